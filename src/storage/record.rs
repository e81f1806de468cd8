//! Bond record and its flash encoding.
//!
//! Format (little-endian):
//! ```text
//! [2 ediv][8 rand][16 ltk][1 ltk flags][16 irk][1 addr type][6 addr]
//! [1 sys_len][sys_len sys attrs]
//! ```

use heapless::Vec;

use crate::config::SYS_ATTRS_MAX;

/// Encrypted Diversifier and random number identifying a long-term key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BondMasterId {
    pub ediv: u16,
    pub rand: [u8; 8],
}

/// Keys and GATT state for one bonded host.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BondRecord {
    pub master_id: BondMasterId,
    pub ltk: [u8; 16],
    pub ltk_flags: u8,
    pub irk: [u8; 16],
    pub peer_addr_type: u8,
    pub peer_addr: [u8; 6],
    /// CCCD values the SoftDevice handed us on disconnect.
    pub sys_attrs: Vec<u8, SYS_ATTRS_MAX>,
}

impl BondRecord {
    /// Encoded size without system attributes.
    pub const HEADER_LEN: usize = 2 + 8 + 16 + 1 + 16 + 1 + 6 + 1;

    /// Largest encoded record.
    pub const MAX_LEN: usize = Self::HEADER_LEN + SYS_ATTRS_MAX;

    pub fn encoded_len(&self) -> usize {
        Self::HEADER_LEN + self.sys_attrs.len()
    }

    /// Serialize to bytes for flash storage.
    ///
    /// Returns the number of bytes written, or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let total = self.encoded_len();
        if buf.len() < total {
            return 0;
        }

        buf[0..2].copy_from_slice(&self.master_id.ediv.to_le_bytes());
        buf[2..10].copy_from_slice(&self.master_id.rand);
        buf[10..26].copy_from_slice(&self.ltk);
        buf[26] = self.ltk_flags;
        buf[27..43].copy_from_slice(&self.irk);
        buf[43] = self.peer_addr_type;
        buf[44..50].copy_from_slice(&self.peer_addr);
        buf[50] = self.sys_attrs.len() as u8;
        buf[51..total].copy_from_slice(&self.sys_attrs);
        total
    }

    /// Deserialize one record from the start of `data`.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_LEN {
            return None;
        }
        let sys_len = data[50] as usize;
        if sys_len > SYS_ATTRS_MAX || data.len() < Self::HEADER_LEN + sys_len {
            return None;
        }

        let mut record = Self {
            master_id: BondMasterId {
                ediv: u16::from_le_bytes([data[0], data[1]]),
                rand: data[2..10].try_into().ok()?,
            },
            ltk: data[10..26].try_into().ok()?,
            ltk_flags: data[26],
            irk: data[27..43].try_into().ok()?,
            peer_addr_type: data[43],
            peer_addr: data[44..50].try_into().ok()?,
            sys_attrs: Vec::new(),
        };
        record
            .sys_attrs
            .extend_from_slice(&data[Self::HEADER_LEN..Self::HEADER_LEN + sys_len])
            .ok()?;
        Some(record)
    }
}
