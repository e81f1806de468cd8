//! Bonded host storage.
//!
//! [`BondStore`] is the RAM copy of every bond: keys the SoftDevice needs to
//! re-encrypt a link and the GATT system attributes (CCCD state) to restore
//! on reconnect, so a bonded host does not have to re-subscribe. The whole
//! store is persisted as a single flash item by [`flash`].
//!
//! Stored form:
//! ```text
//! [1 count][record 0][record 1]...
//! ```

#[cfg(feature = "embedded")]
pub mod flash;
pub mod record;

pub use record::{BondMasterId, BondRecord};

use heapless::Vec;

use crate::config::MAX_BONDS;

/// Largest serialized store.
pub const MAX_STORE_LEN: usize = 1 + MAX_BONDS * BondRecord::MAX_LEN;

/// In-memory cache of bonds, synced with flash.
///
/// Records are kept oldest first; the most recently bonded host is last.
#[derive(Clone, Debug, Default)]
pub struct BondStore {
    bonds: Vec<BondRecord, MAX_BONDS>,
    /// True if the cache differs from flash.
    dirty: bool,
}

impl BondStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            bonds: Vec::new(),
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BondRecord> {
        self.bonds.iter()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Flag the cache for saving again, e.g. after a failed flash write.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Store a new bond.
    ///
    /// A record with the same master ID or peer address is replaced and
    /// becomes the most recent. When the store is full the oldest bond is
    /// evicted. Returns the evicted record, if any.
    pub fn upsert(&mut self, record: BondRecord) -> Option<BondRecord> {
        self.dirty = true;

        if let Some(pos) = self.bonds.iter().position(|b| {
            b.master_id == record.master_id || b.peer_addr == record.peer_addr
        }) {
            self.bonds.remove(pos);
            let _ = self.bonds.push(record);
            return None;
        }

        let evicted = if self.bonds.is_full() {
            Some(self.bonds.remove(0))
        } else {
            None
        };
        let _ = self.bonds.push(record);
        evicted
    }

    pub fn find_by_master_id(&self, master_id: &BondMasterId) -> Option<&BondRecord> {
        self.bonds.iter().find(|b| b.master_id == *master_id)
    }

    pub fn find_by_peer(&self, peer_addr: &[u8; 6]) -> Option<&BondRecord> {
        self.bonds.iter().find(|b| b.peer_addr == *peer_addr)
    }

    /// Replace the system attributes of the bond for `peer_addr`.
    ///
    /// Returns `false` if the peer is not bonded or `attrs` does not fit.
    /// Unchanged attributes do not mark the store dirty.
    pub fn update_sys_attrs(&mut self, peer_addr: &[u8; 6], attrs: &[u8]) -> bool {
        let Some(bond) = self.bonds.iter_mut().find(|b| b.peer_addr == *peer_addr) else {
            return false;
        };
        if bond.sys_attrs.as_slice() == attrs {
            return true;
        }
        let mut updated = Vec::new();
        if updated.extend_from_slice(attrs).is_err() {
            return false;
        }
        bond.sys_attrs = updated;
        self.dirty = true;
        true
    }

    /// Serialize all bonds to a byte buffer.
    ///
    /// Returns the number of bytes written. Records that do not fit are
    /// left out and the count byte reflects what was written.
    pub fn serialize_all(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let mut offset = 1;
        let mut count = 0u8;
        for bond in &self.bonds {
            let written = bond.serialize(&mut buf[offset..]);
            if written == 0 {
                break;
            }
            offset += written;
            count += 1;
        }
        buf[0] = count;
        offset
    }

    /// Replace the cache with bonds decoded from `data`.
    ///
    /// Decoding stops at the first truncated record. The store is clean
    /// afterwards.
    pub fn deserialize_all(&mut self, data: &[u8]) {
        self.bonds.clear();
        self.dirty = false;

        let Some((&count, mut rest)) = data.split_first() else {
            return;
        };
        for _ in 0..count {
            let Some(bond) = BondRecord::deserialize(rest) else {
                break;
            };
            rest = &rest[bond.encoded_len()..];
            if self.bonds.push(bond).is_err() {
                break;
            }
        }
    }
}
