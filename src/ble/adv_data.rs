//! Advertising payload and AD structure parsing.
//!
//! The payload is assembled at compile time from [`config`] and is what a
//! host's scanner sees before connecting:
//!
//! ```text
//! 02 01 06                  Flags: LE General Discoverable, BR/EDR not supported
//! 0B 09 "BT Gamepad"        Complete Local Name
//! 03 03 12 18               Complete List of 16-bit UUIDs: HID (0x1812)
//! 03 19 C4 03               Appearance: Gamepad (0x03C4)
//! ```
//!
//! The parser walks `len | type | data` structures the way a host scanner
//! does; [`check_adv_data`] runs it over the payload at startup.

use heapless::String;

use crate::config;
use crate::error::Error;

/// AD type codes.
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const INCOMPLETE_16BIT_UUIDS: u8 = 0x02;
    pub const COMPLETE_16BIT_UUIDS: u8 = 0x03;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const APPEARANCE: u8 = 0x19;
}

/// LE General Discoverable Mode | BR/EDR Not Supported.
pub const ADV_FLAGS: u8 = 0x06;

/// Payload limit of a legacy advertising PDU.
pub const LEGACY_ADV_MAX: usize = 31;

/// HID service UUID.
pub const HID_SERVICE_UUID: u16 = 0x1812;

/// Length of [`ADV_DATA`].
pub const ADV_DATA_LEN: usize = 3 + 2 + config::DEVICE_NAME.len() + 4 + 4;

/// Advertising payload.
pub static ADV_DATA: [u8; ADV_DATA_LEN] = build_adv_data();

/// Scan response payload (empty).
pub static SCAN_DATA: [u8; 0] = [];

const fn build_adv_data() -> [u8; ADV_DATA_LEN] {
    let name = config::DEVICE_NAME.as_bytes();
    let uuid = HID_SERVICE_UUID.to_le_bytes();
    let appearance = config::APPEARANCE_GAMEPAD.to_le_bytes();

    let mut out = [0u8; ADV_DATA_LEN];
    out[0] = 0x02;
    out[1] = ad_type::FLAGS;
    out[2] = ADV_FLAGS;

    out[3] = (name.len() + 1) as u8;
    out[4] = ad_type::COMPLETE_LOCAL_NAME;
    let mut i = 0;
    while i < name.len() {
        out[5 + i] = name[i];
        i += 1;
    }

    let mut at = 5 + name.len();
    out[at] = 0x03;
    out[at + 1] = ad_type::COMPLETE_16BIT_UUIDS;
    out[at + 2] = uuid[0];
    out[at + 3] = uuid[1];

    at += 4;
    out[at] = 0x03;
    out[at + 1] = ad_type::APPEARANCE;
    out[at + 2] = appearance[0];
    out[at + 3] = appearance[1];
    out
}

/// Data of the first AD structure of type `ty`.
///
/// Stops at a zero length or a length running past the end of `data`.
pub fn find_ad_structure(data: &[u8], ty: u8) -> Option<&[u8]> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        if data[i + 1] == ty {
            return Some(&data[i + 2..i + 1 + len]);
        }
        i += len + 1;
    }
    None
}

/// Check if raw advertisement data lists the HID Service UUID (0x1812).
pub fn contains_hid_service_uuid(data: &[u8]) -> bool {
    let hid_uuid_le = HID_SERVICE_UUID.to_le_bytes();

    [ad_type::INCOMPLETE_16BIT_UUIDS, ad_type::COMPLETE_16BIT_UUIDS]
        .iter()
        .filter_map(|&ty| find_ad_structure(data, ty))
        .any(|uuids| uuids.chunks_exact(2).any(|chunk| chunk == hid_uuid_le))
}

/// Extract complete/shortened local name from advertisement data.
///
/// Invalid UTF-8 ends the name; names longer than 32 bytes are cut at a
/// character boundary.
pub fn extract_device_name(data: &[u8]) -> Option<String<32>> {
    let bytes = find_ad_structure(data, ad_type::COMPLETE_LOCAL_NAME)
        .or_else(|| find_ad_structure(data, ad_type::SHORTENED_LOCAL_NAME))?;

    let text = match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    };

    let mut name = String::new();
    for c in text.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    Some(name)
}

pub fn extract_appearance(data: &[u8]) -> Option<u16> {
    match find_ad_structure(data, ad_type::APPEARANCE)? {
        [lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

pub fn extract_flags(data: &[u8]) -> Option<u8> {
    find_ad_structure(data, ad_type::FLAGS)?.first().copied()
}

/// Make sure `data` announces this device: HID service, configured name
/// and appearance, discoverable flags, and fits a legacy PDU.
pub fn check_adv_data(data: &[u8]) -> Result<(), Error> {
    let name_matches =
        extract_device_name(data).is_some_and(|n| n.as_str() == config::DEVICE_NAME);
    if data.len() > LEGACY_ADV_MAX
        || !name_matches
        || !contains_hid_service_uuid(data)
        || extract_appearance(data) != Some(config::APPEARANCE_GAMEPAD)
        || extract_flags(data) != Some(ADV_FLAGS)
    {
        return Err(Error::AdvertisingData);
    }
    Ok(())
}
