//! Application-wide constants and compile-time configuration.
//!
//! Advertising parameters, GATT values, demo timing and flash layout live
//! here so they can be tuned in one place.

use crate::hid::ReportLayout;

// BLE advertising

/// Complete local name (advertising data and GAP device name).
pub const DEVICE_NAME: &str = "BT Gamepad";

/// GAP appearance: HID category (15), gamepad sub-category (4).
pub const APPEARANCE_GAMEPAD: u16 = 0x03C4;

/// Advertising interval in 0.625 ms units. 0x30 = 30 ms.
pub const ADV_INTERVAL: u32 = 0x0030;

/// Back-off before re-advertising after the SoftDevice rejected a request.
pub const ADV_RETRY_MS: u64 = 500;

/// ATT MTU requested from the SoftDevice. A 13-byte report fits the default
/// 23-byte MTU; a bit of headroom keeps notifications single-packet.
pub const ATT_MTU: u16 = 64;

// HID

/// Report layout advertised by this build.
#[cfg(not(feature = "extended-report"))]
pub const REPORT_LAYOUT: ReportLayout = ReportLayout::Compact;

/// Report layout advertised by this build.
#[cfg(feature = "extended-report")]
pub const REPORT_LAYOUT: ReportLayout = ReportLayout::Extended;

/// Input report length for [`REPORT_LAYOUT`].
pub const REPORT_LEN: usize = REPORT_LAYOUT.report_len();

/// Report ID declared in both report descriptors and in the Report
/// Reference descriptor of the input report characteristic.
pub const HID_REPORT_ID: u8 = 1;

/// HID Information: bcdHID 1.11.
pub const HID_VERSION: u16 = 0x0111;

/// HID Information flags: remote wake (bit 0) | normally connectable (bit 1).
pub const HID_INFO_FLAGS: u8 = 0x03;

// Demo

/// Period between scripted demo reports (ms).
pub const DEMO_PERIOD_MS: u64 = 100;

// Battery / Device Information

/// Constant battery level reported by the Battery Service (percent).
pub const BATTERY_LEVEL: u8 = 100;

/// Device Information strings.
pub const MANUFACTURER_NAME: &str = "bt-gamepad";
pub const MODEL_NUMBER: &str = "BTGP-1";
pub const FIRMWARE_REVISION: &str = env!("CARGO_PKG_VERSION");

/// PnP ID - the "pid.codes" open-source test VID, USB-IF vendor ID source.
/// Replace with your own allocated VID/PID for production.
pub const PNP_VENDOR_ID_SOURCE: u8 = 0x02;
pub const PNP_VENDOR_ID: u16 = 0x1209;
pub const PNP_PRODUCT_ID: u16 = 0x0002;
pub const PNP_PRODUCT_VERSION: u16 = 0x0100;

// Bond storage

/// Maximum number of bonded hosts kept in storage.
pub const MAX_BONDS: usize = 4;

/// Capacity for the GATT system attributes (CCCD state) kept per bond.
pub const SYS_ATTRS_MAX: usize = 64;

/// Flash page index where bond storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for bond storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
