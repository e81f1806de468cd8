//! BLE HID gamepad.
//!
//! Report encoding, descriptors, the demo script, session state and bond
//! storage are hardware independent and tested on the host:
//!
//! Usage: `cargo test`
//!
//! With the `embedded` feature the crate also provides the SoftDevice glue
//! (`ble::gatt`, `ble::security`, `ble::peripheral`, `storage::flash`) that
//! `main.rs` wires together on the nRF52840.

#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod config;
pub mod demo;
pub mod error;
pub mod hid;
pub mod session;
pub mod storage;

pub use error::{BleError, Error};
pub use hid::{Dpad, EncodedReport, GamepadReport, ReportLayout};
pub use session::{Action, GamepadEvent, Session};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
