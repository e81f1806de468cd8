//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role as a
//! HID-over-GATT (HOGP) gamepad:
//!
//! 1. **Advertising data** - the connectable advertisement hosts discover.
//! 2. **GATT server** - Battery, Device Information and HID services.
//! 3. **Security** - Just Works pairing and flash-backed bonds.
//! 4. **Peripheral loop** - advertise, serve one host, drive the demo.
//!
//! Only the advertising payload is hardware independent; everything else
//! needs the `embedded` feature.

pub mod adv_data;
#[cfg(feature = "embedded")]
pub mod gatt;
#[cfg(feature = "embedded")]
pub mod peripheral;
#[cfg(feature = "embedded")]
pub mod security;
