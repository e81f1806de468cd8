//! Unified error type for bt-gamepad.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    /// The GATT server could not be registered with the SoftDevice.
    GattRegister,

    /// The advertising payload does not announce this device.
    AdvertisingData,

    // HID
    /// The report descriptor does not describe the report the encoder emits.
    DescriptorMismatch,

    /// An encoded report does not match the input report characteristic size.
    ReportLength,

    // Storage
    /// Flash read/write/erase failed.
    Storage,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Raw error code from a SoftDevice call.
    Raw(u32),
    /// Advertising could not start or ended without a connection.
    AdvertiseFailed,
    /// Characteristic notification failed.
    NotifyFailed,
    /// Writing a characteristic value into the attribute table failed.
    SetValueFailed,
    /// Reading or restoring GATT system attributes failed.
    SysAttrsFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ble_error_converts_into_error() {
        let err: Error = BleError::NotifyFailed.into();
        assert_eq!(err, Error::Ble(BleError::NotifyFailed));
    }

    #[test]
    fn raw_code_is_preserved() {
        let err: Error = BleError::Raw(0x3001).into();
        assert!(matches!(err, Error::Ble(BleError::Raw(0x3001))));
    }
}
