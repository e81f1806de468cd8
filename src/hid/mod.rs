//! HID gamepad report types, report descriptors and the descriptor parser.

pub mod descriptor;
pub mod dpad;
pub mod gamepad;
pub mod report_protocol;


pub use dpad::Dpad;
pub use gamepad::{button, GamepadReport};

use core::ops::RangeInclusive;

use crate::config;
use crate::error::Error;
use report_protocol::HidDescriptor;

/// Compact report size in bytes.
pub const COMPACT_REPORT_SIZE: usize = 9;

/// Extended report size in bytes.
pub const EXTENDED_REPORT_SIZE: usize = 13;

/// Largest report any layout produces.
pub const MAX_REPORT_LEN: usize = EXTENDED_REPORT_SIZE;

/// Input report layout, paired with one report descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportLayout {
    /// 16 buttons, 8-bit axes, 9-byte report.
    Compact,
    /// 12 buttons, 16-bit little-endian axes, 13-byte report.
    Extended,
}

impl ReportLayout {
    pub const fn report_len(self) -> usize {
        match self {
            ReportLayout::Compact => COMPACT_REPORT_SIZE,
            ReportLayout::Extended => EXTENDED_REPORT_SIZE,
        }
    }

    pub const fn button_count(self) -> u8 {
        match self {
            ReportLayout::Compact => 16,
            ReportLayout::Extended => 12,
        }
    }

    /// Mask of the button bits the descriptor declares.
    pub const fn button_mask(self) -> u16 {
        match self {
            ReportLayout::Compact => 0xFFFF,
            ReportLayout::Extended => 0x0FFF,
        }
    }

    /// Largest axis magnitude; the logical range is symmetric.
    pub const fn axis_max(self) -> i16 {
        match self {
            ReportLayout::Compact => i8::MAX as i16,
            ReportLayout::Extended => i16::MAX,
        }
    }

    pub const fn axis_range(self) -> RangeInclusive<i16> {
        -self.axis_max()..=self.axis_max()
    }

    /// Steps in one pass of the demo script: one per button, two per axis,
    /// one per trigger, one per D-pad direction, the combination and the
    /// neutral step.
    pub const fn demo_len(self) -> usize {
        self.button_count() as usize + 4 * 2 + 2 + Dpad::DIRECTIONS.len() + 2
    }

    /// Report Map registered with the HID service.
    pub const fn descriptor(self) -> &'static [u8] {
        match self {
            ReportLayout::Compact => descriptor::GAMEPAD_REPORT_DESCRIPTOR,
            ReportLayout::Extended => descriptor::GAMEPAD_EXTENDED_REPORT_DESCRIPTOR,
        }
    }

    /// Parse the layout's descriptor and make sure it declares exactly the
    /// report the encoder produces.
    pub fn check_descriptor(self) -> Result<HidDescriptor, Error> {
        let desc = HidDescriptor::parse(self.descriptor()).ok_or(Error::DescriptorMismatch)?;
        if desc.input_report_len() != self.report_len()
            || desc.report_id != Some(config::HID_REPORT_ID)
        {
            return Err(Error::DescriptorMismatch);
        }
        Ok(desc)
    }
}

/// An encoded input report, ready for a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncodedReport {
    bytes: [u8; MAX_REPORT_LEN],
    len: u8,
}

impl EncodedReport {
    const fn empty() -> Self {
        Self {
            bytes: [0; MAX_REPORT_LEN],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
