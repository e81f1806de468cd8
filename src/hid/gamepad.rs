//! Gamepad input report and its byte encoding.
//!
//! A single [`GamepadReport`] value is encoded for either
//! [`ReportLayout`](super::ReportLayout). Every field is clamped or masked
//! to the bit width the layout's descriptor declares before it is packed,
//! so out-of-range values never bleed into neighbouring fields.

use super::dpad::{Dpad, HAT_MASK};
use super::{EncodedReport, ReportLayout};

/// Button bits (Xbox naming). Bit *n* is HID Button *n + 1*.
pub mod button {
    pub const A: u16 = 0x0001;
    pub const B: u16 = 0x0002;
    pub const X: u16 = 0x0004;
    pub const Y: u16 = 0x0008;
    pub const LB: u16 = 0x0010;
    pub const RB: u16 = 0x0020;
    pub const BACK: u16 = 0x0040;
    pub const START: u16 = 0x0080;
    pub const LS: u16 = 0x0100;
    pub const RS: u16 = 0x0200;
    pub const GUIDE: u16 = 0x0400;

    /// Bit for 1-based HID button number `n` (1..=16), or 0 when out of range.
    pub const fn nth(n: u8) -> u16 {
        if n == 0 || n > 16 {
            0
        } else {
            1 << (n - 1)
        }
    }
}

/// Controller state for one input report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    /// Button bitfield (see [`button`]).
    pub buttons: u16,
    /// Left stick X (negative = left).
    pub left_x: i16,
    /// Left stick Y (negative = up).
    pub left_y: i16,
    /// Right stick X (negative = left).
    pub right_x: i16,
    /// Right stick Y (negative = up).
    pub right_y: i16,
    /// Left trigger, 0 = released.
    pub left_trigger: u8,
    /// Right trigger, 0 = released.
    pub right_trigger: u8,
    pub dpad: Dpad,
}

impl GamepadReport {
    /// Nothing pressed, sticks centered, D-pad neutral.
    pub const fn neutral() -> Self {
        Self {
            buttons: 0,
            left_x: 0,
            left_y: 0,
            right_x: 0,
            right_y: 0,
            left_trigger: 0,
            right_trigger: 0,
            dpad: Dpad::Neutral,
        }
    }

    /// Returns `true` when the report carries no input at all.
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    /// Serialise into `buf` using `layout`.
    ///
    /// Returns the number of bytes written (`layout.report_len()`), or 0
    /// when `buf` is too small.
    pub fn serialize(&self, layout: ReportLayout, buf: &mut [u8]) -> usize {
        let len = layout.report_len();
        if buf.len() < len {
            return 0;
        }

        let [lo, hi] = (self.buttons & layout.button_mask()).to_le_bytes();
        buf[0] = lo;
        buf[1] = hi;

        let max = layout.axis_max();
        let mut offset = 2;
        for axis in [self.left_x, self.left_y, self.right_x, self.right_y] {
            let value = axis.clamp(-max, max);
            match layout {
                ReportLayout::Compact => {
                    buf[offset] = value as i8 as u8;
                    offset += 1;
                }
                ReportLayout::Extended => {
                    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
                    offset += 2;
                }
            }
        }

        buf[offset] = self.left_trigger;
        buf[offset + 1] = self.right_trigger;
        // Upper nibble is constant padding.
        buf[offset + 2] = self.dpad.hat() & HAT_MASK;

        len
    }

    /// Encode into an owned fixed-capacity buffer.
    pub fn encode(&self, layout: ReportLayout) -> EncodedReport {
        let mut report = EncodedReport::empty();
        let len = self.serialize(layout, &mut report.bytes);
        report.len = len as u8;
        report
    }

    /// Parse a report previously produced for `layout`.
    ///
    /// Extra trailing bytes are ignored. Padding bits are discarded.
    pub fn from_bytes(layout: ReportLayout, data: &[u8]) -> Option<Self> {
        if data.len() < layout.report_len() {
            return None;
        }

        let buttons = u16::from_le_bytes([data[0], data[1]]) & layout.button_mask();

        let mut axes = [0i16; 4];
        let mut offset = 2;
        for axis in axes.iter_mut() {
            *axis = match layout {
                ReportLayout::Compact => {
                    offset += 1;
                    data[offset - 1] as i8 as i16
                }
                ReportLayout::Extended => {
                    offset += 2;
                    i16::from_le_bytes([data[offset - 2], data[offset - 1]])
                }
            };
        }

        Some(Self {
            buttons,
            left_x: axes[0],
            left_y: axes[1],
            right_x: axes[2],
            right_y: axes[3],
            left_trigger: data[offset],
            right_trigger: data[offset + 1],
            dpad: Dpad::from_hat(data[offset + 2]),
        })
    }

    /// The report as the encoder will actually emit it for `layout`:
    /// buttons masked, axes clamped.
    pub fn clamped(&self, layout: ReportLayout) -> Self {
        let max = layout.axis_max();
        Self {
            buttons: self.buttons & layout.button_mask(),
            left_x: self.left_x.clamp(-max, max),
            left_y: self.left_y.clamp(-max, max),
            right_x: self.right_x.clamp(-max, max),
            right_y: self.right_y.clamp(-max, max),
            ..*self
        }
    }
}
