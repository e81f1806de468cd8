//! HID Report Descriptor parser.
//!
//! Walks a Report Descriptor and builds the input report field map:
//! where each Input item starts (bit offset), how wide it is, which usages
//! it carries and its logical range. The map is used to check at startup
//! that the encoder emits exactly the report the descriptor declares, and
//! to read individual usages back out of an encoded report.
//!
//! ## HID Report Descriptor Structure
//!
//! A Report Descriptor is a sequence of items:
//! - Global items (Usage Page, Logical Min/Max, Report Size/Count,
//!   Report ID) persist until changed.
//! - Local items (Usage, Usage Min/Max) apply to the next Main item only.
//! - Main items (Input, Output, Feature, Collection) consume local state.
//!
//! ## Limitations
//!
//! - Only the first Report ID is mapped; parsing stops at a second one.
//! - Push/Pop state is not supported.
//! - Long items are skipped.

use heapless::Vec;

/// Maximum number of Input main items we track.
pub const MAX_INPUT_FIELDS: usize = 16;

/// Maximum number of explicit Usage items before one main item.
const MAX_LOCAL_USAGES: usize = 8;

/// Usage page codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsagePage {
    /// Generic Desktop (sticks, hat switch, application usages).
    GenericDesktop,
    /// Simulation Controls (brake, accelerator).
    Simulation,
    /// Button.
    Button,
    /// Unknown/unsupported.
    Unknown(u16),
}

impl From<u16> for UsagePage {
    fn from(code: u16) -> Self {
        match code {
            0x01 => UsagePage::GenericDesktop,
            0x02 => UsagePage::Simulation,
            0x09 => UsagePage::Button,
            other => UsagePage::Unknown(other),
        }
    }
}

/// Generic Desktop usage codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DesktopUsage {
    Pointer,
    Joystick,
    GamePad,
    X,
    Y,
    Z,
    Rz,
    HatSwitch,
    Unknown(u16),
}

impl From<u16> for DesktopUsage {
    fn from(code: u16) -> Self {
        match code {
            0x01 => DesktopUsage::Pointer,
            0x04 => DesktopUsage::Joystick,
            0x05 => DesktopUsage::GamePad,
            0x30 => DesktopUsage::X,
            0x31 => DesktopUsage::Y,
            0x32 => DesktopUsage::Z,
            0x35 => DesktopUsage::Rz,
            0x39 => DesktopUsage::HatSwitch,
            other => DesktopUsage::Unknown(other),
        }
    }
}

/// Usage codes on the pages a gamepad descriptor uses.
pub mod usage {
    pub const X: u16 = 0x30;
    pub const Y: u16 = 0x31;
    pub const Z: u16 = 0x32;
    pub const RZ: u16 = 0x35;
    pub const HAT_SWITCH: u16 = 0x39;
    pub const ACCELERATOR: u16 = 0xC4;
    pub const BRAKE: u16 = 0xC5;
}

/// One Input main item.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputField {
    pub usage_page: UsagePage,
    /// Explicit usages, in order. Empty when a usage range is used.
    pub usages: Vec<u16, MAX_LOCAL_USAGES>,
    pub usage_min: u16,
    pub usage_max: u16,
    /// Offset of the first bit within the report (Report ID excluded).
    pub bit_offset: u16,
    pub report_size: u16,
    pub report_count: u16,
    pub logical_min: i32,
    pub logical_max: i32,
    /// Constant (padding) item.
    pub constant: bool,
}

impl InputField {
    pub fn bit_len(&self) -> u16 {
        self.report_size.saturating_mul(self.report_count)
    }

    /// Usage assigned to element `index` of this item.
    ///
    /// With fewer explicit usages than elements, the last usage repeats.
    pub fn usage_at(&self, index: u16) -> Option<u16> {
        if self.constant || index >= self.report_count {
            return None;
        }
        if let Some(&last) = self.usages.last() {
            return Some(*self.usages.get(index as usize).unwrap_or(&last));
        }
        let usage = self.usage_min.checked_add(index)?;
        (usage <= self.usage_max).then_some(usage)
    }

    fn element(&self, index: u16) -> FieldRef {
        FieldRef {
            bit_offset: self.bit_offset + index * self.report_size,
            bit_size: self.report_size,
            signed: self.logical_min < 0,
        }
    }
}

/// Location of a single usage value inside a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldRef {
    pub bit_offset: u16,
    pub bit_size: u16,
    /// Sign-extend on extraction (logical minimum is negative).
    pub signed: bool,
}

impl FieldRef {
    /// Read the value out of `data`, LSB-first as HID packs fields.
    pub fn extract(&self, data: &[u8]) -> Option<i32> {
        let size = self.bit_size as usize;
        if size == 0 || size > 32 {
            return None;
        }
        let start = self.bit_offset as usize;
        if start + size > data.len() * 8 {
            return None;
        }

        let mut raw: u32 = 0;
        for bit in 0..size {
            let pos = start + bit;
            if (data[pos / 8] >> (pos % 8)) & 1 == 1 {
                raw |= 1 << bit;
            }
        }

        if self.signed && size < 32 && raw & (1 << (size - 1)) != 0 {
            raw |= u32::MAX << size;
        }
        Some(raw as i32)
    }
}

/// Parsed gamepad report descriptor.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidDescriptor {
    /// Usage of the top-level application collection.
    pub application: DesktopUsage,
    /// Report ID of the mapped input report, when the descriptor uses IDs.
    pub report_id: Option<u8>,
    /// Input items in report order.
    pub fields: Vec<InputField, MAX_INPUT_FIELDS>,
    input_bits: u16,
}

impl HidDescriptor {
    /// Input report payload length in bytes (Report ID excluded).
    pub fn input_report_len(&self) -> usize {
        (self.input_bits as usize).div_ceil(8)
    }

    /// Find where the value of `usage` on `page` lives.
    pub fn locate(&self, page: UsagePage, usage: u16) -> Option<FieldRef> {
        self.fields
            .iter()
            .filter(|f| f.usage_page == page)
            .find_map(|f| {
                (0..f.report_count)
                    .find(|&i| f.usage_at(i) == Some(usage))
                    .map(|i| f.element(i))
            })
    }

    /// Total bits of constant (padding) input items.
    pub fn padding_bits(&self) -> u16 {
        self.fields
            .iter()
            .filter(|f| f.constant)
            .map(InputField::bit_len)
            .sum()
    }
}

impl HidDescriptor {
    /// Parse a HID Report Descriptor.
    ///
    /// Returns `None` unless the descriptor declares a Game Pad or Joystick
    /// application collection with at least one input item.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut application: Option<DesktopUsage> = None;
        let mut report_id: Option<u8> = None;
        let mut fields: Vec<InputField, MAX_INPUT_FIELDS> = Vec::new();
        let mut bit_offset: u16 = 0;
        let mut depth: u8 = 0;

        // Global state.
        let mut usage_page = UsagePage::Unknown(0);
        let mut logical_min: i32 = 0;
        let mut logical_max: i32 = 0;
        let mut report_size: u16 = 0;
        let mut report_count: u16 = 0;

        // Local state, reset after every main item.
        let mut usages: Vec<u16, MAX_LOCAL_USAGES> = Vec::new();
        let mut usage_min: u16 = 0;
        let mut usage_max: u16 = 0;

        let mut i = 0;
        while i < data.len() {
            let prefix = data[i];

            // Long item: 0xFE, size, tag, data.
            if prefix == 0xFE {
                let Some(&len) = data.get(i + 1) else { break };
                i += 3 + len as usize;
                continue;
            }

            let tag = (prefix >> 4) & 0x0F;
            let item_type = (prefix >> 2) & 0x03;
            let size = match prefix & 0x03 {
                0 => 0,
                1 => 1,
                2 => 2,
                _ => 4,
            };

            if i + 1 + size > data.len() {
                break;
            }
            let item = &data[i + 1..i + 1 + size];
            let value = unsigned_value(item);

            match item_type {
                // Main items
                0 => {
                    match tag {
                        // Input
                        0x08 => {
                            let field = InputField {
                                usage_page,
                                usages: usages.clone(),
                                usage_min,
                                usage_max,
                                bit_offset,
                                report_size,
                                report_count,
                                logical_min,
                                logical_max,
                                constant: value & 0x01 != 0,
                            };
                            bit_offset = bit_offset.saturating_add(field.bit_len());
                            if fields.push(field).is_err() {
                                return None;
                            }
                        }
                        // Collection
                        0x0A => {
                            // 0x01 = Application
                            if depth == 0
                                && value == 0x01
                                && application.is_none()
                                && usage_page == UsagePage::GenericDesktop
                            {
                                application = usages.first().map(|&u| DesktopUsage::from(u));
                            }
                            depth = depth.saturating_add(1);
                        }
                        // End Collection
                        0x0C => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    usages.clear();
                    usage_min = 0;
                    usage_max = 0;
                }
                // Global items
                1 => match tag {
                    0x00 => usage_page = UsagePage::from(value as u16),
                    0x01 => logical_min = signed_value(item),
                    0x02 => logical_max = signed_value(item),
                    0x07 => report_size = value as u16,
                    0x08 => {
                        let id = value as u8;
                        match report_id {
                            Some(current) if current != id => break,
                            _ => report_id = Some(id),
                        }
                    }
                    0x09 => report_count = value as u16,
                    _ => {}
                },
                // Local items
                2 => match tag {
                    0x00 => {
                        let _ = usages.push(value as u16);
                    }
                    0x01 => usage_min = value as u16,
                    0x02 => usage_max = value as u16,
                    _ => {}
                },
                _ => {}
            }

            i += 1 + size;
        }

        match application {
            Some(app @ (DesktopUsage::GamePad | DesktopUsage::Joystick)) if !fields.is_empty() => {
                Some(HidDescriptor {
                    application: app,
                    report_id,
                    fields,
                    input_bits: bit_offset,
                })
            }
            _ => None,
        }
    }
}

fn unsigned_value(item: &[u8]) -> u32 {
    item.iter()
        .rev()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn signed_value(item: &[u8]) -> i32 {
    match item.len() {
        1 => item[0] as i8 as i32,
        2 => i16::from_le_bytes([item[0], item[1]]) as i32,
        4 => i32::from_le_bytes([item[0], item[1], item[2], item[3]]),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::descriptor::{GAMEPAD_EXTENDED_REPORT_DESCRIPTOR, GAMEPAD_REPORT_DESCRIPTOR};

    #[test]
    fn compact_descriptor_declares_nine_byte_report() {
        let desc = HidDescriptor::parse(GAMEPAD_REPORT_DESCRIPTOR).unwrap();
        assert_eq!(desc.application, DesktopUsage::GamePad);
        assert_eq!(desc.report_id, Some(1));
        assert_eq!(desc.input_report_len(), 9);
        assert_eq!(desc.padding_bits(), 4);
    }

    #[test]
    fn extended_descriptor_declares_thirteen_byte_report() {
        let desc = HidDescriptor::parse(GAMEPAD_EXTENDED_REPORT_DESCRIPTOR).unwrap();
        assert_eq!(desc.report_id, Some(1));
        assert_eq!(desc.input_report_len(), 13);
        assert_eq!(desc.padding_bits(), 8);
    }

    #[test]
    fn compact_field_offsets() {
        let desc = HidDescriptor::parse(GAMEPAD_REPORT_DESCRIPTOR).unwrap();

        let b1 = desc.locate(UsagePage::Button, 1).unwrap();
        assert_eq!((b1.bit_offset, b1.bit_size, b1.signed), (0, 1, false));
        let b16 = desc.locate(UsagePage::Button, 16).unwrap();
        assert_eq!(b16.bit_offset, 15);
        assert!(desc.locate(UsagePage::Button, 17).is_none());

        let x = desc.locate(UsagePage::GenericDesktop, usage::X).unwrap();
        assert_eq!((x.bit_offset, x.bit_size, x.signed), (16, 8, true));
        let rz = desc.locate(UsagePage::GenericDesktop, usage::RZ).unwrap();
        assert_eq!(rz.bit_offset, 40);

        let brake = desc.locate(UsagePage::Simulation, usage::BRAKE).unwrap();
        assert_eq!((brake.bit_offset, brake.signed), (48, false));
        let accel = desc.locate(UsagePage::Simulation, usage::ACCELERATOR).unwrap();
        assert_eq!(accel.bit_offset, 56);

        let hat = desc
            .locate(UsagePage::GenericDesktop, usage::HAT_SWITCH)
            .unwrap();
        assert_eq!((hat.bit_offset, hat.bit_size), (64, 4));
    }

    #[test]
    fn extended_field_offsets() {
        let desc = HidDescriptor::parse(GAMEPAD_EXTENDED_REPORT_DESCRIPTOR).unwrap();

        assert!(desc.locate(UsagePage::Button, 12).is_some());
        assert!(desc.locate(UsagePage::Button, 13).is_none());

        let y = desc.locate(UsagePage::GenericDesktop, usage::Y).unwrap();
        assert_eq!((y.bit_offset, y.bit_size, y.signed), (32, 16, true));
        let hat = desc
            .locate(UsagePage::GenericDesktop, usage::HAT_SWITCH)
            .unwrap();
        assert_eq!(hat.bit_offset, 96);
    }

    #[test]
    fn logical_ranges_are_sign_extended() {
        let desc = HidDescriptor::parse(GAMEPAD_EXTENDED_REPORT_DESCRIPTOR).unwrap();
        let sticks = desc
            .fields
            .iter()
            .find(|f| f.usages.first() == Some(&usage::X))
            .unwrap();
        assert_eq!(sticks.logical_min, -32767);
        assert_eq!(sticks.logical_max, 32767);

        let triggers = desc
            .fields
            .iter()
            .find(|f| f.usage_page == UsagePage::Simulation)
            .unwrap();
        assert_eq!(triggers.logical_max, 255);
    }

    #[test]
    fn extract_reads_lsb_first_and_sign_extends() {
        let field = FieldRef {
            bit_offset: 4,
            bit_size: 8,
            signed: true,
        };
        // 0x81 spread over the nibble boundary: low nibble 1 in byte 0 high,
        // high nibble 8 in byte 1 low.
        assert_eq!(field.extract(&[0x10, 0x08]), Some(-127));

        let unsigned = FieldRef {
            signed: false,
            ..field
        };
        assert_eq!(unsigned.extract(&[0x10, 0x08]), Some(0x81));
        assert_eq!(unsigned.extract(&[0x10]), None);
    }

    #[test]
    fn rejects_non_gamepad_descriptors() {
        // Mouse application collection.
        let mouse = [
            0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x05, 0x09, 0x19, 0x01, 0x29, 0x03, 0x15, 0x00,
            0x25, 0x01, 0x95, 0x03, 0x75, 0x01, 0x81, 0x02, 0xC0,
        ];
        assert!(HidDescriptor::parse(&mouse).is_none());
        assert!(HidDescriptor::parse(&[]).is_none());
    }

    #[test]
    fn truncated_descriptor_does_not_panic() {
        let truncated = &GAMEPAD_REPORT_DESCRIPTOR[..GAMEPAD_REPORT_DESCRIPTOR.len() - 20];
        let desc = HidDescriptor::parse(truncated).unwrap();
        assert!(desc.input_report_len() < 9);

        // Item header promising more data than is left.
        assert!(HidDescriptor::parse(&[0x05, 0x01, 0x09, 0x05, 0xA1]).is_none());
    }

    #[test]
    fn second_report_id_ends_the_map() {
        let mut two_reports: heapless::Vec<u8, 160> = heapless::Vec::new();
        two_reports
            .extend_from_slice(&GAMEPAD_REPORT_DESCRIPTOR[..GAMEPAD_REPORT_DESCRIPTOR.len() - 1])
            .unwrap();
        two_reports
            .extend_from_slice(&[0x85, 0x02, 0x95, 0x08, 0x75, 0x08, 0x81, 0x02, 0xC0])
            .unwrap();
        let desc = HidDescriptor::parse(&two_reports).unwrap();
        assert_eq!(desc.report_id, Some(1));
        assert_eq!(desc.input_report_len(), 9);
    }
}
