//! Property tests for report encoding.

use bt_gamepad::hid::{Dpad, GamepadReport, ReportLayout};
use proptest::prelude::*;

fn any_dpad() -> impl Strategy<Value = Dpad> {
    (0u8..=8).prop_map(Dpad::from_hat)
}

fn any_report() -> impl Strategy<Value = GamepadReport> {
    (
        any::<u16>(),
        any::<[i16; 4]>(),
        any::<u8>(),
        any::<u8>(),
        any_dpad(),
    )
        .prop_map(|(buttons, axes, lt, rt, dpad)| GamepadReport {
            buttons,
            left_x: axes[0],
            left_y: axes[1],
            right_x: axes[2],
            right_y: axes[3],
            left_trigger: lt,
            right_trigger: rt,
            dpad,
        })
}

fn any_layout() -> impl Strategy<Value = ReportLayout> {
    prop_oneof![Just(ReportLayout::Compact), Just(ReportLayout::Extended)]
}

proptest! {
    #[test]
    fn encoded_length_is_fixed(report in any_report(), layout in any_layout()) {
        prop_assert_eq!(report.encode(layout).len(), layout.report_len());
    }

    #[test]
    fn decode_returns_clamped_input(report in any_report(), layout in any_layout()) {
        let encoded = report.encode(layout);
        let decoded = GamepadReport::from_bytes(layout, encoded.as_bytes()).unwrap();
        prop_assert_eq!(decoded, report.clamped(layout));
    }

    #[test]
    fn axes_stay_in_logical_range(report in any_report(), layout in any_layout()) {
        let decoded = GamepadReport::from_bytes(layout, report.encode(layout).as_bytes()).unwrap();
        let range = layout.axis_range();
        for axis in [decoded.left_x, decoded.left_y, decoded.right_x, decoded.right_y] {
            prop_assert!(range.contains(&axis));
        }
    }

    #[test]
    fn padding_bits_are_zero(report in any_report()) {
        let compact = report.encode(ReportLayout::Compact);
        prop_assert_eq!(compact.as_bytes()[8] & 0xF0, 0);

        let extended = report.encode(ReportLayout::Extended);
        prop_assert_eq!(extended.as_bytes()[1] & 0xF0, 0);
        prop_assert_eq!(extended.as_bytes()[12] & 0xF0, 0);
    }

    #[test]
    fn buttons_do_not_touch_other_fields(buttons in any::<u16>(), layout in any_layout()) {
        let report = GamepadReport { buttons, ..GamepadReport::default() };
        let neutral = GamepadReport::default().encode(layout);
        let encoded = report.encode(layout);
        prop_assert_eq!(&encoded.as_bytes()[2..], &neutral.as_bytes()[2..]);
    }

    #[test]
    fn short_buffers_are_never_written(report in any_report(), layout in any_layout(), len in 0usize..9) {
        let mut buf = [0x5Au8; 13];
        let short = &mut buf[..len.min(layout.report_len() - 1)];
        prop_assert_eq!(report.serialize(layout, short), 0);
        prop_assert!(buf.iter().all(|&b| b == 0x5A));
    }
}
