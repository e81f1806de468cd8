//! Scripted demo input.
//!
//! Cycles through every input the gamepad declares, one per tick: each
//! button alone, each stick axis at both extremes, each trigger fully
//! pressed, the eight D-pad directions, a face-button combination with
//! half-pressed triggers and finally an all-neutral report.
//!
//! Every step starts from a neutral report, so the D-pad reads centered
//! unless the step is a D-pad step.

use crate::hid::{button, Dpad, GamepadReport, ReportLayout};

/// One scripted step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DemoStep {
    pub report: GamepadReport,
    pub label: &'static str,
}

const BUTTON_LABELS: [&str; 16] = [
    "A Button (Button 1)",
    "B Button (Button 2)",
    "X Button (Button 3)",
    "Y Button (Button 4)",
    "Left Bumper (Button 5)",
    "Right Bumper (Button 6)",
    "Back Button (Button 7)",
    "Start Button (Button 8)",
    "Left Stick Button (Button 9)",
    "Right Stick Button (Button 10)",
    "Guide Button (Button 11)",
    "Button 12",
    "Button 13",
    "Button 14",
    "Button 15",
    "Button 16",
];

#[derive(Clone, Copy)]
enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// Axis steps: axis, positive extreme, label.
const AXIS_STEPS: [(Axis, bool, &str); 8] = [
    (Axis::LeftX, false, "Left Stick X - Full Left"),
    (Axis::LeftX, true, "Left Stick X - Full Right"),
    (Axis::LeftY, false, "Left Stick Y - Full Up"),
    (Axis::LeftY, true, "Left Stick Y - Full Down"),
    (Axis::RightX, false, "Right Stick X - Full Left"),
    (Axis::RightX, true, "Right Stick X - Full Right"),
    (Axis::RightY, false, "Right Stick Y - Full Up"),
    (Axis::RightY, true, "Right Stick Y - Full Down"),
];

const DPAD_LABELS: [&str; 8] = [
    "D-Pad Up",
    "D-Pad Up-Right",
    "D-Pad Right",
    "D-Pad Down-Right",
    "D-Pad Down",
    "D-Pad Down-Left",
    "D-Pad Left",
    "D-Pad Up-Left",
];

/// Trigger value for the combination step.
const HALF_TRIGGER: u8 = 127;

/// Build step `index` (modulo the script length) for `layout`.
pub fn step(layout: ReportLayout, index: usize) -> DemoStep {
    let mut report = GamepadReport::neutral();
    let mut i = index % layout.demo_len();

    let buttons = layout.button_count() as usize;
    if i < buttons {
        report.buttons = button::nth(i as u8 + 1);
        return DemoStep {
            report,
            label: BUTTON_LABELS[i],
        };
    }
    i -= buttons;

    if let Some(&(axis, positive, label)) = AXIS_STEPS.get(i) {
        let max = layout.axis_max();
        let value = if positive { max } else { -max };
        match axis {
            Axis::LeftX => report.left_x = value,
            Axis::LeftY => report.left_y = value,
            Axis::RightX => report.right_x = value,
            Axis::RightY => report.right_y = value,
        }
        return DemoStep { report, label };
    }
    i -= AXIS_STEPS.len();

    match i {
        0 => {
            report.left_trigger = u8::MAX;
            DemoStep {
                report,
                label: "Left Trigger - Full Press",
            }
        }
        1 => {
            report.right_trigger = u8::MAX;
            DemoStep {
                report,
                label: "Right Trigger - Full Press",
            }
        }
        2..=9 => {
            report.dpad = Dpad::DIRECTIONS[i - 2];
            DemoStep {
                report,
                label: DPAD_LABELS[i - 2],
            }
        }
        10 => {
            report.buttons = button::A | button::B | button::X | button::Y;
            report.left_trigger = HALF_TRIGGER;
            report.right_trigger = HALF_TRIGGER;
            DemoStep {
                report,
                label: "Multiple Buttons + Half Triggers",
            }
        }
        _ => DemoStep {
            report,
            label: "All Neutral",
        },
    }
}

/// Walks the demo script in order, wrapping after the last step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DemoSequencer {
    layout: ReportLayout,
    step: usize,
}

impl DemoSequencer {
    pub const fn new(layout: ReportLayout) -> Self {
        Self { layout, step: 0 }
    }

    /// Index of the step the next call to [`next_step`](Self::next_step)
    /// returns.
    pub fn position(&self) -> usize {
        self.step
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    pub fn next_step(&mut self) -> DemoStep {
        let current = step(self.layout, self.step);
        self.step = (self.step + 1) % self.layout.demo_len();
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_script_covers_sixteen_buttons() {
        for n in 0..16 {
            let s = step(ReportLayout::Compact, n);
            assert_eq!(s.report.buttons, 1 << n);
            assert_eq!(s.report.dpad, Dpad::Neutral);
        }
        assert_eq!(step(ReportLayout::Compact, 16).report.left_x, -127);
        assert_eq!(step(ReportLayout::Compact, 16).report.buttons, 0);
    }

    #[test]
    fn extended_script_stops_at_button_twelve() {
        assert_eq!(step(ReportLayout::Extended, 11).report.buttons, 0x0800);
        assert_eq!(step(ReportLayout::Extended, 11).label, "Button 12");
        let axis = step(ReportLayout::Extended, 12);
        assert_eq!(axis.report.left_x, -32767);
        assert_eq!(axis.report.buttons, 0);
    }

    #[test]
    fn axis_steps_use_layout_extremes() {
        let base = 16;
        let expected = [
            (-127, 0, 0, 0),
            (127, 0, 0, 0),
            (0, -127, 0, 0),
            (0, 127, 0, 0),
            (0, 0, -127, 0),
            (0, 0, 127, 0),
            (0, 0, 0, -127),
            (0, 0, 0, 127),
        ];
        for (i, axes) in expected.iter().enumerate() {
            let r = step(ReportLayout::Compact, base + i).report;
            assert_eq!((r.left_x, r.left_y, r.right_x, r.right_y), *axes);
        }
    }

    #[test]
    fn trigger_dpad_and_tail_steps() {
        let layout = ReportLayout::Compact;
        assert_eq!(step(layout, 24).report.left_trigger, 255);
        assert_eq!(step(layout, 24).report.right_trigger, 0);
        assert_eq!(step(layout, 25).report.right_trigger, 255);

        for (i, dir) in Dpad::DIRECTIONS.iter().enumerate() {
            let s = step(layout, 26 + i);
            assert_eq!(s.report.dpad, *dir);
            assert_eq!(s.report.buttons, 0);
        }

        let combo = step(layout, 34).report;
        assert_eq!(combo.buttons, 0x000F);
        assert_eq!((combo.left_trigger, combo.right_trigger), (127, 127));
        assert_eq!(combo.dpad, Dpad::Neutral);

        let last = step(layout, 35);
        assert!(last.report.is_neutral());
        assert_eq!(last.label, "All Neutral");
    }

    #[test]
    fn extended_tail_is_shifted_by_four() {
        let layout = ReportLayout::Extended;
        assert_eq!(step(layout, 20).report.left_trigger, 255);
        assert_eq!(step(layout, 22).report.dpad, Dpad::Up);
        assert!(step(layout, 31).report.is_neutral());
    }

    #[test]
    fn step_index_wraps() {
        assert_eq!(step(ReportLayout::Compact, 36), step(ReportLayout::Compact, 0));
        assert_eq!(step(ReportLayout::Extended, 33), step(ReportLayout::Extended, 1));
    }

    #[test]
    fn sequencer_wraps_after_last_step() {
        let mut seq = DemoSequencer::new(ReportLayout::Extended);
        for i in 0..32 {
            assert_eq!(seq.position(), i);
            seq.next_step();
        }
        assert_eq!(seq.position(), 0);
        assert_eq!(seq.next_step().label, "A Button (Button 1)");

        seq.reset();
        assert_eq!(seq.position(), 0);
    }
}
