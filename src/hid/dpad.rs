//! D-pad direction, encoded as a HID hat switch.
//!
//! The hat switch is declared with logical range 0..=7 and the *Null State*
//! flag, so any value outside that range (we always send 8) means centered.
//!
//! ```text
//!        0
//!     7     1
//!   6    8    2
//!     5     3
//!        4
//! ```

/// Hat switch nibble mask. The upper nibble of the hat byte is padding.
pub const HAT_MASK: u8 = 0x0F;

/// D-pad direction (clockwise from Up) or neutral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Dpad {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
    /// Centered - the hat switch null state.
    #[default]
    Neutral = 8,
}

impl Dpad {
    /// The eight directions in hat order.
    pub const DIRECTIONS: [Dpad; 8] = [
        Dpad::Up,
        Dpad::UpRight,
        Dpad::Right,
        Dpad::DownRight,
        Dpad::Down,
        Dpad::DownLeft,
        Dpad::Left,
        Dpad::UpLeft,
    ];

    /// Hat switch value (0..=7, or 8 for neutral).
    pub const fn hat(self) -> u8 {
        self as u8
    }

    /// Decode a hat nibble. Anything outside 0..=7 is the null state.
    pub fn from_hat(value: u8) -> Self {
        match value & HAT_MASK {
            v @ 0..=7 => Self::DIRECTIONS[v as usize],
            _ => Dpad::Neutral,
        }
    }

    pub const fn is_neutral(self) -> bool {
        matches!(self, Dpad::Neutral)
    }
}
