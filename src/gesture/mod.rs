pub mod store;

use std::str::FromStr;

use crate::error::AccessoryError;

/// Physical gestures the accessory firmware recognizes: button taps at the
/// four clock positions, directional swipes at two speeds, and two-finger
/// taps. Taps register on a good firm press or a 1–2 second hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GestureType {
    /// Tap the 3 o'clock button.
    Tap3 = 0,
    /// Tap the 12 o'clock button.
    Tap12 = 1,
    /// Tap the 9 o'clock button.
    Tap9 = 2,
    /// Tap the 6 o'clock button.
    Tap6 = 3,
    SwipeUp = 4,
    SwipeUpFast = 5,
    SwipeDown = 6,
    SwipeDownFast = 7,
    SwipeBack = 8,
    SwipeForward = 9,
    TwoFingerTap = 10,
    /// Tap and hold two fingers for 3 seconds.
    TwoFingerTapHold = 11,
}

/// All gesture types, in raw-index order.
pub const ALL_GESTURES: [GestureType; 12] = [
    GestureType::Tap3,
    GestureType::Tap12,
    GestureType::Tap9,
    GestureType::Tap6,
    GestureType::SwipeUp,
    GestureType::SwipeUpFast,
    GestureType::SwipeDown,
    GestureType::SwipeDownFast,
    GestureType::SwipeBack,
    GestureType::SwipeForward,
    GestureType::TwoFingerTap,
    GestureType::TwoFingerTapHold,
];

impl GestureType {
    /// Stable string identifier, used as the durable-store key.
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::Tap3 => "gesture_tap_3",
            GestureType::Tap12 => "gesture_tap_12",
            GestureType::Tap9 => "gesture_tap_9",
            GestureType::Tap6 => "gesture_tap_6",
            GestureType::SwipeUp => "gesture_swipe_up",
            GestureType::SwipeUpFast => "gesture_swipe_up_fast",
            GestureType::SwipeDown => "gesture_swipe_down",
            GestureType::SwipeDownFast => "gesture_swipe_down_fast",
            GestureType::SwipeBack => "gesture_swipe_back",
            GestureType::SwipeForward => "gesture_swipe_forward",
            GestureType::TwoFingerTap => "gesture_two_finger_tap",
            GestureType::TwoFingerTapHold => "gesture_two_finger_tap_hold",
        }
    }

    /// Raw gesture index as reported by the firmware; doubles as the
    /// fallback action key for unbound gestures.
    pub fn raw_index(&self) -> u32 {
        *self as u32
    }
}

impl FromStr for GestureType {
    type Err = AccessoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_GESTURES
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| AccessoryError::InvalidGestureType(s.to_string()))
    }
}

impl std::fmt::Display for GestureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
