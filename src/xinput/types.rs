//! Controller data types.
//!
//! These mirror the native XInput structures but are plain Rust values: the raw `#[repr(C)]`
//! layouts live in [`ffi`](super::ffi) and convert into these with `From`.
//!
//! # Axis conventions
//! - Thumbsticks normalize to `[-1.0, 1.0]` (up is **positive** Y, as XInput reports it).
//! - Triggers normalize to `[0.0, 1.0]`.
//! - The D-pad can also be read as an 8-way direction (`0..=7`, Up = 0, clockwise).

use crate::error::{InputError, Result};
use crate::state::DeviceState;
use crate::vibration::Vibration;
use bitflags::bitflags;
use std::fmt;

/// Left thumbstick dead zone recommended by the XInput headers.
pub const LEFT_THUMB_DEADZONE: i16 = 7849;
/// Right thumbstick dead zone recommended by the XInput headers.
pub const RIGHT_THUMB_DEADZONE: i16 = 8689;
/// Trigger activation threshold recommended by the XInput headers.
pub const TRIGGER_THRESHOLD: u8 = 30;

/// One of the four fixed controller slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    One = 0,
    Two = 1,
    Three = 2,
    Four = 3,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::One, Slot::Two, Slot::Three, Slot::Four];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub(crate) const fn user_index(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Slot {
    type Error = InputError;

    fn try_from(index: u32) -> Result<Self> {
        Slot::ALL
            .get(index as usize)
            .copied()
            .ok_or(InputError::SlotOutOfRange(index))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

bitflags! {
    /// `XINPUT_GAMEPAD_*` button bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GamepadButtons: u16 {
        const DPAD_UP = 0x0001;
        const DPAD_DOWN = 0x0002;
        const DPAD_LEFT = 0x0004;
        const DPAD_RIGHT = 0x0008;
        const START = 0x0010;
        const BACK = 0x0020;
        const LEFT_THUMB = 0x0040;
        const RIGHT_THUMB = 0x0080;
        const LEFT_SHOULDER = 0x0100;
        const RIGHT_SHOULDER = 0x0200;
        const A = 0x1000;
        const B = 0x2000;
        const X = 0x4000;
        const Y = 0x8000;
    }
}

/// A single gamepad button, used for edge queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Start,
    Back,
    LeftThumb,
    RightThumb,
    LeftShoulder,
    RightShoulder,
    A,
    B,
    X,
    Y,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 14] = [
        GamepadButton::DPadUp,
        GamepadButton::DPadDown,
        GamepadButton::DPadLeft,
        GamepadButton::DPadRight,
        GamepadButton::Start,
        GamepadButton::Back,
        GamepadButton::LeftThumb,
        GamepadButton::RightThumb,
        GamepadButton::LeftShoulder,
        GamepadButton::RightShoulder,
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
    ];

    pub const fn flag(self) -> GamepadButtons {
        match self {
            GamepadButton::DPadUp => GamepadButtons::DPAD_UP,
            GamepadButton::DPadDown => GamepadButtons::DPAD_DOWN,
            GamepadButton::DPadLeft => GamepadButtons::DPAD_LEFT,
            GamepadButton::DPadRight => GamepadButtons::DPAD_RIGHT,
            GamepadButton::Start => GamepadButtons::START,
            GamepadButton::Back => GamepadButtons::BACK,
            GamepadButton::LeftThumb => GamepadButtons::LEFT_THUMB,
            GamepadButton::RightThumb => GamepadButtons::RIGHT_THUMB,
            GamepadButton::LeftShoulder => GamepadButtons::LEFT_SHOULDER,
            GamepadButton::RightShoulder => GamepadButtons::RIGHT_SHOULDER,
            GamepadButton::A => GamepadButtons::A,
            GamepadButton::B => GamepadButtons::B,
            GamepadButton::X => GamepadButtons::X,
            GamepadButton::Y => GamepadButtons::Y,
        }
    }
}

/// Buttons, triggers and sticks of one controller at one poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Gamepad {
    pub buttons: GamepadButtons,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_thumb_x: i16,
    pub left_thumb_y: i16,
    pub right_thumb_x: i16,
    pub right_thumb_y: i16,
}

impl Gamepad {
    #[inline]
    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.buttons.contains(button.flag())
    }

    /// Normalized left stick `(x, y)`.
    pub fn left_thumb(&self) -> (f32, f32) {
        (
            normalize_thumb(self.left_thumb_x),
            normalize_thumb(self.left_thumb_y),
        )
    }

    /// Normalized right stick `(x, y)`.
    pub fn right_thumb(&self) -> (f32, f32) {
        (
            normalize_thumb(self.right_thumb_x),
            normalize_thumb(self.right_thumb_y),
        )
    }

    /// Left stick with the recommended radial dead zone applied.
    pub fn left_thumb_filtered(&self) -> (f32, f32) {
        apply_deadzone(self.left_thumb_x, self.left_thumb_y, LEFT_THUMB_DEADZONE)
    }

    /// Right stick with the recommended radial dead zone applied.
    pub fn right_thumb_filtered(&self) -> (f32, f32) {
        apply_deadzone(self.right_thumb_x, self.right_thumb_y, RIGHT_THUMB_DEADZONE)
    }

    #[inline]
    pub fn left_trigger(&self) -> f32 {
        self.left_trigger as f32 / 255.0
    }

    #[inline]
    pub fn right_trigger(&self) -> f32 {
        self.right_trigger as f32 / 255.0
    }

    /// D-pad as an 8-way direction: `None` = neutral, `0..=7` = Up, clockwise.
    ///
    /// Opposing directions held together (up+down, left+right) read as neutral.
    pub fn dpad_direction(&self) -> Option<u8> {
        let up = self.buttons.contains(GamepadButtons::DPAD_UP);
        let down = self.buttons.contains(GamepadButtons::DPAD_DOWN);
        let left = self.buttons.contains(GamepadButtons::DPAD_LEFT);
        let right = self.buttons.contains(GamepadButtons::DPAD_RIGHT);

        match (up, down, left, right) {
            (true, false, false, false) => Some(0),
            (true, false, false, true) => Some(1),
            (false, false, false, true) => Some(2),
            (false, true, false, true) => Some(3),
            (false, true, false, false) => Some(4),
            (false, true, true, false) => Some(5),
            (false, false, true, false) => Some(6),
            (true, false, true, false) => Some(7),
            _ => None,
        }
    }
}

#[inline]
fn normalize_thumb(v: i16) -> f32 {
    // Map [-32768, 32767] -> [-1, 1]
    if v >= 0 {
        v as f32 / 32767.0
    } else {
        v as f32 / 32768.0
    }
}

fn apply_deadzone(x: i16, y: i16, deadzone: i16) -> (f32, f32) {
    let (fx, fy) = (x as f32, y as f32);
    let magnitude = (fx * fx + fy * fy).sqrt();
    if magnitude <= deadzone as f32 {
        return (0.0, 0.0);
    }
    let clipped = magnitude.min(32767.0);
    let scale = (clipped - deadzone as f32) / (32767.0 - deadzone as f32) / magnitude;
    (fx * scale, fy * scale)
}

/// Controller snapshot: the gamepad plus the native packet counter.
///
/// An unchanged `packet_number` between two polls means the native layer saw no change.
/// It is a hint only; edges are always computed from the gamepad fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ControllerState {
    pub packet_number: u32,
    pub gamepad: Gamepad,
}

impl DeviceState for ControllerState {
    type Button = GamepadButton;

    #[inline]
    fn is_pressed(&self, button: GamepadButton) -> bool {
        self.gamepad.is_pressed(button)
    }
}

/// `XINPUT_DEVTYPE_*`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControllerType {
    #[default]
    Unknown,
    Gamepad,
}

impl From<u8> for ControllerType {
    fn from(raw: u8) -> Self {
        match raw {
            0x01 => ControllerType::Gamepad,
            _ => ControllerType::Unknown,
        }
    }
}

/// `XINPUT_DEVSUBTYPE_*`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControllerSubType {
    #[default]
    Unknown,
    Gamepad,
    Wheel,
    ArcadeStick,
    FlightStick,
    DancePad,
    Guitar,
    GuitarAlternate,
    DrumKit,
    GuitarBass,
    ArcadePad,
}

impl From<u8> for ControllerSubType {
    fn from(raw: u8) -> Self {
        match raw {
            0x01 => ControllerSubType::Gamepad,
            0x02 => ControllerSubType::Wheel,
            0x03 => ControllerSubType::ArcadeStick,
            0x04 => ControllerSubType::FlightStick,
            0x05 => ControllerSubType::DancePad,
            0x06 => ControllerSubType::Guitar,
            0x07 => ControllerSubType::GuitarAlternate,
            0x08 => ControllerSubType::DrumKit,
            0x0B => ControllerSubType::GuitarBass,
            0x13 => ControllerSubType::ArcadePad,
            _ => ControllerSubType::Unknown,
        }
    }
}

bitflags! {
    /// `XINPUT_CAPS_*` feature bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u16 {
        const FORCE_FEEDBACK = 0x0001;
        const WIRELESS = 0x0002;
        const VOICE = 0x0004;
        const PLUGIN_MODULES = 0x0008;
        const NO_NAVIGATION = 0x0010;
    }
}

/// What a connected controller supports.
///
/// In `gamepad` and `vibration`, a non-zero field means the control or motor is present
/// (the value encodes its resolution).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Capabilities {
    pub controller_type: ControllerType,
    pub sub_type: ControllerSubType,
    pub flags: CapabilityFlags,
    pub gamepad: Gamepad,
    pub vibration: Vibration,
}

impl Capabilities {
    /// `is_set(CapabilityFlags::empty())` asks whether *no* flag is set.
    pub fn is_set(&self, flags: CapabilityFlags) -> bool {
        if flags.is_empty() {
            self.flags.is_empty()
        } else {
            self.flags.contains(flags)
        }
    }

    pub fn has_button(&self, button: GamepadButton) -> bool {
        self.gamepad.is_pressed(button)
    }

    pub fn has_left_thumb_x(&self) -> bool {
        self.gamepad.left_thumb_x != 0
    }

    pub fn has_left_thumb_y(&self) -> bool {
        self.gamepad.left_thumb_y != 0
    }

    pub fn has_right_thumb_x(&self) -> bool {
        self.gamepad.right_thumb_x != 0
    }

    pub fn has_right_thumb_y(&self) -> bool {
        self.gamepad.right_thumb_y != 0
    }

    pub fn has_left_trigger(&self) -> bool {
        self.gamepad.left_trigger != 0
    }

    pub fn has_right_trigger(&self) -> bool {
        self.gamepad.right_trigger != 0
    }

    pub fn has_left_motor(&self) -> bool {
        self.vibration.left_motor() != 0.0
    }

    pub fn has_right_motor(&self) -> bool {
        self.vibration.right_motor() != 0.0
    }
}

/// Which device behind a slot a battery query targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BatteryDeviceType {
    #[default]
    Gamepad = 0,
    Headset = 1,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BatteryType {
    #[default]
    Disconnected,
    Wired,
    Alkaline,
    NiMh,
    Unknown,
}

impl From<u8> for BatteryType {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => BatteryType::Disconnected,
            0x01 => BatteryType::Wired,
            0x02 => BatteryType::Alkaline,
            0x03 => BatteryType::NiMh,
            _ => BatteryType::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatteryLevel {
    #[default]
    Empty,
    Low,
    Medium,
    Full,
}

impl From<u8> for BatteryLevel {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => BatteryLevel::Empty,
            0x01 => BatteryLevel::Low,
            0x02 => BatteryLevel::Medium,
            _ => BatteryLevel::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BatteryInformation {
    pub battery_type: BatteryType,
    pub level: BatteryLevel,
}

bitflags! {
    /// `XINPUT_KEYSTROKE_*` flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeystrokeFlags: u16 {
        const KEY_DOWN = 0x0001;
        const KEY_UP = 0x0002;
        const REPEAT = 0x0004;
    }
}

/// One queued gamepad input event from `XInputGetKeystroke`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Keystroke {
    /// `VK_PAD_*` virtual-key code.
    pub virtual_key: u16,
    /// Unused by current drivers; kept for completeness.
    pub unicode: u16,
    pub flags: KeystrokeFlags,
    pub user_index: u8,
    pub hid_code: u8,
}

impl Keystroke {
    pub fn is_set(&self, flags: KeystrokeFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Slot that produced the event, if it names one of the four slots.
    pub fn slot(&self) -> Option<Slot> {
        Slot::try_from(self.user_index as u32).ok()
    }
}

/// Windows Core Audio endpoint ids of a headset plugged into a controller.
///
/// Both are `None` when no headset is attached, or when the bound XInput revision does not
/// support the query (1.3).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AudioDeviceIds {
    pub render: Option<String>,
    pub capture: Option<String>,
}

/// A COM GUID with the native field layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const EMPTY: Guid = Guid {
        data1: 0,
        data2: 0,
        data3: 0,
        data4: [0; 8],
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Guid::EMPTY
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

/// DirectSound device GUIDs of a headset (XInput 1.3 only; empty on newer revisions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DSoundGuids {
    pub render: Guid,
    pub capture: Guid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_rejects_indices_past_four() {
        assert_eq!(Slot::try_from(3).unwrap(), Slot::Four);
        assert!(matches!(
            Slot::try_from(4),
            Err(InputError::SlotOutOfRange(4))
        ));
    }

    #[test]
    fn every_button_maps_to_a_distinct_bit() {
        let mut seen = GamepadButtons::empty();
        for b in GamepadButton::ALL {
            assert!(!seen.intersects(b.flag()), "{b:?} overlaps");
            seen |= b.flag();
        }
        assert_eq!(seen, GamepadButtons::all());
    }

    #[test]
    fn dpad_direction_is_eight_way() {
        let pad = |b: GamepadButtons| Gamepad {
            buttons: b,
            ..Gamepad::default()
        };
        assert_eq!(pad(GamepadButtons::empty()).dpad_direction(), None);
        assert_eq!(pad(GamepadButtons::DPAD_UP).dpad_direction(), Some(0));
        assert_eq!(
            pad(GamepadButtons::DPAD_DOWN | GamepadButtons::DPAD_LEFT).dpad_direction(),
            Some(5)
        );
        assert_eq!(
            pad(GamepadButtons::DPAD_UP | GamepadButtons::DPAD_DOWN).dpad_direction(),
            None
        );
    }

    #[test]
    fn thumbs_and_triggers_normalize() {
        let pad = Gamepad {
            left_thumb_x: i16::MIN,
            left_thumb_y: i16::MAX,
            left_trigger: 255,
            ..Gamepad::default()
        };
        assert_eq!(pad.left_thumb(), (-1.0, 1.0));
        assert_eq!(pad.left_trigger(), 1.0);
        assert_eq!(pad.right_trigger(), 0.0);
    }

    #[test]
    fn deadzone_swallows_small_deflection() {
        let pad = Gamepad {
            left_thumb_x: 5000,
            right_thumb_x: 32767,
            ..Gamepad::default()
        };
        assert_eq!(pad.left_thumb_filtered(), (0.0, 0.0));
        let (x, y) = pad.right_thumb_filtered();
        assert!((x - 1.0).abs() < 1e-4);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn capabilities_report_present_controls() {
        let caps = Capabilities {
            flags: CapabilityFlags::WIRELESS | CapabilityFlags::FORCE_FEEDBACK,
            gamepad: Gamepad {
                buttons: GamepadButtons::A | GamepadButtons::START,
                left_trigger: 255,
                ..Gamepad::default()
            },
            vibration: Vibration::from_motor_speeds(65535, 0),
            ..Capabilities::default()
        };
        assert!(caps.has_button(GamepadButton::A));
        assert!(!caps.has_button(GamepadButton::Y));
        assert!(caps.has_left_trigger() && !caps.has_right_trigger());
        assert!(caps.has_left_motor() && !caps.has_right_motor());
        assert!(caps.is_set(CapabilityFlags::WIRELESS));
        assert!(!caps.is_set(CapabilityFlags::empty()));
        assert!(Capabilities::default().is_set(CapabilityFlags::empty()));
    }

    #[test]
    fn guid_formats_like_the_registry() {
        let g = Guid {
            data1: 0x6F1D2B61,
            data2: 0xD5A0,
            data3: 0x11CF,
            data4: [0xBF, 0xC7, 0x44, 0x45, 0x53, 0x54, 0x00, 0x00],
        };
        assert_eq!(g.to_string(), "{6F1D2B61-D5A0-11CF-BFC7-444553540000}");
        assert!(Guid::EMPTY.is_empty());
    }
}
