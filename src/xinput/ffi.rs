//! `#[repr(C)]` layouts of the XInput structures.
//!
//! Field order and widths match `xinput.h`. Every function-table implementation (the loaded
//! DLL, or a scripted mock) reads and writes these.

use super::types::{
    BatteryInformation, Capabilities, ControllerState, Gamepad, GamepadButtons, Keystroke,
    KeystrokeFlags,
};
use crate::vibration::Vibration;

/// `XINPUT_GAMEPAD`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawGamepad {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

/// `XINPUT_STATE`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawState {
    pub packet_number: u32,
    pub gamepad: RawGamepad,
}

/// `XINPUT_VIBRATION`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawVibration {
    pub left_motor_speed: u16,
    pub right_motor_speed: u16,
}

/// `XINPUT_CAPABILITIES`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawCapabilities {
    pub device_type: u8,
    pub sub_type: u8,
    pub flags: u16,
    pub gamepad: RawGamepad,
    pub vibration: RawVibration,
}

/// `XINPUT_BATTERY_INFORMATION`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawBatteryInformation {
    pub battery_type: u8,
    pub battery_level: u8,
}

/// `XINPUT_KEYSTROKE`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawKeystroke {
    pub virtual_key: u16,
    pub unicode: u16,
    pub flags: u16,
    pub user_index: u8,
    pub hid_code: u8,
}

/// `XINPUT_FLAG_GAMEPAD`: restrict capability queries to gamepads.
pub const FLAG_GAMEPAD: u32 = 0x0000_0001;

impl From<RawGamepad> for Gamepad {
    fn from(raw: RawGamepad) -> Self {
        Gamepad {
            buttons: GamepadButtons::from_bits_truncate(raw.buttons),
            left_trigger: raw.left_trigger,
            right_trigger: raw.right_trigger,
            left_thumb_x: raw.thumb_lx,
            left_thumb_y: raw.thumb_ly,
            right_thumb_x: raw.thumb_rx,
            right_thumb_y: raw.thumb_ry,
        }
    }
}

impl From<Gamepad> for RawGamepad {
    fn from(pad: Gamepad) -> Self {
        RawGamepad {
            buttons: pad.buttons.bits(),
            left_trigger: pad.left_trigger,
            right_trigger: pad.right_trigger,
            thumb_lx: pad.left_thumb_x,
            thumb_ly: pad.left_thumb_y,
            thumb_rx: pad.right_thumb_x,
            thumb_ry: pad.right_thumb_y,
        }
    }
}

impl From<RawState> for ControllerState {
    fn from(raw: RawState) -> Self {
        ControllerState {
            packet_number: raw.packet_number,
            gamepad: raw.gamepad.into(),
        }
    }
}

impl From<Vibration> for RawVibration {
    fn from(v: Vibration) -> Self {
        let (left_motor_speed, right_motor_speed) = v.to_motor_speeds();
        RawVibration {
            left_motor_speed,
            right_motor_speed,
        }
    }
}

impl From<RawCapabilities> for Capabilities {
    fn from(raw: RawCapabilities) -> Self {
        Capabilities {
            controller_type: raw.device_type.into(),
            sub_type: raw.sub_type.into(),
            flags: super::types::CapabilityFlags::from_bits_truncate(raw.flags),
            gamepad: raw.gamepad.into(),
            vibration: Vibration::from_motor_speeds(
                raw.vibration.left_motor_speed,
                raw.vibration.right_motor_speed,
            ),
        }
    }
}

impl From<RawBatteryInformation> for BatteryInformation {
    fn from(raw: RawBatteryInformation) -> Self {
        BatteryInformation {
            battery_type: raw.battery_type.into(),
            level: raw.battery_level.into(),
        }
    }
}

impl From<RawKeystroke> for Keystroke {
    fn from(raw: RawKeystroke) -> Self {
        Keystroke {
            virtual_key: raw.virtual_key,
            unicode: raw.unicode,
            flags: KeystrokeFlags::from_bits_truncate(raw.flags),
            user_index: raw.user_index,
            hid_code: raw.hid_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn layouts_match_the_native_headers() {
        assert_eq!(size_of::<RawGamepad>(), 12);
        assert_eq!(size_of::<RawState>(), 16);
        assert_eq!(size_of::<RawVibration>(), 4);
        assert_eq!(size_of::<RawCapabilities>(), 20);
        assert_eq!(size_of::<RawBatteryInformation>(), 2);
        assert_eq!(size_of::<RawKeystroke>(), 8);
        assert_eq!(size_of::<super::super::types::Guid>(), 16);
    }

    #[test]
    fn unknown_button_bits_are_dropped() {
        let pad: Gamepad = RawGamepad {
            buttons: 0x1000 | 0x0400,
            ..RawGamepad::default()
        }
        .into();
        assert_eq!(pad.buttons, GamepadButtons::A);
    }
}
