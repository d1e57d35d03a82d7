//! Error type shared by every device kind.
//!
//! A disconnected device is **not** an error while polling: buffers collapse to the
//! neutral state and report `is_connected() == false` instead. [`InputError::NotConnected`]
//! is only returned for *requests* that cannot be honoured without a device, such as
//! setting vibration or reading capabilities.

use thiserror::Error;

/// Win32 success code.
pub const ERROR_SUCCESS: u32 = 0;
/// Returned by XInput (and Raw Input readers) when the device is absent.
pub const ERROR_DEVICE_NOT_CONNECTED: u32 = 1167;
/// Returned by `XInputGetKeystroke` when no new event is queued.
pub const ERROR_EMPTY: u32 = 4306;
/// Returned by function tables for an export the loaded library does not provide.
pub const ERROR_CALL_NOT_IMPLEMENTED: u32 = 120;

#[derive(Debug, Error)]
pub enum InputError {
    /// A request targeted a device that is currently disconnected.
    #[error("device in slot {slot} is not connected")]
    NotConnected { slot: usize },

    /// A native call failed with a code other than "not connected".
    #[error("{operation} failed with native error code {code}")]
    Native { operation: &'static str, code: u32 },

    /// No XInput library revision could be bound in this process.
    #[error("no XInput library could be loaded; controller support is unavailable")]
    FacilityUnavailable,

    #[error("time must be non-negative, got {0}")]
    NegativeTime(i64),

    #[error("time {0} ms does not fit a keyframe timeline")]
    TimeOutOfRange(i64),

    #[error("slot index {0} is out of range (expected 0..=3)")]
    SlotOutOfRange(u32),

    #[error("motor intensity {0} is outside [0, 1]")]
    IntensityOutOfRange(f32),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    ConfigToml(#[from] toml::de::Error),

    #[error("invalid JSON configuration: {0}")]
    ConfigJson(#[from] serde_json::Error),
}

pub type Result<T, E = InputError> = std::result::Result<T, E>;

impl InputError {
    /// Build a [`InputError::Native`] for a failed call.
    #[inline]
    pub fn native(operation: &'static str, code: u32) -> Self {
        InputError::Native { operation, code }
    }

    /// `true` for errors that will never go away for the rest of the process.
    pub fn is_permanent(&self) -> bool {
        matches!(self, InputError::FacilityUnavailable)
    }
}
