//! Library revisions and the native function table.
//!
//! Three XInput revisions ship with Windows and the DirectX redistributables. They export
//! overlapping but different function sets:
//!
//! | revision | library          | audio ids | DirectSound GUIDs |
//! |----------|------------------|-----------|-------------------|
//! | 1.5      | `xinput1_5.dll`  | yes       | no                |
//! | 1.4      | `xinput1_4.dll`  | yes       | no                |
//! | 1.3      | `xinput1_3.dll`  | no        | yes               |
//!
//! A [`LibraryProbe`] opens one revision and hands back a [`NativeXInput`] table. Calls a
//! revision does not export answer [`ERROR_CALL_NOT_IMPLEMENTED`]; the
//! [`XInput`](super::XInput) facade synthesizes a result for those.

use super::ffi::{RawBatteryInformation, RawCapabilities, RawKeystroke, RawState, RawVibration};
use super::types::Guid;
use crate::error::ERROR_CALL_NOT_IMPLEMENTED;
use serde::{Deserialize, Serialize};
use std::fmt;

/// XInput library revision. Orders oldest to newest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Revision {
    #[serde(rename = "1.3")]
    V1_3,
    #[serde(rename = "1.4")]
    V1_4,
    #[serde(rename = "1.5")]
    V1_5,
}

impl Revision {
    /// Probe order: newest first.
    pub const NEWEST_FIRST: [Revision; 3] = [Revision::V1_5, Revision::V1_4, Revision::V1_3];

    pub const fn library_name(self) -> &'static str {
        match self {
            Revision::V1_5 => "xinput1_5.dll",
            Revision::V1_4 => "xinput1_4.dll",
            Revision::V1_3 => "xinput1_3.dll",
        }
    }

    /// `(major, minor)`.
    pub const fn version(self) -> (u8, u8) {
        match self {
            Revision::V1_5 => (1, 5),
            Revision::V1_4 => (1, 4),
            Revision::V1_3 => (1, 3),
        }
    }

    /// `XInputGetAudioDeviceIds` exists from 1.4 on.
    pub const fn has_audio_device_ids(self) -> bool {
        !matches!(self, Revision::V1_3)
    }

    /// `XInputGetDSoundAudioDeviceGuids` was removed after 1.3.
    pub const fn has_dsound_guids(self) -> bool {
        matches!(self, Revision::V1_3)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.version();
        write!(f, "{major}.{minor}")
    }
}

/// One loaded XInput function table.
///
/// Every method returns the native result code (`ERROR_SUCCESS`, `ERROR_DEVICE_NOT_CONNECTED`,
/// ...) and writes through its out-parameters, exactly like the exports it wraps.
pub trait NativeXInput: Send + Sync {
    fn enable(&self, enable: bool);

    fn get_state(&self, user_index: u32, state: &mut RawState) -> u32;

    fn set_state(&self, user_index: u32, vibration: &mut RawVibration) -> u32;

    fn get_capabilities(&self, user_index: u32, flags: u32, caps: &mut RawCapabilities) -> u32;

    fn get_battery_information(
        &self,
        user_index: u32,
        device_type: u8,
        info: &mut RawBatteryInformation,
    ) -> u32;

    fn get_keystroke(&self, user_index: u32, keystroke: &mut RawKeystroke) -> u32;

    /// Writes NUL-terminated UTF-16 ids; `*_len` carry buffer capacity in, length out.
    fn get_audio_device_ids(
        &self,
        _user_index: u32,
        _render: &mut [u16],
        _render_len: &mut u32,
        _capture: &mut [u16],
        _capture_len: &mut u32,
    ) -> u32 {
        ERROR_CALL_NOT_IMPLEMENTED
    }

    fn get_dsound_audio_device_guids(
        &self,
        _user_index: u32,
        _render: &mut Guid,
        _capture: &mut Guid,
    ) -> u32 {
        ERROR_CALL_NOT_IMPLEMENTED
    }
}

/// Opens XInput libraries by revision.
pub trait LibraryProbe {
    /// `None` if the revision is not installed or lacks a required export.
    fn open(&self, revision: Revision) -> Option<Box<dyn NativeXInput>>;
}

/// A probe that finds nothing; used where XInput does not exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLibraries;

impl LibraryProbe for NoLibraries {
    fn open(&self, _revision: Revision) -> Option<Box<dyn NativeXInput>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_order_is_newest_first() {
        let mut sorted = Revision::NEWEST_FIRST;
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sorted, Revision::NEWEST_FIRST);
        assert_eq!(Revision::V1_4.to_string(), "1.4");
        assert_eq!(Revision::V1_3.library_name(), "xinput1_3.dll");
    }

    #[test]
    fn audio_exports_are_split_across_revisions() {
        for r in Revision::NEWEST_FIRST {
            assert_ne!(r.has_audio_device_ids(), r.has_dsound_guids(), "{r}");
        }
    }

    #[test]
    fn revision_deserializes_from_dotted_string() {
        #[derive(Deserialize)]
        struct W {
            r: Revision,
        }
        let w: W = toml::from_str(r#"r = "1.4""#).unwrap();
        assert_eq!(w.r, Revision::V1_4);
    }
}
