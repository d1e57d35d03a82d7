//! Revision resolution and the typed XInput facade.
//!
//! [`XInput::resolve`] probes [`Revision::NEWEST_FIRST`] and binds the first library the
//! probe can open. The process-wide instance behind [`XInput::shared`] is resolved once and
//! never re-attempted: when nothing was found, every later call fails with
//! [`InputError::FacilityUnavailable`].
//!
//! Operations a revision lacks are synthesized:
//! - 1.3 has no audio endpoint ids: empty ids are returned after a capabilities probe
//!   confirms the slot is connected.
//! - 1.4/1.5 have no DirectSound GUIDs: empty GUIDs are returned after the same probe.

use super::ffi::{
    RawBatteryInformation, RawCapabilities, RawKeystroke, RawState, RawVibration, FLAG_GAMEPAD,
};
use super::native::{LibraryProbe, NativeXInput, Revision};
use super::types::{
    AudioDeviceIds, BatteryDeviceType, BatteryInformation, Capabilities, ControllerState,
    DSoundGuids, Guid, Keystroke, Slot,
};
use crate::config::XInputConfig;
use crate::error::{
    InputError, Result, ERROR_DEVICE_NOT_CONNECTED, ERROR_EMPTY, ERROR_SUCCESS,
};
use crate::state::Sample;
use crate::vibration::Vibration;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Capacity, in UTF-16 units, of each audio endpoint id buffer.
const AUDIO_ID_CAPACITY: usize = 256;

static SHARED: OnceLock<Option<Arc<XInput>>> = OnceLock::new();

/// Outcome of a native call that did not fail outright.
enum Status {
    Done,
    NotConnected,
    Empty,
}

fn status(operation: &'static str, code: u32) -> Result<Status> {
    match code {
        ERROR_SUCCESS => Ok(Status::Done),
        ERROR_DEVICE_NOT_CONNECTED => Ok(Status::NotConnected),
        ERROR_EMPTY => Ok(Status::Empty),
        code => Err(InputError::native(operation, code)),
    }
}

/// A bound XInput library.
pub struct XInput {
    revision: Revision,
    native: Box<dyn NativeXInput>,
}

impl fmt::Debug for XInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XInput")
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl XInput {
    /// Probe revisions newest first and bind the first one found.
    ///
    /// `config.max_revision` skips anything newer than the cap. When `config.enable` is
    /// `false` the bound library is told to report neutral state.
    pub fn resolve(probe: &dyn LibraryProbe, config: &XInputConfig) -> Result<Self> {
        for revision in Revision::NEWEST_FIRST {
            if config.max_revision.is_some_and(|cap| revision > cap) {
                debug!(%revision, "skipping XInput revision above configured cap");
                continue;
            }
            match probe.open(revision) {
                Some(native) => {
                    info!(%revision, library = revision.library_name(), "bound XInput");
                    let xinput = XInput { revision, native };
                    if !config.enable {
                        xinput.enable(false);
                    }
                    return Ok(xinput);
                }
                None => debug!(%revision, "XInput revision not available"),
            }
        }
        warn!("no XInput library found; controllers are unavailable");
        Err(InputError::FacilityUnavailable)
    }

    /// Process-wide instance, resolved on first call against the system libraries.
    pub fn shared() -> Result<Arc<XInput>> {
        let probe = crate::backends::system_probe();
        Self::shared_with(probe.as_ref(), &XInputConfig::default())
    }

    /// Like [`shared`](Self::shared), but the first caller picks the probe and config.
    /// Later calls return the already-bound instance (or the same failure).
    pub fn shared_with(probe: &dyn LibraryProbe, config: &XInputConfig) -> Result<Arc<XInput>> {
        SHARED
            .get_or_init(|| Self::resolve(probe, config).ok().map(Arc::new))
            .clone()
            .ok_or(InputError::FacilityUnavailable)
    }

    #[inline]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    #[inline]
    pub fn version(&self) -> (u8, u8) {
        self.revision.version()
    }

    #[inline]
    pub fn library_name(&self) -> &'static str {
        self.revision.library_name()
    }

    /// Toggle reporting for every slot; while disabled, state reads are neutral and
    /// vibration is silenced by the library.
    pub fn enable(&self, enable: bool) {
        debug!(enable, "XInputEnable");
        self.native.enable(enable);
    }

    pub fn get_state(&self, slot: Slot) -> Result<Sample<ControllerState>> {
        let mut raw = RawState::default();
        let code = self.native.get_state(slot.user_index(), &mut raw);
        match status("XInputGetState", code)? {
            Status::Done => Ok(Sample::Present(raw.into())),
            Status::NotConnected => Ok(Sample::NotConnected),
            Status::Empty => Err(InputError::native("XInputGetState", code)),
        }
    }

    pub fn set_state(&self, slot: Slot, vibration: Vibration) -> Result<()> {
        let mut raw = RawVibration::from(vibration);
        let code = self.native.set_state(slot.user_index(), &mut raw);
        self.require_connected("XInputSetState", slot, code)
    }

    pub fn get_capabilities(&self, slot: Slot) -> Result<Capabilities> {
        let mut raw = RawCapabilities::default();
        let code = self
            .native
            .get_capabilities(slot.user_index(), FLAG_GAMEPAD, &mut raw);
        self.require_connected("XInputGetCapabilities", slot, code)?;
        Ok(raw.into())
    }

    pub fn get_battery_information(
        &self,
        slot: Slot,
        device_type: BatteryDeviceType,
    ) -> Result<BatteryInformation> {
        let mut raw = RawBatteryInformation::default();
        let code =
            self.native
                .get_battery_information(slot.user_index(), device_type as u8, &mut raw);
        self.require_connected("XInputGetBatteryInformation", slot, code)?;
        Ok(raw.into())
    }

    /// Next queued keystroke, `None` when the queue is empty or the slot is disconnected.
    pub fn get_keystroke(&self, slot: Slot) -> Result<Option<Keystroke>> {
        let mut raw = RawKeystroke::default();
        let code = self.native.get_keystroke(slot.user_index(), &mut raw);
        Ok(match status("XInputGetKeystroke", code)? {
            Status::Done => Some(raw.into()),
            Status::NotConnected | Status::Empty => None,
        })
    }

    pub fn get_audio_device_ids(&self, slot: Slot) -> Result<AudioDeviceIds> {
        if !self.revision.has_audio_device_ids() {
            self.probe_connected(slot)?;
            return Ok(AudioDeviceIds::default());
        }

        let mut render = [0u16; AUDIO_ID_CAPACITY];
        let mut capture = [0u16; AUDIO_ID_CAPACITY];
        let mut render_len = AUDIO_ID_CAPACITY as u32;
        let mut capture_len = AUDIO_ID_CAPACITY as u32;
        let code = self.native.get_audio_device_ids(
            slot.user_index(),
            &mut render,
            &mut render_len,
            &mut capture,
            &mut capture_len,
        );
        self.require_connected("XInputGetAudioDeviceIds", slot, code)?;

        Ok(AudioDeviceIds {
            render: wide_to_string(&render, render_len),
            capture: wide_to_string(&capture, capture_len),
        })
    }

    pub fn get_dsound_audio_device_guids(&self, slot: Slot) -> Result<DSoundGuids> {
        if !self.revision.has_dsound_guids() {
            self.probe_connected(slot)?;
            return Ok(DSoundGuids::default());
        }

        let mut render = Guid::EMPTY;
        let mut capture = Guid::EMPTY;
        let code =
            self.native
                .get_dsound_audio_device_guids(slot.user_index(), &mut render, &mut capture);
        self.require_connected("XInputGetDSoundAudioDeviceGuids", slot, code)?;
        Ok(DSoundGuids { render, capture })
    }

    /// Connectivity check used by synthesized operations.
    fn probe_connected(&self, slot: Slot) -> Result<()> {
        self.get_capabilities(slot).map(|_| ())
    }

    /// Only keystroke polling may answer `ERROR_EMPTY`; anywhere else it is a failure.
    fn require_connected(&self, operation: &'static str, slot: Slot, code: u32) -> Result<()> {
        match status(operation, code)? {
            Status::Done => Ok(()),
            Status::NotConnected => Err(InputError::NotConnected { slot: slot.index() }),
            Status::Empty => Err(InputError::native(operation, code)),
        }
    }
}

/// Decode a NUL-terminated UTF-16 buffer; empty ids become `None`.
fn wide_to_string(buf: &[u16], len: u32) -> Option<String> {
    let len = (len as usize).min(buf.len());
    let end = buf[..len].iter().position(|&c| c == 0).unwrap_or(len);
    if end == 0 {
        return None;
    }
    Some(String::from_utf16_lossy(&buf[..end]))
}
