//! One controller slot as a polled session.
//!
//! A [`Controller`] owns the double buffer for its slot and forwards requests (vibration,
//! capabilities, battery, keystrokes, headset ids) to the bound [`XInput`]. Call
//! [`update`](Controller::update) once per frame.

use super::resolver::XInput;
use super::types::{
    AudioDeviceIds, BatteryDeviceType, BatteryInformation, Capabilities, ControllerState,
    DSoundGuids, GamepadButton, Keystroke, Slot,
};
use crate::buffer::StateBuffer;
use crate::device::Device;
use crate::error::{InputError, Result};
use crate::metadata::{DeviceKind, DeviceMeta};
use crate::vibration::{Vibration, VibrationEffect};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

struct PlayingEffect {
    effect: Arc<dyn VibrationEffect>,
    started: Option<Duration>,
}

pub struct Controller {
    slot: Slot,
    api: Arc<XInput>,
    buffer: StateBuffer<ControllerState>,
    capabilities: Option<Capabilities>,
    previous_packet: u32,
    vibration: Vibration,
    effect: Option<PlayingEffect>,
    /// Set once the slot has answered with a state.
    seen: bool,
    name: String,
    id: String,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("slot", &self.slot)
            .field("connected", &self.buffer.is_connected())
            .field("revision", &self.api.revision())
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub const MAX_DEVICES: usize = 4;

    /// Session for `slot`. Nothing is read until the first [`update`](Self::update).
    pub fn new(api: Arc<XInput>, slot: Slot) -> Self {
        Self {
            slot,
            api,
            buffer: StateBuffer::new(),
            capabilities: None,
            previous_packet: 0,
            vibration: Vibration::ZERO,
            effect: None,
            seen: false,
            name: format!("XInput Controller {}", slot.index() + 1),
            id: format!("xinput:{}", slot.index()),
        }
    }

    /// Poll the slot and advance any playing effect to `time`.
    pub fn update(&mut self, time: Duration) -> Result<()> {
        let was_connected = self.seen && self.buffer.is_connected();
        self.previous_packet = self.buffer.current().packet_number;

        let api = &self.api;
        let slot = self.slot;
        self.buffer.poll(|| api.get_state(slot))?;
        self.seen |= self.buffer.is_connected();

        match (was_connected, self.buffer.is_connected()) {
            (false, true) => {
                info!(%slot, "controller connected");
                self.capabilities = None;
            }
            (true, false) => {
                info!(%slot, "controller disconnected");
                self.capabilities = None;
                self.effect = None;
                self.vibration = Vibration::ZERO;
            }
            _ => {}
        }

        if self.buffer.is_connected() {
            self.drive_effect(time)?;
        }
        Ok(())
    }

    #[inline]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[inline]
    pub fn api(&self) -> &Arc<XInput> {
        &self.api
    }

    #[inline]
    pub fn state(&self) -> &ControllerState {
        self.buffer.current()
    }

    /// Whether the native packet counter moved since the previous update.
    pub fn has_new_packet(&self) -> bool {
        self.buffer.is_connected() && self.buffer.current().packet_number != self.previous_packet
    }

    /// Last vibration sent to the motors.
    #[inline]
    pub fn vibration(&self) -> Vibration {
        self.vibration
    }

    /// Set both motors. Levels must lie in `[0, 1]`.
    pub fn set_vibration(&mut self, left: f32, right: f32) -> Result<()> {
        let vibration = Vibration::new(left, right)?;
        self.send(vibration)
    }

    fn send(&mut self, vibration: Vibration) -> Result<()> {
        if !self.buffer.is_connected() {
            return Err(InputError::NotConnected {
                slot: self.slot.index(),
            });
        }
        self.api.set_state(self.slot, vibration)?;
        self.vibration = vibration;
        Ok(())
    }

    /// Capabilities of the connected controller, fetched on first use after each connect.
    pub fn capabilities(&mut self) -> Result<Capabilities> {
        if !self.buffer.is_connected() {
            return Err(InputError::NotConnected {
                slot: self.slot.index(),
            });
        }
        if let Some(caps) = self.capabilities {
            return Ok(caps);
        }
        let caps = self.api.get_capabilities(self.slot)?;
        debug!(slot = %self.slot, sub_type = ?caps.sub_type, "capabilities refreshed");
        self.capabilities = Some(caps);
        Ok(caps)
    }

    pub fn battery_information(&self, device: BatteryDeviceType) -> Result<BatteryInformation> {
        self.api.get_battery_information(self.slot, device)
    }

    /// Next queued keystroke for this slot, if any.
    pub fn keystroke(&self) -> Result<Option<Keystroke>> {
        self.api.get_keystroke(self.slot)
    }

    pub fn audio_device_ids(&self) -> Result<AudioDeviceIds> {
        self.api.get_audio_device_ids(self.slot)
    }

    pub fn dsound_audio_device_guids(&self) -> Result<DSoundGuids> {
        self.api.get_dsound_audio_device_guids(self.slot)
    }

    /// Start `effect`; its clock starts at the next update.
    pub fn play(&mut self, effect: Arc<dyn VibrationEffect>) {
        self.effect = Some(PlayingEffect {
            effect,
            started: None,
        });
    }

    /// Stop the playing effect and silence the motors.
    pub fn stop(&mut self) -> Result<()> {
        self.effect = None;
        if self.buffer.is_connected() {
            self.send(Vibration::ZERO)?;
        }
        Ok(())
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.effect.is_some()
    }

    fn drive_effect(&mut self, time: Duration) -> Result<()> {
        let Some(playing) = self.effect.as_mut() else {
            return Ok(());
        };
        let started = *playing.started.get_or_insert(time);
        let elapsed = i64::try_from(time.saturating_sub(started).as_millis()).unwrap_or(i64::MAX);

        if playing.effect.is_finished(elapsed) {
            debug!(slot = %self.slot, elapsed, "vibration effect finished");
            self.effect = None;
            return self.send(Vibration::ZERO);
        }

        let vibration = playing.effect.at(elapsed);
        if vibration != self.vibration {
            self.send(vibration)?;
        }
        Ok(())
    }
}

impl Device for Controller {
    type State = ControllerState;
    const KIND: DeviceKind = DeviceKind::Controller;
    const MAX_DEVICES: usize = Controller::MAX_DEVICES;

    fn update(&mut self, time: Duration) -> Result<()> {
        Controller::update(self, time)
    }

    fn buffer(&self) -> &StateBuffer<ControllerState> {
        &self.buffer
    }

    fn retire(&mut self) {
        self.effect = None;
        if self.buffer.is_connected() && !self.vibration.is_zero() {
            if let Err(e) = self.send(Vibration::ZERO) {
                warn!(slot = %self.slot, error = %e, "failed to silence retired controller");
            }
        }
        self.buffer.retire();
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> DeviceMeta {
        DeviceMeta {
            kind: DeviceKind::Controller,
            index: Some(self.slot.index()),
            bus: Some("xinput".into()),
            display_name: Some(self.name.clone()),
            revision: Some(self.api.revision().to_string()),
            ..DeviceMeta::default()
        }
    }
}

impl Controller {
    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.buffer.is_pressed(button)
    }

    pub fn just_pressed(&self, button: GamepadButton) -> bool {
        self.buffer.just_pressed(button)
    }

    pub fn just_released(&self, button: GamepadButton) -> bool {
        self.buffer.just_released(button)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.buffer.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockLibraries, MockXInput};
    use crate::config::XInputConfig;
    use crate::vibration::VibrationSequence;
    use crate::xinput::{GamepadButtons, Revision};

    fn session(slot: Slot) -> (MockXInput, Controller) {
        let pads = MockXInput::new();
        let probe = MockLibraries::new(&pads, [Revision::V1_4]);
        let api = Arc::new(XInput::resolve(&probe, &XInputConfig::default()).unwrap());
        (pads, Controller::new(api, slot))
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn press_and_release_edges() {
        let (pads, mut pad) = session(Slot::One);
        pads.connect(Slot::One);

        pads.set_buttons(Slot::One, GamepadButtons::A);
        pad.update(ms(0)).unwrap();
        assert!(pad.just_pressed(GamepadButton::A));
        assert!(pad.has_new_packet());

        pad.update(ms(16)).unwrap();
        assert!(pad.is_pressed(GamepadButton::A));
        assert!(!pad.just_pressed(GamepadButton::A));
        assert!(!pad.has_new_packet());

        pads.set_buttons(Slot::One, GamepadButtons::empty());
        pad.update(ms(32)).unwrap();
        assert!(pad.just_released(GamepadButton::A));
    }

    #[test]
    fn vibration_rejected_while_disconnected() {
        let (pads, mut pad) = session(Slot::Two);
        pad.update(ms(0)).unwrap();

        assert!(!pad.is_connected());
        assert!(matches!(
            pad.set_vibration(0.5, 0.5),
            Err(InputError::NotConnected { slot: 1 })
        ));
        assert!(pads.vibrations(Slot::Two).is_empty());
    }

    #[test]
    fn vibration_range_is_checked_before_sending() {
        let (pads, mut pad) = session(Slot::One);
        pads.connect(Slot::One);
        pad.update(ms(0)).unwrap();

        assert!(matches!(
            pad.set_vibration(1.5, 0.0),
            Err(InputError::IntensityOutOfRange(_))
        ));
        pad.set_vibration(1.0, 0.0).unwrap();
        assert_eq!(pads.vibrations(Slot::One), vec![(65535, 0)]);
    }

    #[test]
    fn capabilities_cached_until_reconnect() {
        let (pads, mut pad) = session(Slot::One);
        pads.connect(Slot::One);
        pad.update(ms(0)).unwrap();

        pad.capabilities().unwrap();
        pad.capabilities().unwrap();
        assert_eq!(pads.capability_queries(Slot::One), 1);

        pads.disconnect(Slot::One);
        pad.update(ms(16)).unwrap();
        assert!(pad.capabilities().is_err());

        pads.connect(Slot::One);
        pad.update(ms(32)).unwrap();
        pad.capabilities().unwrap();
        assert_eq!(pads.capability_queries(Slot::One), 2);
    }

    #[test]
    fn disconnect_resets_to_neutral() {
        let (pads, mut pad) = session(Slot::Three);
        pads.connect(Slot::Three);
        pads.set_buttons(Slot::Three, GamepadButtons::X | GamepadButtons::Y);
        pad.update(ms(0)).unwrap();

        pads.disconnect(Slot::Three);
        pad.update(ms(16)).unwrap();

        assert_eq!(*pad.state(), ControllerState::default());
        assert!(!pad.just_released(GamepadButton::X));
        assert!(!pad.is_pressed(GamepadButton::Y));
    }

    #[test]
    fn effect_is_sampled_then_stops() {
        let (pads, mut pad) = session(Slot::One);
        pads.connect(Slot::One);

        let mut seq = VibrationSequence::new();
        seq.add(0, Vibration::ZERO).unwrap();
        seq.add(100, Vibration::FULL).unwrap();
        pad.play(Arc::new(seq));

        pad.update(ms(1000)).unwrap(); // clock starts: t = 0, level unchanged
        pad.update(ms(1050)).unwrap(); // t = 50
        pad.update(ms(1100)).unwrap(); // t = 100
        assert!(pad.is_playing());
        pad.update(ms(1101)).unwrap(); // past the end

        assert!(!pad.is_playing());
        assert_eq!(
            pads.vibrations(Slot::One),
            vec![(32768, 32768), (65535, 65535), (0, 0)]
        );
    }

    #[test]
    fn empty_result_from_state_read_is_an_error() {
        let (pads, mut pad) = session(Slot::One);
        pads.connect(Slot::One);
        pads.set_buttons(Slot::One, GamepadButtons::A);
        pad.update(ms(0)).unwrap();

        pads.fail_next(Slot::One, crate::error::ERROR_EMPTY);
        assert!(pad.update(ms(2)).is_err());
        assert!(pad.is_connected());
        assert!(pad.is_pressed(GamepadButton::A));
        assert!(!pad.just_released(GamepadButton::A));
    }

    #[test]
    fn retire_silences_running_motors() {
        let (pads, mut pad) = session(Slot::One);
        pads.connect(Slot::One);
        pad.update(ms(0)).unwrap();
        pad.set_vibration(1.0, 1.0).unwrap();

        Device::retire(&mut pad);
        assert_eq!(pads.vibrations(Slot::One), vec![(65535, 65535), (0, 0)]);

        // Nothing to silence the second time.
        Device::retire(&mut pad);
        assert_eq!(pads.vibrations(Slot::One).len(), 2);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_of(f: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn empty_slot_does_not_report_a_disconnect() {
        let (pads, mut pad) = session(Slot::Two);

        let quiet = logs_of(|| {
            pad.update(ms(0)).unwrap();
            pad.update(ms(16)).unwrap();
        });
        assert!(!quiet.contains("controller disconnected"), "{quiet}");

        pads.connect(Slot::Two);
        let plugged = logs_of(|| pad.update(ms(32)).unwrap());
        assert!(plugged.contains("controller connected"), "{plugged}");

        pads.disconnect(Slot::Two);
        let unplugged = logs_of(|| pad.update(ms(48)).unwrap());
        assert!(unplugged.contains("controller disconnected"), "{unplugged}");
    }

    #[test]
    fn metadata_names_the_slot() {
        let (_pads, pad) = session(Slot::Four);
        let meta = pad.metadata();
        assert_eq!(pad.id(), "xinput:3");
        assert_eq!(meta.index, Some(3));
        assert_eq!(meta.revision.as_deref(), Some("1.4"));
    }
}
