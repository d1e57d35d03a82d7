//! In-memory backends for tests and headless hosts.
//!
//! Each mock is a cheap handle over shared state: clone it (or keep the original) to
//! script devices while a session owns the boxed function table or source.
//!
//! - [`MockXInput`]: four scripted controller slots; records vibration and capability calls.
//! - [`MockLibraries`]: a [`LibraryProbe`] that "installs" a chosen set of revisions.
//! - [`MockRawInput`]: scripted keyboards and mice behind a [`RawInputPlatform`].
//! - [`MockCursor`]: a display counter behind [`CursorApi`].

use crate::cursor::{CursorApi, CursorInfo, CursorOptions};
use crate::error::{
    InputError, Result, ERROR_DEVICE_NOT_CONNECTED, ERROR_EMPTY, ERROR_SUCCESS,
};
use crate::keyboard::KeyboardState;
use crate::metadata::DeviceKind;
use crate::mouse::{MouseButton, MouseButtons};
use crate::raw::{
    DeviceDescriptor, DeviceHandle, HidInfo, KeyboardInfo, KeyboardSource, MouseInfo,
    MouseSource, RawDeviceInfo, RawInputPlatform,
};
use crate::state::{Point, Sample};
use crate::xinput::ffi::{
    RawBatteryInformation, RawCapabilities, RawGamepad, RawKeystroke, RawState, RawVibration,
};
use crate::xinput::{Gamepad, GamepadButtons, Guid, LibraryProbe, NativeXInput, Revision, Slot};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// `ERROR_INVALID_HANDLE`
const ERROR_INVALID_HANDLE: u32 = 6;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct PadScript {
    connected: bool,
    packet: u32,
    gamepad: Gamepad,
    capabilities: RawCapabilities,
    battery: RawBatteryInformation,
    keystrokes: VecDeque<RawKeystroke>,
    render_id: String,
    capture_id: String,
    dsound: (Guid, Guid),
    fail_next: Option<u32>,
    capability_queries: usize,
    vibrations: Vec<(u16, u16)>,
}

impl PadScript {
    fn bump(&mut self) {
        self.packet = self.packet.wrapping_add(1);
    }

    /// Result code for the next call, before any output is written.
    fn precheck(&mut self) -> Option<u32> {
        if let Some(code) = self.fail_next.take() {
            return Some(code);
        }
        (!self.connected).then_some(ERROR_DEVICE_NOT_CONNECTED)
    }
}

struct Pads {
    slots: [PadScript; 4],
    enabled: bool,
}

/// Scripted XInput function table.
#[derive(Clone)]
pub struct MockXInput {
    inner: Arc<Mutex<Pads>>,
}

impl Default for MockXInput {
    fn default() -> Self {
        Self::new()
    }
}

impl MockXInput {
    /// Four empty, disconnected slots.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Pads {
                slots: Default::default(),
                enabled: true,
            })),
        }
    }

    fn with_pad<R>(&self, slot: Slot, f: impl FnOnce(&mut PadScript) -> R) -> R {
        f(&mut lock(&self.inner).slots[slot.index()])
    }

    fn with_user_index<R>(
        &self,
        user_index: u32,
        f: impl FnOnce(&mut PadScript) -> R,
    ) -> Option<R> {
        let mut pads = lock(&self.inner);
        pads.slots.get_mut(user_index as usize).map(f)
    }

    /// Plug a standard gamepad into `slot`.
    pub fn connect(&self, slot: Slot) {
        self.with_pad(slot, |p| {
            p.connected = true;
            p.capabilities = standard_capabilities();
            p.battery = RawBatteryInformation {
                battery_type: 0x01,
                battery_level: 0x03,
            };
            p.bump();
        });
    }

    pub fn disconnect(&self, slot: Slot) {
        self.with_pad(slot, |p| {
            p.connected = false;
            p.gamepad = Gamepad::default();
        });
    }

    pub fn set_buttons(&self, slot: Slot, buttons: GamepadButtons) {
        self.with_pad(slot, |p| {
            p.gamepad.buttons = buttons;
            p.bump();
        });
    }

    pub fn set_gamepad(&self, slot: Slot, gamepad: Gamepad) {
        self.with_pad(slot, |p| {
            p.gamepad = gamepad;
            p.bump();
        });
    }

    pub fn set_capabilities(&self, slot: Slot, caps: RawCapabilities) {
        self.with_pad(slot, |p| p.capabilities = caps);
    }

    pub fn set_battery(&self, slot: Slot, battery_type: u8, battery_level: u8) {
        self.with_pad(slot, |p| {
            p.battery = RawBatteryInformation {
                battery_type,
                battery_level,
            }
        });
    }

    pub fn push_keystroke(&self, slot: Slot, keystroke: RawKeystroke) {
        self.with_pad(slot, |p| p.keystrokes.push_back(keystroke));
    }

    pub fn set_audio_ids(&self, slot: Slot, render: &str, capture: &str) {
        self.with_pad(slot, |p| {
            p.render_id = render.to_string();
            p.capture_id = capture.to_string();
        });
    }

    pub fn set_dsound_guids(&self, slot: Slot, render: Guid, capture: Guid) {
        self.with_pad(slot, |p| p.dsound = (render, capture));
    }

    /// Make the next call on `slot` fail with `code`.
    pub fn fail_next(&self, slot: Slot, code: u32) {
        self.with_pad(slot, |p| p.fail_next = Some(code));
    }

    pub fn capability_queries(&self, slot: Slot) -> usize {
        self.with_pad(slot, |p| p.capability_queries)
    }

    /// Motor speeds sent to `slot`, oldest first.
    pub fn vibrations(&self, slot: Slot) -> Vec<(u16, u16)> {
        self.with_pad(slot, |p| p.vibrations.clone())
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.inner).enabled
    }
}

fn standard_capabilities() -> RawCapabilities {
    RawCapabilities {
        device_type: 0x01,
        sub_type: 0x01,
        flags: 0,
        gamepad: RawGamepad {
            buttons: GamepadButtons::all().bits(),
            left_trigger: 0xFF,
            right_trigger: 0xFF,
            thumb_lx: -64,
            thumb_ly: -64,
            thumb_rx: -64,
            thumb_ry: -64,
        },
        vibration: RawVibration {
            left_motor_speed: 0xFFFF,
            right_motor_speed: 0xFFFF,
        },
    }
}

fn write_wide(text: &str, buf: &mut [u16], len: &mut u32) {
    let mut n = 0;
    for (dst, src) in buf.iter_mut().zip(text.encode_utf16()) {
        *dst = src;
        n += 1;
    }
    if let Some(nul) = buf.get_mut(n) {
        *nul = 0;
    }
    *len = if text.is_empty() { 0 } else { n as u32 + 1 };
}

impl NativeXInput for MockXInput {
    fn enable(&self, enable: bool) {
        lock(&self.inner).enabled = enable;
    }

    fn get_state(&self, user_index: u32, state: &mut RawState) -> u32 {
        let enabled = self.is_enabled();
        self.with_user_index(user_index, |p| {
            if let Some(code) = p.precheck() {
                return code;
            }
            state.packet_number = p.packet;
            state.gamepad = if enabled {
                p.gamepad.into()
            } else {
                RawGamepad::default()
            };
            ERROR_SUCCESS
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }

    fn set_state(&self, user_index: u32, vibration: &mut RawVibration) -> u32 {
        self.with_user_index(user_index, |p| {
            if let Some(code) = p.precheck() {
                return code;
            }
            p.vibrations
                .push((vibration.left_motor_speed, vibration.right_motor_speed));
            ERROR_SUCCESS
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }

    fn get_capabilities(&self, user_index: u32, _flags: u32, caps: &mut RawCapabilities) -> u32 {
        self.with_user_index(user_index, |p| {
            p.capability_queries += 1;
            if let Some(code) = p.precheck() {
                return code;
            }
            *caps = p.capabilities;
            ERROR_SUCCESS
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }

    fn get_battery_information(
        &self,
        user_index: u32,
        _device_type: u8,
        info: &mut RawBatteryInformation,
    ) -> u32 {
        self.with_user_index(user_index, |p| {
            if let Some(code) = p.precheck() {
                return code;
            }
            *info = p.battery;
            ERROR_SUCCESS
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }

    fn get_keystroke(&self, user_index: u32, keystroke: &mut RawKeystroke) -> u32 {
        self.with_user_index(user_index, |p| {
            if let Some(code) = p.precheck() {
                return code;
            }
            match p.keystrokes.pop_front() {
                Some(k) => {
                    *keystroke = k;
                    ERROR_SUCCESS
                }
                None => ERROR_EMPTY,
            }
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }

    fn get_audio_device_ids(
        &self,
        user_index: u32,
        render: &mut [u16],
        render_len: &mut u32,
        capture: &mut [u16],
        capture_len: &mut u32,
    ) -> u32 {
        self.with_user_index(user_index, |p| {
            if let Some(code) = p.precheck() {
                return code;
            }
            write_wide(&p.render_id, render, render_len);
            write_wide(&p.capture_id, capture, capture_len);
            ERROR_SUCCESS
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }

    fn get_dsound_audio_device_guids(
        &self,
        user_index: u32,
        render: &mut Guid,
        capture: &mut Guid,
    ) -> u32 {
        self.with_user_index(user_index, |p| {
            if let Some(code) = p.precheck() {
                return code;
            }
            (*render, *capture) = p.dsound;
            ERROR_SUCCESS
        })
        .unwrap_or(ERROR_DEVICE_NOT_CONNECTED)
    }
}

/// Probe over a fixed set of "installed" revisions, all backed by one [`MockXInput`].
pub struct MockLibraries {
    pads: MockXInput,
    installed: Vec<Revision>,
    probed: Mutex<Vec<Revision>>,
}

impl MockLibraries {
    pub fn new(pads: &MockXInput, installed: impl IntoIterator<Item = Revision>) -> Self {
        Self {
            pads: pads.clone(),
            installed: installed.into_iter().collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    /// Revisions asked for, in order.
    pub fn probed(&self) -> Vec<Revision> {
        lock(&self.probed).clone()
    }
}

impl LibraryProbe for MockLibraries {
    fn open(&self, revision: Revision) -> Option<Box<dyn NativeXInput>> {
        lock(&self.probed).push(revision);
        self.installed
            .contains(&revision)
            .then(|| Box::new(self.pads.clone()) as Box<dyn NativeXInput>)
    }
}

struct RawEntry {
    handle: DeviceHandle,
    kind: DeviceKind,
    name: String,
    info: RawDeviceInfo,
    connected: bool,
    keys: KeyboardState,
    cursor: CursorInfo,
    buttons: MouseButtons,
}

#[derive(Default)]
struct RawDevices {
    entries: Vec<RawEntry>,
    next_handle: DeviceHandle,
}

/// Scripted Raw Input device list.
#[derive(Clone, Default)]
pub struct MockRawInput {
    inner: Arc<Mutex<RawDevices>>,
}

impl MockRawInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, kind: DeviceKind, name: &str, info: RawDeviceInfo) -> DeviceHandle {
        let mut devices = lock(&self.inner);
        devices.next_handle += 0x10;
        let handle = 0x1000 + devices.next_handle;
        devices.entries.push(RawEntry {
            handle,
            kind,
            name: name.to_string(),
            info,
            connected: true,
            keys: KeyboardState::default(),
            cursor: CursorInfo::default(),
            buttons: MouseButtons::empty(),
        });
        handle
    }

    /// Add a 101-key keyboard. Returns its handle.
    pub fn add_keyboard(&self, name: &str) -> DeviceHandle {
        let info = KeyboardInfo {
            kind: 4,
            sub_kind: 0,
            mode: 1,
            function_keys: 12,
            indicators: 3,
            total_keys: 101,
        };
        self.add(DeviceKind::Keyboard, name, RawDeviceInfo::Keyboard(info))
    }

    /// Add a five-button wheel mouse. Returns its handle.
    pub fn add_mouse(&self, name: &str) -> DeviceHandle {
        let info = MouseInfo {
            id: 256,
            button_count: MouseButton::MAX_SUPPORTED as u32,
            sample_rate: 0,
            has_horizontal_wheel: true,
        };
        self.add(DeviceKind::Mouse, name, RawDeviceInfo::Mouse(info))
    }

    pub fn add_hid(&self, name: &str, info: HidInfo) -> DeviceHandle {
        self.add(DeviceKind::Hid, name, RawDeviceInfo::Hid(info))
    }

    fn with_entry(&self, handle: DeviceHandle, f: impl FnOnce(&mut RawEntry)) {
        let mut devices = lock(&self.inner);
        if let Some(e) = devices.entries.iter_mut().find(|e| e.handle == handle) {
            f(e);
        }
    }

    pub fn set_keys(&self, handle: DeviceHandle, keys: KeyboardState) {
        self.with_entry(handle, |e| e.keys = keys);
    }

    pub fn set_cursor(&self, handle: DeviceHandle, position: Point) {
        self.with_entry(handle, |e| e.cursor.position = position);
    }

    pub fn set_cursor_options(&self, handle: DeviceHandle, options: CursorOptions) {
        self.with_entry(handle, |e| e.cursor.options = options);
    }

    pub fn set_buttons(&self, handle: DeviceHandle, buttons: MouseButtons) {
        self.with_entry(handle, |e| e.buttons = buttons);
    }

    /// The device stays listed but stops answering reads.
    pub fn unplug(&self, handle: DeviceHandle) {
        self.with_entry(handle, |e| {
            e.connected = false;
            e.keys = KeyboardState::default();
            e.buttons = MouseButtons::empty();
        });
    }

    pub fn replug(&self, handle: DeviceHandle) {
        self.with_entry(handle, |e| e.connected = true);
    }

    /// Drop the device from the list entirely.
    pub fn remove(&self, handle: DeviceHandle) {
        lock(&self.inner).entries.retain(|e| e.handle != handle);
    }

    fn read<R>(&self, handle: DeviceHandle, f: impl FnOnce(&RawEntry) -> R) -> Result<R> {
        let devices = lock(&self.inner);
        devices
            .entries
            .iter()
            .find(|e| e.handle == handle)
            .map(f)
            .ok_or_else(|| InputError::native("GetRawInputDeviceInfoW", ERROR_INVALID_HANDLE))
    }
}

impl RawInputPlatform for MockRawInput {
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(lock(&self.inner)
            .entries
            .iter()
            .map(|e| DeviceDescriptor {
                handle: e.handle,
                kind: e.kind,
            })
            .collect())
    }

    fn device_info(&self, handle: DeviceHandle) -> Result<RawDeviceInfo> {
        self.read(handle, |e| e.info)
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String> {
        self.read(handle, |e| e.name.clone())
    }

    fn keyboard_source(&self, handle: DeviceHandle) -> Box<dyn KeyboardSource> {
        Box::new(MockSource {
            devices: self.clone(),
            handle,
        })
    }

    fn mouse_source(&self, handle: DeviceHandle) -> Box<dyn MouseSource> {
        Box::new(MockSource {
            devices: self.clone(),
            handle,
        })
    }
}

/// Reads one entry of a [`MockRawInput`]. A removed device reads as disconnected.
struct MockSource {
    devices: MockRawInput,
    handle: DeviceHandle,
}

impl MockSource {
    fn sample<T>(&self, f: impl FnOnce(&RawEntry) -> T) -> Sample<T> {
        match self.devices.read(self.handle, |e| e.connected.then(|| f(e))) {
            Ok(Some(v)) => Sample::Present(v),
            _ => Sample::NotConnected,
        }
    }
}

impl KeyboardSource for MockSource {
    fn read(&mut self) -> Result<Sample<KeyboardState>> {
        Ok(self.sample(|e| e.keys))
    }
}

impl MouseSource for MockSource {
    fn cursor(&mut self) -> Result<Sample<CursorInfo>> {
        Ok(self.sample(|e| e.cursor))
    }

    fn is_button_down(&mut self, button: MouseButton) -> bool {
        matches!(self.sample(|e| e.buttons.contains(button.flag())), Sample::Present(true))
    }
}

/// Cursor display counter.
#[derive(Debug, Default)]
pub struct MockCursor {
    counter: Cell<i32>,
    calls: Cell<usize>,
    position: Cell<Point>,
}

impl MockCursor {
    pub fn with_counter(counter: i32) -> Self {
        Self {
            counter: Cell::new(counter),
            ..Self::default()
        }
    }

    pub fn counter(&self) -> i32 {
        self.counter.get()
    }

    /// Number of `show_cursor` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn position(&self) -> Point {
        self.position.get()
    }
}

impl CursorApi for MockCursor {
    fn show_cursor(&self, show: bool) -> i32 {
        self.calls.set(self.calls.get() + 1);
        let next = self.counter.get() + if show { 1 } else { -1 };
        self.counter.set(next);
        next
    }

    fn set_cursor_pos(&self, position: Point) -> Result<()> {
        self.position.set(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_consumed_by_one_call() {
        let pads = MockXInput::new();
        pads.connect(Slot::One);
        pads.fail_next(Slot::One, 5);

        let mut state = RawState::default();
        assert_eq!(pads.get_state(0, &mut state), 5);
        assert_eq!(pads.get_state(0, &mut state), ERROR_SUCCESS);
    }

    #[test]
    fn out_of_range_user_index_is_not_connected() {
        let pads = MockXInput::new();
        let mut state = RawState::default();
        assert_eq!(pads.get_state(7, &mut state), ERROR_DEVICE_NOT_CONNECTED);
    }

    #[test]
    fn removed_device_reads_as_disconnected() {
        let platform = MockRawInput::new();
        let h = platform.add_keyboard("kbd");
        let mut source = platform.keyboard_source(h);

        assert!(source.read().unwrap().is_present());
        platform.remove(h);
        assert_eq!(source.read().unwrap(), Sample::NotConnected);
        assert!(platform.device_name(h).is_err());
    }
}
