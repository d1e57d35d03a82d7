//! Keyboard sessions.
//!
//! A [`KeyboardState`] is the full 256-entry virtual-key table captured at one poll, packed
//! into bits. Windows keeps one key table per thread, not per device, so every keyboard
//! session on Windows reads the same table; the per-device split still gives each its own
//! edge history and connection status.

use crate::buffer::StateBuffer;
use crate::device::Device;
use crate::error::Result;
use crate::metadata::{DeviceKind, DeviceMeta};
use crate::raw::{
    DeviceDescriptor, DeviceHandle, KeyboardSource, RawDevice, RawDeviceInfo, RawInputPlatform,
};
use crate::state::DeviceState;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Windows virtual-key code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub u8);

impl Key {
    pub const BACKSPACE: Key = Key(0x08);
    pub const TAB: Key = Key(0x09);
    pub const ENTER: Key = Key(0x0D);
    pub const SHIFT: Key = Key(0x10);
    pub const CONTROL: Key = Key(0x11);
    pub const ALT: Key = Key(0x12);
    pub const PAUSE: Key = Key(0x13);
    pub const CAPS_LOCK: Key = Key(0x14);
    pub const ESCAPE: Key = Key(0x1B);
    pub const SPACE: Key = Key(0x20);
    pub const PAGE_UP: Key = Key(0x21);
    pub const PAGE_DOWN: Key = Key(0x22);
    pub const END: Key = Key(0x23);
    pub const HOME: Key = Key(0x24);
    pub const LEFT: Key = Key(0x25);
    pub const UP: Key = Key(0x26);
    pub const RIGHT: Key = Key(0x27);
    pub const DOWN: Key = Key(0x28);
    pub const INSERT: Key = Key(0x2D);
    pub const DELETE: Key = Key(0x2E);
    pub const LEFT_WINDOWS: Key = Key(0x5B);
    pub const RIGHT_WINDOWS: Key = Key(0x5C);
    pub const NUMPAD0: Key = Key(0x60);
    pub const F1: Key = Key(0x70);
    pub const LEFT_SHIFT: Key = Key(0xA0);
    pub const RIGHT_SHIFT: Key = Key(0xA1);
    pub const LEFT_CONTROL: Key = Key(0xA2);
    pub const RIGHT_CONTROL: Key = Key(0xA3);
    pub const LEFT_ALT: Key = Key(0xA4);
    pub const RIGHT_ALT: Key = Key(0xA5);

    /// `A`-`Z` and `0`-`9` map to their ASCII codes; anything else is `None`.
    pub const fn from_ascii(c: u8) -> Option<Key> {
        match c {
            b'A'..=b'Z' | b'0'..=b'9' => Some(Key(c)),
            b'a'..=b'z' => Some(Key(c - 32)),
            _ => None,
        }
    }

    /// `F1`..`F24`.
    pub const fn function(n: u8) -> Option<Key> {
        match n {
            1..=24 => Some(Key(Self::F1.0 + n - 1)),
            _ => None,
        }
    }

    /// `NUMPAD0`..`NUMPAD9`.
    pub const fn numpad(n: u8) -> Option<Key> {
        if n <= 9 {
            Some(Key(Self::NUMPAD0.0 + n))
        } else {
            None
        }
    }
}

/// 256 key bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyboardState {
    keys: [u64; 4],
}

impl KeyboardState {
    /// From a `GetKeyboardState` table: the high bit of each entry marks a held key.
    pub fn from_key_table(table: &[u8; 256]) -> Self {
        let mut state = Self::default();
        for (vk, &entry) in table.iter().enumerate() {
            if entry & 0x80 != 0 {
                state.set(Key(vk as u8), true);
            }
        }
        state
    }

    pub fn set(&mut self, key: Key, down: bool) {
        let (word, bit) = (key.0 as usize / 64, key.0 % 64);
        if down {
            self.keys[word] |= 1 << bit;
        } else {
            self.keys[word] &= !(1 << bit);
        }
    }

    pub fn with(mut self, key: Key) -> Self {
        self.set(key, true);
        self
    }

    #[inline]
    pub fn is_down(&self, key: Key) -> bool {
        self.keys[key.0 as usize / 64] & (1 << (key.0 % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.keys.iter().all(|&w| w == 0)
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        (0..=255u8).map(Key).filter(|&k| self.is_down(k))
    }
}

impl fmt::Debug for KeyboardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.pressed_keys().map(|k| k.0))
            .finish()
    }
}

impl DeviceState for KeyboardState {
    type Button = Key;

    #[inline]
    fn is_pressed(&self, key: Key) -> bool {
        self.is_down(key)
    }
}

pub struct Keyboard {
    raw: RawDevice,
    buffer: StateBuffer<KeyboardState>,
    source: Box<dyn KeyboardSource>,
}

impl fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyboard")
            .field("raw", &self.raw)
            .field("connected", &self.buffer.is_connected())
            .finish_non_exhaustive()
    }
}

impl Keyboard {
    pub const MAX_DEVICES: usize = 4;

    /// Open the keyboard behind `descriptor`. The first [`update`](Self::update) reads state.
    pub fn open<P: RawInputPlatform + ?Sized>(
        platform: &P,
        index: usize,
        descriptor: DeviceDescriptor,
    ) -> Result<Self> {
        let raw = RawDevice::open(platform, index, descriptor)?;
        debug!(index, name = raw.name(), "opened keyboard");
        Ok(Self {
            source: platform.keyboard_source(raw.handle()),
            raw,
            buffer: StateBuffer::new(),
        })
    }

    pub fn update(&mut self) -> Result<()> {
        let source = &mut self.source;
        self.buffer.poll(|| source.read())
    }

    #[inline]
    pub fn state(&self) -> &KeyboardState {
        self.buffer.current()
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.buffer.is_pressed(key)
    }

    pub fn just_pressed(&self, key: Key) -> bool {
        self.buffer.just_pressed(key)
    }

    pub fn just_released(&self, key: Key) -> bool {
        self.buffer.just_released(key)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.buffer.is_connected()
    }

    /// Device interface path.
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    pub fn display_name(&self) -> &str {
        self.raw.display_name()
    }

    pub fn handle(&self) -> DeviceHandle {
        self.raw.handle()
    }

    pub fn info(&self) -> &RawDeviceInfo {
        self.raw.info()
    }
}

impl Device for Keyboard {
    type State = KeyboardState;
    const KIND: DeviceKind = DeviceKind::Keyboard;
    const MAX_DEVICES: usize = Keyboard::MAX_DEVICES;

    fn update(&mut self, _time: Duration) -> Result<()> {
        Keyboard::update(self)
    }

    fn buffer(&self) -> &StateBuffer<KeyboardState> {
        &self.buffer
    }

    fn retire(&mut self) {
        self.buffer.retire();
    }

    fn name(&self) -> &str {
        self.raw.display_name()
    }

    fn id(&self) -> &str {
        self.raw.name()
    }

    fn metadata(&self) -> DeviceMeta {
        self.raw.metadata()
    }
}
