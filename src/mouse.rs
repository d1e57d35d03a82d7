//! Mouse sessions.
//!
//! Position and buttons are read from the OS at each poll. Relative motion and wheel
//! movement come from the host's message loop (`WM_INPUT`, `WM_MOUSEWHEEL`) through
//! [`Mouse::add_motion`] and [`Mouse::add_wheel`]; the pending amounts are moved into the
//! next snapshot and cleared.
//!
//! Wheel input is counted in notches of [`WHEEL_DELTA`]. A partial notch from a
//! high-resolution wheel stays pending until it adds up to a whole one.

use crate::buffer::StateBuffer;
use crate::cursor::{self, CursorOptions};
use crate::device::Device;
use crate::error::Result;
use crate::metadata::{DeviceKind, DeviceMeta};
use crate::raw::{
    DeviceDescriptor, DeviceHandle, MouseSource, RawDevice, RawDeviceInfo, RawInputPlatform,
};
use crate::state::{DeviceState, Point, Sample};
use bitflags::bitflags;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Wheel units per notch.
pub const WHEEL_DELTA: i32 = 120;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    pub const MAX_SUPPORTED: usize = 5;

    pub const ALL: [MouseButton; Self::MAX_SUPPORTED] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ];

    /// `VK_LBUTTON` and friends.
    pub const fn virtual_key(self) -> u8 {
        match self {
            MouseButton::Left => 0x01,
            MouseButton::Right => 0x02,
            MouseButton::Middle => 0x04,
            MouseButton::X1 => 0x05,
            MouseButton::X2 => 0x06,
        }
    }

    pub const fn flag(self) -> MouseButtons {
        match self {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Right => MouseButtons::RIGHT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::X1 => MouseButtons::X1,
            MouseButton::X2 => MouseButtons::X2,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u8 {
        const LEFT = 0x01;
        const RIGHT = 0x02;
        const MIDDLE = 0x04;
        const X1 = 0x08;
        const X2 = 0x10;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MouseState {
    /// Cursor position in screen coordinates.
    pub position: Point,
    /// Relative motion reported since the previous poll.
    pub motion: Point,
    /// Whole wheel notches since the previous poll (positive = away from the user).
    pub wheel: i32,
    pub buttons: MouseButtons,
    pub cursor: CursorOptions,
}

impl DeviceState for MouseState {
    type Button = MouseButton;

    #[inline]
    fn is_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(button.flag())
    }
}

pub struct Mouse {
    raw: RawDevice,
    buffer: StateBuffer<MouseState>,
    source: Box<dyn MouseSource>,
    pending_motion: Point,
    pending_wheel: i32,
    wheel_value: i32,
}

impl fmt::Debug for Mouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mouse")
            .field("raw", &self.raw)
            .field("connected", &self.buffer.is_connected())
            .field("wheel_value", &self.wheel_value)
            .finish_non_exhaustive()
    }
}

impl Mouse {
    pub const MAX_DEVICES: usize = 4;

    pub fn open<P: RawInputPlatform + ?Sized>(
        platform: &P,
        index: usize,
        descriptor: DeviceDescriptor,
    ) -> Result<Self> {
        let raw = RawDevice::open(platform, index, descriptor)?;
        debug!(index, name = raw.name(), "opened mouse");
        Ok(Self {
            source: platform.mouse_source(raw.handle()),
            raw,
            buffer: StateBuffer::new(),
            pending_motion: Point::ZERO,
            pending_wheel: 0,
            wheel_value: 0,
        })
    }

    /// Feed relative motion from the message loop.
    pub fn add_motion(&mut self, dx: i32, dy: i32) {
        self.pending_motion += Point::new(dx, dy);
    }

    /// Feed a raw wheel delta (`WHEEL_DELTA` units) from the message loop.
    pub fn add_wheel(&mut self, delta: i32) {
        self.pending_wheel = self.pending_wheel.saturating_add(delta);
    }

    /// Poll the device. Pending motion and whole wheel notches move into the new snapshot
    /// only when the read succeeds; a failed read keeps them for the next update.
    pub fn update(&mut self) -> Result<()> {
        let motion = self.pending_motion;
        let notches = self.pending_wheel / WHEEL_DELTA;

        let source = &mut self.source;
        self.buffer.poll(|| {
            let info = match source.cursor()? {
                Sample::Present(info) => info,
                Sample::NotConnected => return Ok(Sample::NotConnected),
            };
            let mut buttons = MouseButtons::empty();
            for b in MouseButton::ALL {
                if source.is_button_down(b) {
                    buttons |= b.flag();
                }
            }
            Ok(Sample::Present(MouseState {
                position: info.position,
                motion,
                wheel: notches,
                buttons,
                cursor: info.options,
            }))
        })?;

        self.pending_motion = Point::ZERO;
        if self.buffer.is_connected() {
            self.pending_wheel -= notches * WHEEL_DELTA;
            cursor::remember(self.buffer.current().cursor);
            self.wheel_value = self.wheel_value.saturating_add(notches);
        } else {
            self.pending_wheel = 0;
            self.wheel_value = 0;
        }
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> &MouseState {
        self.buffer.current()
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.buffer.current().position
    }

    /// Notches accumulated over the session.
    #[inline]
    pub fn wheel_value(&self) -> i32 {
        self.wheel_value
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.buffer.is_pressed(button)
    }

    pub fn just_pressed(&self, button: MouseButton) -> bool {
        self.buffer.just_pressed(button)
    }

    pub fn just_released(&self, button: MouseButton) -> bool {
        self.buffer.just_released(button)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.buffer.is_connected()
    }

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

impl Device for Mouse {
    type State = MouseState;
    const KIND: DeviceKind = DeviceKind::Mouse;
    const MAX_DEVICES: usize = Mouse::MAX_DEVICES;

    fn update(&mut self, _time: Duration) -> Result<()> {
        Mouse::update(self)
    }

    fn buffer(&self) -> &StateBuffer<MouseState> {
        &self.buffer
    }

    fn retire(&mut self) {
        self.pending_motion = Point::ZERO;
        self.pending_wheel = 0;
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
