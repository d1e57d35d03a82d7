use crate::buffer::StateBuffer;
use crate::error::Result;
use crate::metadata::{DeviceKind, DeviceMeta};
use crate::state::DeviceState;
use std::time::Duration;

/// A polled input device: keyboard, mouse or controller.
///
/// Implementors own a [`StateBuffer`] and refresh it in [`update`](Device::update); the edge
/// queries are derived from it.
pub trait Device {
    type State: DeviceState;

    const KIND: DeviceKind;

    /// Upper bound on simultaneously tracked devices of this kind.
    const MAX_DEVICES: usize;

    /// Poll the device once. `time` is the host's frame clock.
    fn update(&mut self, time: Duration) -> Result<()>;

    fn buffer(&self) -> &StateBuffer<Self::State>;

    /// Stop tracking: later updates are no-ops and the state stays neutral.
    fn retire(&mut self);

    fn name(&self) -> &str;

    /// Stable identifier (device path for Raw Input devices, `xinput:{slot}` for controllers).
    fn id(&self) -> &str;

    fn metadata(&self) -> DeviceMeta;

    fn describe(&self) -> String {
        format!("{} ({})", self.name(), self.id())
    }

    fn is_connected(&self) -> bool {
        self.buffer().is_connected()
    }

    fn current(&self) -> &Self::State {
        self.buffer().current()
    }

    fn is_pressed(&self, button: <Self::State as DeviceState>::Button) -> bool {
        self.buffer().is_pressed(button)
    }

    fn just_pressed(&self, button: <Self::State as DeviceState>::Button) -> bool {
        self.buffer().just_pressed(button)
    }

    fn just_released(&self, button: <Self::State as DeviceState>::Button) -> bool {
        self.buffer().just_released(button)
    }
}
