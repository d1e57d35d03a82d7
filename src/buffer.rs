//! Double-buffered device state with edge detection.
//!
//! [`StateBuffer`] is generic over the snapshot type, so keyboards, mice and gamepads share
//! exactly the same promote-then-install sequence and the same edge rules:
//!
//! - `just_pressed(b)`  = pressed now, not pressed at the previous poll
//! - `just_released(b)` = not pressed now, pressed at the previous poll
//!
//! While the device is disconnected every edge query returns `false`, and both slots hold
//! the neutral state. The first poll after construction compares against neutral, so a
//! button held at startup reports `just_pressed` exactly once.
//!
//! `poll` is not atomic with respect to other threads; wrap a shared buffer in a mutex.

use crate::error::Result;
use crate::state::{DeviceState, Sample};

#[derive(Clone, Debug)]
pub struct StateBuffer<S: DeviceState> {
    previous: S,
    current: S,
    connected: bool,
    retired: bool,
}

impl<S: DeviceState> Default for StateBuffer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DeviceState> StateBuffer<S> {
    /// Both slots start neutral; the device is assumed present until a poll says otherwise.
    pub fn new() -> Self {
        Self {
            previous: S::default(),
            current: S::default(),
            connected: true,
            retired: false,
        }
    }

    /// Promote `current` to `previous`, then install a fresh snapshot from `read`.
    ///
    /// A [`Sample::NotConnected`] reading marks the buffer disconnected and collapses both
    /// slots to neutral. Any other failure is returned unchanged; `previous` has already been
    /// promoted at that point and `current` is left as it was.
    pub fn poll<F>(&mut self, read: F) -> Result<()>
    where
        F: FnOnce() -> Result<Sample<S>>,
    {
        if self.retired {
            return Ok(());
        }

        self.previous = self.current.clone();
        let sample = read()?;
        self.install(sample);
        Ok(())
    }

    /// Install an already-captured sample. Same semantics as [`poll`](Self::poll).
    pub fn push(&mut self, sample: Sample<S>) {
        if self.retired {
            return;
        }
        self.previous = self.current.clone();
        self.install(sample);
    }

    fn install(&mut self, sample: Sample<S>) {
        match sample {
            Sample::Present(state) => {
                self.current = state;
                self.connected = true;
            }
            Sample::NotConnected => self.collapse(),
        }
    }

    /// Mark the device as removed. Later polls are no-ops and the state stays neutral.
    pub fn retire(&mut self) {
        self.collapse();
        self.retired = true;
    }

    /// Drop history without changing connection status.
    pub fn reset(&mut self) {
        self.previous = S::default();
        self.current = S::default();
    }

    fn collapse(&mut self) {
        self.connected = false;
        self.reset();
    }

    #[inline]
    pub fn current(&self) -> &S {
        &self.current
    }

    #[inline]
    pub fn previous(&self) -> &S {
        &self.previous
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected && !self.retired
    }

    #[inline]
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Whether the current and previous snapshots differ in any field.
    pub fn changed(&self) -> bool {
        self.current != self.previous
    }

    pub fn is_pressed(&self, button: S::Button) -> bool {
        self.is_connected() && self.current.is_pressed(button)
    }

    pub fn just_pressed(&self, button: S::Button) -> bool {
        self.is_connected() && self.current.is_pressed(button) && !self.previous.is_pressed(button)
    }

    pub fn just_released(&self, button: S::Button) -> bool {
        self.is_connected() && !self.current.is_pressed(button) && self.previous.is_pressed(button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputError;

    /// Eight-button toy device for exercising the generic rules.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Bits(u8);

    impl DeviceState for Bits {
        type Button = u8;
        fn is_pressed(&self, b: u8) -> bool {
            self.0 & (1 << b) != 0
        }
    }

    fn present(bits: u8) -> Sample<Bits> {
        Sample::Present(Bits(bits))
    }

    #[test]
    fn button_held_at_startup_is_just_pressed_once() {
        let mut buf = StateBuffer::<Bits>::new();

        buf.push(present(0b1));
        assert!(buf.just_pressed(0));

        buf.push(present(0b1));
        assert!(!buf.just_pressed(0));
        assert!(buf.is_pressed(0));
    }

    #[test]
    fn edges_follow_consecutive_snapshots() {
        // Every pair of consecutive snapshots must agree with the set definition.
        let seq = [0b0000, 0b0101, 0b0111, 0b0010, 0b0010, 0b1000, 0b0000];
        let mut buf = StateBuffer::<Bits>::new();
        let mut prev = 0u8;

        for &s in &seq {
            buf.push(present(s));
            for b in 0..4 {
                let now = s & (1 << b) != 0;
                let before = prev & (1 << b) != 0;
                assert_eq!(buf.just_pressed(b), now && !before, "press b={b} s={s:04b}");
                assert_eq!(buf.just_released(b), !now && before, "release b={b} s={s:04b}");
            }
            prev = s;
        }
    }

    #[test]
    fn disconnect_collapses_to_neutral_and_suppresses_edges() {
        let mut buf = StateBuffer::<Bits>::new();
        buf.push(present(0b11));

        buf.push(Sample::NotConnected);
        assert!(!buf.is_connected());
        assert_eq!(*buf.current(), Bits::default());
        assert_eq!(*buf.previous(), Bits::default());
        assert!(!buf.just_released(0));

        // Idempotent.
        for _ in 0..3 {
            buf.push(Sample::NotConnected);
            assert!(!buf.is_connected());
            assert!(!buf.just_pressed(0) && !buf.just_released(1));
            assert!(!buf.is_pressed(0));
        }
    }

    #[test]
    fn reconnect_with_held_button_reports_press() {
        let mut buf = StateBuffer::<Bits>::new();
        buf.push(present(0b1));
        buf.push(Sample::NotConnected);

        buf.push(present(0b1));
        assert!(buf.is_connected());
        assert!(buf.just_pressed(0));
    }

    #[test]
    fn native_failure_propagates_after_promotion() {
        let mut buf = StateBuffer::<Bits>::new();
        buf.push(present(0b1));

        let err = buf
            .poll(|| Err(InputError::native("read", 31)))
            .unwrap_err();
        assert!(matches!(err, InputError::Native { code: 31, .. }));
        assert!(buf.is_connected());
        assert_eq!(*buf.previous(), Bits(0b1));
        assert_eq!(*buf.current(), Bits(0b1));
    }

    #[test]
    fn retired_buffer_ignores_polls() {
        let mut buf = StateBuffer::<Bits>::new();
        buf.push(present(0b1));
        buf.retire();

        let mut called = false;
        buf.poll(|| {
            called = true;
            Ok(present(0b1))
        })
        .unwrap();

        assert!(!called);
        assert!(buf.is_retired());
        assert!(!buf.is_connected());
        assert_eq!(*buf.current(), Bits::default());
    }

    #[test]
    fn pushed_samples_after_retire_are_dropped() {
        let mut buf = StateBuffer::<Bits>::new();
        buf.retire();

        buf.push(present(0b1));
        assert!(!buf.is_connected());
        assert_eq!(*buf.current(), Bits::default());
        assert!(!buf.just_pressed(0));
    }

    #[test]
    fn changed_compares_whole_snapshots() {
        let mut buf = StateBuffer::<Bits>::new();
        buf.push(present(0b10));
        assert!(buf.changed());
        buf.push(present(0b10));
        assert!(!buf.changed());
    }
}
