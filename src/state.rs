//! Device snapshots and the sources that produce them.
//!
//! Every device kind implements [`DeviceState`] for its snapshot type. A snapshot is an
//! owned value captured at one poll; [`StateBuffer`](crate::buffer::StateBuffer) keeps two
//! of them and derives edges from the difference. Native readers answer with a [`Sample`].
//!
//! `Default::default()` is the kind's **neutral** state: nothing pressed, axes at rest.

/// Snapshot of one device kind at one instant.
pub trait DeviceState: Clone + Default + PartialEq {
    /// Button or key identifier for this kind (`Key`, `MouseButton`, `GamepadButton`).
    type Button: Copy;

    /// Whether `button` was held when the snapshot was captured.
    fn is_pressed(&self, button: Self::Button) -> bool;
}

/// Outcome of one native read.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample<S> {
    /// The device answered with a fresh snapshot.
    Present(S),
    /// The device is absent this poll. Not an error.
    NotConnected,
}

impl<S> Sample<S> {
    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, Sample::Present(_))
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Sample<T> {
        match self {
            Sample::Present(s) => Sample::Present(f(s)),
            Sample::NotConnected => Sample::NotConnected,
        }
    }
}

/// Integer screen/client point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x = self.x.saturating_add(rhs.x);
        self.y = self.y.saturating_add(rhs.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_map_keeps_not_connected() {
        let s: Sample<u8> = Sample::NotConnected;
        assert_eq!(s.map(|v| v as u16 + 1), Sample::NotConnected);
        assert_eq!(Sample::Present(2u8).map(|v| v * 2), Sample::Present(4));
    }

    #[test]
    fn point_accumulates_saturating() {
        let mut p = Point::new(i32::MAX - 1, 3);
        p += Point::new(5, -4);
        assert_eq!(p, Point::new(i32::MAX, -1));
    }
}
