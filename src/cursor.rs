//! Process-wide cursor visibility.
//!
//! Windows tracks cursor visibility as a display counter: `ShowCursor(TRUE)` increments it,
//! `ShowCursor(FALSE)` decrements it, and the cursor is visible while it is `>= 0`. Setting
//! a state therefore drains the counter until it crosses zero in the wanted direction.
//!
//! The last known options are cached in an atomic so every mouse session can report them
//! without another OS call.

use crate::error::Result;
use crate::state::Point;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// Cursor visibility, as `CURSORINFO::flags` reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CursorOptions {
    Hidden = 0,
    #[default]
    Showing = 1,
    /// Touch or pen input is hiding the cursor; the system will not show it.
    Suppressed = 2,
}

impl CursorOptions {
    /// Decode a `CURSORINFO::flags` value.
    pub fn from_flags(flags: u32) -> Self {
        match flags {
            0x1 => CursorOptions::Showing,
            0x2 => CursorOptions::Suppressed,
            _ => CursorOptions::Hidden,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => CursorOptions::Showing,
            2 => CursorOptions::Suppressed,
            _ => CursorOptions::Hidden,
        }
    }
}

/// Cursor position and visibility at one poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorInfo {
    pub position: Point,
    pub options: CursorOptions,
}

/// The two cursor calls the library needs.
pub trait CursorApi {
    /// `ShowCursor`: adjust the display counter and return its new value.
    fn show_cursor(&self, show: bool) -> i32;

    /// `SetCursorPos`, in screen coordinates.
    fn set_cursor_pos(&self, position: Point) -> Result<()>;
}

static OPTIONS: AtomicU8 = AtomicU8::new(CursorOptions::Showing as u8);

/// Last known cursor options.
pub fn state() -> CursorOptions {
    CursorOptions::from_u8(OPTIONS.load(Ordering::Relaxed))
}

pub(crate) fn remember(options: CursorOptions) {
    OPTIONS.store(options as u8, Ordering::Relaxed);
}

/// Show or hide the cursor. `Suppressed` cannot be requested and is treated as `Hidden`.
///
/// Returns the options now in effect.
pub fn set_state(api: &dyn CursorApi, options: CursorOptions) -> CursorOptions {
    let options = match options {
        CursorOptions::Suppressed => CursorOptions::Hidden,
        o => o,
    };

    let counter = match options {
        CursorOptions::Showing => drain(|| api.show_cursor(true), |c| c >= 0),
        _ => drain(|| api.show_cursor(false), |c| c < 0),
    };
    debug!(?options, counter, "cursor state set");

    remember(options);
    options
}

fn drain(mut step: impl FnMut() -> i32, done: impl Fn(i32) -> bool) -> i32 {
    loop {
        let counter = step();
        if done(counter) {
            return counter;
        }
    }
}

/// Move the cursor, in screen coordinates.
pub fn set_position(api: &dyn CursorApi, position: Point) -> Result<()> {
    api.set_cursor_pos(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockCursor;

    #[test]
    fn showing_drains_counter_to_zero() {
        let api = MockCursor::with_counter(-3);
        assert_eq!(set_state(&api, CursorOptions::Showing), CursorOptions::Showing);
        assert_eq!(api.counter(), 0);
        assert_eq!(api.calls(), 3);
    }

    #[test]
    fn hiding_drains_counter_below_zero() {
        let api = MockCursor::with_counter(2);
        set_state(&api, CursorOptions::Hidden);
        assert_eq!(api.counter(), -1);
    }

    #[test]
    fn suppressed_request_hides() {
        let api = MockCursor::with_counter(0);
        assert_eq!(set_state(&api, CursorOptions::Suppressed), CursorOptions::Hidden);
        assert_eq!(api.counter(), -1);
    }

    #[test]
    fn set_position_forwards_to_api() {
        let api = MockCursor::with_counter(0);
        set_position(&api, Point::new(640, 360)).unwrap();
        assert_eq!(api.position(), Point::new(640, 360));
    }

    #[test]
    fn flags_decode() {
        assert_eq!(CursorOptions::from_flags(0), CursorOptions::Hidden);
        assert_eq!(CursorOptions::from_flags(1), CursorOptions::Showing);
        assert_eq!(CursorOptions::from_flags(2), CursorOptions::Suppressed);
    }
}
