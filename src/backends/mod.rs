//! Platform backends.
//!
//! Implementations of the collaborator traits ([`RawInputPlatform`](crate::raw::RawInputPlatform),
//! [`LibraryProbe`](crate::xinput::LibraryProbe), [`CursorApi`](crate::cursor::CursorApi))
//! for real and in-memory input sources.
//!
//! # Feature flags
//! - **`hid`**: HID product strings as device display names on Windows (default).
//! - **`mock`**: the in-memory `mock` backends, for tests and headless hosts.
//!
//! On other platforms [`system_probe`] finds no XInput.

use crate::xinput::LibraryProbe;

#[cfg(any(test, feature = "mock"))]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

/// Library probe for the current platform.
pub fn system_probe() -> Box<dyn LibraryProbe> {
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::SystemLibraries)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(crate::xinput::NoLibraries)
    }
}
