#![cfg(target_os = "windows")]

//! Windows backends.
//!
//! - **Raw Input** device enumeration, keyboard/mouse state readers and the cursor API
//! - **XInput** libraries loaded at runtime, newest revision first
//! - **HID** product strings for friendly device names (feature `hid`)
//!
//! Most users should not interact with these modules directly. Prefer the high-level API:
//! - [`XInput::shared`](crate::xinput::XInput::shared) binds [`SystemLibraries`]
//! - [`DeviceRegistry`](crate::registry::DeviceRegistry) over [`WindowsRawInput`] for
//!   keyboards and mice
//!
//! The `WM_INPUT` parser is exposed for host applications that own the Win32 message loop
//! and want to forward relative mouse motion into their [`Mouse`](crate::mouse::Mouse)
//! sessions.

pub mod raw_input;
pub mod xinput;

pub use raw_input::{
    read_raw_input_bytes, read_wm_input, RawMousePacket, WindowsCursor, WindowsRawInput,
};
pub use xinput::{SystemLibraries, XInputLibrary};
