//! XInput controllers.
//!
//! - [`XInput`]: the bound library (one revision per process), typed calls.
//! - [`Controller`]: one slot as a frame-polled session with edge detection.
//! - [`native`]: revisions, the raw function table and library probing.
//!
//! # Example
//! ```no_run
//! use padstate::xinput::{Controller, GamepadButton, Slot, XInput};
//! use std::time::Duration;
//!
//! let api = XInput::shared()?;
//! let mut pad = Controller::new(api, Slot::One);
//! pad.update(Duration::ZERO)?;
//! if pad.just_pressed(GamepadButton::A) {
//!     pad.set_vibration(0.5, 0.5)?;
//! }
//! # Ok::<(), padstate::InputError>(())
//! ```

mod controller;
pub mod ffi;
pub mod native;
mod resolver;
mod types;

pub use controller::Controller;
pub use native::{LibraryProbe, NativeXInput, NoLibraries, Revision};
pub use resolver::XInput;
pub use types::*;
