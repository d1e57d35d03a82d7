//! Frame-polled input state for keyboards, mice and XInput controllers.
//!
//! Every device keeps two snapshots (previous and current) in a [`StateBuffer`]; call
//! `update` once per frame and ask for `is_pressed`, `just_pressed` or `just_released`.
//! Disconnected devices read as neutral instead of failing.
//!
//! ```no_run
//! use padstate::xinput::{Controller, GamepadButton, XInput};
//! use padstate::{DeviceRegistry, Result};
//! use std::time::Duration;
//!
//! fn frame(pads: &mut DeviceRegistry<Controller, std::sync::Arc<XInput>>, t: Duration) -> Result<()> {
//!     pads.update(t)?;
//!     if let Some(pad) = pads.default_device()? {
//!         if pad.just_pressed(GamepadButton::Start) {
//!             pad.set_vibration(0.2, 0.2)?;
//!         }
//!     }
//!     Ok(())
//! }
//!
//! let mut pads = DeviceRegistry::new(XInput::shared()?);
//! frame(&mut pads, Duration::ZERO)?;
//! # Ok::<(), padstate::InputError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod buffer;
pub mod config;
pub mod cursor;
pub mod device;
pub mod error;
pub mod keyboard;
pub mod metadata;
pub mod mouse;
pub mod raw;
pub mod registry;
pub mod state;
pub mod vibration;
pub mod xinput;

pub use buffer::StateBuffer;
pub use config::Config;
pub use device::Device;
pub use error::{InputError, Result};
pub use keyboard::{Key, Keyboard, KeyboardState};
pub use metadata::{DeviceKind, DeviceMeta};
pub use mouse::{Mouse, MouseButton, MouseState};
pub use registry::{DeviceRegistry, Discover};
pub use state::{DeviceState, Point, Sample};
pub use vibration::{Vibration, VibrationEffect, VibrationSequence};
