//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of a device suitable
//! for UI display, logging, and persistence. Backends populate what they know;
//! unknown fields remain `None`.
//!
//! # Conventions
//! - `bus` is a short bus hint: `"rawinput"` for keyboards and mice, `"xinput"` for controllers.
//! - `display_name` is the friendliest name available (HID product string, then the
//!   device-instance id derived from `path`).
//! - `path` is the Raw Input device interface path (opaque string) useful for diagnostics.
//! - HID-specific fields (`vid`, `pid`, `usage_page`, `usage`) are filled when the platform
//!   reports the device as HID.
//!
//! ## Persistence notes
//! - `vid`/`pid` are generally stable and useful for re-identification.
//! - `path` may change across ports, drivers, and reconnects; treat it as diagnostic first,
//!   identity second. Controllers have no path; their identity is the slot index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level device class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    /// Raw Input device that is neither a keyboard nor a mouse.
    #[default]
    Hid,
    Controller,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Keyboard => "keyboard",
            DeviceKind::Mouse => "mouse",
            DeviceKind::Hid => "hid",
            DeviceKind::Controller => "controller",
        })
    }
}

/// Snapshot of metadata describing a single device.
///
/// All fields except `kind` are optional; populate what is known on the current platform.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMeta {
    pub kind: DeviceKind,

    /// Discovery index (keyboards, mice) or slot index (controllers).
    pub index: Option<usize>,

    /// Bus classification (`"rawinput"`, `"xinput"`).
    pub bus: Option<String>,

    /// USB Vendor ID (VID), if known.
    pub vid: Option<u16>,

    /// USB Product ID (PID), if known.
    pub pid: Option<u16>,

    /// Human-readable name.
    pub display_name: Option<String>,

    /// HID Usage Page (e.g., `0x01` for Generic Desktop), if known.
    pub usage_page: Option<u16>,

    /// HID Usage within the page, if known.
    pub usage: Option<u16>,

    /// OS device interface path.
    pub path: Option<String>,

    /// Bound XInput revision (`"1.4"`), controllers only.
    pub revision: Option<String>,
}

impl fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(i) = self.index {
            write!(f, "#{i}")?;
        }
        if let Some(name) = &self.display_name {
            write!(f, " \"{name}\"")?;
        }
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, " [{vid:04X}:{pid:04X}]")?;
        }
        Ok(())
    }
}
