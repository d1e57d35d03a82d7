//! Raw Input device enumeration.
//!
//! [`RawInputPlatform`] is the seam between device sessions and the OS: it lists attached
//! devices, describes them, and hands out per-device state readers. The Windows backend
//! implements it over `GetRawInputDeviceList` / `GetRawInputDeviceInfoW`; tests use
//! `backends::mock` (feature `mock`).
//!
//! [`RawDevice`] is the descriptor part every keyboard and mouse session carries.

use crate::cursor::CursorInfo;
use crate::error::Result;
use crate::keyboard::KeyboardState;
use crate::metadata::{DeviceKind, DeviceMeta};
use crate::mouse::MouseButton;
use crate::state::Sample;
use std::sync::Arc;

/// Opaque OS device handle (`HANDLE` value on Windows).
pub type DeviceHandle = usize;

/// One entry of the device list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    pub handle: DeviceHandle,
    pub kind: DeviceKind,
}

/// `RID_DEVICE_INFO_MOUSE`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseInfo {
    pub id: u32,
    pub button_count: u32,
    pub sample_rate: u32,
    pub has_horizontal_wheel: bool,
}

/// `RID_DEVICE_INFO_KEYBOARD`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardInfo {
    pub kind: u32,
    pub sub_kind: u32,
    pub mode: u32,
    pub function_keys: u32,
    pub indicators: u32,
    pub total_keys: u32,
}

/// `RID_DEVICE_INFO_HID`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HidInfo {
    pub vendor_id: u32,
    pub product_id: u32,
    pub version: u32,
    pub usage_page: u16,
    pub usage: u16,
}

/// Kind-specific device information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawDeviceInfo {
    Mouse(MouseInfo),
    Keyboard(KeyboardInfo),
    Hid(HidInfo),
}

/// Reads the full key table of one keyboard.
pub trait KeyboardSource: Send {
    fn read(&mut self) -> Result<Sample<KeyboardState>>;
}

/// Reads cursor and button state for one mouse.
pub trait MouseSource: Send {
    fn cursor(&mut self) -> Result<Sample<CursorInfo>>;

    fn is_button_down(&mut self, button: MouseButton) -> bool;
}

pub trait RawInputPlatform {
    /// Attached devices, in OS order.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>>;

    fn device_info(&self, handle: DeviceHandle) -> Result<RawDeviceInfo>;

    /// Device interface path.
    fn device_name(&self, handle: DeviceHandle) -> Result<String>;

    /// Friendly name for a device path, when the platform can look one up.
    fn display_name(&self, _device_name: &str, _kind: DeviceKind) -> Option<String> {
        None
    }

    fn keyboard_source(&self, handle: DeviceHandle) -> Box<dyn KeyboardSource>;

    fn mouse_source(&self, handle: DeviceHandle) -> Box<dyn MouseSource>;
}

impl<P: RawInputPlatform + ?Sized> RawInputPlatform for Arc<P> {
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        (**self).enumerate()
    }

    fn device_info(&self, handle: DeviceHandle) -> Result<RawDeviceInfo> {
        (**self).device_info(handle)
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String> {
        (**self).device_name(handle)
    }

    fn display_name(&self, device_name: &str, kind: DeviceKind) -> Option<String> {
        (**self).display_name(device_name, kind)
    }

    fn keyboard_source(&self, handle: DeviceHandle) -> Box<dyn KeyboardSource> {
        (**self).keyboard_source(handle)
    }

    fn mouse_source(&self, handle: DeviceHandle) -> Box<dyn MouseSource> {
        (**self).mouse_source(handle)
    }
}

/// Descriptor shared by keyboard and mouse sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDevice {
    index: usize,
    handle: DeviceHandle,
    kind: DeviceKind,
    name: String,
    display_name: String,
    info: RawDeviceInfo,
}

impl RawDevice {
    /// Read name and info for `descriptor`.
    pub fn open<P: RawInputPlatform + ?Sized>(
        platform: &P,
        index: usize,
        descriptor: DeviceDescriptor,
    ) -> Result<Self> {
        let name = platform.device_name(descriptor.handle)?;
        let info = platform.device_info(descriptor.handle)?;
        let display_name = platform
            .display_name(&name, descriptor.kind)
            .unwrap_or_else(|| instance_id(&name));
        Ok(Self {
            index,
            handle: descriptor.handle,
            kind: descriptor.kind,
            name,
            display_name,
            info,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    #[inline]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Device interface path.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    pub fn info(&self) -> &RawDeviceInfo {
        &self.info
    }

    pub fn metadata(&self) -> DeviceMeta {
        let (vid, pid, usage_page, usage) = match self.info {
            RawDeviceInfo::Hid(h) => (
                u16::try_from(h.vendor_id).ok(),
                u16::try_from(h.product_id).ok(),
                Some(h.usage_page),
                Some(h.usage),
            ),
            _ => vid_pid_from_path(&self.name).map_or((None, None, None, None), |(v, p)| {
                (Some(v), Some(p), None, None)
            }),
        };
        DeviceMeta {
            kind: self.kind,
            index: Some(self.index),
            bus: Some("rawinput".into()),
            vid,
            pid,
            display_name: Some(self.display_name.clone()),
            usage_page,
            usage,
            path: Some(self.name.clone()),
            revision: None,
        }
    }
}

/// Device-instance id from an interface path:
/// `\\?\HID#VID_046D&PID_C52B&MI_00#7&1a2b&0&0000#{guid}` becomes `HID\VID_046D&PID_C52B&MI_00`.
///
/// Paths that do not have that shape are returned unchanged.
pub fn instance_id(device_name: &str) -> String {
    let trimmed = device_name
        .strip_prefix(r"\\?\")
        .or_else(|| device_name.strip_prefix(r"\??\"))
        .unwrap_or(device_name);
    let mut parts = trimmed.split('#');
    match (parts.next(), parts.next()) {
        (Some(class), Some(hardware)) if !class.is_empty() && !hardware.is_empty() => {
            format!(r"{class}\{hardware}")
        }
        _ => device_name.to_string(),
    }
}

/// `VID_xxxx` / `PID_xxxx` tokens of an interface path.
pub fn vid_pid_from_path(device_name: &str) -> Option<(u16, u16)> {
    let upper = device_name.to_ascii_uppercase();
    let hex_after = |tag: &str| {
        let start = upper.find(tag)? + tag.len();
        let digits = upper.get(start..start + 4)?;
        u16::from_str_radix(digits, 16).ok()
    };
    Some((hex_after("VID_")?, hex_after("PID_")?))
}
