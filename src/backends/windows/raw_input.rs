//! Windows Raw Input platform (keyboard + mouse).
//!
//! [`WindowsRawInput`] enumerates devices with `GetRawInputDeviceList` and describes them
//! with `GetRawInputDeviceInfoW`. State readers use the thread key table
//! (`GetKeyboardState`), `GetCursorInfo` and `GetAsyncKeyState`; a device counts as
//! disconnected once its handle stops answering `GetRawInputDeviceInfoW`.
//!
//! ## What you get
//! - Device list, interface paths, per-kind device info
//! - Friendly names from the HID product string (feature `hid`)
//! - A `WM_INPUT` parser for relative mouse motion and wheel deltas, to feed
//!   [`Mouse::add_motion`] / [`Mouse::add_wheel`] from the host's message loop
//!
//! ## What you **don't** get
//! - No message loop and no `RegisterRawInputDevices`; the host owns its window.
//! - Windows keeps one key table per thread, so all keyboards report the same keys.
//!
//! ## Conventions
//! - Mouse deltas are reported in **raw OS units** (counts) as provided by Raw Input.
//! - Wheel deltas are reported in **raw WHEEL_DELTA units** (typically ±120 per notch).

#![cfg(target_os = "windows")]

use crate::cursor::{CursorApi, CursorInfo, CursorOptions};
use crate::error::{InputError, Result};
use crate::keyboard::KeyboardState;
use crate::metadata::DeviceKind;
use crate::mouse::{Mouse, MouseButton};
use crate::raw::{
    DeviceDescriptor, DeviceHandle, HidInfo, KeyboardInfo, KeyboardSource, MouseInfo,
    MouseSource, RawDeviceInfo, RawInputPlatform,
};
use crate::state::{Point, Sample};
use core::ffi::c_void;
use core::mem::size_of;
use tracing::trace;
use windows_sys::Win32::Foundation::{GetLastError, HANDLE};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, GetKeyboardState};
use windows_sys::Win32::UI::Input::*;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetCursorInfo, SetCursorPos, ShowCursor, CURSORINFO,
};

#[cfg(feature = "hid")]
use std::sync::OnceLock;

// Local constants (avoid relying on module exports that vary by windows-sys version)
const RI_MOUSE_WHEEL: u16 = 0x0400;
const RI_MOUSE_HWHEEL: u16 = 0x0800;

#[inline]
fn to_handle(handle: DeviceHandle) -> HANDLE {
    handle as HANDLE
}

fn last_error(operation: &'static str) -> InputError {
    InputError::native(operation, unsafe { GetLastError() })
}

/// Raw Input device interface path for a given `hDevice` (RIDI_DEVICENAME).
pub(crate) fn device_name(hdev: HANDLE) -> Option<String> {
    unsafe {
        // Query required size (in WCHARs, including NUL).
        let mut size: u32 = 0;
        let r0 = GetRawInputDeviceInfoW(hdev, RIDI_DEVICENAME, core::ptr::null_mut(), &mut size);
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        let mut wide: Vec<u16> = vec![0u16; size as usize];
        let r1 = GetRawInputDeviceInfoW(
            hdev,
            RIDI_DEVICENAME,
            wide.as_mut_ptr() as *mut c_void,
            &mut size,
        );
        if r1 == u32::MAX {
            return None;
        }

        while wide.last() == Some(&0) {
            wide.pop();
        }
        Some(String::from_utf16_lossy(&wide))
    }
}

fn device_info(hdev: HANDLE) -> Option<RID_DEVICE_INFO> {
    unsafe {
        let mut info: RID_DEVICE_INFO = core::mem::zeroed();
        info.cbSize = size_of::<RID_DEVICE_INFO>() as u32;
        let mut size = info.cbSize;
        let r = GetRawInputDeviceInfoW(
            hdev,
            RIDI_DEVICEINFO,
            &mut info as *mut RID_DEVICE_INFO as *mut c_void,
            &mut size,
        );
        (r != u32::MAX).then_some(info)
    }
}

/// Raw Input backed [`RawInputPlatform`].
#[derive(Default)]
pub struct WindowsRawInput {
    /// `(instance key, product string)` for every HID interface, read once.
    #[cfg(feature = "hid")]
    products: OnceLock<Vec<(String, String)>>,
}

impl WindowsRawInput {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "hid")]
    fn products(&self) -> &[(String, String)] {
        self.products.get_or_init(|| {
            let api = match hidapi::HidApi::new() {
                Ok(api) => api,
                Err(e) => {
                    tracing::debug!(error = %e, "hidapi unavailable; no product strings");
                    return Vec::new();
                }
            };
            api.device_list()
                .filter_map(|info| {
                    let product = info.product_string()?.trim();
                    if product.is_empty() {
                        return None;
                    }
                    let path = info.path().to_string_lossy();
                    Some((instance_key(&path), product.to_string()))
                })
                .collect()
        })
    }
}

/// Interface path without its trailing interface-class GUID, lowercased.
///
/// Raw Input and hidapi report different interface classes for the same device instance.
#[cfg(feature = "hid")]
fn instance_key(path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    match lower.rfind('#') {
        Some(i) => lower[..i].to_string(),
        None => lower,
    }
}

impl RawInputPlatform for WindowsRawInput {
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        let entry = size_of::<RAWINPUTDEVICELIST>() as u32;
        let mut count: u32 = 0;
        if unsafe { GetRawInputDeviceList(core::ptr::null_mut(), &mut count, entry) } == u32::MAX {
            return Err(last_error("GetRawInputDeviceList"));
        }

        let mut list: Vec<RAWINPUTDEVICELIST> =
            vec![unsafe { core::mem::zeroed() }; count as usize];
        let written = unsafe { GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry) };
        if written == u32::MAX {
            return Err(last_error("GetRawInputDeviceList"));
        }
        list.truncate(written as usize);

        let devices: Vec<_> = list
            .iter()
            .map(|d| DeviceDescriptor {
                handle: d.hDevice as DeviceHandle,
                kind: match d.dwType {
                    RIM_TYPEMOUSE => DeviceKind::Mouse,
                    RIM_TYPEKEYBOARD => DeviceKind::Keyboard,
                    _ => DeviceKind::Hid,
                },
            })
            .collect();
        trace!(count = devices.len(), "raw input devices");
        Ok(devices)
    }

    fn device_info(&self, handle: DeviceHandle) -> Result<RawDeviceInfo> {
        let info = device_info(to_handle(handle))
            .ok_or_else(|| last_error("GetRawInputDeviceInfoW"))?;
        // SAFETY: dwType selects the initialised union member.
        Ok(unsafe {
            match info.dwType {
                RIM_TYPEMOUSE => {
                    let m = info.Anonymous.mouse;
                    RawDeviceInfo::Mouse(MouseInfo {
                        id: m.dwId,
                        button_count: m.dwNumberOfButtons,
                        sample_rate: m.dwSampleRate,
                        has_horizontal_wheel: m.fHasHorizontalWheel != 0,
                    })
                }
                RIM_TYPEKEYBOARD => {
                    let k = info.Anonymous.keyboard;
                    RawDeviceInfo::Keyboard(KeyboardInfo {
                        kind: k.dwType,
                        sub_kind: k.dwSubType,
                        mode: k.dwKeyboardMode,
                        function_keys: k.dwNumberOfFunctionKeys,
                        indicators: k.dwNumberOfIndicators,
                        total_keys: k.dwNumberOfKeysTotal,
                    })
                }
                _ => {
                    let h = info.Anonymous.hid;
                    RawDeviceInfo::Hid(HidInfo {
                        vendor_id: h.dwVendorId,
                        product_id: h.dwProductId,
                        version: h.dwVersionNumber,
                        usage_page: h.usUsagePage,
                        usage: h.usUsage,
                    })
                }
            }
        })
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String> {
        device_name(to_handle(handle)).ok_or_else(|| last_error("GetRawInputDeviceInfoW"))
    }

    #[cfg(feature = "hid")]
    fn display_name(&self, device_name: &str, _kind: DeviceKind) -> Option<String> {
        let key = instance_key(device_name);
        self.products()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, product)| product.clone())
    }

    fn keyboard_source(&self, handle: DeviceHandle) -> Box<dyn KeyboardSource> {
        Box::new(SystemSource { handle })
    }

    fn mouse_source(&self, handle: DeviceHandle) -> Box<dyn MouseSource> {
        Box::new(SystemSource { handle })
    }
}

/// State reader for one Raw Input device.
struct SystemSource {
    handle: DeviceHandle,
}

impl SystemSource {
    fn present(&self) -> bool {
        device_info(to_handle(self.handle)).is_some()
    }
}

impl KeyboardSource for SystemSource {
    fn read(&mut self) -> Result<Sample<KeyboardState>> {
        if !self.present() {
            return Ok(Sample::NotConnected);
        }
        let mut table = [0u8; 256];
        if unsafe { GetKeyboardState(table.as_mut_ptr()) } == 0 {
            return Err(last_error("GetKeyboardState"));
        }
        Ok(Sample::Present(KeyboardState::from_key_table(&table)))
    }
}

impl MouseSource for SystemSource {
    fn cursor(&mut self) -> Result<Sample<CursorInfo>> {
        if !self.present() {
            return Ok(Sample::NotConnected);
        }
        let mut info: CURSORINFO = unsafe { core::mem::zeroed() };
        info.cbSize = size_of::<CURSORINFO>() as u32;
        if unsafe { GetCursorInfo(&mut info) } == 0 {
            return Err(last_error("GetCursorInfo"));
        }
        Ok(Sample::Present(CursorInfo {
            position: Point::new(info.ptScreenPos.x, info.ptScreenPos.y),
            options: CursorOptions::from_flags(info.flags),
        }))
    }

    fn is_button_down(&mut self, button: MouseButton) -> bool {
        let state = unsafe { GetAsyncKeyState(button.virtual_key() as i32) } as u16;
        state & 0x8000 != 0
    }
}

/// `ShowCursor` / `SetCursorPos`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowsCursor;

impl CursorApi for WindowsCursor {
    fn show_cursor(&self, show: bool) -> i32 {
        unsafe { ShowCursor(show as i32) }
    }

    fn set_cursor_pos(&self, position: Point) -> Result<()> {
        if unsafe { SetCursorPos(position.x, position.y) } == 0 {
            return Err(last_error("SetCursorPos"));
        }
        Ok(())
    }
}

/// Relative mouse packet from `WM_INPUT`.
#[derive(Clone, Copy, Debug)]
pub struct RawMousePacket {
    /// Raw Input device handle that produced the event.
    pub device: DeviceHandle,
    /// Relative delta X (raw counts).
    pub dx: i32,
    /// Relative delta Y (raw counts).
    pub dy: i32,
    /// Vertical wheel delta (typically ±120 per detent when present).
    pub wheel_delta: i16,
    /// Horizontal wheel delta (typically ±120 per detent when present).
    pub hwheel_delta: i16,
}

impl RawMousePacket {
    /// Add this packet's motion and wheel to the mouse it came from.
    ///
    /// Returns `false` when no mouse in `mice` has the packet's handle.
    pub fn forward(&self, mice: &mut [Mouse]) -> bool {
        let Some(mouse) = mice.iter_mut().find(|m| m.handle() == self.device) else {
            return false;
        };
        mouse.add_motion(self.dx, self.dy);
        if self.wheel_delta != 0 {
            mouse.add_wheel(self.wheel_delta as i32);
        }
        true
    }
}

/// Parse a `WM_INPUT` lparam into a mouse packet (if it carries one).
pub fn read_wm_input(lparam: isize) -> Option<RawMousePacket> {
    unsafe {
        // Query size
        let mut size: u32 = 0;
        let r0 = GetRawInputData(
            lparam as _,
            RID_INPUT,
            core::ptr::null_mut(),
            &mut size,
            size_of::<RAWINPUTHEADER>() as u32,
        );
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        // Read buffer
        let mut buf = vec![0u8; size as usize];
        let r1 = GetRawInputData(
            lparam as _,
            RID_INPUT,
            buf.as_mut_ptr() as *mut c_void,
            &mut size,
            size_of::<RAWINPUTHEADER>() as u32,
        );
        if r1 == u32::MAX {
            return None;
        }

        read_raw_input_bytes(&buf)
    }
}

/// Parse a raw `RID_INPUT` payload (bytes returned by `GetRawInputData`). Safe to call
/// later, as long as the bytes were copied during `WM_INPUT`.
pub fn read_raw_input_bytes(buf: &[u8]) -> Option<RawMousePacket> {
    let hdr_sz = size_of::<RAWINPUTHEADER>();
    if buf.len() < hdr_sz + size_of::<RAWMOUSE>() {
        return None;
    }

    unsafe {
        let hdr: RAWINPUTHEADER = core::ptr::read_unaligned(buf.as_ptr() as *const RAWINPUTHEADER);
        if hdr.dwType != RIM_TYPEMOUSE {
            return None;
        }
        let m: RAWMOUSE = core::ptr::read_unaligned(buf.as_ptr().add(hdr_sz) as *const RAWMOUSE);

        let flags: u16 = m.Anonymous.Anonymous.usButtonFlags;
        let data: u16 = m.Anonymous.Anonymous.usButtonData;

        Some(RawMousePacket {
            device: hdr.hDevice as DeviceHandle,
            dx: m.lLastX,
            dy: m.lLastY,
            wheel_delta: if flags & RI_MOUSE_WHEEL != 0 { data as i16 } else { 0 },
            hwheel_delta: if flags & RI_MOUSE_HWHEEL != 0 { data as i16 } else { 0 },
        })
    }
}
