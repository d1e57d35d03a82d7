//! XInput libraries loaded at runtime.
//!
//! [`SystemLibraries`] opens `xinput1_x.dll` with `LoadLibraryW` and binds the exports with
//! `GetProcAddress`. `XInputGetState`, `XInputSetState` and `XInputGetCapabilities` are
//! required; a library missing any of them is treated as absent. Every other export is
//! optional and answers `ERROR_CALL_NOT_IMPLEMENTED` when missing.
//!
//! The module handle is released when the table is dropped. The process-wide binding behind
//! [`XInput::shared`](crate::xinput::XInput::shared) is never dropped.

#![cfg(target_os = "windows")]

use crate::error::ERROR_CALL_NOT_IMPLEMENTED;
use crate::xinput::ffi::{
    RawBatteryInformation, RawCapabilities, RawKeystroke, RawState, RawVibration,
};
use crate::xinput::{Guid, LibraryProbe, NativeXInput, Revision};
use tracing::debug;
use windows_sys::Win32::Foundation::{FreeLibrary, HMODULE};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

type EnableFn = unsafe extern "system" fn(i32);
type GetStateFn = unsafe extern "system" fn(u32, *mut RawState) -> u32;
type SetStateFn = unsafe extern "system" fn(u32, *mut RawVibration) -> u32;
type GetCapabilitiesFn = unsafe extern "system" fn(u32, u32, *mut RawCapabilities) -> u32;
type GetBatteryInformationFn =
    unsafe extern "system" fn(u32, u8, *mut RawBatteryInformation) -> u32;
type GetKeystrokeFn = unsafe extern "system" fn(u32, u32, *mut RawKeystroke) -> u32;
type GetAudioDeviceIdsFn =
    unsafe extern "system" fn(u32, *mut u16, *mut u32, *mut u16, *mut u32) -> u32;
type GetDSoundAudioDeviceGuidsFn = unsafe extern "system" fn(u32, *mut Guid, *mut Guid) -> u32;

/// Probes the XInput DLLs installed on this system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLibraries;

impl LibraryProbe for SystemLibraries {
    fn open(&self, revision: Revision) -> Option<Box<dyn NativeXInput>> {
        XInputLibrary::load(revision).map(|lib| Box::new(lib) as Box<dyn NativeXInput>)
    }
}

/// Owned module handle.
struct Module(HMODULE);

// The handle is a process-wide token; the loader serializes access to it.
unsafe impl Send for Module {}
unsafe impl Sync for Module {}

impl Drop for Module {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.0);
        }
    }
}

impl Module {
    /// Look up `name` (NUL-terminated) and reinterpret it as `F`.
    ///
    /// # Safety
    /// `F` must be the `extern "system"` signature of the export.
    unsafe fn symbol<F: Copy>(&self, name: &'static [u8]) -> Option<F> {
        debug_assert_eq!(name.last(), Some(&0));
        debug_assert_eq!(
            core::mem::size_of::<F>(),
            core::mem::size_of::<unsafe extern "system" fn() -> isize>()
        );
        let proc = GetProcAddress(self.0, name.as_ptr())?;
        Some(core::mem::transmute_copy(&proc))
    }
}

/// Function table of one loaded XInput DLL.
pub struct XInputLibrary {
    get_state: GetStateFn,
    set_state: SetStateFn,
    get_capabilities: GetCapabilitiesFn,
    enable: Option<EnableFn>,
    get_battery_information: Option<GetBatteryInformationFn>,
    get_keystroke: Option<GetKeystrokeFn>,
    get_audio_device_ids: Option<GetAudioDeviceIdsFn>,
    get_dsound_audio_device_guids: Option<GetDSoundAudioDeviceGuidsFn>,
    // Dropped last: the function pointers above point into it.
    _module: Module,
}

impl XInputLibrary {
    pub fn load(revision: Revision) -> Option<Self> {
        let wide: Vec<u16> = revision
            .library_name()
            .encode_utf16()
            .chain(core::iter::once(0))
            .collect();
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            return None;
        }
        let module = Module(handle);

        unsafe {
            let (Some(get_state), Some(set_state), Some(get_capabilities)) = (
                module.symbol::<GetStateFn>(b"XInputGetState\0"),
                module.symbol::<SetStateFn>(b"XInputSetState\0"),
                module.symbol::<GetCapabilitiesFn>(b"XInputGetCapabilities\0"),
            ) else {
                debug!(%revision, "library lacks required exports");
                return None;
            };

            Some(Self {
                get_state,
                set_state,
                get_capabilities,
                enable: module.symbol(b"XInputEnable\0"),
                get_battery_information: module.symbol(b"XInputGetBatteryInformation\0"),
                get_keystroke: module.symbol(b"XInputGetKeystroke\0"),
                get_audio_device_ids: module.symbol(b"XInputGetAudioDeviceIds\0"),
                get_dsound_audio_device_guids: module
                    .symbol(b"XInputGetDSoundAudioDeviceGuids\0"),
                _module: module,
            })
        }
    }
}

impl NativeXInput for XInputLibrary {
    fn enable(&self, enable: bool) {
        if let Some(f) = self.enable {
            unsafe { f(enable as i32) }
        }
    }

    fn get_state(&self, user_index: u32, state: &mut RawState) -> u32 {
        unsafe { (self.get_state)(user_index, state) }
    }

    fn set_state(&self, user_index: u32, vibration: &mut RawVibration) -> u32 {
        unsafe { (self.set_state)(user_index, vibration) }
    }

    fn get_capabilities(&self, user_index: u32, flags: u32, caps: &mut RawCapabilities) -> u32 {
        unsafe { (self.get_capabilities)(user_index, flags, caps) }
    }

    fn get_battery_information(
        &self,
        user_index: u32,
        device_type: u8,
        info: &mut RawBatteryInformation,
    ) -> u32 {
        match self.get_battery_information {
            Some(f) => unsafe { f(user_index, device_type, info) },
            None => ERROR_CALL_NOT_IMPLEMENTED,
        }
    }

    fn get_keystroke(&self, user_index: u32, keystroke: &mut RawKeystroke) -> u32 {
        match self.get_keystroke {
            // Second argument is reserved.
            Some(f) => unsafe { f(user_index, 0, keystroke) },
            None => ERROR_CALL_NOT_IMPLEMENTED,
        }
    }

    fn get_audio_device_ids(
        &self,
        user_index: u32,
        render: &mut [u16],
        render_len: &mut u32,
        capture: &mut [u16],
        capture_len: &mut u32,
    ) -> u32 {
        *render_len = (*render_len).min(render.len() as u32);
        *capture_len = (*capture_len).min(capture.len() as u32);
        match self.get_audio_device_ids {
            Some(f) => unsafe {
                f(
                    user_index,
                    render.as_mut_ptr(),
                    render_len,
                    capture.as_mut_ptr(),
                    capture_len,
                )
            },
            None => ERROR_CALL_NOT_IMPLEMENTED,
        }
    }

    fn get_dsound_audio_device_guids(
        &self,
        user_index: u32,
        render: &mut Guid,
        capture: &mut Guid,
    ) -> u32 {
        match self.get_dsound_audio_device_guids {
            Some(f) => unsafe { f(user_index, render, capture) },
            None => ERROR_CALL_NOT_IMPLEMENTED,
        }
    }
}
