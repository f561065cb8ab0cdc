//! Windows platform backend.
//!
//! Windows are found with `FindWindowW`, named events are Win32 events,
//! the descriptor is read through `OpenFileMappingW`/`MapViewOfFile`, and the
//! inject helper is started with `std::process::Command`.
//!
//! Every raw handle is wrapped in `OwnedHandle`, which closes it on drop.

mod event;
mod process;
mod shmem;
mod window;

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::process::{Child, Command};

use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE};

pub use event::WindowsEvent;
pub use process::WindowsProcess;

use crate::inject::InjectionRequest;
use crate::platform::{Platform, PlatformError, WindowHandle, WindowOwner};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// A kernel handle closed on drop. Never holds a null handle.
pub(crate) struct OwnedHandle(HANDLE);

impl OwnedHandle {
    /// Wraps `handle`, or reports `call` with the thread's last error if null.
    pub(crate) fn from_raw(handle: HANDLE, call: &'static str) -> Result<Self, PlatformError> {
        if handle.is_null() {
            Err(last_error(call))
        } else {
            Ok(Self(handle))
        }
    }

    pub(crate) fn raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

/// Builds a `PlatformError` from `GetLastError`.
pub(crate) fn last_error(call: &'static str) -> PlatformError {
    let code = unsafe { GetLastError() };
    PlatformError::Os { call, code }
}

/// NUL-terminated UTF-16 copy of `s`.
pub(crate) fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}

// ---------------------------------------------------------------------------
// Platform impl
// ---------------------------------------------------------------------------

/// The live Win32 platform.
#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        WindowsPlatform
    }
}

impl Platform for WindowsPlatform {
    type Event = WindowsEvent;
    type Process = WindowsProcess;
    type Helper = Child;

    fn find_window(&self, class_name: &str) -> Option<WindowHandle> {
        window::find_by_class(class_name)
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        window::foreground()
    }

    fn window_owner(&self, window: WindowHandle) -> Result<WindowOwner, PlatformError> {
        window::owner(window)
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        window::is_valid(window)
    }

    fn open_process(&self, process_id: u32) -> Result<WindowsProcess, PlatformError> {
        WindowsProcess::open(process_id)
    }

    fn open_event(&self, name: &str) -> Result<Option<WindowsEvent>, PlatformError> {
        WindowsEvent::open(name)
    }

    fn create_event(&self, name: &str) -> Result<WindowsEvent, PlatformError> {
        WindowsEvent::open_or_create(name)
    }

    fn read_shared_memory(&self, name: &str, len: usize) -> Result<Vec<u8>, PlatformError> {
        shmem::read(name, len)
    }

    fn spawn_helper(&self, request: &InjectionRequest) -> Result<Child, PlatformError> {
        let child = Command::new(&request.helper)
            .args(&request.args)
            .current_dir(&request.working_dir)
            .spawn()?;
        Ok(child)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
