//! Named auto-reset events shared with the injected agent.

use std::ptr;

use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_FILE_NOT_FOUND, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::System::Threading::{
    CreateEventW, OpenEventW, SetEvent, WaitForSingleObject, EVENT_ALL_ACCESS,
};

use super::{last_error, wide, OwnedHandle};
use crate::platform::{PlatformError, SyncEvent};

pub struct WindowsEvent {
    handle: OwnedHandle,
}

impl WindowsEvent {
    /// Opens an existing event. `Ok(None)` if no object has that name.
    pub(crate) fn open(name: &str) -> Result<Option<Self>, PlatformError> {
        let name = wide(name);
        let raw = unsafe { OpenEventW(EVENT_ALL_ACCESS, 0, name.as_ptr()) };
        if raw.is_null() {
            let code = unsafe { GetLastError() };
            if code == ERROR_FILE_NOT_FOUND {
                return Ok(None);
            }
            return Err(PlatformError::Os {
                call: "OpenEventW",
                code,
            });
        }
        Ok(Some(Self {
            handle: OwnedHandle::from_raw(raw, "OpenEventW")?,
        }))
    }

    /// Opens the event, creating it auto-reset and unsignaled if absent.
    pub(crate) fn open_or_create(name: &str) -> Result<Self, PlatformError> {
        if let Some(event) = Self::open(name)? {
            return Ok(event);
        }
        let name = wide(name);
        let raw = unsafe { CreateEventW(ptr::null(), 0, 0, name.as_ptr()) };
        Ok(Self {
            handle: OwnedHandle::from_raw(raw, "CreateEventW")?,
        })
    }
}

impl SyncEvent for WindowsEvent {
    fn signal(&self) -> Result<(), PlatformError> {
        if unsafe { SetEvent(self.handle.raw()) } == 0 {
            return Err(last_error("SetEvent"));
        }
        Ok(())
    }

    fn poll(&self) -> Result<bool, PlatformError> {
        match unsafe { WaitForSingleObject(self.handle.raw(), 0) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(last_error("WaitForSingleObject")),
        }
    }
}
