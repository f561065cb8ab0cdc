//! Top-level window lookup.

use std::ptr;

use windows_sys::Win32::Foundation::HWND;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetForegroundWindow, GetWindowThreadProcessId, IsWindow,
};

use super::{last_error, wide};
use crate::platform::{PlatformError, WindowHandle, WindowOwner};

fn to_handle(hwnd: HWND) -> Option<WindowHandle> {
    (!hwnd.is_null()).then(|| WindowHandle(hwnd as isize))
}

fn to_hwnd(window: WindowHandle) -> HWND {
    window.0 as HWND
}

pub(super) fn find_by_class(class_name: &str) -> Option<WindowHandle> {
    let class = wide(class_name);
    to_handle(unsafe { FindWindowW(class.as_ptr(), ptr::null()) })
}

pub(super) fn foreground() -> Option<WindowHandle> {
    to_handle(unsafe { GetForegroundWindow() })
}

pub(super) fn owner(window: WindowHandle) -> Result<WindowOwner, PlatformError> {
    let mut process_id = 0;
    let thread_id = unsafe { GetWindowThreadProcessId(to_hwnd(window), &mut process_id) };
    if thread_id == 0 || process_id == 0 {
        return Err(last_error("GetWindowThreadProcessId"));
    }
    Ok(WindowOwner {
        process_id,
        thread_id,
    })
}

pub(super) fn is_valid(window: WindowHandle) -> bool {
    unsafe { IsWindow(to_hwnd(window)) != 0 }
}
