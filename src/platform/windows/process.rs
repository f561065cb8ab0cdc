//! Target process access with `PROCESS_QUERY_LIMITED_INFORMATION`.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows_sys::Win32::System::Threading::{
    GetCurrentProcess, IsWow64Process, OpenProcess, QueryFullProcessImageNameW,
    PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};

use super::{last_error, OwnedHandle};
use crate::platform::{Bitness, PlatformError, TargetProcess};

/// `MAX_PATH`; image paths longer than this are not expected for games.
const MAX_PATH: usize = 260;

pub struct WindowsProcess {
    handle: OwnedHandle,
}

impl WindowsProcess {
    pub(crate) fn open(process_id: u32) -> Result<Self, PlatformError> {
        let raw = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, process_id) };
        Ok(Self {
            handle: OwnedHandle::from_raw(raw, "OpenProcess")?,
        })
    }
}

impl TargetProcess for WindowsProcess {
    fn bitness(&self) -> Result<Bitness, PlatformError> {
        if !is_64bit_windows() {
            return Ok(Bitness::X86);
        }
        let mut wow64 = 0;
        if unsafe { IsWow64Process(self.handle.raw(), &mut wow64) } == 0 {
            return Err(last_error("IsWow64Process"));
        }
        Ok(if wow64 != 0 { Bitness::X86 } else { Bitness::X64 })
    }

    fn image_path(&self) -> Option<String> {
        let mut buf = [0u16; MAX_PATH];
        let mut len = buf.len() as u32;
        let ok = unsafe {
            QueryFullProcessImageNameW(
                self.handle.raw(),
                PROCESS_NAME_WIN32,
                buf.as_mut_ptr(),
                &mut len,
            )
        };
        if ok == 0 {
            log::debug!("inject: {}", last_error("QueryFullProcessImageNameW"));
            return None;
        }
        Some(
            OsString::from_wide(&buf[..len as usize])
                .to_string_lossy()
                .into_owned(),
        )
    }
}

/// A 64-bit host implies 64-bit Windows; a 32-bit host is on 64-bit Windows
/// only when it runs under WOW64 itself.
fn is_64bit_windows() -> bool {
    if cfg!(target_pointer_width = "64") {
        return true;
    }
    let mut wow64 = 0;
    unsafe { IsWow64Process(GetCurrentProcess(), &mut wow64) != 0 && wow64 != 0 }
}
