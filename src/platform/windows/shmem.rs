//! One-shot reads from a named file mapping.

use windows_sys::Win32::System::Memory::{
    MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_READ,
    MEMORY_MAPPED_VIEW_ADDRESS,
};

use super::{last_error, wide, OwnedHandle};
use crate::platform::PlatformError;

/// Unmaps the view on drop.
struct View(MEMORY_MAPPED_VIEW_ADDRESS);

impl Drop for View {
    fn drop(&mut self) {
        unsafe { UnmapViewOfFile(self.0) };
    }
}

/// Copies the first `len` bytes of the mapping called `name`.
pub(super) fn read(name: &str, len: usize) -> Result<Vec<u8>, PlatformError> {
    let name = wide(name);
    let mapping = OwnedHandle::from_raw(
        unsafe { OpenFileMappingW(FILE_MAP_READ, 0, name.as_ptr()) },
        "OpenFileMappingW",
    )?;

    let address = unsafe { MapViewOfFile(mapping.raw(), FILE_MAP_READ, 0, 0, len) };
    if address.Value.is_null() {
        return Err(last_error("MapViewOfFile"));
    }
    let view = View(address);

    // The view is at least `len` bytes: MapViewOfFile fails otherwise.
    let bytes = unsafe { std::slice::from_raw_parts(view.0.Value as *const u8, len) };
    Ok(bytes.to_vec())
}
