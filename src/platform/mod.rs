//! Platform abstraction layer.
//!
//! Defines the `Platform` trait and the handle traits the capture engine talks
//! to. The engine never calls the OS directly; it only sees window handles,
//! named synchronization events, target processes and helper processes through
//! these traits.
//!
//! The Windows implementation lives in `windows`. The scripted test platform
//! lives in `fake` and is only compiled for unit tests.

#[cfg(test)]
pub(crate) mod fake;
#[cfg(target_os = "windows")]
pub mod windows;

use std::fmt;

use crate::inject::InjectionRequest;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by the platform layer.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// An OS call failed; `code` is the value of `GetLastError` (or errno).
    #[error("{call} failed, error code = {code}")]
    Os { call: &'static str, code: u32 },

    /// Launching or waiting on a helper process failed.
    #[error("helper process: {0}")]
    Io(#[from] std::io::Error),

    /// The platform cannot provide this facility at all.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Opaque top-level window handle.
///
/// Stored as `isize` so it is `Copy + Send` regardless of how the OS bindings
/// represent `HWND`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Process and thread that own a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOwner {
    pub process_id: u32,
    pub thread_id: u32,
}

/// Pointer width of a target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitness {
    X86,
    X64,
}

// ---------------------------------------------------------------------------
// Handle traits
// ---------------------------------------------------------------------------

/// A named, auto-reset kernel event shared with the injected agent.
///
/// Dropping the value closes the handle.
pub trait SyncEvent {
    /// Sets the event. Fire-and-forget: nothing waits for the other side.
    fn signal(&self) -> Result<(), PlatformError>;

    /// Zero-timeout wait. Returns `true` if the event was signaled (and, being
    /// auto-reset, has now been consumed).
    fn poll(&self) -> Result<bool, PlatformError>;
}

/// A target process opened with limited query access.
///
/// Dropping the value closes the handle.
pub trait TargetProcess {
    /// Pointer width of the process, via the WOW64 compatibility query.
    fn bitness(&self) -> Result<Bitness, PlatformError>;

    /// Full path of the process image, if it can be queried.
    fn image_path(&self) -> Option<String>;
}

/// A launched inject helper.
pub trait HelperProcess {
    /// Non-blocking exit check: `Some(code)` once the helper has terminated.
    fn try_exit_code(&mut self) -> Result<Option<i32>, PlatformError>;

    /// Blocks until the helper terminates and returns its exit code.
    fn wait_exit_code(&mut self) -> Result<i32, PlatformError>;
}

impl HelperProcess for std::process::Child {
    fn try_exit_code(&mut self) -> Result<Option<i32>, PlatformError> {
        // A helper killed without an exit code counts as a failure.
        Ok(self.try_wait()?.map(|status| status.code().unwrap_or(-1)))
    }

    fn wait_exit_code(&mut self) -> Result<i32, PlatformError> {
        Ok(self.wait()?.code().unwrap_or(-1))
    }
}

// ---------------------------------------------------------------------------
// Platform trait
// ---------------------------------------------------------------------------

/// Everything the capture engine needs from the operating system.
pub trait Platform {
    type Event: SyncEvent;
    type Process: TargetProcess;
    type Helper: HelperProcess;

    /// Looks up a top-level window by class name.
    fn find_window(&self, class_name: &str) -> Option<WindowHandle>;

    /// The window the user is currently working in.
    fn foreground_window(&self) -> Option<WindowHandle>;

    /// Resolves the process and thread that created `window`.
    fn window_owner(&self, window: WindowHandle) -> Result<WindowOwner, PlatformError>;

    /// Whether `window` still identifies an existing window.
    fn is_window(&self, window: WindowHandle) -> bool;

    /// Opens `process_id` for limited query access.
    fn open_process(&self, process_id: u32) -> Result<Self::Process, PlatformError>;

    /// Opens an existing named event. `Ok(None)` means no such event exists.
    fn open_event(&self, name: &str) -> Result<Option<Self::Event>, PlatformError>;

    /// Opens a named event, creating it (auto-reset, unsignaled) if absent.
    fn create_event(&self, name: &str) -> Result<Self::Event, PlatformError>;

    /// Copies the first `len` bytes of a named shared-memory segment.
    fn read_shared_memory(&self, name: &str, len: usize) -> Result<Vec<u8>, PlatformError>;

    /// Launches the inject helper described by `request`.
    fn spawn_helper(&self, request: &InjectionRequest) -> Result<Self::Helper, PlatformError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
