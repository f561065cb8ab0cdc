//! Live state of one capture attempt.

use crate::backend::ActiveBackend;
use crate::host::AdvisoryId;
use crate::platform::WindowHandle;
use crate::sync::SyncEventSet;

/// Externally visible phase of a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing targeted; waiting for the next poll or hotkey.
    Idle,
    /// An asynchronous inject helper is still running.
    Injecting,
    /// The agent is running; waiting for CaptureReady.
    AwaitingReady,
    /// A backend is live.
    Capturing,
    /// Injection failed; automatic retries are suspended.
    Error,
}

/// Per-session fields, reset wholesale by teardown.
pub(crate) struct CaptureSession<E> {
    /// Window found by the last acquisition.
    pub target: Option<WindowHandle>,
    /// Window the agent reports capturing; watched for validity.
    pub capture_window: Option<WindowHandle>,
    pub process_id: u32,
    pub thread_id: u32,
    pub flip: bool,
    /// The agent is (believed to be) running and will signal CaptureReady.
    pub capturing: bool,
    /// Sticky injection failure.
    pub error: bool,
    /// Ticks spent waiting for CaptureReady.
    pub stall_ticks: u32,
    /// Seconds spent waiting for CaptureReady.
    pub stall_secs: f32,
    /// Seconds since the last class-name poll. Starts negative so the first
    /// poll after teardown happens one interval plus one tick later.
    pub check_interval: f32,
    pub advisory: Option<AdvisoryId>,
    pub events: SyncEventSet<E>,
    pub backend: Option<ActiveBackend>,
}

impl<E> Default for CaptureSession<E> {
    fn default() -> Self {
        Self {
            target: None,
            capture_window: None,
            process_id: 0,
            thread_id: 0,
            flip: false,
            capturing: false,
            error: false,
            stall_ticks: 0,
            stall_secs: 0.0,
            check_interval: -1.0,
            advisory: None,
            events: SyncEventSet::default(),
            backend: None,
        }
    }
}

impl<E> CaptureSession<E> {
    /// Marks the agent running and restarts the stall watchdog.
    pub fn mark_capturing(&mut self) {
        self.capturing = true;
        self.stall_ticks = 0;
        self.stall_secs = 0.0;
    }
}
