//! Named synchronization events shared with the injected agent.
//!
//! Every event name is `<purpose tag><decimal process id>`. The tags below are
//! the wire contract with the agent and must match it byte for byte.
//!
//! `SyncEventSet` owns the handles for one capture session. Handles are opened
//! lazily as the session progresses and are all closed together by `close()`
//! (or on drop). Closing an empty set is a no-op.

use crate::platform::{Platform, PlatformError, SyncEvent};

/// Engine -> agent: (re)begin producing frames.
pub const RESTART_CAPTURE_TAG: &str = "OBS_RestartCapture";
/// Engine -> agent: stop and release resources.
pub const END_CAPTURE_TAG: &str = "OBS_EndCapture";
/// Agent -> engine: the capture descriptor is valid.
pub const CAPTURE_READY_TAG: &str = "OBS_CaptureReady";
/// Agent -> engine: the target process is terminating.
pub const APP_EXIT_TAG: &str = "OBS_AppExit";
/// Host liveness object the agent polls for.
pub const HOST_ALIVE_TAG: &str = "OBS_KeepAlive";

/// Builds the name of a process-scoped object.
pub fn event_name(tag: &str, process_id: u32) -> String {
    format!("{tag}{process_id}")
}

/// The named events of one capture session.
pub struct SyncEventSet<E> {
    restart: Option<E>,
    end: Option<E>,
    ready: Option<E>,
    exit: Option<E>,
    host_alive: Option<E>,
}

impl<E> Default for SyncEventSet<E> {
    fn default() -> Self {
        Self {
            restart: None,
            end: None,
            ready: None,
            exit: None,
            host_alive: None,
        }
    }
}

impl<E: SyncEvent> SyncEventSet<E> {
    /// Opens the agent's restart event if the agent already created it.
    ///
    /// A resident agent owns this event, so its existence is how an already
    /// hooked process is detected.
    pub fn open_restart<P>(&mut self, platform: &P, process_id: u32) -> Result<bool, PlatformError>
    where
        P: Platform<Event = E>,
    {
        self.restart = platform.open_event(&event_name(RESTART_CAPTURE_TAG, process_id))?;
        Ok(self.restart.is_some())
    }

    /// Creates the host liveness event, replacing any previous one.
    pub fn create_host_alive<P>(&mut self, platform: &P, process_id: u32) -> Result<(), PlatformError>
    where
        P: Platform<Event = E>,
    {
        self.host_alive = None;
        self.host_alive = Some(platform.create_event(&event_name(HOST_ALIVE_TAG, process_id))?);
        Ok(())
    }

    /// Drops the host liveness event after a failed injection attempt.
    pub fn release_host_alive(&mut self) {
        self.host_alive = None;
    }

    /// Opens or creates the ready event if it is not held yet.
    pub fn ensure_ready<P>(&mut self, platform: &P, process_id: u32) -> Result<(), PlatformError>
    where
        P: Platform<Event = E>,
    {
        ensure(&mut self.ready, platform, CAPTURE_READY_TAG, process_id)
    }

    /// Opens or creates the restart, end, ready and exit events.
    ///
    /// Stops at the first failure; events opened before it stay held.
    pub fn ensure_all<P>(&mut self, platform: &P, process_id: u32) -> Result<(), PlatformError>
    where
        P: Platform<Event = E>,
    {
        ensure(&mut self.restart, platform, RESTART_CAPTURE_TAG, process_id)?;
        ensure(&mut self.end, platform, END_CAPTURE_TAG, process_id)?;
        ensure(&mut self.ready, platform, CAPTURE_READY_TAG, process_id)?;
        ensure(&mut self.exit, platform, APP_EXIT_TAG, process_id)
    }

    /// Asks the agent to (re)start producing frames.
    pub fn signal_restart(&self) -> Result<(), PlatformError> {
        signal(self.restart.as_ref())
    }

    /// Asks the agent to stop. Does nothing if the end event was never opened.
    pub fn signal_end(&self) -> Result<(), PlatformError> {
        signal(self.end.as_ref())
    }

    /// Zero-timeout check of the ready event.
    pub fn poll_ready(&self) -> bool {
        poll(self.ready.as_ref(), CAPTURE_READY_TAG)
    }

    /// Zero-timeout check of the exit event.
    pub fn poll_exit(&self) -> bool {
        poll(self.exit.as_ref(), APP_EXIT_TAG)
    }

    pub fn has_ready(&self) -> bool {
        self.ready.is_some()
    }

    /// True when no handle is held.
    pub fn is_empty(&self) -> bool {
        self.restart.is_none()
            && self.end.is_none()
            && self.ready.is_none()
            && self.exit.is_none()
            && self.host_alive.is_none()
    }

    /// Closes every held handle.
    pub fn close(&mut self) {
        *self = Self::default();
    }
}

fn ensure<P: Platform>(
    slot: &mut Option<P::Event>,
    platform: &P,
    tag: &str,
    process_id: u32,
) -> Result<(), PlatformError> {
    if slot.is_none() {
        *slot = Some(platform.create_event(&event_name(tag, process_id))?);
    }
    Ok(())
}

fn signal<E: SyncEvent>(event: Option<&E>) -> Result<(), PlatformError> {
    match event {
        Some(event) => event.signal(),
        None => Ok(()),
    }
}

/// A failing wait is treated as "not signaled"; the agent side is untrusted.
fn poll<E: SyncEvent>(event: Option<&E>, tag: &str) -> bool {
    match event.map(|e| e.poll()) {
        Some(Ok(signaled)) => signaled,
        Some(Err(e)) => {
            log::debug!("sync: wait on {tag} failed: {e}");
            false
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
