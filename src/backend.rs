//! Capture backend contract.
//!
//! A backend turns the agent's published surface into a texture the host can
//! draw. The pixel-transfer mechanism belongs to the host; the engine only
//! drives the lifecycle: `init` once, `lock_texture`/`unlock_texture` at most
//! once per render, `destroy` when the session restarts or ends.
//!
//! `ActiveBackend` owns one backend for the engine and guarantees `destroy` is
//! called exactly once, including on drop.

use crate::descriptor::{CaptureDescriptor, CaptureMode};

/// Backend initialization failure.
#[derive(Debug, thiserror::Error)]
#[error("{mode:?} backend: {reason}")]
pub struct BackendError {
    pub mode: CaptureMode,
    pub reason: String,
}

/// A locked frame. Only geometry is interpreted by the engine; `handle` is
/// whatever the backend needs the host to draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub width: u32,
    pub height: u32,
    pub handle: u64,
}

/// One pixel-transfer strategy, selected by the descriptor's mode tag.
pub trait CaptureBackend {
    fn init(&mut self, descriptor: &CaptureDescriptor) -> Result<(), BackendError>;

    /// Returns the current frame, or `None` if no frame is available.
    fn lock_texture(&mut self) -> Option<TextureRef>;

    /// Releases the lock taken by the previous `lock_texture`.
    fn unlock_texture(&mut self);

    /// Releases every backend resource. Must be idempotent.
    fn destroy(&mut self);
}

/// The backend of the running session.
pub(crate) struct ActiveBackend {
    mode: CaptureMode,
    inner: Box<dyn CaptureBackend>,
    destroyed: bool,
}

impl ActiveBackend {
    /// Initializes `inner`; on failure the backend is destroyed before returning.
    pub(crate) fn start(
        mode: CaptureMode,
        mut inner: Box<dyn CaptureBackend>,
        descriptor: &CaptureDescriptor,
    ) -> Result<Self, BackendError> {
        if let Err(e) = inner.init(descriptor) {
            inner.destroy();
            return Err(e);
        }
        Ok(Self {
            mode,
            inner,
            destroyed: false,
        })
    }

    pub(crate) fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub(crate) fn lock_texture(&mut self) -> Option<TextureRef> {
        self.inner.lock_texture()
    }

    pub(crate) fn unlock_texture(&mut self) {
        self.inner.unlock_texture();
    }

    pub(crate) fn destroy(&mut self) {
        if !self.destroyed {
            self.inner.destroy();
            self.destroyed = true;
        }
    }
}

impl Drop for ActiveBackend {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ---------------------------------------------------------------------------
// Probe backend
// ---------------------------------------------------------------------------

/// Backend that transfers no pixels and reports the descriptor geometry as its
/// frame. Used by the command-line probe to exercise the whole handshake.
#[derive(Debug, Default)]
pub struct ProbeBackend {
    frame: Option<TextureRef>,
    locked: bool,
}

impl ProbeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureBackend for ProbeBackend {
    fn init(&mut self, descriptor: &CaptureDescriptor) -> Result<(), BackendError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(BackendError {
                mode: descriptor.mode,
                reason: format!("empty surface {}x{}", descriptor.width, descriptor.height),
            });
        }
        self.frame = Some(TextureRef {
            width: descriptor.width,
            height: descriptor.height,
            handle: u64::from(descriptor.map_id),
        });
        Ok(())
    }

    fn lock_texture(&mut self) -> Option<TextureRef> {
        let frame = self.frame?;
        self.locked = true;
        Some(frame)
    }

    fn unlock_texture(&mut self) {
        self.locked = false;
    }

    fn destroy(&mut self) {
        self.frame = None;
        self.locked = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
