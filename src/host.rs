//! Services the embedding application provides to a capture source.

use crate::backend::CaptureBackend;
use crate::descriptor::CaptureMode;
use crate::render::Vec2;

/// Identity of an advisory shown by the host's status area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvisoryId(pub u64);

/// The application hosting the capture source.
pub trait Host {
    /// Configured frame-rate ceiling. Also the default stall budget in ticks.
    fn max_fps(&self) -> u32;

    /// Size of the host's output canvas, used to place the captured frame.
    fn base_size(&self) -> Vec2;

    /// Shows a user-visible advisory and returns its identity.
    fn add_advisory(&mut self, message: &str) -> AdvisoryId;

    /// Removes an advisory previously returned by `add_advisory`.
    fn remove_advisory(&mut self, id: AdvisoryId);

    /// Builds an uninitialized backend for `mode`.
    fn create_backend(&mut self, mode: CaptureMode) -> Box<dyn CaptureBackend>;
}
