//! gamecap -- game capture supervision engine.
//!
//! Finds a target game window, injects the capture agent into its process via
//! an external helper, synchronizes with the agent over named events and a
//! shared-memory descriptor, and drives a pluggable capture backend.
//!
//! The embedding application implements [`host::Host`] and calls
//! [`source::GameCaptureSource::tick`] once per frame.

pub mod backend;
pub mod config;
pub mod descriptor;
pub mod host;
pub mod inject;
pub mod keycodes;
pub mod platform;
pub mod render;
pub mod session;
pub mod source;
mod sync;

pub use backend::{BackendError, CaptureBackend, ProbeBackend, TextureRef};
pub use config::{CaptureConfig, ConfigError};
pub use descriptor::{CaptureDescriptor, CaptureMode};
pub use host::{AdvisoryId, Host};
pub use render::{Placement, Vec2};
pub use session::CaptureState;
pub use source::GameCaptureSource;
