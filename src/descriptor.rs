//! Capture descriptor exchanged through shared memory.
//!
//! The agent writes one fixed-size record into the segment named
//! `<INFO_MEMORY_TAG><process id>` before it signals CaptureReady. The engine
//! copies it out once per (re)start. The record is nine little-endian 32-bit
//! fields:
//!
//! | offset | field        |
//! |--------|--------------|
//! | 0      | mode tag     |
//! | 4      | pixel format |
//! | 8      | width        |
//! | 12     | height       |
//! | 16     | window       |
//! | 20     | flip         |
//! | 24     | pitch        |
//! | 28     | map id       |
//! | 32     | map size     |
//!
//! The segment is written by a foreign process and is parsed defensively:
//! short reads and unknown mode tags are errors, never panics.

use crate::platform::{Platform, PlatformError, WindowHandle};

/// Shared-memory name prefix for the descriptor segment.
pub const INFO_MEMORY_TAG: &str = "Local\\OBSInfoMemory";

/// Size of the descriptor record in bytes.
pub const DESCRIPTOR_SIZE: usize = 36;

const MODE_MEMORY: u32 = 1;
const MODE_SHARED_TEXTURE: u32 = 2;

/// How the agent transfers pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Frames are copied into a shared memory ring.
    Memory,
    /// Frames live in a GPU texture shared by handle.
    SharedTexture,
}

impl TryFrom<u32> for CaptureMode {
    type Error = DescriptorError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            MODE_MEMORY => Ok(CaptureMode::Memory),
            MODE_SHARED_TEXTURE => Ok(CaptureMode::SharedTexture),
            other => Err(DescriptorError::UnknownMode(other)),
        }
    }
}

/// Errors reading the descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The segment could not be opened or mapped. Not fatal; retried later.
    #[error("descriptor segment unavailable: {0}")]
    Unavailable(#[from] PlatformError),

    #[error("descriptor segment too short: {0} bytes")]
    Truncated(usize),

    /// The agent wrote a mode tag this engine does not know.
    #[error("unknown capture mode tag {0}")]
    UnknownMode(u32),
}

/// Description of the captured surface, as written by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDescriptor {
    pub mode: CaptureMode,
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub window: WindowHandle,
    pub flip: bool,
    pub pitch: u32,
    pub map_id: u32,
    pub map_size: u32,
}

impl CaptureDescriptor {
    /// Decodes a descriptor record.
    pub fn parse(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() < DESCRIPTOR_SIZE {
            return Err(DescriptorError::Truncated(bytes.len()));
        }

        let field = |index: usize| {
            let at = index * 4;
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        Ok(Self {
            mode: CaptureMode::try_from(field(0))?,
            format: field(1),
            width: field(2),
            height: field(3),
            window: WindowHandle(field(4) as isize),
            flip: field(5) != 0,
            pitch: field(6),
            map_id: field(7),
            map_size: field(8),
        })
    }

    /// Reads the descriptor published for `process_id`.
    pub fn read<P: Platform>(platform: &P, process_id: u32) -> Result<Self, DescriptorError> {
        let name = format!("{INFO_MEMORY_TAG}{process_id}");
        let bytes = platform.read_shared_memory(&name, DESCRIPTOR_SIZE)?;
        Self::parse(&bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Encodes a record the way the agent lays it out.
#[cfg(test)]
pub(crate) fn encode(fields: [u32; 9]) -> Vec<u8> {
    fields.iter().flat_map(|f| f.to_le_bytes()).collect()
}
