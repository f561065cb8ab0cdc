//! Capture source configuration.
//!
//! Loaded from a TOML file. Every key is optional; unknown keys are rejected so
//! typos surface at load time instead of silently falling back to defaults.
//!
//! ```toml
//! window_class = "UnrealWindow"
//! safe_hook = true
//! stretch = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::keycodes::{hotkey_vk, DEFAULT_HOTKEY};

/// Helper directory relative to the working directory when `plugin_dir` is unset.
const DEFAULT_PLUGIN_SUBDIR: &str = "plugins/GraphicsCapture";

/// Errors loading or validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML syntax or type error; the message carries line and column.
    #[error("{0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Window class looked up in class-name mode. Empty disables capture.
    pub window_class: String,
    /// Select the target with a hotkey instead of by class name.
    pub use_hotkey: bool,
    /// Hotkey name, see `keycodes::hotkey_vk`.
    pub hotkey: String,
    /// Inject asynchronously through the target's thread (anti-cheat friendly).
    pub safe_hook: bool,
    pub stretch: bool,
    pub ignore_aspect: bool,
    /// Seconds between class-name lookups while idle.
    pub poll_interval_secs: f32,
    /// Wall-clock CaptureReady budget. Unset: the host's max FPS in ticks.
    pub stall_timeout_secs: Option<f32>,
    /// Directory holding the inject helpers.
    pub plugin_dir: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_class: String::new(),
            use_hotkey: false,
            hotkey: DEFAULT_HOTKEY.to_string(),
            safe_hook: false,
            stretch: false,
            ignore_aspect: false,
            poll_interval_secs: 3.0,
            stall_timeout_secs: None,
            plugin_dir: None,
        }
    }
}

impl CaptureConfig {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.poll_interval_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_secs must be positive, got {}",
                self.poll_interval_secs
            )));
        }
        if let Some(secs) = self.stall_timeout_secs {
            if !(secs > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "stall_timeout_secs must be positive, got {secs}"
                )));
            }
        }
        if hotkey_vk(&self.hotkey).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown hotkey {:?}",
                self.hotkey
            )));
        }
        Ok(())
    }

    /// Virtual key code the host should register for hotkey mode.
    pub fn hotkey_vk(&self) -> Option<u16> {
        hotkey_vk(&self.hotkey)
    }

    /// Directory containing the inject helpers.
    pub fn plugin_dir(&self) -> PathBuf {
        match &self.plugin_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .unwrap_or_default()
                .join(DEFAULT_PLUGIN_SUBDIR),
        }
    }
}

impl std::str::FromStr for CaptureConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: CaptureConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
