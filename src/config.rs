//! Configuration loaded from `strata.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine:
//!
//! ```toml
//! [window]
//! title = "Strata"
//!
//! [assets]
//! root = "assets"
//! decode_worker = false
//!
//! [tunables.bloom]
//! strength = 0.5
//! ```

use crate::error::Result;
use crate::shadow::ShadowConfig;
use crate::tunables::Tunables;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up by [`StrataConfig::load_or_default`].
pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrataConfig {
    /// Window settings for the demo binary.
    pub window: WindowConfig,
    /// Where sections and textures come from, and how they are decoded.
    pub assets: AssetConfig,
    /// Initial values of the runtime-tunable parameters.
    pub tunables: Tunables,
    /// Soft shadow sampling parameters, fixed for the whole session.
    pub shadows: ShadowConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Logical width in points.
    pub width: u32,
    /// Logical height in points.
    pub height: u32,
}

/// Asset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory that relative texture paths are resolved against.
    pub root: PathBuf,
    /// Section list, relative to `root`.
    pub sections: PathBuf,
    /// Decode textures on background threads instead of the frame thread.
    pub decode_worker: bool,
    /// Number of decode threads when `decode_worker` is enabled.
    pub decode_threads: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Strata".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            sections: PathBuf::from("sections.json"),
            decode_worker: true,
            decode_threads: 2,
        }
    }
}

impl AssetConfig {
    /// Full path of the section list.
    pub fn sections_path(&self) -> PathBuf {
        self.root.join(&self.sections)
    }
}

impl StrataConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load `strata.toml` from the current directory, falling back to defaults
    /// when the file is missing or invalid.
    pub fn load_or_default() -> Self {
        match Self::load_from_file(DEFAULT_CONFIG_FILE) {
            Ok(config) => {
                log::info!("loaded configuration from {DEFAULT_CONFIG_FILE}");
                config
            }
            Err(crate::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{DEFAULT_CONFIG_FILE} not found, using defaults");
                Self::default()
            }
            Err(e) => {
                log::warn!("ignoring {DEFAULT_CONFIG_FILE}: {e}");
                Self::default()
            }
        }
    }
}
