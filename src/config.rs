// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Loaded from a TOML file (default `$XDG_CONFIG_HOME/frame-monitor/config.toml`).
//! Every field has a default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::confidence::DEFAULT_SENTINEL;
use crate::constants::depth::{DEFAULT_FAR_M, DEFAULT_NEAR_M};
use crate::constants::timing::DEFAULT_FPS;
use crate::errors::ConfigError;
use crate::media::{DepthRange, UnknownConfidence};

const CONFIG_DIR_NAME: &str = "frame-monitor";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Grayscale depth view clip planes (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthSettings {
    pub near: f32,
    pub far: f32,
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            near: DEFAULT_NEAR_M,
            far: DEFAULT_FAR_M,
        }
    }
}

/// Handling of confidence codes outside 0..=2
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCodePolicy {
    /// Fill with `sentinel_color`
    #[default]
    Sentinel,
    /// Keep whatever the display buffer held from the previous frame
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub unknown_code: UnknownCodePolicy,
    /// RGBA written for unknown codes under the sentinel policy
    pub sentinel_color: [u8; 4],
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            unknown_code: UnknownCodePolicy::default(),
            sentinel_color: DEFAULT_SENTINEL,
        }
    }
}

impl ConfidenceSettings {
    pub fn unknown_confidence(&self) -> UnknownConfidence {
        match self.unknown_code {
            UnknownCodePolicy::Sentinel => UnknownConfidence::Sentinel(self.sentinel_color),
            UnknownCodePolicy::Preserve => UnknownConfidence::Preserve,
        }
    }
}

/// Which display views are produced each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub camera: bool,
    /// Depth meters shown directly over 0..1 m
    pub raw_depth: bool,
    pub gray_depth: bool,
    pub confidence: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            camera: true,
            raw_depth: true,
            gray_depth: true,
            confidence: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub depth: DepthSettings,
    pub confidence: ConfidenceSettings,
    pub views: ViewSettings,
    /// Mirror every view vertically (for sources with a bottom-left origin)
    pub flip_vertical: bool,
    /// Frame rate used to drive synthetic and file sources
    pub fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            depth: DepthSettings::default(),
            confidence: ConfidenceSettings::default(),
            views: ViewSettings::default(),
            flip_vertical: false,
            fps: DEFAULT_FPS,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// if present, otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn depth_range(&self) -> Result<DepthRange, ConfigError> {
        DepthRange::new(self.depth.near, self.depth.far)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.depth_range().map(|_| ())
    }
}
