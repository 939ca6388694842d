// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    DEFAULT_EDGE_HIGH_THRESHOLD, DEFAULT_EDGE_LOW_THRESHOLD, DEFAULT_FRAMERATE, DEFAULT_HEIGHT,
    DEFAULT_LOG_FILTER, DEFAULT_WIDTH, ProcessorKind,
};
use crate::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user's config directory
const CONFIG_DIR_NAME: &str = "camera-pipeline";

/// File name of the persisted configuration
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture width in pixels
    pub width: u32,
    /// Capture height in pixels
    pub height: u32,
    /// Synthetic source frame rate
    pub framerate: u32,
    /// Processing stage applied to each frame
    pub processor: ProcessorKind,
    /// Lower hysteresis threshold for edge detection
    pub edge_low_threshold: u8,
    /// Upper hysteresis threshold for edge detection
    pub edge_high_threshold: u8,
    /// Chroma pixel stride of synthetic frames (1 = planar, 2 = interleaved)
    pub chroma_pixel_stride: u32,
    /// Extra bytes appended to every chroma row of synthetic frames
    pub row_padding: u32,
    /// Color the surface is cleared to before the quad is drawn (RGBA, 0.0-1.0)
    pub clear_color: [f64; 4],
    /// tracing filter used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            framerate: DEFAULT_FRAMERATE,
            processor: ProcessorKind::default(),
            edge_low_threshold: DEFAULT_EDGE_LOW_THRESHOLD,
            edge_high_threshold: DEFAULT_EDGE_HIGH_THRESHOLD,
            chroma_pixel_stride: 2, // Most sensors deliver semi-planar chroma
            row_padding: 0,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location
    ///
    /// A missing file (or no config directory on this platform) yields defaults.
    pub fn load() -> PipelineResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> PipelineResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| PipelineError::Config("no config directory on this platform".into()))?;
        self.save_to(&path)
    }

    /// Write configuration as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> PipelineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::Config(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.framerate == 0 {
            return Err(PipelineError::Config("framerate must be non-zero".into()));
        }
        if !matches!(self.chroma_pixel_stride, 1 | 2) {
            return Err(PipelineError::Config(format!(
                "chroma pixel stride must be 1 or 2, got {}",
                self.chroma_pixel_stride
            )));
        }
        if self.edge_low_threshold > self.edge_high_threshold {
            return Err(PipelineError::Config(format!(
                "edge thresholds out of order: low {} > high {}",
                self.edge_low_threshold, self.edge_high_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "width": 320, "processor": "grayscale" }"#)
            .expect("partial config parses");
        assert_eq!(config.width, 320);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.processor, ProcessorKind::Grayscale);
    }

    #[test]
    fn test_validate_rejects_bad_stride() {
        let config = Config {
            chroma_pixel_stride: 3,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_swapped_thresholds() {
        let config = Config {
            edge_low_threshold: 200,
            edge_high_threshold: 100,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
