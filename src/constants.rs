// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bytes per pixel of processed frames and of the display texture (RGBA8)
pub const RGBA_BYTES_PER_PIXEL: usize = 4;

/// Default capture width (the analysis resolution requested from the sensor)
pub const DEFAULT_WIDTH: u32 = 640;

/// Default capture height
pub const DEFAULT_HEIGHT: u32 = 480;

/// Default synthetic capture rate in frames per second
pub const DEFAULT_FRAMERATE: u32 = 15;

/// Default lower hysteresis threshold for edge detection
pub const DEFAULT_EDGE_LOW_THRESHOLD: u8 = 50;

/// Default upper hysteresis threshold for edge detection
pub const DEFAULT_EDGE_HIGH_THRESHOLD: u8 = 150;

/// Sliding window used for the frames-per-second estimate
pub const FPS_WINDOW: Duration = Duration::from_secs(2);

/// Default log filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Processing stage applied to each interleaved frame
///
/// The core treats the processor as opaque; these are the stages the
/// binary can select from configuration or the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    /// Gradient edge map with hysteresis thresholds (default)
    #[default]
    Edges,
    /// Luma replicated into RGB
    Grayscale,
    /// All-zero RGBA output of the correct size
    Blank,
}

impl ProcessorKind {
    /// Get all processor variants for CLI and config iteration
    pub const ALL: [ProcessorKind; 3] = [
        ProcessorKind::Edges,
        ProcessorKind::Grayscale,
        ProcessorKind::Blank,
    ];

    /// Get display name for the processor
    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessorKind::Edges => "Edge detection",
            ProcessorKind::Grayscale => "Grayscale",
            ProcessorKind::Blank => "Blank",
        }
    }

    /// Parse from the lowercase name used in config files and on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "edges" | "edge" | "canny" => Some(ProcessorKind::Edges),
            "grayscale" | "gray" | "grey" => Some(ProcessorKind::Grayscale),
            "blank" | "zero" => Some(ProcessorKind::Blank),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Size in bytes of an RGBA frame
pub fn rgba_frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * RGBA_BYTES_PER_PIXEL
}
