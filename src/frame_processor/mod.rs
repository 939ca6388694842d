// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing stage
//!
//! A processor takes one NV21 frame plus its dimensions and returns a
//! displayable RGBA buffer of exactly `width * height * 4` bytes. The
//! pipeline treats it as opaque and synchronous: it runs on the analysis
//! thread, once per accepted frame.
//!
//! Any closure with the right signature is a processor, so tests and
//! embedders can plug in their own stage without a wrapper type:
//!
//! ```ignore
//! let stub = |_nv21: &[u8], w: u32, h: u32| -> Result<Vec<u8>, ProcessorError> {
//!     Ok(vec![0u8; (w * h * 4) as usize])
//! };
//! let pipeline = PreviewPipeline::new(stub, slot, redraw);
//! ```

pub mod tasks;

pub use tasks::{Blank, EdgeDetector, Grayscale};

use crate::config::Config;
use crate::constants::{ProcessorKind, rgba_frame_len};
use crate::errors::ProcessorError;

/// Synchronous NV21 to RGBA processing stage
pub trait FrameProcessor: Send {
    /// Process one NV21 frame into RGBA
    ///
    /// # Arguments
    /// * `nv21` - Luma plane followed by interleaved V,U pairs
    /// * `width`, `height` - Frame dimensions in pixels
    ///
    /// # Returns
    /// * `Ok(rgba)` - `width * height * 4` bytes, row-major, top row first
    /// * `Err(ProcessorError)` - The frame is dropped by the caller
    fn process(&mut self, nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> FrameProcessor for F
where
    F: FnMut(&[u8], u32, u32) -> Result<Vec<u8>, ProcessorError> + Send,
{
    fn process(&mut self, nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError> {
        self(nv21, width, height)
    }
}

/// Check that a processor result is a full RGBA frame
pub fn validate_output(output: &[u8], width: u32, height: u32) -> Result<(), ProcessorError> {
    let expected = rgba_frame_len(width, height);
    if output.len() != expected {
        return Err(ProcessorError::OutputSize {
            expected,
            actual: output.len(),
        });
    }
    Ok(())
}

/// Luma plane of an NV21 buffer, or an error if the buffer is too short
pub(crate) fn luma_plane(nv21: &[u8], width: u32, height: u32) -> Result<&[u8], ProcessorError> {
    let y_size = width as usize * height as usize;
    nv21.get(..y_size).ok_or_else(|| {
        ProcessorError::Failed(format!(
            "input has {} bytes, {}x{} luma needs {}",
            nv21.len(),
            width,
            height,
            y_size
        ))
    })
}

/// Build the processor selected in the configuration
pub fn build_processor(kind: ProcessorKind, config: &Config) -> Box<dyn FrameProcessor> {
    match kind {
        ProcessorKind::Edges => Box::new(EdgeDetector::new(
            config.edge_low_threshold,
            config.edge_high_threshold,
        )),
        ProcessorKind::Grayscale => Box::new(Grayscale),
        ProcessorKind::Blank => Box::new(Blank),
    }
}
