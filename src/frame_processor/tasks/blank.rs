// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::rgba_frame_len;
use crate::errors::ProcessorError;
use crate::frame_processor::FrameProcessor;

/// Zero-filled output of the correct size
///
/// Useful for measuring pipeline overhead without processing cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blank;

impl FrameProcessor for Blank {
    fn process(&mut self, _nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError> {
        Ok(vec![0; rgba_frame_len(width, height)])
    }

    fn name(&self) -> &str {
        "blank"
    }
}
