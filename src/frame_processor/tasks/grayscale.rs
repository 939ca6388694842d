// SPDX-License-Identifier: GPL-3.0-only

//! Luma-only preview

use super::gray_to_rgba;
use crate::errors::ProcessorError;
use crate::frame_processor::{FrameProcessor, luma_plane};

/// Replicates NV21 luma into the RGB channels
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl FrameProcessor for Grayscale {
    fn process(&mut self, nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError> {
        let luma = luma_plane(nv21, width, height)?;
        Ok(gray_to_rgba(luma))
    }

    fn name(&self) -> &str {
        "grayscale"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_replicated_with_opaque_alpha() {
        let nv21 = [10, 20, 30, 40, 128, 128];
        let out = Grayscale.process(&nv21, 2, 2).expect("grayscale");
        assert_eq!(
            out,
            vec![10, 10, 10, 255, 20, 20, 20, 255, 30, 30, 30, 255, 40, 40, 40, 255]
        );
    }

    #[test]
    fn test_truncated_input_fails() {
        assert!(Grayscale.process(&[0; 2], 2, 2).is_err());
    }
}
