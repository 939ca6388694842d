// SPDX-License-Identifier: GPL-3.0-only

//! Built-in processing stages
//!
//! Each stage reads the NV21 luma plane and produces an RGBA frame.

pub mod blank;
pub mod edge_detector;
pub mod grayscale;

pub use blank::Blank;
pub use edge_detector::EdgeDetector;
pub use grayscale::Grayscale;

/// Expand a single-channel image to opaque RGBA
pub(crate) fn gray_to_rgba(gray: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray.len() * 4);
    for &value in gray {
        rgba.extend_from_slice(&[value, value, value, 255]);
    }
    rgba
}
