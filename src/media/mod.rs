// SPDX-License-Identifier: GPL-3.0-only

//! Pixel layout conversion
//!
//! - [`nv21_converter`]: multi-plane YUV 4:2:0 sensor frames to NV21

pub mod nv21_converter;

pub use nv21_converter::{InterleavedFrame, convert_into, convert_to_nv21, interleaved_len};
