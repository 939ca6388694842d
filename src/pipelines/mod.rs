// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipelines
//!
//! - [`preview`]: raw sensor frames to displayable RGBA, latest frame wins

pub mod preview;

pub use preview::{FrameSlot, PipelineStats, PreviewPipeline, ProcessedFrame, RedrawRequester};
