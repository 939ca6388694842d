// SPDX-License-Identifier: GPL-3.0-only

//! Camera Pipeline - real-time camera frame processing and display
//!
//! Raw multi-plane sensor frames are converted to NV21, handed to a
//! processing stage that produces RGBA, and published to a latest-wins slot
//! from which an on-demand renderer draws them full screen.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Frame source abstraction and the synthetic test camera
//! - [`media`]: YUV 4:2:0 to NV21 conversion
//! - [`frame_processor`]: Processing stage contract and built-in stages
//! - [`pipelines`]: The preview pipeline (`ingest`) and the frame slot
//! - [`render`]: On-demand renderer, wgpu backend and render thread
//! - [`gpu`]: Device creation
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let slot = Arc::new(FrameSlot::new());
//! let host = RenderHost::spawn(make_backend, Arc::clone(&slot), 640, 480)?;
//! let mut pipeline = PreviewPipeline::new(EdgeDetector::default(), slot, host.redraw_handle());
//! pipeline.ingest(raw_frame)?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod gpu;
pub mod media;
pub mod pipelines;
pub mod render;

// Re-export commonly used types
pub use backends::camera::{FrameSource, PlaneBuffer, RawFrame, ReleaseCounter};
pub use config::Config;
pub use constants::ProcessorKind;
pub use errors::{PipelineError, PipelineResult, Plane, ProcessorError};
pub use frame_processor::FrameProcessor;
pub use media::{InterleavedFrame, convert_to_nv21};
pub use pipelines::{FrameSlot, PreviewPipeline, ProcessedFrame, RedrawRequester};
pub use render::{GraphicsBackend, Renderer, RendererState};
