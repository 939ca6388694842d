// SPDX-License-Identifier: GPL-3.0-only

//! Frame source abstraction
//!
//! A frame source delivers [`RawFrame`]s to a sink on one dedicated
//! producer thread:
//!
//! - deliveries are sequential, never two in flight at once;
//! - when the sink falls behind, pending frames are replaced by newer ones
//!   (keep-only-latest), never queued;
//! - the source owns the frame storage and every delivered frame must be
//!   released exactly once.
//!
//! ```text
//! ┌──────────────────┐  RawFrame   ┌───────────────┐
//! │  FrameSource     │────────────▶│  FrameSink    │  (PreviewPipeline::ingest)
//! │  (producer thd)  │◀────────────│               │
//! └──────────────────┘  release()  └───────────────┘
//! ```

pub mod frame_loop;
pub mod synthetic;
pub mod types;

pub use frame_loop::{FrameLoop, LoopAction};
pub use synthetic::{LatestFrameMailbox, SyntheticCamera, SyntheticConfig};
pub use types::*;

/// Consumer of delivered frames, called on the source's producer thread
pub type FrameSink = Box<dyn FnMut(RawFrame) + Send>;

/// Source of raw sensor frames
pub trait FrameSource: Send {
    /// Begin delivering frames to `sink`
    ///
    /// # Returns
    /// * `Ok(())` - Streaming started
    /// * `Err(BackendError::AlreadyStarted)` - The source is already streaming
    fn start(&mut self, sink: FrameSink) -> BackendResult<()>;

    /// Stop delivering frames and release anything still pending
    fn stop(&mut self);

    /// Check if the producer thread is still delivering
    fn is_running(&self) -> bool;

    /// Delivery and release accounting for this source
    fn release_counter(&self) -> &ReleaseCounter;
}
