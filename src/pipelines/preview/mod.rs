// SPDX-License-Identifier: GPL-3.0-only

//! Live preview pipeline
//!
//! ```text
//! RawFrame ──▶ convert_into ──▶ FrameProcessor ──▶ FrameSlot ──▶ request_redraw
//!   (YUV)        (NV21)            (RGBA)          (latest)
//! ```
//!
//! [`PreviewPipeline::ingest`] runs on the frame source's producer thread.
//! Every raw frame is released on every path, and a failed frame never
//! stops the pipeline: the error is logged, counted and returned, and the
//! next frame is handled normally.

pub mod slot;
pub mod stats;

pub use slot::{FrameSlot, ProcessedFrame};
pub use stats::{PipelineStats, StatsSnapshot};

use crate::backends::camera::{FrameSink, RawFrame};
use crate::errors::{PipelineError, PipelineResult};
use crate::frame_processor::{FrameProcessor, validate_output};
use crate::media::convert_into;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Asks the display surface for one redraw
pub trait RedrawRequester: Send {
    fn request_redraw(&self);
}

impl<F> RedrawRequester for F
where
    F: Fn() + Send,
{
    fn request_redraw(&self) {
        self()
    }
}

/// Converts, processes and publishes frames for display
pub struct PreviewPipeline {
    processor: Box<dyn FrameProcessor>,
    slot: Arc<FrameSlot>,
    redraw: Box<dyn RedrawRequester>,
    stats: Arc<PipelineStats>,
    // NV21 scratch reused across frames
    nv21: Vec<u8>,
}

impl PreviewPipeline {
    pub fn new<P, R>(processor: P, slot: Arc<FrameSlot>, redraw: R) -> Self
    where
        P: FrameProcessor + 'static,
        R: RedrawRequester + 'static,
    {
        Self::from_boxed(Box::new(processor), slot, Box::new(redraw))
    }

    /// Create a pipeline from already boxed collaborators
    pub fn from_boxed(
        processor: Box<dyn FrameProcessor>,
        slot: Arc<FrameSlot>,
        redraw: Box<dyn RedrawRequester>,
    ) -> Self {
        debug!(processor = processor.name(), "Creating preview pipeline");
        Self {
            processor,
            slot,
            redraw,
            stats: Arc::new(PipelineStats::new()),
            nv21: Vec::new(),
        }
    }

    /// Shared handle to the pipeline counters
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    pub fn slot(&self) -> Arc<FrameSlot> {
        Arc::clone(&self.slot)
    }

    /// Handle one raw frame from the source
    ///
    /// # Returns
    /// * `Ok(())` - The frame was published and a redraw requested
    /// * `Err(PipelineError::EmptyFrame)` - Zero width or height, frame dropped
    /// * `Err(PipelineError::BufferBounds)` - A chroma plane was too short, frame dropped
    /// * `Err(PipelineError::Processor)` - Processing failed or output had the wrong size, frame dropped
    ///
    /// The raw frame is released before returning in every case.
    pub fn ingest(&mut self, raw: RawFrame) -> PipelineResult<()> {
        self.stats.record_ingested(raw.width, raw.height);

        let result = self.process(&raw);
        let sequence = raw.sequence;
        raw.release();

        match &result {
            Ok(()) => trace!(sequence, "Frame ingested"),
            Err(e @ (PipelineError::EmptyFrame { .. } | PipelineError::BufferBounds { .. })) => {
                self.stats.record_bounds_drop();
                warn!(sequence, error = %e, "Dropping frame");
            }
            Err(e) => {
                self.stats.record_processor_drop();
                warn!(sequence, error = %e, "Dropping frame");
            }
        }
        result
    }

    fn process(&mut self, raw: &RawFrame) -> PipelineResult<()> {
        let (width, height) = (raw.width, raw.height);
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyFrame { width, height });
        }

        convert_into(raw, &mut self.nv21)?;

        let rgba = self.processor.process(&self.nv21, width, height)?;
        validate_output(&rgba, width, height)?;

        trace!(
            sequence = raw.sequence,
            width,
            height,
            bytes = rgba.len(),
            "Processed frame"
        );

        self.slot.publish(ProcessedFrame {
            width,
            height,
            rgba,
            source_sequence: raw.sequence,
        });
        self.stats.record_published();
        self.redraw.request_redraw();
        Ok(())
    }

    /// Turn the pipeline into a sink for a frame source
    ///
    /// Per-frame errors are already logged and counted by `ingest`.
    pub fn into_sink(mut self) -> FrameSink {
        Box::new(move |raw| {
            let _ = self.ingest(raw);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{PlaneBuffer, ReleaseCounter};
    use crate::errors::{Plane, ProcessorError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn raw_frame(width: u32, height: u32) -> RawFrame {
        let chroma = (width / 2 * height / 2) as usize;
        RawFrame::new(
            width,
            height,
            PlaneBuffer::new(vec![16; (width * height) as usize], width, 1),
            PlaneBuffer::new(vec![128; chroma], width / 2, 1),
            PlaneBuffer::new(vec![128; chroma], width / 2, 1),
        )
    }

    fn zero_stub(_nv21: &[u8], w: u32, h: u32) -> Result<Vec<u8>, ProcessorError> {
        Ok(vec![0; (w * h * 4) as usize])
    }

    #[test]
    fn test_success_publishes_and_requests_redraw() {
        let slot = Arc::new(FrameSlot::new());
        let redraws = Arc::new(AtomicU32::new(0));
        let redraws_clone = Arc::clone(&redraws);
        let mut pipeline = PreviewPipeline::new(zero_stub, Arc::clone(&slot), move || {
            redraws_clone.fetch_add(1, Ordering::SeqCst);
        });

        let counter = ReleaseCounter::new();
        pipeline
            .ingest(counter.tag(raw_frame(4, 4)))
            .expect("frame accepted");

        assert_eq!(counter.outstanding(), 0);
        assert_eq!(redraws.load(Ordering::SeqCst), 1);
        let frame = slot.take_if_new().expect("frame published");
        assert_eq!(frame.rgba.len(), 64);
    }

    #[test]
    fn test_processor_sees_nv21_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let processor = move |nv21: &[u8], w: u32, h: u32| -> Result<Vec<u8>, ProcessorError> {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(nv21.len(), 16 + 8);
            Ok(vec![0; (w * h * 4) as usize])
        };
        let mut pipeline = PreviewPipeline::new(processor, Arc::new(FrameSlot::new()), || {});
        pipeline.ingest(raw_frame(4, 4)).expect("frame accepted");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bounds_error_releases_and_skips_processor() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let processor = move |_: &[u8], w: u32, h: u32| -> Result<Vec<u8>, ProcessorError> {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0; (w * h * 4) as usize])
        };
        let slot = Arc::new(FrameSlot::new());
        let mut pipeline = PreviewPipeline::new(processor, Arc::clone(&slot), || {});

        let mut frame = raw_frame(4, 4);
        frame.u.data.truncate(1);
        let counter = ReleaseCounter::new();
        let err = pipeline.ingest(counter.tag(frame)).unwrap_err();

        assert!(matches!(err, PipelineError::BufferBounds { plane: Plane::U, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(counter.outstanding(), 0);
        assert!(slot.take_if_new().is_none());
        assert_eq!(pipeline.stats().snapshot().dropped_bounds, 1);
    }

    #[test]
    fn test_wrong_output_size_is_rejected() {
        let short = |_: &[u8], _: u32, _: u32| -> Result<Vec<u8>, ProcessorError> { Ok(vec![0; 3]) };
        let slot = Arc::new(FrameSlot::new());
        let mut pipeline = PreviewPipeline::new(short, Arc::clone(&slot), || {});

        let err = pipeline.ingest(raw_frame(4, 4)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Processor(ProcessorError::OutputSize {
                expected: 64,
                actual: 3
            })
        );
        assert!(slot.take_if_new().is_none());
        assert_eq!(pipeline.stats().snapshot().dropped_processor, 1);
    }

    #[test]
    fn test_zero_sized_frame_is_dropped_before_processing() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let processor = move |_: &[u8], w: u32, h: u32| -> Result<Vec<u8>, ProcessorError> {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0; (w * h * 4) as usize])
        };
        let slot = Arc::new(FrameSlot::new());
        let mut pipeline = PreviewPipeline::new(processor, Arc::clone(&slot), || {});
        let counter = ReleaseCounter::new();

        for (width, height) in [(0, 0), (8, 0), (0, 8)] {
            let frame = RawFrame::new(
                width,
                height,
                PlaneBuffer::default(),
                PlaneBuffer::default(),
                PlaneBuffer::default(),
            );
            let err = pipeline.ingest(counter.tag(frame)).unwrap_err();
            assert_eq!(err, PipelineError::EmptyFrame { width, height });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(counter.outstanding(), 0);
        assert!(slot.take_if_new().is_none());
        assert_eq!(pipeline.stats().snapshot().published, 0);
        assert_eq!(pipeline.stats().snapshot().dropped_bounds, 3);

        // Next real frame goes through
        pipeline.ingest(raw_frame(4, 4)).expect("frame accepted");
        assert!(slot.take_if_new().is_some());
    }
}
