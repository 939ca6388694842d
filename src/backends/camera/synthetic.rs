// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic test-pattern camera
//!
//! Produces YUV 4:2:0 multi-plane frames the way a mobile sensor delivers
//! them: a luma plane plus two chroma planes whose pixel stride is either 1
//! (planar) or 2 (semi-planar, where the U and V planes alias one
//! interleaved buffer). Chroma rows can carry padding to exercise stride
//! handling; the luma plane is always tightly packed, since it is forwarded
//! verbatim.
//!
//! Two threads are involved:
//!
//! ```text
//! capture thread ──offer()──▶ LatestFrameMailbox ──take()──▶ analysis thread ──▶ sink
//!                 (displaced frames are released and counted as dropped)
//! ```
//!
//! The mailbox holds at most one frame, so a slow sink never builds a
//! backlog: whatever was pending when a newer frame arrives is released
//! immediately. The sink always runs on the analysis thread, one frame at a
//! time.

use super::frame_loop::{FrameLoop, LoopAction};
use super::types::{BackendError, BackendResult, FramePlanes, PlaneBuffer, RawFrame};
use super::{FrameSink, FrameSource, ReleaseCounter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// How long the analysis thread waits for a frame before re-checking its stop flag
const MAILBOX_POLL: Duration = Duration::from_millis(20);

/// Synthetic camera settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// 1 = planar chroma, 2 = interleaved chroma
    pub chroma_pixel_stride: u32,
    /// Extra bytes at the end of every chroma row
    pub row_padding: u32,
    /// Stop capturing after this many frames
    pub frame_limit: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: crate::constants::DEFAULT_WIDTH,
            height: crate::constants::DEFAULT_HEIGHT,
            framerate: crate::constants::DEFAULT_FRAMERATE,
            chroma_pixel_stride: 2,
            row_padding: 0,
            frame_limit: None,
        }
    }
}

/// Single-entry mailbox with keep-only-latest semantics
#[derive(Default)]
pub struct LatestFrameMailbox {
    slot: Mutex<Option<RawFrame>>,
    ready: Condvar,
}

impl LatestFrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame, returning the pending frame it displaced (if any)
    pub fn offer(&self, frame: RawFrame) -> Option<RawFrame> {
        let displaced = match self.slot.lock() {
            Ok(mut guard) => guard.replace(frame),
            Err(poisoned) => poisoned.into_inner().replace(frame),
        };
        self.ready.notify_one();
        displaced
    }

    /// Take the pending frame, waiting up to `timeout` for one to arrive
    pub fn take_timeout(&self, timeout: Duration) -> Option<RawFrame> {
        let guard = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut guard = match self
            .ready
            .wait_timeout_while(guard, timeout, |pending| pending.is_none())
        {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
        guard.take()
    }

    /// Take the pending frame without waiting
    pub fn try_take(&self) -> Option<RawFrame> {
        self.take_timeout(Duration::ZERO)
    }
}

/// Test-pattern frame source
pub struct SyntheticCamera {
    config: SyntheticConfig,
    counter: ReleaseCounter,
    dropped: Arc<AtomicU64>,
    mailbox: Arc<LatestFrameMailbox>,
    pool: Arc<Mutex<Vec<FramePlanes>>>,
    capture: Option<FrameLoop>,
    analysis: Option<FrameLoop>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticConfig) -> BackendResult<Self> {
        if config.width < 2 || config.height < 2 {
            return Err(BackendError::FormatNotSupported(format!(
                "{}x{} is smaller than one chroma sample",
                config.width, config.height
            )));
        }
        if !matches!(config.chroma_pixel_stride, 1 | 2) {
            return Err(BackendError::FormatNotSupported(format!(
                "chroma pixel stride {}",
                config.chroma_pixel_stride
            )));
        }
        if config.framerate == 0 {
            return Err(BackendError::FormatNotSupported("0 fps".into()));
        }

        Ok(Self {
            config,
            counter: ReleaseCounter::new(),
            dropped: Arc::new(AtomicU64::new(0)),
            mailbox: Arc::new(LatestFrameMailbox::new()),
            pool: Arc::new(Mutex::new(Vec::new())),
            capture: None,
            analysis: None,
        })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Frames displaced from the mailbox before the sink saw them
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    /// True once the capture thread has produced its frame limit
    pub fn is_capture_finished(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| !c.is_running())
    }
}

impl FrameSource for SyntheticCamera {
    fn start(&mut self, mut sink: FrameSink) -> BackendResult<()> {
        if self.capture.is_some() {
            return Err(BackendError::AlreadyStarted);
        }

        info!(
            width = self.config.width,
            height = self.config.height,
            fps = self.config.framerate,
            pixel_stride = self.config.chroma_pixel_stride,
            "Starting synthetic camera"
        );

        let mailbox = Arc::clone(&self.mailbox);
        let analysis = FrameLoop::start("frame-analysis", move || {
            if let Some(frame) = mailbox.take_timeout(MAILBOX_POLL) {
                sink(frame);
            }
            LoopAction::Continue
        })
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let config = self.config;
        let counter = self.counter.clone();
        let dropped = Arc::clone(&self.dropped);
        let mailbox = Arc::clone(&self.mailbox);
        let pool = Arc::clone(&self.pool);
        let period = Duration::from_secs_f64(1.0 / config.framerate as f64);
        let mut sequence = 0u64;
        let mut next_deadline = Instant::now();

        let capture = FrameLoop::start("frame-capture", move || {
            if config.frame_limit.is_some_and(|limit| sequence >= limit) {
                return LoopAction::Stop;
            }

            let now = Instant::now();
            if next_deadline > now {
                std::thread::sleep(next_deadline - now);
            }
            next_deadline += period;

            let planes = pool
                .lock()
                .ok()
                .and_then(|mut free| free.pop())
                .unwrap_or_default();
            let frame = render_test_pattern(&config, sequence, planes);

            let pool_return = Arc::clone(&pool);
            let frame = counter.tag_with(frame, move |planes| {
                if let Ok(mut free) = pool_return.lock() {
                    free.push(planes);
                }
            });

            trace!(sequence, "Captured synthetic frame");
            if let Some(stale) = mailbox.offer(frame) {
                dropped.fetch_add(1, Ordering::SeqCst);
                debug!(sequence = stale.sequence, "Dropping stale frame (latest wins)");
                stale.release();
            }

            sequence += 1;
            LoopAction::Continue
        })
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        self.analysis = Some(analysis);
        self.capture = Some(capture);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(mut analysis) = self.analysis.take() {
            analysis.stop();
        }
        // Anything still pending was never delivered
        if let Some(frame) = self.mailbox.try_take() {
            self.dropped.fetch_add(1, Ordering::SeqCst);
            frame.release();
        }
        info!(
            delivered = self.counter.delivered(),
            released = self.counter.released(),
            dropped = self.dropped(),
            "Synthetic camera stopped"
        );
    }

    fn is_running(&self) -> bool {
        self.analysis.as_ref().is_some_and(|a| a.is_running())
    }

    fn release_counter(&self) -> &ReleaseCounter {
        &self.counter
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        if self.capture.is_some() || self.analysis.is_some() {
            self.stop();
        }
    }
}

/// Byte length of a plane whose last row is not padded
///
/// Mirrors sensor buffers, which end right after the last sample.
fn plane_len(rows: u32, cols: u32, row_stride: u32, pixel_stride: u32) -> usize {
    if rows == 0 || cols == 0 {
        return 0;
    }
    ((rows - 1) * row_stride + (cols - 1) * pixel_stride + 1) as usize
}

/// Fill plane buffers with a moving checkerboard and chroma gradients
pub fn render_test_pattern(config: &SyntheticConfig, sequence: u64, planes: FramePlanes) -> RawFrame {
    let FramePlanes {
        y: mut y_data,
        u: mut u_data,
        v: mut v_data,
    } = planes;

    let width = config.width;
    let height = config.height;
    let pixel_stride = config.chroma_pixel_stride;
    let chroma_w = width / 2;
    let chroma_h = height / 2;

    let y_stride = width;
    let c_stride = chroma_w * pixel_stride + config.row_padding;

    y_data.clear();
    y_data.resize((y_stride * height) as usize, 0);
    let c_len = plane_len(chroma_h, chroma_w, c_stride, pixel_stride);
    u_data.clear();
    u_data.resize(c_len, 0);
    v_data.clear();
    v_data.resize(c_len, 0);

    // 32px checkerboard scrolling one pixel per frame
    let shift = (sequence % 64) as u32;
    for row in 0..height {
        let row_start = (row * y_stride) as usize;
        for col in 0..width {
            let light = (((col + shift) / 32) + (row / 32)) % 2 == 0;
            y_data[row_start + col as usize] = if light { 200 } else { 40 };
        }
    }

    for row in 0..chroma_h {
        for col in 0..chroma_w {
            let idx = (row * c_stride + col * pixel_stride) as usize;
            let u = (col * 255 / chroma_w.max(1)) as u8;
            let v = (row * 255 / chroma_h.max(1)) as u8;
            u_data[idx] = u;
            v_data[idx] = v;
            // Semi-planar: each plane is a view into one interleaved buffer
            if pixel_stride == 2 && idx + 1 < c_len {
                u_data[idx + 1] = v;
                v_data[idx + 1] = u;
            }
        }
    }

    RawFrame::new(
        width,
        height,
        PlaneBuffer::new(y_data, y_stride, 1),
        PlaneBuffer::new(u_data, c_stride, pixel_stride),
        PlaneBuffer::new(v_data, c_stride, pixel_stride),
    )
    .with_sequence(sequence)
}
