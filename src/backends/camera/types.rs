// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for frame sources

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Callback that returns a frame's plane storage to its source
///
/// Invoked exactly once per delivered frame.
pub type ReleaseFn = Box<dyn FnOnce(FramePlanes) + Send>;

/// One plane of a multi-plane sensor frame
#[derive(Clone, Default)]
pub struct PlaneBuffer {
    /// Plane bytes as delivered by the sensor (may include row padding)
    pub data: Vec<u8>,
    /// Bytes between the starts of successive rows
    pub row_stride: u32,
    /// Bytes between successive samples within a row
    pub pixel_stride: u32,
}

impl PlaneBuffer {
    pub fn new(data: Vec<u8>, row_stride: u32, pixel_stride: u32) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Length of the plane in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for PlaneBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PlaneBuffer({} bytes, row_stride={}, pixel_stride={})",
            self.data.len(),
            self.row_stride,
            self.pixel_stride
        )
    }
}

/// Plane storage handed back to the source on release
#[derive(Debug, Default)]
pub struct FramePlanes {
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

/// A raw YUV 4:2:0 frame from the sensor
///
/// Owned by the producer thread for the duration of one delivery. The frame
/// must be released exactly once: [`RawFrame::release`] consumes it, and a
/// frame dropped without an explicit release is released by its `Drop` impl
/// so that no exit path can leak pool storage.
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Luma plane
    pub y: PlaneBuffer,
    /// Blue-difference chroma plane
    pub u: PlaneBuffer,
    /// Red-difference chroma plane
    pub v: PlaneBuffer,
    /// Source-assigned sequence number
    pub sequence: u64,
    release: Option<ReleaseFn>,
}

impl RawFrame {
    /// Create a frame with no release callback
    pub fn new(width: u32, height: u32, y: PlaneBuffer, u: PlaneBuffer, v: PlaneBuffer) -> Self {
        Self {
            width,
            height,
            y,
            u,
            v,
            sequence: 0,
            release: None,
        }
    }

    /// Attach the callback that returns this frame's storage to its source
    pub fn with_release(mut self, release: ReleaseFn) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Release the frame back to its source
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            let planes = FramePlanes {
                y: std::mem::take(&mut self.y.data),
                u: std::mem::take(&mut self.u.data),
                v: std::mem::take(&mut self.v.data),
            };
            release(planes);
        }
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        if self.release.is_some() {
            debug!(sequence = self.sequence, "RawFrame dropped unreleased, releasing");
            self.release_inner();
        }
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("y", &self.y)
            .field("u", &self.u)
            .field("v", &self.v)
            .field("sequence", &self.sequence)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

/// Counts deliveries and releases of a frame source
///
/// Every frame tagged with [`ReleaseCounter::tag`] counts as delivered; its
/// release callback bumps the release count. `outstanding() == 0` after a
/// run means every frame was released.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter {
    delivered: Arc<AtomicU64>,
    released: Arc<AtomicU64>,
}

impl ReleaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a counting release callback to a frame
    pub fn tag(&self, frame: RawFrame) -> RawFrame {
        self.tag_with(frame, |_planes| {})
    }

    /// Attach a counting release callback that also hands the plane
    /// storage to `on_release` (e.g. to return it to a buffer pool)
    pub fn tag_with<F>(&self, frame: RawFrame, on_release: F) -> RawFrame
    where
        F: FnOnce(FramePlanes) + Send + 'static,
    {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.released);
        frame.with_release(Box::new(move |planes| {
            released.fetch_add(1, Ordering::SeqCst);
            on_release(planes);
        }))
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Frames delivered but not yet released
    pub fn outstanding(&self) -> u64 {
        self.delivered().saturating_sub(self.released())
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for frame source operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Source is already streaming
    AlreadyStarted,
    /// Requested format is not supported
    FormatNotSupported(String),
    /// Failed to initialize the source
    InitializationFailed(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::AlreadyStarted => write!(f, "Frame source already started"),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
