// SPDX-License-Identifier: GPL-3.0-only

//! Preview pipeline statistics

use crate::constants::FPS_WINDOW;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Frames handed to `ingest`
    pub ingested: u64,
    /// Frames processed and published to the slot
    pub published: u64,
    /// Frames dropped because they were empty or a plane was too short for its strides
    pub dropped_bounds: u64,
    /// Frames dropped because the processor failed or returned a bad size
    pub dropped_processor: u64,
    /// Published frames per second over the sliding window
    pub fps: f64,
    /// Dimensions of the most recent frame
    pub width: u32,
    pub height: u32,
}

impl StatsSnapshot {
    /// Resolution as "WIDTHxHEIGHT"
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped_bounds + self.dropped_processor
    }
}

/// Thread-safe pipeline counters
#[derive(Debug)]
pub struct PipelineStats {
    ingested: AtomicU64,
    published: AtomicU64,
    dropped_bounds: AtomicU64,
    dropped_processor: AtomicU64,
    width: AtomicU32,
    height: AtomicU32,
    window: Duration,
    publish_times: Mutex<VecDeque<Instant>>,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::with_window(FPS_WINDOW)
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create stats with a custom FPS window
    pub fn with_window(window: Duration) -> Self {
        Self {
            ingested: AtomicU64::new(0),
            published: AtomicU64::new(0),
            dropped_bounds: AtomicU64::new(0),
            dropped_processor: AtomicU64::new(0),
            width: AtomicU32::new(0),
            height: AtomicU32::new(0),
            window,
            publish_times: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record_ingested(&self, width: u32, height: u32) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
        self.width.store(width, Ordering::Relaxed);
        self.height.store(height, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.record_published_at(Instant::now());
    }

    pub(crate) fn record_published_at(&self, now: Instant) {
        self.published.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut times) = self.publish_times.lock() {
            times.push_back(now);
            prune(&mut times, now, self.window);
        }
    }

    pub fn record_bounds_drop(&self) {
        self.dropped_bounds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processor_drop(&self) {
        self.dropped_processor.fetch_add(1, Ordering::Relaxed);
    }

    /// Published frames per second over the window ending now
    pub fn fps(&self) -> f64 {
        self.fps_at(Instant::now())
    }

    pub(crate) fn fps_at(&self, now: Instant) -> f64 {
        let Ok(mut times) = self.publish_times.lock() else {
            return 0.0;
        };
        prune(&mut times, now, self.window);

        // Rate between the oldest and newest sample, so a short run is not
        // diluted by the full window length
        match (times.front(), times.back()) {
            (Some(first), Some(last)) if times.len() > 1 => {
                let span = last.duration_since(*first).as_secs_f64();
                if span > 0.0 {
                    (times.len() - 1) as f64 / span
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ingested: self.ingested.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped_bounds: self.dropped_bounds.load(Ordering::Relaxed),
            dropped_processor: self.dropped_processor.load(Ordering::Relaxed),
            fps: self.fps(),
            width: self.width.load(Ordering::Relaxed),
            height: self.height.load(Ordering::Relaxed),
        }
    }
}

fn prune(times: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = times.front() {
        if now.duration_since(oldest) > window {
            times.pop_front();
        } else {
            break;
        }
    }
}
