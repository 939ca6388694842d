// SPDX-License-Identifier: GPL-3.0-only

//! Latest-wins hand-off between the analysis and render threads
//!
//! The analysis thread publishes processed frames, the render thread takes
//! them when it draws. Nothing is queued: a publish replaces whatever is
//! pending, and each published frame can be taken at most once. Frame and
//! sequence number travel in one atomically swapped `Arc`, so a reader never
//! sees a flag for one frame paired with the pixels of another.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// An RGBA frame ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFrame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, top row first
    pub rgba: Vec<u8>,
    /// Sequence number of the raw frame this was produced from
    pub source_sequence: u64,
}

#[derive(Debug)]
struct Published {
    sequence: u64,
    frame: Arc<ProcessedFrame>,
}

/// Single-producer, single-consumer latest frame slot
#[derive(Debug, Default)]
pub struct FrameSlot {
    current: ArcSwapOption<Published>,
    next_sequence: AtomicU64,
    last_taken: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending frame and mark it unseen
    ///
    /// Returns the publish sequence number (starting at 1).
    pub fn publish(&self, frame: ProcessedFrame) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::AcqRel) + 1;
        self.current.store(Some(Arc::new(Published {
            sequence,
            frame: Arc::new(frame),
        })));
        trace!(sequence, "Published frame");
        sequence
    }

    /// Take the latest frame if it has not been taken yet
    ///
    /// A second call without an intervening publish returns `None`.
    pub fn take_if_new(&self) -> Option<Arc<ProcessedFrame>> {
        let published = self.current.load_full()?;
        let mut last = self.last_taken.load(Ordering::Acquire);
        loop {
            if published.sequence <= last {
                return None;
            }
            match self.last_taken.compare_exchange_weak(
                last,
                published.sequence,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(Arc::clone(&published.frame)),
                Err(actual) => last = actual,
            }
        }
    }

    /// True if a frame was published since the last take
    pub fn has_unseen(&self) -> bool {
        self.current
            .load_full()
            .is_some_and(|p| p.sequence > self.last_taken.load(Ordering::Acquire))
    }

    /// Latest published frame whether or not it was taken
    pub fn peek(&self) -> Option<Arc<ProcessedFrame>> {
        self.current.load_full().map(|p| Arc::clone(&p.frame))
    }

    /// Number of frames published so far
    pub fn published(&self) -> u64 {
        self.next_sequence.load(Ordering::Acquire)
    }

    /// Drop the pending frame (on teardown)
    pub fn clear(&self) {
        self.current.store(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn frame(tag: u8) -> ProcessedFrame {
        ProcessedFrame {
            width: 1,
            height: 1,
            rgba: vec![tag; 4],
            source_sequence: tag as u64,
        }
    }

    #[test]
    fn test_empty_slot_has_nothing() {
        let slot = FrameSlot::new();
        assert!(slot.take_if_new().is_none());
        assert!(!slot.has_unseen());
    }

    #[test]
    fn test_latest_wins() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        slot.publish(frame(2));
        slot.publish(frame(3));

        let taken = slot.take_if_new().expect("frame pending");
        assert_eq!(taken.rgba, vec![3; 4]);
        assert_eq!(slot.published(), 3);
    }

    #[test]
    fn test_double_take_returns_none() {
        let slot = FrameSlot::new();
        slot.publish(frame(7));
        assert!(slot.has_unseen());
        assert!(slot.take_if_new().is_some());
        assert!(!slot.has_unseen());
        assert!(slot.take_if_new().is_none());
        // Still there for redraws
        assert_eq!(slot.peek().map(|f| f.source_sequence), Some(7));
    }

    #[test]
    fn test_clear_drops_pending() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        slot.clear();
        assert!(slot.take_if_new().is_none());
        assert!(slot.peek().is_none());
    }

    #[test]
    fn test_concurrent_takes_never_duplicate() {
        let slot = Arc::new(FrameSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for tag in 0..200u8 {
                    slot.publish(frame(tag));
                }
            })
        };

        let mut seen = Vec::new();
        while !producer.is_finished() || slot.has_unseen() {
            if let Some(f) = slot.take_if_new() {
                seen.push(f.source_sequence);
            }
        }
        producer.join().expect("producer thread");

        // Strictly increasing: nothing taken twice, never an older frame
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(!seen.is_empty());
    }
}
