// SPDX-License-Identifier: GPL-3.0-only

//! Gradient edge detection
//!
//! Classic two-threshold edge detector on the NV21 luma plane:
//!
//! 1. 3x3 Sobel gradients with replicated borders
//! 2. L1 magnitude (`|gx| + |gy|`)
//! 3. Non-maximum suppression along the quantized gradient direction
//! 4. Hysteresis: pixels above `high` seed edges, which then grow through
//!    connected pixels above `low`
//!
//! Edge pixels are white, everything else black, alpha always opaque.

use super::gray_to_rgba;
use crate::constants::{DEFAULT_EDGE_HIGH_THRESHOLD, DEFAULT_EDGE_LOW_THRESHOLD};
use crate::errors::ProcessorError;
use crate::frame_processor::{FrameProcessor, luma_plane};
use tracing::trace;

const EDGE: u8 = 255;

/// tan(22.5°) and tan(67.5°) scaled by 2^15
const TAN_22_5_Q15: i64 = 13573;
const TAN_67_5_Q15: i64 = 79109;

/// Two-threshold gradient edge detector
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    low: i32,
    high: i32,
    // Scratch buffers reused between frames of the same size
    magnitude: Vec<i32>,
    direction: Vec<Direction>,
    state: Vec<Mark>,
    stack: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Direction {
    #[default]
    Horizontal,
    Vertical,
    /// Gradient along (+1, +1), i.e. down-right in image coordinates
    Diagonal,
    /// Gradient along (+1, -1)
    AntiDiagonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mark {
    #[default]
    None,
    Candidate,
    Edge,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_LOW_THRESHOLD, DEFAULT_EDGE_HIGH_THRESHOLD)
    }
}

impl EdgeDetector {
    /// Create a detector with the given hysteresis thresholds
    ///
    /// Thresholds are swapped if given out of order.
    pub fn new(low: u8, high: u8) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        Self {
            low: low as i32,
            high: high as i32,
            magnitude: Vec::new(),
            direction: Vec::new(),
            state: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn thresholds(&self) -> (u8, u8) {
        (self.low as u8, self.high as u8)
    }

    /// Compute the binary edge map of a grayscale image
    pub fn detect(&mut self, gray: &[u8], width: usize, height: usize) -> Vec<u8> {
        let len = width * height;
        let mut edges = vec![0u8; len];
        if width < 3 || height < 3 {
            return edges;
        }

        self.compute_gradients(gray, width, height);
        self.suppress_non_maxima(width, height);
        self.trace_hysteresis(width, height, &mut edges);

        edges
    }

    fn compute_gradients(&mut self, gray: &[u8], width: usize, height: usize) {
        let len = width * height;
        self.magnitude.clear();
        self.magnitude.resize(len, 0);
        self.direction.clear();
        self.direction.resize(len, Direction::default());

        let at = |x: isize, y: isize| -> i32 {
            let x = x.clamp(0, width as isize - 1) as usize;
            let y = y.clamp(0, height as isize - 1) as usize;
            gray[y * width + x] as i32
        };

        for y in 0..height as isize {
            for x in 0..width as isize {
                let gx = (at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2 * at(x - 1, y) + at(x - 1, y + 1));
                let gy = (at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2 * at(x, y - 1) + at(x + 1, y - 1));

                let i = y as usize * width + x as usize;
                self.magnitude[i] = gx.abs() + gy.abs();
                self.direction[i] = quantize_direction(gx, gy);
            }
        }
    }

    fn suppress_non_maxima(&mut self, width: usize, height: usize) {
        let len = width * height;
        self.state.clear();
        self.state.resize(len, Mark::None);
        self.stack.clear();

        let mag = &self.magnitude;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let i = y * width + x;
                let m = mag[i];
                if m <= self.low {
                    continue;
                }

                let (before, after) = match self.direction[i] {
                    Direction::Horizontal => (i - 1, i + 1),
                    Direction::Vertical => (i - width, i + width),
                    Direction::Diagonal => (i - width - 1, i + width + 1),
                    Direction::AntiDiagonal => (i - width + 1, i + width - 1),
                };

                // Ties resolve towards the first neighbour so plateaus keep one pixel
                if m > mag[before] && m >= mag[after] {
                    if m > self.high {
                        self.state[i] = Mark::Edge;
                        self.stack.push(i);
                    } else {
                        self.state[i] = Mark::Candidate;
                    }
                }
            }
        }
    }

    fn trace_hysteresis(&mut self, width: usize, height: usize, edges: &mut [u8]) {
        while let Some(i) = self.stack.pop() {
            edges[i] = EDGE;
            let x = i % width;
            let y = i / width;
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if self.state[n] == Mark::Candidate {
                        self.state[n] = Mark::Edge;
                        self.stack.push(n);
                    }
                }
            }
        }
    }
}

fn quantize_direction(gx: i32, gy: i32) -> Direction {
    let ax = (gx as i64).abs();
    let ay = (gy as i64).abs() << 15;

    if ay < ax * TAN_22_5_Q15 {
        Direction::Horizontal
    } else if ay > ax * TAN_67_5_Q15 {
        Direction::Vertical
    } else if (gx < 0) == (gy < 0) {
        Direction::Diagonal
    } else {
        Direction::AntiDiagonal
    }
}

impl FrameProcessor for EdgeDetector {
    fn process(&mut self, nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError> {
        let luma = luma_plane(nv21, width, height)?;
        let edges = self.detect(luma, width as usize, height as usize);

        trace!(
            width,
            height,
            edge_pixels = edges.iter().filter(|&&p| p == EDGE).count(),
            "Edge map computed"
        );
        Ok(gray_to_rgba(&edges))
    }

    fn name(&self) -> &str {
        "edges"
    }
}
