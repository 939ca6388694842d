// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the frame pipeline
//!
//! Per-frame errors ([`PipelineError::EmptyFrame`], [`PipelineError::BufferBounds`],
//! [`PipelineError::Processor`], [`PipelineError::SurfaceState`]) drop or skip a
//! single frame and never stop the pipeline. Only [`PipelineError::SurfaceInit`] is escalated to the caller.

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Plane of a multi-plane sensor frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// Luma
    Y,
    /// Blue-difference chroma
    U,
    /// Red-difference chroma
    V,
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::Y => write!(f, "Y"),
            Plane::U => write!(f, "U"),
            Plane::V => write!(f, "V"),
        }
    }
}

/// Main pipeline error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Frame has a zero width or height
    EmptyFrame { width: u32, height: u32 },
    /// Converter indexing would read past the end of a plane
    BufferBounds {
        plane: Plane,
        index: usize,
        len: usize,
    },
    /// The frame processor failed or returned a wrongly sized buffer
    Processor(ProcessorError),
    /// Draw or upload requested before the surface was initialized
    SurfaceState(String),
    /// Surface initialization failed (no program or texture available)
    SurfaceInit(String),
    /// Configuration could not be read or written
    Config(String),
    /// I/O error
    Io(String),
}

/// Frame processor errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// The processing stage reported a failure
    Failed(String),
    /// Output length does not match `width * height * 4`
    OutputSize { expected: usize, actual: usize },
}

impl PipelineError {
    /// True for errors that only affect the current frame or draw call
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyFrame { .. }
                | PipelineError::BufferBounds { .. }
                | PipelineError::Processor(_)
                | PipelineError::SurfaceState(_)
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::EmptyFrame { width, height } => {
                write!(f, "Empty frame: {}x{}", width, height)
            }
            PipelineError::BufferBounds { plane, index, len } => write!(
                f,
                "Buffer bounds error: index {} outside {} plane of {} bytes",
                index, plane, len
            ),
            PipelineError::Processor(e) => write!(f, "Processor error: {}", e),
            PipelineError::SurfaceState(msg) => write!(f, "Surface state error: {}", msg),
            PipelineError::SurfaceInit(msg) => {
                write!(f, "Surface initialization failed: {}", msg)
            }
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorError::Failed(msg) => write!(f, "{}", msg),
            ProcessorError::OutputSize { expected, actual } => write!(
                f,
                "output has {} bytes, expected {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for ProcessorError {}

impl From<ProcessorError> for PipelineError {
    fn from(err: ProcessorError) -> Self {
        PipelineError::Processor(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl From<String> for ProcessorError {
    fn from(msg: String) -> Self {
        ProcessorError::Failed(msg)
    }
}

impl From<&str> for ProcessorError {
    fn from(msg: &str) -> Self {
        ProcessorError::Failed(msg.to_string())
    }
}
