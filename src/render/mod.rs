// SPDX-License-Identifier: GPL-3.0-only

//! On-demand display renderer
//!
//! The renderer owns the draw program and the frame texture and only draws
//! when asked. Each draw request takes the newest frame from the
//! [`FrameSlot`] if there is one, re-specifies the texture with it, and
//! then draws the full-screen quad. Without a new frame it redraws the
//! previous texture contents, so a requested redraw is never a no-op.
//!
//! ```text
//!                on_surface_created
//! Uninitialized ───────────────────▶ SurfaceReady
//!       ▲                                 │ on_draw_requested
//!       │ on_surface_destroyed            ▼
//!       └──────────────────────────  Idle ⇄ Drawing
//! ```
//!
//! GPU specifics live behind [`GraphicsBackend`]; [`wgpu_backend`] is the
//! real implementation.

pub mod host;
pub mod quad;
pub mod wgpu_backend;

pub use host::{RedrawHandle, RenderHost, SurfaceEvent};
pub use quad::{FULLSCREEN_QUAD, QuadVertex};
pub use wgpu_backend::WgpuBackend;

use crate::errors::{PipelineError, PipelineResult};
use crate::pipelines::preview::FrameSlot;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// WGSL source of the quad program
pub const QUAD_SHADER: &str = include_str!("shader.wgsl");

/// GPU operations the renderer needs
///
/// Textures are created with bilinear filtering and edge-clamped wrapping.
pub trait GraphicsBackend {
    type Program;
    type Texture;

    /// Compile and link the full-screen quad program
    fn create_program(&mut self) -> PipelineResult<Self::Program>;

    /// Allocate a texture object with its fixed sampling parameters
    fn create_texture(&mut self) -> PipelineResult<Self::Texture>;

    /// Replace the texture's pixel store with `rgba`
    ///
    /// Reallocates the backing store when `width`/`height` differ from the
    /// previous specification.
    fn specify_texture(
        &mut self,
        texture: &mut Self::Texture,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> PipelineResult<()>;

    /// Update the viewport transform
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Draw the quad sampling `texture` into the surface
    fn draw_quad(&mut self, program: &Self::Program, texture: &Self::Texture) -> PipelineResult<()>;
}

/// Renderer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// No surface, no program, no texture
    Uninitialized,
    /// Program and texture exist, nothing drawn yet
    SurfaceReady,
    /// Between draws
    Idle,
    /// Inside `on_draw_requested`
    Drawing,
}

/// What a single draw did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawOutcome {
    /// Dimensions of the frame uploaded before drawing, if any
    pub uploaded: Option<(u32, u32)>,
    /// The texture backing store was (re)allocated for the upload
    pub reallocated: bool,
    /// A new frame was taken but its upload failed; the previous texture was drawn
    pub upload_failed: bool,
}

struct SurfaceResources<B: GraphicsBackend> {
    program: B::Program,
    texture: B::Texture,
    texture_size: Option<(u32, u32)>,
}

/// Display renderer driven by surface lifecycle callbacks
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    slot: Arc<FrameSlot>,
    surface: Option<SurfaceResources<B>>,
    state: RendererState,
    viewport: Option<(u32, u32)>,
    draws: u64,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B, slot: Arc<FrameSlot>) -> Self {
        Self {
            backend,
            slot,
            surface: None,
            state: RendererState::Uninitialized,
            viewport: None,
            draws: 0,
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Dimensions of the last uploaded frame
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().and_then(|s| s.texture_size)
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    /// Number of completed draws
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create the program and the texture for a new surface
    ///
    /// Calling this again (after a lost context) rebuilds both.
    ///
    /// # Returns
    /// * `Ok(())` - The renderer is in `SurfaceReady`
    /// * `Err(PipelineError::SurfaceInit)` - No usable program or texture; the renderer stays `Uninitialized`
    pub fn on_surface_created(&mut self) -> PipelineResult<()> {
        if self.surface.is_some() {
            info!("Surface recreated, rebuilding GPU resources");
            self.on_surface_destroyed();
        }

        let program = self.backend.create_program().map_err(into_surface_init)?;
        let texture = self.backend.create_texture().map_err(into_surface_init)?;

        if let Some((width, height)) = self.viewport {
            self.backend.set_viewport(width, height);
        }

        self.surface = Some(SurfaceResources {
            program,
            texture,
            texture_size: None,
        });
        self.state = RendererState::SurfaceReady;
        info!("Renderer surface ready");
        Ok(())
    }

    /// Update the viewport, leaving the texture untouched
    pub fn on_size_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "Viewport changed");
        self.viewport = Some((width, height));
        if self.surface.is_some() {
            self.backend.set_viewport(width, height);
        }
    }

    /// Draw once, uploading the newest frame first if there is one
    ///
    /// # Returns
    /// * `Ok(DrawOutcome)` - The quad was drawn
    /// * `Err(PipelineError::SurfaceState)` - No surface yet, nothing drawn
    /// * `Err(_)` - Backend draw failure for this call only
    ///
    /// A failed upload drops that frame and still draws the previous
    /// texture; it is reported through [`DrawOutcome::upload_failed`].
    pub fn on_draw_requested(&mut self) -> PipelineResult<DrawOutcome> {
        let Some(surface) = self.surface.as_mut() else {
            let err = PipelineError::SurfaceState("draw requested before surface creation".into());
            warn!(error = %err, "Skipping draw");
            return Err(err);
        };

        self.state = RendererState::Drawing;
        let mut outcome = DrawOutcome::default();

        if let Some(frame) = self.slot.take_if_new() {
            let size = (frame.width, frame.height);
            match self
                .backend
                .specify_texture(&mut surface.texture, frame.width, frame.height, &frame.rgba)
            {
                Ok(()) => {
                    outcome.reallocated = surface.texture_size != Some(size);
                    outcome.uploaded = Some(size);
                    surface.texture_size = Some(size);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        sequence = frame.source_sequence,
                        "Texture upload failed, drawing previous texture"
                    );
                    outcome.upload_failed = true;
                }
            }
        }

        let result = self.backend.draw_quad(&surface.program, &surface.texture);
        self.state = RendererState::Idle;
        result?;

        self.draws += 1;
        debug!(
            uploaded = outcome.uploaded.is_some(),
            reallocated = outcome.reallocated,
            upload_failed = outcome.upload_failed,
            draws = self.draws,
            "Frame drawn"
        );
        Ok(outcome)
    }

    /// Release the program and texture with the surface
    pub fn on_surface_destroyed(&mut self) {
        if self.surface.take().is_some() {
            info!("Renderer surface destroyed");
        }
        self.state = RendererState::Uninitialized;
    }
}

fn into_surface_init(error: PipelineError) -> PipelineError {
    match error {
        PipelineError::SurfaceInit(_) => error,
        other => PipelineError::SurfaceInit(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::preview::ProcessedFrame;

    /// Records backend calls instead of touching a GPU
    #[derive(Default)]
    struct RecordingBackend {
        uploads: Vec<(u32, u32)>,
        viewports: Vec<(u32, u32)>,
        draws: usize,
        fail_program: bool,
        reject_width: Option<u32>,
    }

    impl GraphicsBackend for RecordingBackend {
        type Program = ();
        type Texture = Option<(u32, u32)>;

        fn create_program(&mut self) -> PipelineResult<()> {
            if self.fail_program {
                return Err(PipelineError::Io("shader compile failed".into()));
            }
            Ok(())
        }

        fn create_texture(&mut self) -> PipelineResult<Self::Texture> {
            Ok(None)
        }

        fn specify_texture(
            &mut self,
            texture: &mut Self::Texture,
            width: u32,
            height: u32,
            _rgba: &[u8],
        ) -> PipelineResult<()> {
            if self.reject_width == Some(width) {
                return Err(PipelineError::SurfaceState("upload rejected".into()));
            }
            *texture = Some((width, height));
            self.uploads.push((width, height));
            Ok(())
        }

        fn set_viewport(&mut self, width: u32, height: u32) {
            self.viewports.push((width, height));
        }

        fn draw_quad(&mut self, _program: &(), _texture: &Self::Texture) -> PipelineResult<()> {
            self.draws += 1;
            Ok(())
        }
    }

    fn frame(width: u32, height: u32) -> ProcessedFrame {
        ProcessedFrame {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
            source_sequence: 0,
        }
    }

    #[test]
    fn test_draw_before_init_is_surface_state_error() {
        let mut renderer = Renderer::new(RecordingBackend::default(), Arc::new(FrameSlot::new()));
        let err = renderer.on_draw_requested().unwrap_err();
        assert!(matches!(err, PipelineError::SurfaceState(_)));
        assert_eq!(renderer.backend().draws, 0);
    }

    #[test]
    fn test_init_failure_escalates_as_surface_init() {
        let backend = RecordingBackend {
            fail_program: true,
            ..Default::default()
        };
        let mut renderer = Renderer::new(backend, Arc::new(FrameSlot::new()));
        let err = renderer.on_surface_created().unwrap_err();
        assert!(matches!(err, PipelineError::SurfaceInit(_)));
        assert!(!err.is_frame_local());
        assert_eq!(renderer.state(), RendererState::Uninitialized);
    }

    #[test]
    fn test_state_transitions() {
        let slot = Arc::new(FrameSlot::new());
        let mut renderer = Renderer::new(RecordingBackend::default(), Arc::clone(&slot));
        assert_eq!(renderer.state(), RendererState::Uninitialized);

        renderer.on_surface_created().expect("surface");
        assert_eq!(renderer.state(), RendererState::SurfaceReady);

        renderer.on_draw_requested().expect("draw");
        assert_eq!(renderer.state(), RendererState::Idle);

        renderer.on_surface_destroyed();
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert_eq!(renderer.texture_size(), None);
    }

    #[test]
    fn test_upload_only_when_new_and_realloc_on_size_change() {
        let slot = Arc::new(FrameSlot::new());
        let mut renderer = Renderer::new(RecordingBackend::default(), Arc::clone(&slot));
        renderer.on_surface_created().expect("surface");

        slot.publish(frame(4, 2));
        let first = renderer.on_draw_requested().expect("draw");
        assert_eq!(first.uploaded, Some((4, 2)));
        assert!(first.reallocated);

        let redraw = renderer.on_draw_requested().expect("redraw");
        assert_eq!(redraw, DrawOutcome::default());

        slot.publish(frame(4, 2));
        let same_size = renderer.on_draw_requested().expect("draw");
        assert!(!same_size.reallocated);

        slot.publish(frame(8, 8));
        let resized = renderer.on_draw_requested().expect("draw");
        assert!(resized.reallocated);

        assert_eq!(renderer.backend().uploads, vec![(4, 2), (4, 2), (8, 8)]);
        assert_eq!(renderer.backend().draws, 4);
        assert_eq!(renderer.draw_count(), 4);
    }

    #[test]
    fn test_viewport_before_surface_is_applied_on_creation() {
        let mut renderer = Renderer::new(RecordingBackend::default(), Arc::new(FrameSlot::new()));
        renderer.on_size_changed(800, 600);
        assert!(renderer.backend().viewports.is_empty());

        renderer.on_surface_created().expect("surface");
        assert_eq!(renderer.backend().viewports, vec![(800, 600)]);

        renderer.on_size_changed(1024, 768);
        assert_eq!(renderer.viewport(), Some((1024, 768)));
        assert!(renderer.backend().uploads.is_empty());
    }

    #[test]
    fn test_failed_upload_still_draws_previous_texture() {
        let slot = Arc::new(FrameSlot::new());
        let backend = RecordingBackend {
            reject_width: Some(2),
            ..Default::default()
        };
        let mut renderer = Renderer::new(backend, Arc::clone(&slot));
        renderer.on_surface_created().expect("surface");

        slot.publish(frame(4, 4));
        renderer.on_draw_requested().expect("draw");

        slot.publish(frame(2, 2));
        let outcome = renderer.on_draw_requested().expect("draw despite upload failure");

        assert!(outcome.upload_failed);
        assert_eq!(outcome.uploaded, None);
        assert_eq!(renderer.texture_size(), Some((4, 4)));
        assert_eq!(renderer.backend().draws, 2);
        assert_eq!(renderer.draw_count(), 2);
        assert_eq!(renderer.state(), RendererState::Idle);
        // The rejected frame was consumed
        assert!(!slot.has_unseen());
    }
}
