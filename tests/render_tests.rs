// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the renderer state machine and the render thread

use camera_pipeline::render::{DrawOutcome, RenderHost, SurfaceEvent};
use camera_pipeline::{
    FrameSlot, GraphicsBackend, PipelineError, PipelineResult, PlaneBuffer, PreviewPipeline,
    ProcessedFrame, ProcessorError, RawFrame, ReleaseCounter, Renderer, RendererState,
};
use std::sync::Arc;

/// Upload as seen by the fake backend
#[derive(Debug, Clone, PartialEq, Eq)]
struct Upload {
    width: u32,
    height: u32,
    bytes: usize,
    all_zero: bool,
}

/// Graphics backend that records calls instead of touching a GPU
#[derive(Debug, Default)]
struct RecordingBackend {
    programs: usize,
    uploads: Vec<Upload>,
    viewports: Vec<(u32, u32)>,
    draws: usize,
    fail_texture: bool,
}

impl GraphicsBackend for RecordingBackend {
    type Program = usize;
    type Texture = Option<(u32, u32)>;

    fn create_program(&mut self) -> PipelineResult<usize> {
        self.programs += 1;
        Ok(self.programs)
    }

    fn create_texture(&mut self) -> PipelineResult<Self::Texture> {
        if self.fail_texture {
            return Err(PipelineError::SurfaceInit("out of texture memory".into()));
        }
        Ok(None)
    }

    fn specify_texture(
        &mut self,
        texture: &mut Self::Texture,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> PipelineResult<()> {
        *texture = Some((width, height));
        self.uploads.push(Upload {
            width,
            height,
            bytes: rgba.len(),
            all_zero: rgba.iter().all(|&b| b == 0),
        });
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewports.push((width, height));
    }

    fn draw_quad(&mut self, _program: &usize, _texture: &Self::Texture) -> PipelineResult<()> {
        self.draws += 1;
        Ok(())
    }
}

fn raw_frame(width: u32, height: u32) -> RawFrame {
    let chroma = ((width / 2) * (height / 2)) as usize;
    RawFrame::new(
        width,
        height,
        PlaneBuffer::new(vec![128; (width * height) as usize], width, 1),
        PlaneBuffer::new(vec![128; chroma], width / 2, 1),
        PlaneBuffer::new(vec![128; chroma], width / 2, 1),
    )
}

fn zero_stub(_nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ProcessorError> {
    Ok(vec![0; (width * height * 4) as usize])
}

#[test]
fn test_end_to_end_640x480() {
    let slot = Arc::new(FrameSlot::new());
    let mut renderer = Renderer::new(RecordingBackend::default(), Arc::clone(&slot));
    renderer.on_surface_created().expect("surface");
    renderer.on_size_changed(1080, 1920);

    let mut pipeline = PreviewPipeline::new(zero_stub, Arc::clone(&slot), || {});
    let counter = ReleaseCounter::new();
    pipeline
        .ingest(counter.tag(raw_frame(640, 480)))
        .expect("frame accepted");
    assert_eq!(counter.outstanding(), 0);

    let outcome = renderer.on_draw_requested().expect("draw without error");
    assert_eq!(outcome.uploaded, Some((640, 480)));
    assert_eq!(renderer.texture_size(), Some((640, 480)));
    assert_eq!(
        renderer.backend().uploads,
        vec![Upload {
            width: 640,
            height: 480,
            bytes: 640 * 480 * 4,
            all_zero: true,
        }]
    );
    assert_eq!(renderer.backend().draws, 1);
}

#[test]
fn test_draw_before_surface_is_rejected() {
    let slot = Arc::new(FrameSlot::new());
    slot.publish(ProcessedFrame {
        width: 2,
        height: 2,
        rgba: vec![0; 16],
        source_sequence: 0,
    });
    let mut renderer = Renderer::new(RecordingBackend::default(), Arc::clone(&slot));

    let err = renderer.on_draw_requested().unwrap_err();
    assert!(matches!(err, PipelineError::SurfaceState(_)));
    assert!(err.is_frame_local());
    // The pending frame is still there for the first real draw
    assert!(slot.has_unseen());
    assert!(renderer.backend().uploads.is_empty());
}

#[test]
fn test_redraw_without_new_frame_still_draws() {
    let slot = Arc::new(FrameSlot::new());
    let mut renderer = Renderer::new(RecordingBackend::default(), Arc::clone(&slot));
    renderer.on_surface_created().expect("surface");

    // Nothing published yet: draws the placeholder texture
    assert_eq!(renderer.on_draw_requested().expect("draw"), DrawOutcome::default());

    slot.publish(ProcessedFrame {
        width: 4,
        height: 4,
        rgba: vec![0; 64],
        source_sequence: 1,
    });
    renderer.on_draw_requested().expect("draw");
    let again = renderer.on_draw_requested().expect("redraw");

    assert_eq!(again.uploaded, None);
    assert_eq!(renderer.backend().draws, 3);
    assert_eq!(renderer.backend().uploads.len(), 1);
    assert_eq!(renderer.state(), RendererState::Idle);
}

#[test]
fn test_viewport_resize_does_not_touch_texture() {
    let slot = Arc::new(FrameSlot::new());
    let mut renderer = Renderer::new(RecordingBackend::default(), Arc::clone(&slot));
    renderer.on_surface_created().expect("surface");

    slot.publish(ProcessedFrame {
        width: 4,
        height: 2,
        rgba: vec![0; 32],
        source_sequence: 1,
    });
    renderer.on_draw_requested().expect("draw");

    renderer.on_size_changed(320, 240);
    renderer.on_size_changed(640, 480);

    assert_eq!(renderer.backend().viewports, vec![(320, 240), (640, 480)]);
    assert_eq!(renderer.backend().uploads.len(), 1);
    assert_eq!(renderer.texture_size(), Some((4, 2)));
}

#[test]
fn test_surface_init_failure_is_escalated() {
    let backend = RecordingBackend {
        fail_texture: true,
        ..Default::default()
    };
    let mut renderer = Renderer::new(backend, Arc::new(FrameSlot::new()));
    let err = renderer.on_surface_created().unwrap_err();
    assert!(matches!(err, PipelineError::SurfaceInit(_)));
    assert_eq!(renderer.state(), RendererState::Uninitialized);
}

#[test]
fn test_render_host_draws_once_per_request() {
    let slot = Arc::new(FrameSlot::new());
    let host = RenderHost::spawn(
        || Ok(RecordingBackend::default()),
        Arc::clone(&slot),
        800,
        600,
    )
    .expect("render thread");

    let redraw = host.redraw_handle();
    let mut pipeline = PreviewPipeline::new(zero_stub, Arc::clone(&slot), redraw.clone());
    for _ in 0..3 {
        pipeline.ingest(raw_frame(16, 16)).expect("frame accepted");
    }
    host.resize(1024, 768);
    host.send(SurfaceEvent::DrawRequested);
    assert_eq!(redraw.requested(), 3);

    let renderer = host.shutdown().expect("render thread joined");
    assert_eq!(renderer.draw_count(), 4);
    assert_eq!(renderer.viewport(), Some((1024, 768)));
    assert_eq!(renderer.backend().viewports, vec![(800, 600), (1024, 768)]);
    // Every upload is a full frame, at most one per draw
    assert!(!renderer.backend().uploads.is_empty());
    assert!(renderer.backend().uploads.len() <= 3);
}

#[test]
fn test_render_host_reports_init_failure() {
    let result = RenderHost::<RecordingBackend>::spawn(
        || Err(PipelineError::SurfaceInit("no adapter".into())),
        Arc::new(FrameSlot::new()),
        640,
        480,
    );
    assert!(matches!(result, Err(PipelineError::SurfaceInit(_))));
}
