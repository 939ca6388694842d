// SPDX-License-Identifier: GPL-3.0-only

//! Render thread hosting a [`Renderer`]
//!
//! The host plays the role of the display surface: it owns the renderer on
//! a dedicated thread and feeds it surface lifecycle events in order.
//! [`RedrawHandle::request_redraw`] enqueues exactly one draw; nothing is
//! drawn without a request.

use super::{GraphicsBackend, Renderer};
use crate::errors::{PipelineError, PipelineResult};
use crate::pipelines::preview::{FrameSlot, RedrawRequester};
use futures::channel::{mpsc, oneshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Surface lifecycle events delivered to the render thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Surface (re)created, GPU resources must be built
    Created,
    /// Surface resized
    SizeChanged { width: u32, height: u32 },
    /// Draw one frame
    DrawRequested,
    /// Surface gone, GPU resources released
    Destroyed,
    /// Leave the render thread
    Shutdown,
}

/// Counters shared between the render thread and its handles
#[derive(Debug, Default)]
struct HostCounters {
    requested: AtomicU64,
    drawn: AtomicU64,
    failed: AtomicU64,
}

/// Cloneable handle that requests redraws from the render thread
#[derive(Clone)]
pub struct RedrawHandle {
    sender: mpsc::UnboundedSender<SurfaceEvent>,
    counters: Arc<HostCounters>,
}

impl RedrawHandle {
    /// Number of redraws requested through any handle
    pub fn requested(&self) -> u64 {
        self.counters.requested.load(Ordering::Acquire)
    }
}

impl RedrawRequester for RedrawHandle {
    fn request_redraw(&self) {
        if self.sender.unbounded_send(SurfaceEvent::DrawRequested).is_ok() {
            self.counters.requested.fetch_add(1, Ordering::AcqRel);
        } else {
            debug!("Redraw requested after render thread exit");
        }
    }
}

/// Owns the render thread
pub struct RenderHost<B: GraphicsBackend> {
    sender: mpsc::UnboundedSender<SurfaceEvent>,
    counters: Arc<HostCounters>,
    thread_handle: Option<JoinHandle<Option<Renderer<B>>>>,
}

impl<B> RenderHost<B>
where
    B: GraphicsBackend + Send + 'static,
    B::Program: Send + 'static,
    B::Texture: Send + 'static,
{
    /// Start the render thread and initialize the surface on it
    ///
    /// `make_backend` runs on the render thread. Blocks until the surface
    /// is ready.
    ///
    /// # Returns
    /// * `Ok(RenderHost)` - Surface created and sized, ready for redraws
    /// * `Err(PipelineError::SurfaceInit)` - Backend or surface creation failed, the thread has exited
    pub fn spawn<F>(make_backend: F, slot: Arc<FrameSlot>, width: u32, height: u32) -> PipelineResult<Self>
    where
        F: FnOnce() -> PipelineResult<B> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded();
        let (init_tx, init_rx) = oneshot::channel::<PipelineResult<()>>();
        let counters = Arc::new(HostCounters::default());
        let thread_counters = Arc::clone(&counters);

        info!(width, height, "Starting render thread");

        let thread_handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                let mut renderer = match make_backend() {
                    Ok(backend) => Renderer::new(backend, slot),
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return None;
                    }
                };

                if let Err(e) = renderer.on_surface_created() {
                    let _ = init_tx.send(Err(e));
                    return None;
                }
                renderer.on_size_changed(width, height);
                let _ = init_tx.send(Ok(()));

                run_event_loop(&mut renderer, receiver, &thread_counters);
                Some(renderer)
            })
            .map_err(|e| PipelineError::SurfaceInit(format!("failed to spawn render thread: {}", e)))?;

        let init = pollster::block_on(init_rx)
            .unwrap_or_else(|_| Err(PipelineError::SurfaceInit("render thread exited".into())));

        if let Err(e) = init {
            error!(error = %e, "Surface initialization failed");
            let _ = thread_handle.join();
            return Err(e);
        }

        Ok(Self {
            sender,
            counters,
            thread_handle: Some(thread_handle),
        })
    }
}

impl<B: GraphicsBackend> RenderHost<B> {
    pub fn redraw_handle(&self) -> RedrawHandle {
        RedrawHandle {
            sender: self.sender.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Forward a surface event to the render thread
    pub fn send(&self, event: SurfaceEvent) {
        if self.sender.unbounded_send(event).is_err() {
            warn!(?event, "Render thread gone, dropping surface event");
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.send(SurfaceEvent::SizeChanged { width, height });
    }

    /// Draws completed so far
    pub fn drawn(&self) -> u64 {
        self.counters.drawn.load(Ordering::Acquire)
    }

    /// Draws that returned an error
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Acquire)
    }

    /// Process every queued event, stop the thread and hand back the renderer
    pub fn shutdown(mut self) -> PipelineResult<Renderer<B>> {
        self.send(SurfaceEvent::Shutdown);
        let handle = self
            .thread_handle
            .take()
            .ok_or_else(|| PipelineError::SurfaceState("render thread already joined".into()))?;
        handle
            .join()
            .map_err(|_| PipelineError::SurfaceState("render thread panicked".into()))?
            .ok_or_else(|| PipelineError::SurfaceState("render thread has no renderer".into()))
    }
}

impl<B: GraphicsBackend> Drop for RenderHost<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!("RenderHost dropped, stopping render thread");
            let _ = self.sender.unbounded_send(SurfaceEvent::Shutdown);
            if handle.join().is_err() {
                warn!("Render thread panicked");
            }
        }
    }
}

fn run_event_loop<B: GraphicsBackend>(
    renderer: &mut Renderer<B>,
    receiver: mpsc::UnboundedReceiver<SurfaceEvent>,
    counters: &HostCounters,
) {
    for event in futures::executor::block_on_stream(receiver) {
        match event {
            SurfaceEvent::Created => {
                if let Err(e) = renderer.on_surface_created() {
                    error!(error = %e, "Surface re-creation failed");
                }
            }
            SurfaceEvent::SizeChanged { width, height } => renderer.on_size_changed(width, height),
            SurfaceEvent::DrawRequested => match renderer.on_draw_requested() {
                Ok(_) => {
                    counters.drawn.fetch_add(1, Ordering::AcqRel);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::AcqRel);
                    debug!(error = %e, "Draw skipped");
                }
            },
            SurfaceEvent::Destroyed => renderer.on_surface_destroyed(),
            SurfaceEvent::Shutdown => break,
        }
    }
    info!(draws = renderer.draw_count(), "Render thread exiting");
}
