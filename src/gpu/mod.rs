// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization
//!
//! Explicit, once-per-process device creation for the display renderer.
//! Failure is returned to the caller as [`PipelineError::SurfaceInit`]
//! rather than aborting the process.

use crate::errors::{PipelineError, PipelineResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Software rasterizer (llvmpipe, SwiftShader, ...)
    pub is_software: bool,
}

/// Create a wgpu device and queue for rendering
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
///
/// # Returns
///
/// A tuple of (Device, Queue, GpuDeviceInfo), or `SurfaceInit` when no
/// adapter or device is available
pub async fn create_render_device(
    label: &str,
) -> PipelineResult<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo)> {
    info!(label = label, "Creating GPU device for rendering");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| PipelineError::SurfaceInit(format!("no suitable GPU adapter: {}", e)))?;

    let adapter_info = adapter.get_info();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        device_type = ?adapter_info.device_type,
        "GPU adapter selected for rendering"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| PipelineError::SurfaceInit(format!("failed to create GPU device: {}", e)))?;

    debug!(label = label, "GPU device created");

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        is_software: adapter_info.device_type == wgpu::DeviceType::Cpu,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}

/// Blocking wrapper for threads without an async runtime
pub fn create_render_device_blocking(
    label: &str,
) -> PipelineResult<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo)> {
    pollster::block_on(create_render_device(label))
}
