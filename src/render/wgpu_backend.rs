// SPDX-License-Identifier: GPL-3.0-only

//! wgpu implementation of the graphics backend
//!
//! Draws into an offscreen RGBA surface texture sized by the viewport.
//! The surface can be read back with [`WgpuBackend::read_surface`] for
//! snapshots and tests.

use super::quad::{FULLSCREEN_QUAD, QuadVertex};
use super::{GraphicsBackend, QUAD_SHADER};
use crate::constants::RGBA_BYTES_PER_PIXEL;
use crate::errors::{PipelineError, PipelineResult};
use std::sync::Arc;
use tracing::{debug, error, info};
use wgpu::util::DeviceExt;

/// Surface and frame texture format
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Compiled quad program
pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
}

/// Frame texture with its bind group
pub struct WgpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl WgpuTexture {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

struct SurfaceTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Renders the display quad with wgpu
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    target: SurfaceTarget,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    /// Create a backend drawing into a `width` x `height` surface
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, width: u32, height: u32) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera-pipeline frame bind group layout"),
            entries: &[
                // Frame texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Bilinear, edge-clamped
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("camera-pipeline frame sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let target = create_target(&device, width.max(1), height.max(1));

        Self {
            device,
            queue,
            bind_group_layout,
            sampler,
            target,
            clear_color: wgpu::Color::BLACK,
        }
    }

    /// Color the surface is cleared to before the quad is drawn
    pub fn set_clear_color(&mut self, rgba: [f64; 4]) {
        self.clear_color = wgpu::Color {
            r: rgba[0],
            g: rgba[1],
            b: rgba[2],
            a: rgba[3],
        };
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    fn allocate_texture(&self, width: u32, height: u32) -> WgpuTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("camera-pipeline frame texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera-pipeline frame bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        WgpuTexture {
            texture,
            bind_group,
            width,
            height,
        }
    }

    fn write_texture(&self, texture: &WgpuTexture, rgba: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(texture.width * RGBA_BYTES_PER_PIXEL as u32),
                rows_per_image: Some(texture.height),
            },
            wgpu::Extent3d {
                width: texture.width,
                height: texture.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Read the surface back as tightly packed RGBA, top row first
    pub fn read_surface(&self) -> PipelineResult<Vec<u8>> {
        let SurfaceTarget {
            texture,
            width,
            height,
            ..
        } = &self.target;
        let (width, height) = (*width, *height);

        let row_bytes = width * RGBA_BYTES_PER_PIXEL as u32;
        let padded_bytes_per_row = (row_bytes + 255) & !255; // Align to 256 bytes

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera-pipeline surface readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("camera-pipeline readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());

        pollster::block_on(receiver)
            .map_err(|_| PipelineError::SurfaceState("surface readback cancelled".into()))?
            .map_err(|e| PipelineError::SurfaceState(format!("surface readback failed: {}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let mut output = Vec::with_capacity((row_bytes * height) as usize);
        if padded_bytes_per_row == row_bytes {
            output.extend_from_slice(&data[..(row_bytes * height) as usize]);
        } else {
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                output.extend_from_slice(&data[start..start + row_bytes as usize]);
            }
        }
        drop(data);
        staging_buffer.unmap();

        Ok(output)
    }

    /// Compile `source` into the quad pipeline
    ///
    /// Shader and pipeline validation errors are returned as `SurfaceInit`.
    fn build_program(&self, source: &str) -> PipelineResult<WgpuProgram> {
        // Validation errors would otherwise reach the uncaptured handler
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("camera-pipeline quad shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("camera-pipeline quad pipeline layout"),
                bind_group_layouts: &[&self.bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("camera-pipeline quad pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[QuadVertex::layout()],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TEXTURE_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            });

        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            error!(error = %e, "Quad program failed validation");
            return Err(PipelineError::SurfaceInit(format!("quad program invalid: {}", e)));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("camera-pipeline quad vertices"),
                contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
                usage: wgpu::BufferUsages::VERTEX,
            });

        info!("Quad program created");
        Ok(WgpuProgram {
            pipeline,
            vertex_buffer,
        })
    }
}

fn create_target(device: &wgpu::Device, width: u32, height: u32) -> SurfaceTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("camera-pipeline surface"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    SurfaceTarget {
        texture,
        view,
        width,
        height,
    }
}

impl GraphicsBackend for WgpuBackend {
    type Program = WgpuProgram;
    type Texture = WgpuTexture;

    fn create_program(&mut self) -> PipelineResult<WgpuProgram> {
        self.build_program(QUAD_SHADER)
    }

    fn create_texture(&mut self) -> PipelineResult<WgpuTexture> {
        // 1x1 black placeholder until the first frame arrives
        let texture = self.allocate_texture(1, 1);
        self.write_texture(&texture, &[0, 0, 0, 255]);
        Ok(texture)
    }

    fn specify_texture(
        &mut self,
        texture: &mut WgpuTexture,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> PipelineResult<()> {
        let expected = width as usize * height as usize * RGBA_BYTES_PER_PIXEL;
        if rgba.len() != expected || width == 0 || height == 0 {
            return Err(PipelineError::SurfaceState(format!(
                "texture data has {} bytes, {}x{} needs {}",
                rgba.len(),
                width,
                height,
                expected
            )));
        }

        if texture.size() != (width, height) {
            debug!(width, height, "Reallocating frame texture");
            *texture = self.allocate_texture(width, height);
        }
        self.write_texture(texture, rgba);
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (self.target.width, self.target.height) != (width, height) {
            self.target = create_target(&self.device, width, height);
        }
    }

    fn draw_quad(&mut self, program: &WgpuProgram, texture: &WgpuTexture) -> PipelineResult<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("camera-pipeline draw encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("camera-pipeline quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_viewport(
                0.0,
                0.0,
                self.target.width as f32,
                self.target.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &texture.bind_group, &[]);
            render_pass.set_vertex_buffer(0, program.vertex_buffer.slice(..));
            render_pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
