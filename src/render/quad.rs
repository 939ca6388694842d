// SPDX-License-Identifier: GPL-3.0-only

//! Full-screen quad geometry

use bytemuck::{Pod, Zeroable};

/// Vertex of the display quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Clip-space position
    pub position: [f32; 2],
    /// Texture coordinate, (0, 0) is the first byte of the uploaded frame
    pub tex_coords: [f32; 2],
}

const fn vertex(x: f32, y: f32, u: f32, v: f32) -> QuadVertex {
    QuadVertex {
        position: [x, y],
        tex_coords: [u, v],
    }
}

/// Two triangles covering the viewport
///
/// Clip-space y grows upwards while frame rows grow downwards, so the top
/// edge (y = +1) samples v = 0: the first sensor row is drawn at the top.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    vertex(-1.0, -1.0, 0.0, 1.0),
    vertex(1.0, -1.0, 1.0, 1.0),
    vertex(-1.0, 1.0, 0.0, 0.0),
    vertex(-1.0, 1.0, 0.0, 0.0),
    vertex(1.0, -1.0, 1.0, 1.0),
    vertex(1.0, 1.0, 1.0, 0.0),
];

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    /// Vertex buffer layout matching `shader.wgsl`
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
