//! Quad geometry and its GPU buffers.
//!
//! - [`Vertex`] — interleaved position, color and texture coordinate
//! - [`QUAD_VERTICES`] / [`QUAD_INDICES`] — the unit quad drawn every frame
//! - [`Mesh`] — vertex and index buffers uploaded once at startup
//!
//! # Vertex Layout
//!
//! Each vertex is 8 floats (32 bytes):
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | color     | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use crate::gpu::GpuContext;

/// A vertex with position, color and texture coordinates.
///
/// `#[repr(C)]` plus [`bytemuck::Pod`] lets a slice of vertices be cast
/// straight to bytes for upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in local space.
    pub position: [f32; 3],
    /// Linear RGB color, multiplied with the sampled texel.
    pub color: [f32; 3],
    /// Texture coordinates in `[0, 1]`.
    pub uv: [f32; 2],
}

impl Vertex {
    /// Number of `f32` values per vertex.
    pub const FLOATS: usize = 8;

    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // color
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub const fn new(position: [f32; 3], color: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            color,
            uv,
        }
    }
}

/// Unit quad centered on the origin in the XY plane.
#[rustfmt::skip]
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([ 0.5,  0.5, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0]), // top right
    Vertex::new([ 0.5, -0.5, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0]), // bottom right
    Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]), // bottom left
    Vertex::new([-0.5,  0.5, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0]), // top left
];

/// Two triangles covering [`QUAD_VERTICES`].
#[rustfmt::skip]
pub const QUAD_INDICES: [u32; 6] = [
    0, 1, 3,
    1, 2, 3,
];

/// GPU-resident geometry: one vertex buffer and one `u32` index buffer.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Upload vertex and index data to new GPU buffers.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        debug_assert!(
            indices.iter().all(|&i| (i as usize) < vertices.len()),
            "index out of range for {} vertices",
            vertices.len()
        );

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// The textured unit quad.
    pub fn quad(gpu: &GpuContext) -> Self {
        Self::new(gpu, &QUAD_VERTICES, &QUAD_INDICES)
    }

    /// Number of indices submitted per draw.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Free the GPU buffers now instead of waiting for the last reference to drop.
    pub(crate) fn release(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_is_eight_floats() {
        assert_eq!(
            std::mem::size_of::<Vertex>(),
            Vertex::FLOATS * std::mem::size_of::<f32>()
        );
        assert_eq!(Vertex::LAYOUT.array_stride, 32);
    }

    #[test]
    fn attributes_are_interleaved_in_order() {
        let offsets: Vec<u64> = Vertex::LAYOUT.attributes.iter().map(|a| a.offset).collect();
        let locations: Vec<u32> = Vertex::LAYOUT
            .attributes
            .iter()
            .map(|a| a.shader_location)
            .collect();

        assert_eq!(offsets, [0, 12, 24]);
        assert_eq!(locations, [0, 1, 2]);
    }

    #[test]
    fn quad_casts_to_flat_floats() {
        let floats: &[f32] = bytemuck::cast_slice(&QUAD_VERTICES);
        assert_eq!(floats.len(), 4 * Vertex::FLOATS);
        // second vertex: position, color, uv
        assert_eq!(&floats[8..16], &[0.5, -0.5, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn quad_indices_form_two_triangles_over_four_vertices() {
        assert_eq!(QUAD_INDICES.len() % 3, 0);
        assert_eq!(QUAD_INDICES.len() / 3, 2);
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));

        // Every vertex is used
        for v in 0..QUAD_VERTICES.len() as u32 {
            assert!(QUAD_INDICES.contains(&v));
        }
    }

    #[test]
    fn quad_spans_unit_square() {
        for v in &QUAD_VERTICES {
            assert_eq!(v.position[0].abs(), 0.5);
            assert_eq!(v.position[1].abs(), 0.5);
            assert_eq!(v.position[2], 0.0);
            // uv follows position
            assert_eq!(v.uv[0], v.position[0] + 0.5);
            assert_eq!(v.uv[1], v.position[1] + 0.5);
        }
    }
}
