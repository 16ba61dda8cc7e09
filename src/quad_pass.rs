//! Render pass for the textured quad.
//!
//! [`QuadPass`] owns every GPU object the frame loop draws with: the
//! pipeline, the uniform buffer, the quad's vertex and index buffers and its
//! texture. They are created once at startup and released once at shutdown
//! through [`QuadPass::release`].
//!
//! # Bind Groups
//!
//! - **Group 0**: the `Uniforms` block (`model`, `view`, `projection`,
//!   `transform`, `time`, `chain`), visible to both stages
//! - **Group 1**: texture and sampler
//!
//! # Frame Flow
//!
//! ```ignore
//! let transforms = FrameTransforms::compute(time, gpu.width(), gpu.height());
//! quad.update(&gpu, &transforms, time, chain);
//! quad.render(&mut render_pass);
//! ```

use crate::error::InitError;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex};
use crate::shader::{FRAGMENT_ENTRY, ShaderProgram, UniformBlock, UniformSlot, VERTEX_ENTRY};
use crate::texture::Texture;
use crate::transforms::{FrameTransforms, TransformChain};

/// Uniform slots resolved once after the program is compiled.
#[derive(Debug, Clone, Copy)]
pub struct UniformSlots {
    pub model: UniformSlot,
    pub view: UniformSlot,
    pub projection: UniformSlot,
    pub transform: UniformSlot,
    pub time: UniformSlot,
    pub chain: UniformSlot,
}

impl UniformSlots {
    /// Resolve every slot by name, e.g. through [`ShaderProgram::uniform_location`].
    pub fn resolve(lookup: impl Fn(&str) -> Option<UniformSlot>) -> Result<Self, InitError> {
        let slot = |name: &'static str| lookup(name).ok_or(InitError::MissingUniform(name));

        Ok(Self {
            model: slot("model")?,
            view: slot("view")?,
            projection: slot("projection")?,
            transform: slot("transform")?,
            time: slot("time")?,
            chain: slot("chain")?,
        })
    }

    /// Write one frame's values into `block`.
    pub fn write(
        &self,
        block: &mut UniformBlock,
        transforms: &FrameTransforms,
        time: f32,
        chain: TransformChain,
    ) {
        block.set_mat4(self.model, &transforms.model);
        block.set_mat4(self.view, &transforms.view);
        block.set_mat4(self.projection, &transforms.projection);
        block.set_mat4(self.transform, &transforms.spin);
        block.set_f32(self.time, time);
        block.set_u32(self.chain, chain.as_uniform());
    }
}

/// Draws the textured quad.
pub struct QuadPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
    slots: UniformSlots,
    uniforms: UniformBlock,
    mesh: Mesh,
    texture: Texture,
}

impl QuadPass {
    /// Build the pipeline around a compiled program and upload the quad.
    pub fn new(
        gpu: &GpuContext,
        program: &ShaderProgram,
        texture: Texture,
    ) -> Result<Self, InitError> {
        let device = &gpu.device;
        let layout = program.uniform_layout();
        let slots = UniformSlots::resolve(|name| program.uniform_location(name))?;

        // Uniform buffer (group 0)
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Uniforms"),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Quad Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Texture (group 1)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Quad Texture Bind Group Layout"),
                entries: &[
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
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Texture Bind Group"),
            layout: &texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        // The quad is visible from both sides once it spins, so no culling
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Quad Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group,
            slots,
            uniforms: UniformBlock::new(layout),
            mesh: Mesh::quad(gpu),
            texture,
        })
    }

    /// Write this frame's uniforms and upload them in one `write_buffer`.
    pub fn update(
        &mut self,
        gpu: &GpuContext,
        transforms: &FrameTransforms,
        time: f32,
        chain: TransformChain,
    ) {
        self.slots.write(&mut self.uniforms, transforms, time, chain);
        gpu.queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.as_bytes());
    }

    /// Bind everything and issue the indexed draw.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &self.texture_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.mesh.index_count(), 0, 0..1);
    }

    /// Destroy the GPU buffers and texture. Consumes the pass so it runs once.
    pub fn release(self) {
        self.uniform_buffer.destroy();
        self.mesh.release();
        self.texture.release();
        log::debug!("released quad buffers and texture");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{ShaderSource, UniformLayout};
    use std::path::Path;

    fn bundled_layout() -> UniformLayout {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let path = root.join("assets/shaders/coordinates.vert.wgsl");
        ShaderSource::load(path).unwrap().uniform_layout().unwrap()
    }

    fn mat_at(block: &UniformBlock, offset: usize) -> glam::Mat4 {
        let floats: Vec<f32> = block.as_bytes()[offset..offset + 64]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        glam::Mat4::from_cols_slice(&floats)
    }

    #[test]
    fn frame_uniforms_land_in_named_slots() {
        let layout = bundled_layout();
        let slots = UniformSlots::resolve(|name| layout.location(name)).unwrap();
        let transforms = FrameTransforms::compute(3.6, 800, 600);
        let mut block = UniformBlock::new(&layout);
        slots.write(&mut block, &transforms, 3.6, TransformChain::Spin);

        assert_eq!(mat_at(&block, 0), transforms.model);
        assert_eq!(mat_at(&block, 64), transforms.view);
        assert_eq!(mat_at(&block, 128), transforms.projection);
        assert_eq!(mat_at(&block, 192), transforms.spin);

        let bytes = block.as_bytes();
        assert_eq!(f32::from_ne_bytes(bytes[256..260].try_into().unwrap()), 3.6);
        assert_eq!(u32::from_ne_bytes(bytes[260..264].try_into().unwrap()), 1);
    }

    #[test]
    fn rewriting_overwrites_previous_frame() {
        let layout = bundled_layout();
        let slots = UniformSlots::resolve(|name| layout.location(name)).unwrap();
        let mut block = UniformBlock::new(&layout);

        slots.write(
            &mut block,
            &FrameTransforms::compute(1.0, 800, 600),
            1.0,
            TransformChain::Spin,
        );
        let next = FrameTransforms::compute(2.0, 1024, 512);
        slots.write(&mut block, &next, 2.0, TransformChain::ModelViewProjection);

        assert_eq!(mat_at(&block, 128), next.projection);
        assert_eq!(mat_at(&block, 192), next.spin);
        assert_eq!(u32::from_ne_bytes(block.as_bytes()[260..264].try_into().unwrap()), 0);
    }

    #[test]
    fn shader_without_chain_uniform_is_rejected() {
        let layout = UniformLayout::from_wgsl(
            "
            struct Uniforms {
                model: mat4x4f,
                view: mat4x4f,
                projection: mat4x4f,
                transform: mat4x4f,
                time: f32,
            }
            @group(0) @binding(0) var<uniform> u: Uniforms;
            ",
        )
        .unwrap();

        let err = UniformSlots::resolve(|name| layout.location(name)).unwrap_err();
        assert!(matches!(err, InitError::MissingUniform("chain")));
    }

    #[test]
    fn slots_follow_the_shader_field_order() {
        let layout = UniformLayout::from_wgsl(
            "
            struct Uniforms {
                time: f32,
                chain: u32,
                transform: mat4x4f,
                projection: mat4x4f,
                view: mat4x4f,
                model: mat4x4f,
            }
            @group(0) @binding(0) var<uniform> u: Uniforms;
            ",
        )
        .unwrap();
        let slots = UniformSlots::resolve(|name| layout.location(name)).unwrap();
        assert_eq!((slots.time.offset, slots.chain.offset), (0, 4));
        assert_eq!(slots.transform.offset, 16);
        assert_eq!(slots.model.offset, 208);

        let transforms = FrameTransforms::compute(0.5, 640, 480);
        let mut block = UniformBlock::new(&layout);
        slots.write(&mut block, &transforms, 0.5, TransformChain::Spin);
        assert_eq!(block.as_bytes().len(), 272);
        assert_eq!(mat_at(&block, 208), transforms.model);
        assert_eq!(mat_at(&block, 16), transforms.spin);
    }
}
