//! Shader programs loaded from disk and the uniform block they share.
//!
//! A [`ShaderProgram`] is a vertex module and a fragment module compiled from
//! two WGSL files. Both declare the same uniform struct at
//! `@group(0) @binding(0)`:
//!
//! ```wgsl
//! struct Uniforms {
//!     model: mat4x4f,
//!     view: mat4x4f,
//!     projection: mat4x4f,
//!     transform: mat4x4f,
//!     time: f32,
//!     chain: u32,
//! }
//! ```
//!
//! The struct is reflected from the WGSL when the program is compiled, so
//! uniforms are addressed by the names and offsets the shader actually
//! declares. Look the slots up once through
//! [`ShaderProgram::uniform_location`], keep them, and write values into a
//! [`UniformBlock`] each frame. The block is uploaded with a single
//! `write_buffer`.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Mat4;

use crate::error::InitError;
use crate::gpu::GpuContext;

/// Vertex stage entry point expected in the vertex shader file.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Fragment stage entry point expected in the fragment shader file.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Bind group and binding of the uniform struct.
const UNIFORM_GROUP: u32 = 0;
const UNIFORM_BINDING: u32 = 0;

/// Type of a uniform field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    F32,
    U32,
}

impl UniformKind {
    pub const fn size(self) -> u32 {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::F32 | UniformKind::U32 => 4,
        }
    }

    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        match *inner {
            naga::TypeInner::Matrix {
                columns: naga::VectorSize::Quad,
                rows: naga::VectorSize::Quad,
                scalar,
            } if scalar == naga::Scalar::F32 => Some(UniformKind::Mat4),
            naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => {
                Some(UniformKind::F32)
            }
            naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::U32 => {
                Some(UniformKind::U32)
            }
            _ => None,
        }
    }
}

/// A resolved uniform location: byte offset and type within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Field names, offsets and total size of the uniform struct, as declared in
/// WGSL.
///
/// Fields of a type the renderer cannot write (vectors, arrays) are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    size: u32,
    fields: Vec<(String, UniformSlot)>,
}

impl UniformLayout {
    /// Reflect the `@group(0) @binding(0)` uniform struct from WGSL source.
    ///
    /// A shader without a uniform struct yields an empty layout. Parse errors
    /// are returned as a formatted diagnostic.
    pub fn from_wgsl(source: &str) -> Result<Self, String> {
        let module =
            naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
        Ok(Self::from_module(&module))
    }

    fn from_module(module: &naga::Module) -> Self {
        let block = module.global_variables.iter().find_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            let is_uniform = var.space == naga::AddressSpace::Uniform
                && binding.group == UNIFORM_GROUP
                && binding.binding == UNIFORM_BINDING;
            is_uniform.then_some(var.ty)
        });

        let Some(ty) = block else {
            return Self::default();
        };
        let naga::TypeInner::Struct { members, span } = &module.types[ty].inner else {
            return Self::default();
        };

        let fields = members
            .iter()
            .filter_map(|member| {
                let name = member.name.clone()?;
                let kind = UniformKind::from_naga(&module.types[member.ty].inner)?;
                Some((
                    name,
                    UniformSlot {
                        offset: member.offset,
                        kind,
                    },
                ))
            })
            .collect();

        Self {
            size: *span,
            fields,
        }
    }

    /// Look up a field by name.
    pub fn location(&self, name: &str) -> Option<UniformSlot> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, slot)| *slot)
    }

    /// Size of the struct in bytes, including trailing padding.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// CPU-side copy of the uniform buffer contents.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    bytes: Vec<u8>,
}

impl UniformBlock {
    /// A zeroed block sized for `layout`.
    pub fn new(layout: &UniformLayout) -> Self {
        Self {
            bytes: vec![0; layout.size() as usize],
        }
    }

    /// Write a matrix in column-major order.
    pub fn set_mat4(&mut self, slot: UniformSlot, value: &Mat4) {
        debug_assert_eq!(slot.kind, UniformKind::Mat4);
        self.write(slot, bytemuck::cast_slice(&value.to_cols_array()));
    }

    pub fn set_f32(&mut self, slot: UniformSlot, value: f32) {
        debug_assert_eq!(slot.kind, UniformKind::F32);
        self.write(slot, bytemuck::bytes_of(&value));
    }

    pub fn set_u32(&mut self, slot: UniformSlot, value: u32) {
        debug_assert_eq!(slot.kind, UniformKind::U32);
        self.write(slot, bytemuck::bytes_of(&value));
    }

    /// Raw bytes for `Queue::write_buffer`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, slot: UniformSlot, data: &[u8]) {
        debug_assert_eq!(data.len(), slot.kind.size() as usize);
        let start = slot.offset as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
    }
}

/// A WGSL source file read from disk.
pub struct ShaderSource {
    path: PathBuf,
    source: String,
}

impl ShaderSource {
    /// Read a shader from the given file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InitError> {
        let path = path.as_ref().to_path_buf();
        let source = fs::read_to_string(&path).map_err(|source| InitError::ShaderIo {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, source })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reflect this file's uniform struct.
    pub fn uniform_layout(&self) -> Result<UniformLayout, InitError> {
        UniformLayout::from_wgsl(&self.source).map_err(|message| InitError::ShaderCompile {
            path: self.path.clone(),
            message,
        })
    }
}

/// Compiled vertex and fragment modules plus their shared uniform layout.
pub struct ShaderProgram {
    pub(crate) vertex: wgpu::ShaderModule,
    pub(crate) fragment: wgpu::ShaderModule,
    uniforms: UniformLayout,
}

impl ShaderProgram {
    /// Read and compile both stages.
    ///
    /// Validation errors are captured with an error scope and returned as
    /// [`InitError::ShaderCompile`] rather than aborting the process. The two
    /// stages must agree on the uniform struct if both declare one.
    pub fn compile(
        gpu: &GpuContext,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, InitError> {
        let vertex_source = ShaderSource::load(vertex_path)?;
        let fragment_source = ShaderSource::load(fragment_path)?;
        let uniforms = shared_layout(&vertex_source, &fragment_source)?;

        let vertex = compile_module(gpu, &vertex_source)?;
        let fragment = compile_module(gpu, &fragment_source)?;

        Ok(Self {
            vertex,
            fragment,
            uniforms,
        })
    }

    /// Look up a uniform by its field name in the `Uniforms` struct.
    pub fn uniform_location(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.location(name)
    }

    pub fn uniform_layout(&self) -> &UniformLayout {
        &self.uniforms
    }
}

/// The uniform layout both stages see.
fn shared_layout(
    vertex: &ShaderSource,
    fragment: &ShaderSource,
) -> Result<UniformLayout, InitError> {
    let vertex_layout = vertex.uniform_layout()?;
    let fragment_layout = fragment.uniform_layout()?;

    if vertex_layout.is_empty() {
        return Ok(fragment_layout);
    }
    if !fragment_layout.is_empty() && fragment_layout != vertex_layout {
        return Err(InitError::ShaderCompile {
            path: fragment.path().to_path_buf(),
            message: format!(
                "uniform struct differs from the one in '{}'",
                vertex.path().display()
            ),
        });
    }
    Ok(vertex_layout)
}

fn compile_module(
    gpu: &GpuContext,
    shader: &ShaderSource,
) -> Result<wgpu::ShaderModule, InitError> {
    let label = shader.path().display().to_string();

    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = gpu
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(shader.source().into()),
        });

    if let Some(err) = pollster::block_on(gpu.device.pop_error_scope()) {
        return Err(InitError::ShaderCompile {
            path: shader.path().to_path_buf(),
            message: err.to_string(),
        });
    }

    log::debug!("compiled shader '{}'", label);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFORMS: &str = "
        struct Uniforms {
            model: mat4x4f,
            view: mat4x4f,
            projection: mat4x4f,
            transform: mat4x4f,
            time: f32,
            chain: u32,
        }
        @group(0) @binding(0) var<uniform> u: Uniforms;
    ";

    fn bundled(name: &str) -> ShaderSource {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        ShaderSource::load(root.join("assets/shaders").join(name)).unwrap()
    }

    fn layout(source: &str) -> UniformLayout {
        UniformLayout::from_wgsl(source).unwrap()
    }

    #[test]
    fn uniform_offsets_follow_wgsl_layout() {
        let layout = layout(UNIFORMS);

        let expected = [
            ("model", 0, UniformKind::Mat4),
            ("view", 64, UniformKind::Mat4),
            ("projection", 128, UniformKind::Mat4),
            ("transform", 192, UniformKind::Mat4),
            ("time", 256, UniformKind::F32),
            ("chain", 260, UniformKind::U32),
        ];
        for (name, offset, kind) in expected {
            assert_eq!(layout.location(name), Some(UniformSlot { offset, kind }), "{name}");
        }
        // rounded up to the struct's 16-byte alignment
        assert_eq!(layout.size(), 272);
    }

    #[test]
    fn unknown_uniform_is_none() {
        let layout = layout(UNIFORMS);
        assert_eq!(layout.location("normal_matrix"), None);
        assert_eq!(layout.location(""), None);
        assert_eq!(layout.location("Model"), None);
    }

    #[test]
    fn reordered_fields_move_their_offsets() {
        let layout = layout(
            "
            struct Uniforms {
                time: f32,
                chain: u32,
                model: mat4x4f,
            }
            @group(0) @binding(0) var<uniform> u: Uniforms;
            ",
        );

        assert_eq!(layout.location("time").map(|s| s.offset), Some(0));
        assert_eq!(layout.location("chain").map(|s| s.offset), Some(4));
        assert_eq!(layout.location("model").map(|s| s.offset), Some(16));
        assert_eq!(layout.location("view"), None);
        assert_eq!(layout.size(), 80);
    }

    #[test]
    fn shader_without_uniforms_has_empty_layout() {
        let layout = layout("@fragment fn fs_main() -> @location(0) vec4f { return vec4f(1.0); }");
        assert!(layout.is_empty());
        assert_eq!(layout.location("model"), None);
    }

    #[test]
    fn unsupported_field_types_are_skipped() {
        let layout = layout(
            "
            struct Uniforms { tint: vec4f, time: f32 }
            @group(0) @binding(0) var<uniform> u: Uniforms;
            ",
        );
        assert_eq!(layout.location("tint"), None);
        assert_eq!(layout.location("time").map(|s| s.offset), Some(16));
    }

    #[test]
    fn parse_error_is_reported() {
        let err = UniformLayout::from_wgsl("struct Uniforms { model: mat4x4f ").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn mat4_is_written_column_major_at_its_offset() {
        let layout = layout(UNIFORMS);
        let mut block = UniformBlock::new(&layout);
        let m = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);
        block.set_mat4(layout.location("view").unwrap(), &m);

        let floats: Vec<f32> = block.as_bytes()[64..128]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(floats, m.to_cols_array());
        // neighbours untouched
        assert!(block.as_bytes()[..64].iter().all(|&b| b == 0));
        assert!(block.as_bytes()[128..].iter().all(|&b| b == 0));
    }

    #[test]
    fn scalars_are_written_after_matrices() {
        let layout = layout(UNIFORMS);
        let mut block = UniformBlock::new(&layout);
        block.set_f32(layout.location("time").unwrap(), 3.6);
        block.set_u32(layout.location("chain").unwrap(), 1);

        let bytes = block.as_bytes();
        assert_eq!(bytes.len(), 272);
        assert_eq!(f32::from_ne_bytes(bytes[256..260].try_into().unwrap()), 3.6);
        assert_eq!(u32::from_ne_bytes(bytes[260..264].try_into().unwrap()), 1);
    }

    #[test]
    fn missing_shader_file_is_an_init_error() {
        let err = ShaderSource::load("assets/shaders/nope.wgsl").err().unwrap();
        assert!(matches!(err, InitError::ShaderIo { .. }));
    }

    #[test]
    fn bundled_shaders_share_one_uniform_layout() {
        let vertex = bundled("coordinates.vert.wgsl");
        let fragment = bundled("coordinates.frag.wgsl");

        let shared = shared_layout(&vertex, &fragment).unwrap();
        assert_eq!(shared, layout(UNIFORMS));
        assert!(vertex.source().contains(VERTEX_ENTRY));
        assert!(fragment.source().contains(FRAGMENT_ENTRY));
    }

    #[test]
    fn stages_with_different_uniform_structs_are_rejected() {
        let vertex = bundled("coordinates.vert.wgsl");
        let fragment = ShaderSource {
            path: PathBuf::from("drifted.frag.wgsl"),
            source: "
                struct Uniforms { time: f32 }
                @group(0) @binding(0) var<uniform> u: Uniforms;
            "
            .to_string(),
        };

        let err = shared_layout(&vertex, &fragment).unwrap_err();
        assert!(matches!(err, InitError::ShaderCompile { ref path, .. }
            if path == Path::new("drifted.frag.wgsl")));
    }
}
