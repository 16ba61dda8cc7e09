//! Per-frame coordinate-space matrices.
//!
//! A vertex starts in local space and is carried to clip space by three
//! matrices, read right to left:
//!
//! ```text
//! clip = projection * view * model * local
//! ```
//!
//! - `model` lays the quad on the floor by tilting it -55° about X.
//! - `view` pushes the whole scene 3 units down -Z, which reads as the camera
//!   stepping backwards.
//! - `projection` is a 45° perspective frustum from 0.1 to 100.0 whose aspect
//!   ratio follows the framebuffer.
//!
//! A fourth matrix, `spin`, rotates about Z at 50°/s. It is not part of the
//! chain above; the vertex shader picks one chain or the other.
//!
//! Everything here is recomputed from scratch every frame. There is no
//! cached state, so a resize is reflected on the very next frame.
//!
//! # Example
//!
//! ```
//! use coordinate_spaces::FrameTransforms;
//! use glam::Vec4;
//!
//! let t = FrameTransforms::compute(0.0, 800, 600);
//! let clip = t.clip_position(Vec4::new(0.5, 0.5, 0.0, 1.0));
//! let ndc = FrameTransforms::to_ndc(clip);
//! assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
//! ```

use glam::{Mat4, Vec3, Vec4};

/// Tilt applied to the quad about the X axis, in degrees.
pub const MODEL_TILT_DEGREES: f32 = -55.0;
/// Translation applied to the world to move it in front of the camera.
pub const VIEW_TRANSLATION: Vec3 = Vec3::new(0.0, 0.0, -3.0);
/// Vertical field of view, in degrees.
pub const FOV_Y_DEGREES: f32 = 45.0;
/// Near clipping plane distance.
pub const Z_NEAR: f32 = 0.1;
/// Far clipping plane distance.
pub const Z_FAR: f32 = 100.0;
/// Angular speed of the spin matrix, in degrees per second.
pub const SPIN_DEGREES_PER_SECOND: f32 = 50.0;

/// The four matrices uploaded each frame, in column-major `f32` layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransforms {
    /// Local space to world space.
    pub model: Mat4,
    /// World space to view space.
    pub view: Mat4,
    /// View space to clip space.
    pub projection: Mat4,
    /// Independent Z rotation driven by elapsed time. Uploaded as `transform`.
    pub spin: Mat4,
    /// Aspect ratio the projection was built with (`width / height`).
    pub aspect: f32,
}

impl FrameTransforms {
    /// Compute all matrices for a frame.
    ///
    /// `time_secs` is the elapsed time since startup. `width` and `height` are
    /// the framebuffer size in pixels; a zero dimension (minimized window) is
    /// treated as 1 so the aspect ratio stays finite.
    pub fn compute(time_secs: f32, width: u32, height: u32) -> Self {
        let aspect = aspect_ratio(width, height);

        Self {
            model: model_matrix(),
            view: view_matrix(),
            projection: projection_matrix(aspect),
            spin: spin_matrix(time_secs),
            aspect,
        }
    }

    /// `projection * view * model`.
    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }

    /// Carry a local-space position to clip space through the MVP chain.
    pub fn clip_position(&self, local: Vec4) -> Vec4 {
        self.projection * (self.view * (self.model * local))
    }

    /// Perspective division: clip space to normalized device coordinates.
    pub fn to_ndc(clip: Vec4) -> Vec3 {
        clip.truncate() / clip.w
    }
}

/// Which matrix chain the vertex shader uses to position the quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformChain {
    /// `projection * view * model * local`
    #[default]
    ModelViewProjection,
    /// `spin * local`
    Spin,
}

impl TransformChain {
    /// The other chain.
    pub fn toggled(self) -> Self {
        match self {
            TransformChain::ModelViewProjection => TransformChain::Spin,
            TransformChain::Spin => TransformChain::ModelViewProjection,
        }
    }

    /// Value of the `chain` uniform.
    pub fn as_uniform(self) -> u32 {
        match self {
            TransformChain::ModelViewProjection => 0,
            TransformChain::Spin => 1,
        }
    }
}

/// `width / height`, with zero dimensions clamped to 1.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// Fixed "lay the plane on the floor" pose.
pub fn model_matrix() -> Mat4 {
    Mat4::from_rotation_x(MODEL_TILT_DEGREES.to_radians())
}

/// Moving the camera backwards is the same as moving the world forwards.
pub fn view_matrix() -> Mat4 {
    Mat4::from_translation(VIEW_TRANSLATION)
}

/// Right-handed perspective projection with wgpu's `[0, 1]` depth range.
pub fn projection_matrix(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}

/// Rotation about +Z by `time_secs * 50°`.
pub fn spin_matrix(time_secs: f32) -> Mat4 {
    Mat4::from_rotation_z(spin_angle_degrees(time_secs).to_radians())
}

/// Spin angle at `time_secs`, wrapped into `[0, 360)`.
///
/// Wrapping does not change the rotation, but keeps the radian argument small
/// so `f32` precision holds up over long sessions.
pub fn spin_angle_degrees(time_secs: f32) -> f32 {
    (time_secs * SPIN_DEGREES_PER_SECOND).rem_euclid(360.0)
}
