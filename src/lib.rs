//! # Coordinate Spaces
//!
//! A textured quad carried through the standard chain of coordinate spaces:
//!
//! ```text
//! local --model--> world --view--> view --projection--> clip --divide--> NDC --viewport--> screen
//! ```
//!
//! The quad is tilted back onto the floor by the model matrix, pushed three
//! units away by the view matrix and projected with a 45° perspective. A
//! separate spin matrix rotates about Z over time; press `Space` to position
//! the quad with it instead, `Escape` to quit.
//!
//! ```no_run
//! use coordinate_spaces::{AppConfig, run};
//!
//! fn main() {
//!     if let Err(e) = run(AppConfig::default()) {
//!         eprintln!("{e}");
//!         std::process::exit(-1);
//!     }
//! }
//! ```
//!
//! The matrix math in [`transforms`] is pure and usable on its own.

mod app;
mod error;
mod gpu;
mod input;
pub mod logging;
mod mesh;
mod quad_pass;
mod shader;
mod texture;
pub mod transforms;

pub use app::{AppConfig, run};
pub use error::{AssetError, InitError};
pub use gpu::{GpuContext, SurfaceErrorAction};
pub use input::Input;
pub use mesh::{Mesh, QUAD_INDICES, QUAD_VERTICES, Vertex};
pub use quad_pass::{QuadPass, UniformSlots};
pub use shader::{
    ShaderProgram, ShaderSource, UniformBlock, UniformKind, UniformLayout, UniformSlot,
};
pub use texture::{Texture, TextureData};
pub use transforms::{FrameTransforms, TransformChain};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec3, Vec4};

// Re-export the winit key type used by Input
pub use winit::keyboard::KeyCode;
