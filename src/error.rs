//! Error types for startup and asset loading.
//!
//! Two kinds of failure exist:
//!
//! - [`InitError`] is fatal. Nothing can be drawn without a window, a GPU
//!   device and a compiled shader, so the binary logs it and exits with `-1`.
//! - [`AssetError`] is recoverable. A texture that fails to load is reported
//!   as a warning and the quad is drawn with its vertex colors only.

use std::path::PathBuf;

/// Fatal errors raised while bringing up the window, GPU or shaders.
#[derive(Debug)]
pub enum InitError {
    /// The winit event loop could not be created.
    EventLoop(winit::error::EventLoopError),
    /// The OS window could not be created.
    Window(winit::error::OsError),
    /// A wgpu surface could not be created for the window.
    Surface(wgpu::CreateSurfaceError),
    /// No adapter compatible with the surface was found.
    Adapter(wgpu::RequestAdapterError),
    /// The logical device and queue could not be created.
    Device(wgpu::RequestDeviceError),
    /// The surface reported no usable texture formats.
    NoSurfaceFormat,
    /// A shader source file could not be read.
    ShaderIo { path: PathBuf, source: std::io::Error },
    /// A shader failed validation.
    ShaderCompile { path: PathBuf, message: String },
    /// The shader program does not declare a uniform the renderer writes.
    MissingUniform(&'static str),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            InitError::Window(e) => write!(f, "Failed to create window: {}", e),
            InitError::Surface(e) => write!(f, "Failed to create surface: {}", e),
            InitError::Adapter(e) => write!(f, "Failed to find a suitable GPU adapter: {}", e),
            InitError::Device(e) => write!(f, "Failed to create device: {}", e),
            InitError::NoSurfaceFormat => write!(f, "Surface reports no supported formats"),
            InitError::ShaderIo { path, source } => {
                write!(f, "Failed to read shader '{}': {}", path.display(), source)
            }
            InitError::ShaderCompile { path, message } => {
                write!(f, "Failed to compile shader '{}': {}", path.display(), message)
            }
            InitError::MissingUniform(name) => {
                write!(f, "Shader program has no uniform named '{}'", name)
            }
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::EventLoop(e) => Some(e),
            InitError::Window(e) => Some(e),
            InitError::Surface(e) => Some(e),
            InitError::Adapter(e) => Some(e),
            InitError::Device(e) => Some(e),
            InitError::ShaderIo { source, .. } => Some(source),
            InitError::NoSurfaceFormat
            | InitError::ShaderCompile { .. }
            | InitError::MissingUniform(_) => None,
        }
    }
}

impl From<winit::error::EventLoopError> for InitError {
    fn from(e: winit::error::EventLoopError) -> Self {
        InitError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for InitError {
    fn from(e: winit::error::OsError) -> Self {
        InitError::Window(e)
    }
}

impl From<wgpu::CreateSurfaceError> for InitError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        InitError::Surface(e)
    }
}

impl From<wgpu::RequestAdapterError> for InitError {
    fn from(e: wgpu::RequestAdapterError) -> Self {
        InitError::Adapter(e)
    }
}

impl From<wgpu::RequestDeviceError> for InitError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        InitError::Device(e)
    }
}

/// Recoverable errors raised while loading a texture from disk.
#[derive(Debug)]
pub enum AssetError {
    /// The file could not be opened or read.
    Io { path: PathBuf, source: std::io::Error },
    /// The file was read but is not a decodable image.
    Decode { path: PathBuf, source: image::ImageError },
}

impl AssetError {
    /// Path of the asset that failed to load.
    pub fn path(&self) -> &std::path::Path {
        match self {
            AssetError::Io { path, .. } | AssetError::Decode { path, .. } => path,
        }
    }
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetError::Io { path, source } => {
                write!(f, "Failed to read texture '{}': {}", path.display(), source)
            }
            AssetError::Decode { path, source } => {
                write!(f, "Failed to decode texture '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            AssetError::Decode { source, .. } => Some(source),
        }
    }
}
