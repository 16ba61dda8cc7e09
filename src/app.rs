use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::InitError;
use crate::gpu::{GpuContext, SurfaceErrorAction};
use crate::input::Input;
use crate::quad_pass::QuadPass;
use crate::shader::ShaderProgram;
use crate::texture::Texture;
use crate::transforms::{FrameTransforms, TransformChain};

/// Configuration for the app window and its assets.
///
/// Paths are resolved against the working directory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub texture: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// Background color as sRGB components.
    pub clear_color: [f64; 4],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Coordinate Spaces".to_string(),
            width: 800,
            height: 600,
            texture: PathBuf::from("assets/container.png"),
            vertex_shader: PathBuf::from("assets/shaders/coordinates.vert.wgsl"),
            fragment_shader: PathBuf::from("assets/shaders/coordinates.frag.wgsl"),
            clear_color: [0.2, 0.3, 0.3, 1.0],
        }
    }
}

impl AppConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial window size in logical pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the texture image path.
    pub fn texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture = path.into();
        self
    }

    /// Set the vertex and fragment shader paths.
    pub fn shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
        self
    }

    /// Set the background color, as sRGB components.
    pub fn clear_color(mut self, r: f64, g: f64, b: f64, a: f64) -> Self {
        self.clear_color = [r, g, b, a];
        self
    }
}

/// Open the window and run the frame loop until it is closed.
///
/// Returns once the window has closed and every GPU resource has been
/// released. Any failure before the first frame is returned as an
/// [`InitError`].
pub fn run(config: AppConfig) -> Result<(), InitError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        state: AppState::Pending { config },
        init_error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.init_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct App {
    state: AppState,
    init_error: Option<InitError>,
}

enum AppState {
    Pending { config: AppConfig },
    Running(Box<Running>),
    Closing,
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    quad: QuadPass,
    input: Input,
    chain: TransformChain,
    clear_color: wgpu::Color,
    start_time: Instant,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, InitError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;

        let program = ShaderProgram::compile(&gpu, &config.vertex_shader, &config.fragment_shader)?;
        let texture = Texture::load_or_white(&gpu, &config.texture);
        let quad = QuadPass::new(&gpu, &program, texture)?;

        let clear_color = surface_clear_color(config.clear_color, gpu.config.format.is_srgb());

        log::info!(
            "window ready: {}x{} ({:?})",
            gpu.width(),
            gpu.height(),
            gpu.config.format
        );

        Ok(Self {
            window,
            gpu,
            quad,
            input: Input::new(),
            chain: TransformChain::default(),
            clear_color,
            start_time: Instant::now(),
        })
    }

    /// One tick of the frame loop. Returns `false` when the loop should close.
    fn frame(&mut self) -> bool {
        if self.input.key_down(KeyCode::Escape) {
            log::info!("escape pressed");
            return false;
        }

        if self.input.key_pressed(KeyCode::Space) {
            self.chain = self.chain.toggled();
            log::info!("positioning quad with {:?} chain", self.chain);
        }

        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            // minimized; nothing to present
            self.input.begin_frame();
            self.window.request_redraw();
            return true;
        }

        let time = self.start_time.elapsed().as_secs_f32();
        let transforms = FrameTransforms::compute(time, self.gpu.width(), self.gpu.height());
        self.quad.update(&self.gpu, &transforms, time, self.chain);

        if let Err(err) = draw_frame(&self.gpu, &self.quad, self.clear_color) {
            let message = err.to_string();
            match self.gpu.handle_surface_error(err) {
                SurfaceErrorAction::Fatal => {
                    log::error!("surface error: {message}");
                    return false;
                }
                action => log::debug!("surface error: {message} ({action:?})"),
            }
        }

        self.input.begin_frame();
        self.window.request_redraw();
        true
    }

    fn shutdown(self) {
        let Running { window, quad, .. } = self;
        quad.release();
        drop(window);
        log::info!("shut down");
    }
}

impl App {
    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let AppState::Running(running) = std::mem::replace(&mut self.state, AppState::Closing) {
            running.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config } = &self.state else {
            return;
        };

        match Running::new(event_loop, config) {
            Ok(running) => {
                running.window.request_redraw();
                self.state = AppState::Running(Box::new(running));
            }
            Err(e) => {
                self.init_error = Some(e);
                self.state = AppState::Closing;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.close(event_loop);
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
                log::debug!("framebuffer resized to {}x{}", size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if !running.frame() {
                    self.close(event_loop);
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.close(event_loop);
    }
}

/// Clear, draw the quad and present.
fn draw_frame(
    gpu: &GpuContext,
    quad: &QuadPass,
    clear_color: wgpu::Color,
) -> Result<(), wgpu::SurfaceError> {
    let output = gpu.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Quad Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        quad.render(&mut render_pass);
    }

    gpu.queue.submit(std::iter::once(encoder.finish()));
    output.present();
    Ok(())
}

/// Convert an sRGB clear color for the surface.
///
/// An sRGB surface encodes on write, so the value has to be linear to come
/// out as the configured sRGB color.
fn surface_clear_color([r, g, b, a]: [f64; 4], srgb_surface: bool) -> wgpu::Color {
    if !srgb_surface {
        return wgpu::Color { r, g, b, a };
    }

    wgpu::Color {
        r: srgb_to_linear(r),
        g: srgb_to_linear(g),
        b: srgb_to_linear(b),
        a,
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_classic_setup() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.clear_color, [0.2, 0.3, 0.3, 1.0]);
        assert_eq!(config.texture, PathBuf::from("assets/container.png"));
    }

    #[test]
    fn builder_overrides_fields() {
        let config = AppConfig::new()
            .title("Tilted")
            .size(1280, 720)
            .texture("wall.jpg")
            .shaders("a.wgsl", "b.wgsl")
            .clear_color(0.0, 0.0, 0.0, 1.0);

        assert_eq!(config.title, "Tilted");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.texture, PathBuf::from("wall.jpg"));
        assert_eq!(config.vertex_shader, PathBuf::from("a.wgsl"));
        assert_eq!(config.fragment_shader, PathBuf::from("b.wgsl"));
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn clear_color_passes_through_on_linear_surface() {
        let c = surface_clear_color([0.2, 0.3, 0.3, 1.0], false);
        assert_eq!((c.r, c.g, c.b, c.a), (0.2, 0.3, 0.3, 1.0));
    }

    #[test]
    fn clear_color_is_linearized_for_srgb_surface() {
        let c = surface_clear_color([0.2, 0.3, 0.3, 1.0], true);
        assert!((c.r - 0.0331).abs() < 1e-3);
        assert!((c.g - 0.0732).abs() < 1e-3);
        assert_eq!(c.a, 1.0);

        // endpoints are fixed
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-12);
    }
}
