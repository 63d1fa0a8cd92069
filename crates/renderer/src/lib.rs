//! Renderer crate for Shadeview.
//!
//! Glues a winit window, a `wgpu` pipeline, and a first-person camera around
//! a single full-screen quad whose fragment shader does all the drawing.
//!
//! ```text
//!   shadeview CLI
//!        │ RendererConfig
//!        ▼
//!   Viewer::run ──▶ compile_program ──▶ WinitSurface + GpuState
//!                                              │
//!                                              ▼
//!                                   RenderLoop::run ◀── BlendStrength
//! ```
//!
//! Shaders are ordinary GLSL with loose `uniform` declarations; see
//! [`program`] for how they are mapped onto a single uniform buffer.
//! [`RenderLoop`] only talks to the [`InputSurface`] and [`GraphicsDevice`]
//! traits so it can be exercised without a display.

mod camera;
mod device;
mod gpu;
mod input;
mod loader;
mod modes;
pub mod program;
mod render_loop;
mod runtime;
mod types;
mod uniforms;
mod window;

use anyhow::{Context, Result};
use params::BlendStrength;
use tracing::info;

pub use camera::Camera;
pub use device::GraphicsDevice;
pub use gpu::GpuState;
pub use input::{InputSurface, MoveKeys, ViewerEvent};
pub use loader::{read_shader, LoaderError};
pub use modes::{ModeFactory, ModeRegistry, ModeSpec, DEFAULT_MODE};
pub use program::{compile_program, ProgramError, ShaderProgram, Stage};
pub use render_loop::{LoopError, LoopOptions, LoopState, RenderLoop};
pub use runtime::{BoxedTimeSource, FrameLimiter, SystemTimeSource, TimeSample, TimeSource};
pub use types::{
    CameraSettings, GraphicsBackend, RendererConfig, ShaderPaths, WindowConfig,
    DEFAULT_CAMERA_POSITION, DEFAULT_MOUSE_SENSITIVITY, DEFAULT_MOVE_SPEED, DEFAULT_TARGET_FPS,
    DEFAULT_WINDOW_SIZE,
};
pub use uniforms::{Uniform, UniformBlock, UniformSlot, UniformTable, UniformValue};
pub use window::WinitSurface;

/// Entry point that opens the window and blocks until it is closed.
pub struct Viewer {
    config: RendererConfig,
    blend: BlendStrength,
}

impl Viewer {
    pub fn new(config: RendererConfig, blend: BlendStrength) -> Self {
        Self { config, blend }
    }

    /// Compiles the configured shaders, opens the window, and runs frames
    /// until the user quits.
    pub fn run(&mut self) -> Result<()> {
        let program = load_program(&self.config.shaders)?;

        let surface = WinitSurface::new(&self.config.window)?;
        let device = GpuState::new(
            surface.window(),
            surface.size(),
            &program,
            self.config.window.backend,
        )?;
        info!(
            width = device.size().width,
            height = device.size().height,
            backend = %self.config.window.backend,
            "viewer window ready"
        );

        let options = LoopOptions {
            target_fps: self.config.window.target_fps,
            mouse_sensitivity: self.config.camera.mouse_sensitivity,
            capture_mouse: self.config.camera.capture_mouse,
        };
        let camera = Camera::new(&self.config.camera);
        let mut render_loop = RenderLoop::new(surface, device, camera, self.blend.clone(), options);
        render_loop.run()
    }
}

/// Reads and compiles both stages named by `paths`.
pub fn load_program(paths: &ShaderPaths) -> Result<ShaderProgram> {
    let vertex = read_shader(&paths.vertex)?;
    let fragment = read_shader(&paths.fragment)?;
    compile_program(&vertex, &fragment).with_context(|| {
        format!(
            "failed to build shader program from {} and {}",
            paths.vertex.display(),
            paths.fragment.display()
        )
    })
}
