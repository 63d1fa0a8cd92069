use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default window size in physical pixels.
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 800);
/// Default frame cap; `None` renders as fast as presentation allows.
pub const DEFAULT_TARGET_FPS: f32 = 60.0;
/// Where a new camera starts when no position is configured.
pub const DEFAULT_CAMERA_POSITION: [f32; 3] = [0.0, 1.0, 0.0];
/// Camera translation speed in world units per second.
pub const DEFAULT_MOVE_SPEED: f32 = 6.0;
/// Radians of rotation per pixel of mouse motion.
pub const DEFAULT_MOUSE_SENSITIVITY: f32 = 0.005;

/// Graphics API the GPU adapter should be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphicsBackend {
    /// Let wgpu pick from every backend available on the platform.
    #[default]
    Auto,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

impl GraphicsBackend {
    pub fn to_wgpu(self) -> wgpu::Backends {
        match self {
            GraphicsBackend::Auto => wgpu::Backends::all(),
            GraphicsBackend::Vulkan => wgpu::Backends::VULKAN,
            GraphicsBackend::Metal => wgpu::Backends::METAL,
            GraphicsBackend::Dx12 => wgpu::Backends::DX12,
            GraphicsBackend::Gl => wgpu::Backends::GL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GraphicsBackend::Auto => "auto",
            GraphicsBackend::Vulkan => "vulkan",
            GraphicsBackend::Metal => "metal",
            GraphicsBackend::Dx12 => "dx12",
            GraphicsBackend::Gl => "gl",
        }
    }
}

impl fmt::Display for GraphicsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphicsBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(GraphicsBackend::Auto),
            "vulkan" | "vk" => Ok(GraphicsBackend::Vulkan),
            "metal" => Ok(GraphicsBackend::Metal),
            "dx12" | "d3d12" => Ok(GraphicsBackend::Dx12),
            "gl" | "opengl" | "gles" => Ok(GraphicsBackend::Gl),
            other => Err(format!(
                "unknown graphics backend '{other}' (expected auto, vulkan, metal, dx12 or gl)"
            )),
        }
    }
}

/// Window creation and pacing options.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Frame cap; `None` disables the limiter.
    pub target_fps: Option<f32>,
    pub backend: GraphicsBackend,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_SIZE.0,
            height: DEFAULT_WINDOW_SIZE.1,
            title: "Shadeview".to_string(),
            target_fps: Some(DEFAULT_TARGET_FPS),
            backend: GraphicsBackend::Auto,
        }
    }
}

/// Initial camera placement and input tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    /// Whether the cursor starts captured.
    pub capture_mouse: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: DEFAULT_CAMERA_POSITION,
            move_speed: DEFAULT_MOVE_SPEED,
            mouse_sensitivity: DEFAULT_MOUSE_SENSITIVITY,
            capture_mouse: true,
        }
    }
}

/// Vertex and fragment stage sources on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

/// Everything [`crate::Viewer`] needs to open a window and start drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub window: WindowConfig,
    pub camera: CameraSettings,
    pub shaders: ShaderPaths,
}
