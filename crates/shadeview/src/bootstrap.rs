use anyhow::{anyhow, bail, Result};
use control::ControlConfig;
use renderer::{
    CameraSettings, GraphicsBackend, ModeRegistry, RendererConfig, ShaderPaths, WindowConfig,
};
use viewconfig::{BackendSetting, ViewConfig};

use crate::cli::RunArgs;

/// Everything `run` needs after CLI flags have been layered over the config.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub mode: String,
    pub renderer_config: RendererConfig,
    pub blend_strength: f32,
    /// `None` when the channel is disabled or the mode ignores it.
    pub control: Option<ControlConfig>,
    pub stop_control_on_exit: bool,
}

pub fn build_launch_plan(
    args: &RunArgs,
    config: &ViewConfig,
    registry: &ModeRegistry,
) -> Result<LaunchPlan> {
    let mode = args
        .mode
        .clone()
        .unwrap_or_else(|| config.shaders.mode.clone());
    let shader_root = args
        .shader_root
        .clone()
        .unwrap_or_else(|| config.shaders.root.clone());
    let spec = registry.create(&mode, &shader_root).ok_or_else(|| {
        let available: Vec<_> = registry.describe().map(|(id, _)| id).collect();
        anyhow!(
            "unknown mode '{mode}'; available modes: {}",
            available.join(", ")
        )
    })?;

    let (width, height) = match args.size.as_deref() {
        Some(value) => parse_surface_size(value)?,
        None => (config.window.width, config.window.height),
    };

    let target_fps = match args.fps {
        Some(fps) if !fps.is_finite() || fps < 0.0 => bail!("--fps must be >= 0"),
        Some(fps) if fps == 0.0 => None,
        Some(fps) => Some(fps),
        None => config.window.fps,
    };

    let blend_strength = args.blend_strength.unwrap_or(config.params.blend_strength);
    if !blend_strength.is_finite() {
        bail!("blend strength must be a finite number");
    }

    let control = (config.control.enabled && !args.no_control && spec.remote_control).then(|| {
        ControlConfig {
            host: args
                .host
                .clone()
                .unwrap_or_else(|| config.control.host.clone()),
            port: args.port.unwrap_or(config.control.port),
        }
    });

    let renderer_config = RendererConfig {
        window: WindowConfig {
            width,
            height,
            title: config.window.title.clone().unwrap_or(spec.title),
            target_fps,
            backend: args
                .backend
                .unwrap_or_else(|| map_backend(config.window.backend)),
        },
        camera: CameraSettings {
            position: config.camera.position,
            move_speed: config.camera.move_speed,
            mouse_sensitivity: config.camera.mouse_sensitivity,
            capture_mouse: config.camera.capture_mouse,
        },
        shaders: ShaderPaths {
            vertex: spec.vertex_shader,
            fragment: spec.fragment_shader,
        },
    };

    Ok(LaunchPlan {
        mode,
        renderer_config,
        blend_strength,
        control,
        stop_control_on_exit: config.control.stop_on_exit,
    })
}

fn map_backend(setting: BackendSetting) -> GraphicsBackend {
    match setting {
        BackendSetting::Auto => GraphicsBackend::Auto,
        BackendSetting::Vulkan => GraphicsBackend::Vulkan,
        BackendSetting::Metal => GraphicsBackend::Metal,
        BackendSetting::Dx12 => GraphicsBackend::Dx12,
        BackendSetting::Gl => GraphicsBackend::Gl,
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow!("expected WxH format, e.g. 1280x800"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid width in window size"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid height in window size"))?;

    if width == 0 || height == 0 {
        bail!("window dimensions must be greater than zero");
    }

    Ok((width, height))
}
