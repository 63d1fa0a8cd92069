use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Graphics API preference as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSetting {
    #[default]
    Auto,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewConfig {
    pub version: u32,
    pub window: WindowSection,
    pub camera: CameraSection,
    pub control: ControlSection,
    pub params: ParamsSection,
    pub shaders: ShadersSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    /// Frame cap; `0`, `"off"`, or `"uncapped"` disable it.
    #[serde(deserialize_with = "deserialize_fps")]
    pub fps: Option<f32>,
    /// Overrides the title the selected mode would use.
    pub title: Option<String>,
    pub backend: BackendSetting,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraSection {
    pub position: [f32; 3],
    /// World units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse motion.
    pub mouse_sensitivity: f32,
    pub capture_mouse: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlSection {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Shut the listener down once the window closes.
    pub stop_on_exit: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParamsSection {
    pub blend_strength: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShadersSection {
    /// Directory the mode's shader paths are resolved against.
    pub root: PathBuf,
    pub mode: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            window: WindowSection::default(),
            camera: CameraSection::default(),
            control: ControlSection::default(),
            params: ParamsSection::default(),
            shaders: ShadersSection::default(),
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            fps: Some(60.0),
            title: None,
            backend: BackendSetting::Auto,
        }
    }
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            position: [0.0, 1.0, 0.0],
            move_speed: 6.0,
            mouse_sensitivity: 0.005,
            capture_mouse: true,
        }
    }
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 8765,
            stop_on_exit: true,
        }
    }
}

impl Default for ParamsSection {
    fn default() -> Self {
        Self {
            blend_strength: 2.0,
        }
    }
}

impl Default for ShadersSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            mode: "effects".to_string(),
        }
    }
}

fn deserialize_fps<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Num(f64),
        Str(String),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Num(value) if value == 0.0 => Ok(None),
        Helper::Num(value) => Ok(Some(value as f32)),
        Helper::Str(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "off" | "uncapped" | "none" | "0" => Ok(None),
            other => other
                .parse::<f32>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid fps '{raw}'"))),
        },
    }
}

impl ViewConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Like [`ViewConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::metadata(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            _ => Self::load(path),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window width and height must be greater than zero".into(),
            ));
        }

        if let Some(fps) = self.window.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("window.fps must be >= 0".into()));
            }
        }

        if self.camera.position.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::Invalid(
                "camera.position must contain finite numbers".into(),
            ));
        }

        if !(self.camera.move_speed.is_finite() && self.camera.move_speed > 0.0) {
            return Err(ConfigError::Invalid(
                "camera.move_speed must be greater than zero".into(),
            ));
        }

        if !(self.camera.mouse_sensitivity.is_finite() && self.camera.mouse_sensitivity > 0.0) {
            return Err(ConfigError::Invalid(
                "camera.mouse_sensitivity must be greater than zero".into(),
            ));
        }

        if self.control.host.trim().is_empty() {
            return Err(ConfigError::Invalid("control.host may not be empty".into()));
        }

        if !self.params.blend_strength.is_finite() {
            return Err(ConfigError::Invalid(
                "params.blend_strength must be a finite number".into(),
            ));
        }

        if self.shaders.mode.trim().is_empty() {
            return Err(ConfigError::Invalid("shaders.mode may not be empty".into()));
        }

        Ok(())
    }
}
