use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::GraphicsBackend;

#[derive(Parser, Debug)]
#[command(
    name = "shadeview",
    author,
    version,
    about = "Interactive raymarching shader viewer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `config.toml` in the user config directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Visualizer mode to start (see `--list-modes`).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Override the window size (e.g. `1280x800`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Frame rate cap (0=uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Graphics API: `auto`, `vulkan`, `metal`, `dx12`, or `gl`.
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<GraphicsBackend>,

    /// Host the control channel binds to.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port the control channel binds to (0 picks a free port).
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Do not start the remote control channel.
    #[arg(long)]
    pub no_control: bool,

    /// Initial blend strength.
    #[arg(long, value_name = "VALUE", allow_hyphen_values = true)]
    pub blend_strength: Option<f32>,

    /// Directory containing the `glsl/` shader tree.
    #[arg(long, value_name = "DIR")]
    pub shader_root: Option<PathBuf>,

    /// Print the available visualizer modes and exit.
    #[arg(long)]
    pub list_modes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one control message (e.g. `change_blend_strength:3.5`) to a running viewer.
    Send(SendArgs),
}

#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Message in `<command>:<value>` form.
    #[arg(value_name = "MESSAGE")]
    pub message: String,

    /// Control channel URL.
    #[arg(long, value_name = "URL", default_value = "ws://localhost:8765")]
    pub url: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}
