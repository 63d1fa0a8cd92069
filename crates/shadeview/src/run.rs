use std::path::Path;

use anyhow::{Context, Result};
use control::ControlHandle;
use params::BlendStrength;
use renderer::{ModeRegistry, Viewer};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use viewconfig::ViewConfig;

use crate::bootstrap::build_launch_plan;
use crate::cli::{Cli, Command, RunArgs, SendArgs};
use crate::paths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    match cli.command {
        Some(Command::Send(args)) => send(&args),
        None => run_viewer(&cli.run),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_viewer(args: &RunArgs) -> Result<()> {
    let registry = ModeRegistry::builtin();
    if args.list_modes {
        for (id, description) in registry.describe() {
            println!("{id:<12} {description}");
        }
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let plan = build_launch_plan(args, &config, &registry)?;
    info!(
        mode = %plan.mode,
        vertex = %plan.renderer_config.shaders.vertex.display(),
        fragment = %plan.renderer_config.shaders.fragment.display(),
        "starting shadeview"
    );

    let blend = BlendStrength::new(plan.blend_strength);
    let control = plan
        .control
        .as_ref()
        .and_then(|config| start_control(config, &blend));

    let result = Viewer::new(plan.renderer_config, blend).run();

    if let Some(handle) = control {
        if plan.stop_control_on_exit {
            if let Err(err) = handle.stop() {
                warn!(error = %err, "failed to stop control channel cleanly");
            }
        } else {
            debug!("leaving control channel running until process exit");
        }
    }

    result
}

fn start_control(config: &control::ControlConfig, blend: &BlendStrength) -> Option<ControlHandle> {
    match control::spawn(config, blend.clone()) {
        Ok(handle) => {
            info!(url = %handle.url(), "remote control enabled");
            Some(handle)
        }
        Err(err) => {
            warn!(error = %err, "remote control unavailable; continuing without it");
            None
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<ViewConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading configuration");
        return ViewConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let path = paths::default_config_file()?;
    debug!(path = %paths::describe(&path), "loading configuration");
    ViewConfig::load_or_default(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn send(args: &SendArgs) -> Result<()> {
    control::send_message_blocking(&args.url, &args.message)
        .with_context(|| format!("failed to send control message to {}", args.url))?;
    info!(url = %args.url, message = %args.message, "control message sent");
    Ok(())
}
