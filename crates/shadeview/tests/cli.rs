use std::fs;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use control::ControlConfig;
use params::BlendStrength;
use tempfile::TempDir;

fn shadeview(config_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shadeview"))
        .env("SHADEVIEW_CONFIG_DIR", config_dir.path())
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run shadeview")
}

#[test]
fn list_modes_prints_builtin_modes() {
    let config_dir = TempDir::new().unwrap();
    let output = shadeview(&config_dir, &["--list-modes"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("effects"), "{stdout}");
}

#[test]
fn invalid_config_aborts_before_opening_a_window() {
    let config_dir = TempDir::new().unwrap();
    fs::write(
        config_dir.path().join("config.toml"),
        "[window]\nwidth = 0\n",
    )
    .unwrap();

    let output = shadeview(&config_dir, &["--no-control"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "{stderr}");
}

#[test]
fn explicit_config_must_exist() {
    let config_dir = TempDir::new().unwrap();
    let missing = config_dir.path().join("nope.toml");
    let output = shadeview(
        &config_dir,
        &["--config", missing.to_str().unwrap(), "--no-control"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope.toml"), "{stderr}");
}

#[test]
fn unknown_mode_is_rejected() {
    let config_dir = TempDir::new().unwrap();
    let output = shadeview(&config_dir, &["--mode", "tunnel", "--no-control"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown mode 'tunnel'"), "{stderr}");
}

#[test]
fn missing_shader_is_reported_with_its_path() {
    let config_dir = TempDir::new().unwrap();
    let shader_root = TempDir::new().unwrap();
    let output = shadeview(
        &config_dir,
        &[
            "--shader-root",
            shader_root.path().to_str().unwrap(),
            "--no-control",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vertex_shader.glsl"), "{stderr}");
}

#[test]
fn send_updates_a_running_control_channel() {
    let store = BlendStrength::new(2.0);
    let handle = control::spawn(
        &ControlConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        store.clone(),
    )
    .expect("control channel starts");
    let url = format!("ws://{}", handle.local_addr());

    let config_dir = TempDir::new().unwrap();
    let output = shadeview(
        &config_dir,
        &["send", "change_blend_strength:3.5", "--url", &url],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let mut applied = false;
    for _ in 0..300 {
        if store.get() == 3.5 {
            applied = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(applied, "blend strength is {}", store.get());

    handle.stop().expect("stop");
}

#[test]
fn send_to_closed_port_fails() {
    let config_dir = TempDir::new().unwrap();
    let output = shadeview(
        &config_dir,
        &["send", "change_blend_strength:1.0", "--url", "ws://127.0.0.1:1"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to send control message"), "{stderr}");
}
