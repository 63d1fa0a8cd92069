//! Fixed-cadence frame loop.
//!
//! Every frame runs the same sequence against the [`InputSurface`] and
//! [`GraphicsDevice`] it owns:
//!
//! ```text
//!   poll events ─▶ mouse look ─▶ keyboard move ─▶ camera uniforms
//!        ─▶ u_time ─▶ u_blend_strength ─▶ draw_quad ─▶ present ─▶ pace
//! ```
//!
//! The blend strength is copied out of the shared store before anything is
//! handed to the device, so the control thread never waits on a GPU call.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use params::BlendStrength;
use tracing::{debug, info};

use crate::camera::Camera;
use crate::device::GraphicsDevice;
use crate::input::{InputSurface, ViewerEvent};
use crate::runtime::{BoxedTimeSource, FrameLimiter, SystemTimeSource};
use crate::types::DEFAULT_MOUSE_SENSITIVITY;
use crate::uniforms::{Uniform, UniformValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    #[error("render loop is already running")]
    AlreadyRunning,
    #[error("render loop has stopped and cannot be restarted")]
    AlreadyStopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopOptions {
    pub target_fps: Option<f32>,
    pub mouse_sensitivity: f32,
    /// Whether mouse look is active when the loop starts.
    pub capture_mouse: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            target_fps: None,
            mouse_sensitivity: DEFAULT_MOUSE_SENSITIVITY,
            capture_mouse: true,
        }
    }
}

pub struct RenderLoop<S, D>
where
    S: InputSurface,
    D: GraphicsDevice,
{
    // Declared before `surface` so GPU resources drop before the window.
    device: D,
    surface: S,
    camera: Camera,
    blend: BlendStrength,
    clock: BoxedTimeSource,
    limiter: FrameLimiter,
    mouse_sensitivity: f32,
    capture: bool,
    state: LoopState,
    events: Vec<ViewerEvent>,
    last_seconds: Option<f32>,
    stats: FrameStats,
}

impl<S, D> RenderLoop<S, D>
where
    S: InputSurface,
    D: GraphicsDevice,
{
    pub fn new(
        surface: S,
        device: D,
        camera: Camera,
        blend: BlendStrength,
        options: LoopOptions,
    ) -> Self {
        Self {
            device,
            surface,
            camera,
            blend,
            clock: Box::new(SystemTimeSource::new()),
            limiter: FrameLimiter::new(options.target_fps),
            mouse_sensitivity: options.mouse_sensitivity,
            capture: options.capture_mouse,
            state: LoopState::Idle,
            events: Vec::new(),
            last_seconds: None,
            stats: FrameStats::new(Instant::now()),
        }
    }

    /// Replaces the wall clock, mainly so tests can drive time by hand.
    pub fn with_time_source(mut self, clock: BoxedTimeSource) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Runs frames until a quit event arrives.
    ///
    /// Only valid from [`LoopState::Idle`]; a stopped loop cannot be rerun.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        while self.state == LoopState::Running {
            self.step()?;
        }
        Ok(())
    }

    /// Moves from `Idle` to `Running` and applies the initial cursor mode.
    pub fn start(&mut self) -> Result<(), LoopError> {
        match self.state {
            LoopState::Idle => {}
            LoopState::Running => return Err(LoopError::AlreadyRunning),
            LoopState::Stopped => return Err(LoopError::AlreadyStopped),
        }
        self.state = LoopState::Running;
        self.surface.set_cursor_captured(self.capture);
        let _ = self.surface.take_mouse_delta();
        self.clock.reset();
        self.last_seconds = None;
        info!(capture = self.capture, "render loop started");
        Ok(())
    }

    /// Runs a single frame. Does nothing unless the loop is running.
    pub fn step(&mut self) -> Result<()> {
        if self.state != LoopState::Running {
            return Ok(());
        }

        self.dispatch_events()?;
        if self.state == LoopState::Stopped {
            info!(frames = self.stats.total_frames, "render loop stopped");
            return Ok(());
        }

        let sample = self.clock.sample();
        let dt = self
            .last_seconds
            .map(|last| (sample.seconds - last).max(0.0))
            .unwrap_or(0.0);
        self.last_seconds = Some(sample.seconds);

        self.update_camera(dt);
        self.device
            .set_uniform(Uniform::Time, UniformValue::Float(sample.seconds));

        let blend = self.blend.get();
        self.device
            .set_uniform(Uniform::BlendStrength, UniformValue::Float(blend));

        self.device.draw_quad()?;
        self.device.present()?;

        let now = Instant::now();
        self.stats.record(now, sample.seconds, blend);
        if let Some(delay) = self.limiter.delay(now) {
            thread::sleep(delay);
        }
        Ok(())
    }

    fn dispatch_events(&mut self) -> Result<()> {
        let mut events = std::mem::take(&mut self.events);
        self.surface.poll_events(&mut events);
        for event in events.drain(..) {
            match event {
                ViewerEvent::Quit => {
                    self.state = LoopState::Stopped;
                }
                ViewerEvent::Resized { width, height } => {
                    if width == 0 || height == 0 {
                        debug!(width, height, "ignoring zero-sized resize");
                        continue;
                    }
                    self.device.resize(width, height)?;
                    self.device.set_uniform(
                        Uniform::Resolution,
                        UniformValue::Vec2([width as f32, height as f32]),
                    );
                    debug!(width, height, "viewport resized");
                }
                ViewerEvent::ToggleCapture => {
                    self.capture = !self.capture;
                    self.surface.set_cursor_captured(self.capture);
                    let _ = self.surface.take_mouse_delta();
                    debug!(captured = self.capture, "mouse capture toggled");
                }
            }
        }
        self.events = events;
        Ok(())
    }

    fn update_camera(&mut self, dt: f32) {
        let (dx, dy) = self.surface.take_mouse_delta();
        if self.capture {
            self.camera
                .apply_mouse_delta(dx, dy, self.mouse_sensitivity);
        }
        self.camera.apply_keyboard(self.surface.pressed_keys(), dt);

        self.device.set_uniform(
            Uniform::CameraPosition,
            UniformValue::Vec3(self.camera.position().to_array()),
        );
        self.device.set_uniform(
            Uniform::CameraRotation,
            UniformValue::Vec2(self.camera.rotation()),
        );
    }
}

#[derive(Debug)]
struct FrameStats {
    total_frames: u64,
    frames_since_report: u32,
    last_report: Instant,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            total_frames: 0,
            frames_since_report: 0,
            last_report: now,
        }
    }

    fn record(&mut self, now: Instant, time: f32, blend: f32) {
        self.total_frames += 1;
        self.frames_since_report += 1;
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_report as f32 / elapsed.as_secs_f32();
            debug!(
                fps = fps.round(),
                frame_count = self.total_frames,
                time,
                blend,
                "render stats"
            );
            self.frames_since_report = 0;
            self.last_report = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::input::MoveKeys;
    use crate::runtime::{TimeSample, TimeSource};
    use crate::types::CameraSettings;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Resize(u32, u32),
        Uniform(Uniform, UniformValue),
        Draw,
        Present,
    }

    #[derive(Default)]
    struct FakeDevice {
        calls: Vec<Call>,
    }

    impl FakeDevice {
        fn frames(&self) -> Vec<&[Call]> {
            self.calls
                .split_inclusive(|call| *call == Call::Present)
                .collect()
        }

        fn uploads(&self, uniform: Uniform) -> Vec<UniformValue> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Uniform(name, value) if *name == uniform => Some(*value),
                    _ => None,
                })
                .collect()
        }
    }

    impl GraphicsDevice for FakeDevice {
        fn resize(&mut self, width: u32, height: u32) -> Result<()> {
            self.calls.push(Call::Resize(width, height));
            Ok(())
        }

        fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
            self.calls.push(Call::Uniform(uniform, value));
        }

        fn draw_quad(&mut self) -> Result<()> {
            self.calls.push(Call::Draw);
            Ok(())
        }

        fn present(&mut self) -> Result<()> {
            self.calls.push(Call::Present);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        frames: VecDeque<Vec<ViewerEvent>>,
        mouse: VecDeque<(f32, f32)>,
        keys: MoveKeys,
        captured: Vec<bool>,
    }

    impl FakeSurface {
        fn scripted(frames: Vec<Vec<ViewerEvent>>) -> Self {
            Self {
                frames: frames.into(),
                ..Self::default()
            }
        }
    }

    impl InputSurface for FakeSurface {
        fn poll_events(&mut self, events: &mut Vec<ViewerEvent>) {
            if let Some(frame) = self.frames.pop_front() {
                events.extend(frame);
            }
        }

        fn pressed_keys(&self) -> MoveKeys {
            self.keys
        }

        fn take_mouse_delta(&mut self) -> (f32, f32) {
            self.mouse.pop_front().unwrap_or((0.0, 0.0))
        }

        fn set_cursor_captured(&mut self, captured: bool) {
            self.captured.push(captured);
        }
    }

    /// Advances a fixed step on every sample.
    struct SteppedClock {
        now: f32,
        step: f32,
    }

    impl TimeSource for SteppedClock {
        fn reset(&mut self) {
            self.now = 0.0;
        }

        fn sample(&mut self) -> TimeSample {
            let sample = TimeSample::new(self.now);
            self.now += self.step;
            sample
        }
    }

    fn build(surface: FakeSurface, blend: &BlendStrength) -> RenderLoop<FakeSurface, FakeDevice> {
        RenderLoop::new(
            surface,
            FakeDevice::default(),
            Camera::new(&CameraSettings::default()),
            blend.clone(),
            LoopOptions::default(),
        )
        .with_time_source(Box::new(SteppedClock {
            now: 0.0,
            step: 0.5,
        }))
    }

    #[test]
    fn frame_runs_uploads_draw_and_present_in_order() {
        let blend = BlendStrength::new(2.0);
        let mut render_loop = build(FakeSurface::default(), &blend);
        render_loop.start().unwrap();
        render_loop.step().unwrap();

        let frames = render_loop.device().frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0],
            &[
                Call::Uniform(Uniform::CameraPosition, UniformValue::Vec3([0.0, 1.0, 0.0])),
                Call::Uniform(Uniform::CameraRotation, UniformValue::Vec2([0.0, 0.0])),
                Call::Uniform(Uniform::Time, UniformValue::Float(0.0)),
                Call::Uniform(Uniform::BlendStrength, UniformValue::Float(2.0)),
                Call::Draw,
                Call::Present,
            ]
        );
    }

    #[test]
    fn run_stops_on_quit_and_cannot_restart() {
        let blend = BlendStrength::default();
        let surface = FakeSurface::scripted(vec![vec![], vec![], vec![ViewerEvent::Quit]]);
        let mut render_loop = build(surface, &blend);

        render_loop.run().unwrap();
        assert_eq!(render_loop.state(), LoopState::Stopped);
        assert_eq!(render_loop.device().frames().len(), 2);

        let err = render_loop.run().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoopError>(),
            Some(&LoopError::AlreadyStopped)
        );
    }

    #[test]
    fn starting_twice_is_rejected() {
        let blend = BlendStrength::default();
        let mut render_loop = build(FakeSurface::default(), &blend);
        render_loop.start().unwrap();
        assert_eq!(render_loop.start(), Err(LoopError::AlreadyRunning));
    }

    #[test]
    fn stepping_an_idle_loop_does_nothing() {
        let blend = BlendStrength::default();
        let mut render_loop = build(FakeSurface::default(), &blend);
        render_loop.step().unwrap();
        assert!(render_loop.device().calls.is_empty());
        assert_eq!(render_loop.state(), LoopState::Idle);
    }

    #[test]
    fn time_uniform_follows_the_clock() {
        let blend = BlendStrength::default();
        let mut render_loop = build(FakeSurface::default(), &blend);
        render_loop.start().unwrap();
        for _ in 0..3 {
            render_loop.step().unwrap();
        }
        assert_eq!(
            render_loop.device().uploads(Uniform::Time),
            vec![
                UniformValue::Float(0.0),
                UniformValue::Float(0.5),
                UniformValue::Float(1.0)
            ]
        );
    }

    #[test]
    fn blend_store_changes_show_up_next_frame() {
        let blend = BlendStrength::new(2.0);
        let mut render_loop = build(FakeSurface::default(), &blend);
        render_loop.start().unwrap();
        render_loop.step().unwrap();

        let writer = blend.clone();
        thread::spawn(move || writer.set(0.25)).join().unwrap();
        render_loop.step().unwrap();

        assert_eq!(
            render_loop.device().uploads(Uniform::BlendStrength),
            vec![UniformValue::Float(2.0), UniformValue::Float(0.25)]
        );
    }

    #[test]
    fn resize_is_forwarded_before_drawing() {
        let blend = BlendStrength::default();
        let surface = FakeSurface::scripted(vec![vec![
            ViewerEvent::Resized {
                width: 800,
                height: 600,
            },
            ViewerEvent::Resized {
                width: 0,
                height: 600,
            },
        ]]);
        let mut render_loop = build(surface, &blend);
        render_loop.start().unwrap();
        render_loop.step().unwrap();

        let calls = &render_loop.device().calls;
        assert_eq!(calls[0], Call::Resize(800, 600));
        assert_eq!(
            calls
                .iter()
                .filter(|call| matches!(call, Call::Resize(..)))
                .count(),
            1
        );
    }

    #[test]
    fn resize_uploads_only_the_new_resolution() {
        let blend = BlendStrength::default();
        let surface = FakeSurface::scripted(vec![
            vec![],
            vec![ViewerEvent::Resized {
                width: 640,
                height: 480,
            }],
        ]);
        let mut render_loop = build(surface, &blend);
        render_loop.start().unwrap();
        render_loop.step().unwrap();
        let before = render_loop.device().calls.len();
        render_loop.step().unwrap();

        let frame = &render_loop.device().calls[before..];
        assert_eq!(
            &frame[..2],
            &[
                Call::Resize(640, 480),
                Call::Uniform(Uniform::Resolution, UniformValue::Vec2([640.0, 480.0])),
            ]
        );
        // The rest of the frame is the usual per-frame uploads and nothing else.
        assert_eq!(
            frame[2..]
                .iter()
                .filter_map(|call| match call {
                    Call::Uniform(uniform, _) => Some(*uniform),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            vec![
                Uniform::CameraPosition,
                Uniform::CameraRotation,
                Uniform::Time,
                Uniform::BlendStrength,
            ]
        );
        assert_eq!(
            render_loop.device().uploads(Uniform::Resolution),
            vec![UniformValue::Vec2([640.0, 480.0])]
        );
    }

    #[test]
    fn mouse_look_only_applies_while_captured() {
        let blend = BlendStrength::default();
        let mut surface = FakeSurface::scripted(vec![
            vec![],
            vec![ViewerEvent::ToggleCapture],
            vec![],
            vec![ViewerEvent::ToggleCapture],
            vec![],
        ]);
        // start() and each toggle drain one pending delta before the frame reads its own.
        surface.mouse = VecDeque::from(vec![
            (0.0, 0.0),
            (100.0, 0.0),
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 0.0),
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 0.0),
        ]);
        let mut render_loop = build(surface, &blend);
        render_loop.start().unwrap();

        render_loop.step().unwrap();
        let yaw_after_first = render_loop.camera().yaw();
        assert!((yaw_after_first - 0.5).abs() < 1e-6);

        // Capture off: two frames of motion leave the camera where it was.
        render_loop.step().unwrap();
        assert!(!render_loop.capture_enabled());
        render_loop.step().unwrap();
        assert_eq!(render_loop.camera().yaw(), yaw_after_first);

        // Capture back on: the very next frame's motion turns the camera again.
        render_loop.step().unwrap();
        assert!(render_loop.capture_enabled());
        assert!((render_loop.camera().yaw() - 1.0).abs() < 1e-6);
        render_loop.step().unwrap();
        assert!((render_loop.camera().yaw() - 1.5).abs() < 1e-6);

        assert_eq!(render_loop.surface().captured, vec![true, false, true]);
    }

    #[test]
    fn held_keys_move_by_elapsed_time() {
        let blend = BlendStrength::default();
        let mut surface = FakeSurface::default();
        surface.keys = MoveKeys {
            forward: true,
            ..MoveKeys::default()
        };
        let mut render_loop = build(surface, &blend);
        render_loop.start().unwrap();

        // First frame has no elapsed time; the second sees 0.5s at 6 units/s.
        render_loop.step().unwrap();
        render_loop.step().unwrap();
        assert_eq!(
            render_loop.device().uploads(Uniform::CameraPosition),
            vec![
                UniformValue::Vec3([0.0, 1.0, 0.0]),
                UniformValue::Vec3([0.0, 1.0, 3.0])
            ]
        );
    }

    #[test]
    fn quit_skips_the_rest_of_the_frame() {
        let blend = BlendStrength::default();
        let surface = FakeSurface::scripted(vec![vec![ViewerEvent::Quit]]);
        let mut render_loop = build(surface, &blend);
        render_loop.run().unwrap();
        assert!(render_loop.device().calls.is_empty());
    }
}
