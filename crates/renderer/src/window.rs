use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use crate::input::{InputSurface, MoveKeys, ViewerEvent};
use crate::types::WindowConfig;

/// A winit window driven by polling instead of a callback loop.
///
/// Keeps the frame loop in charge of cadence: every call to
/// [`InputSurface::poll_events`] drains pending window-system events and
/// returns immediately.
pub struct WinitSurface {
    window: Window,
    event_loop: EventLoop<()>,
    keys: MoveKeys,
    mouse_delta: (f64, f64),
    captured: bool,
}

impl WinitSurface {
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new().context("failed to initialise event loop")?;
        let window = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .context("failed to create viewer window")?;

        Ok(Self {
            window,
            event_loop,
            keys: MoveKeys::default(),
            mouse_delta: (0.0, 0.0),
            captured: false,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }
}

impl InputSurface for WinitSurface {
    fn poll_events(&mut self, events: &mut Vec<ViewerEvent>) {
        let window_id = self.window.id();
        let keys = &mut self.keys;
        let mouse_delta = &mut self.mouse_delta;

        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _target| match event {
                Event::WindowEvent {
                    window_id: id,
                    event,
                } if id == window_id => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        events.push(ViewerEvent::Quit);
                    }
                    WindowEvent::Resized(size) => events.push(ViewerEvent::Resized {
                        width: size.width,
                        height: size.height,
                    }),
                    WindowEvent::Focused(false) => {
                        *keys = MoveKeys::default();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        let PhysicalKey::Code(code) = event.physical_key else {
                            return;
                        };
                        let pressed = event.state == ElementState::Pressed;
                        if code == KeyCode::Escape {
                            if pressed && !event.repeat {
                                events.push(ViewerEvent::ToggleCapture);
                            }
                        } else {
                            apply_key(keys, code, pressed);
                        }
                    }
                    _ => {}
                },
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } => {
                    mouse_delta.0 += delta.0;
                    mouse_delta.1 += delta.1;
                }
                _ => {}
            });

        if let PumpStatus::Exit(code) = status {
            debug!(code, "window event loop exited");
            events.push(ViewerEvent::Quit);
        }
    }

    fn pressed_keys(&self) -> MoveKeys {
        self.keys
    }

    fn take_mouse_delta(&mut self) -> (f32, f32) {
        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        (dx as f32, dy as f32)
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        let grab = if captured {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(err) = grab {
            warn!(captured, error = %err, "failed to change cursor grab");
        }
        self.window.set_cursor_visible(!captured);
        self.mouse_delta = (0.0, 0.0);
        self.captured = captured;
    }
}

/// Maps WASD plus Q/E onto the movement set.
fn apply_key(keys: &mut MoveKeys, code: KeyCode, pressed: bool) {
    match code {
        KeyCode::KeyW => keys.forward = pressed,
        KeyCode::KeyS => keys.backward = pressed,
        KeyCode::KeyA => keys.left = pressed,
        KeyCode::KeyD => keys.right = pressed,
        KeyCode::KeyE => keys.up = pressed,
        KeyCode::KeyQ => keys.down = pressed,
        _ => {}
    }
}
