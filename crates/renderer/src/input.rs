/// Discrete happenings the render loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    Quit,
    Resized { width: u32, height: u32 },
    /// Flip whether mouse motion steers the camera.
    ToggleCapture,
}

/// Movement keys currently held down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MoveKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveKeys {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.up || self.down
    }
}

/// Window-system side of the viewer: events, keyboard state, and mouse motion.
pub trait InputSurface {
    /// Appends every event that arrived since the last call without blocking.
    fn poll_events(&mut self, events: &mut Vec<ViewerEvent>);
    fn pressed_keys(&self) -> MoveKeys;
    /// Relative mouse motion accumulated since the last call, in pixels.
    fn take_mouse_delta(&mut self) -> (f32, f32);
    fn set_cursor_captured(&mut self, captured: bool);
}
