use std::time::{Duration, Instant};

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the render loop started.
    pub seconds: f32,
}

impl TimeSample {
    pub fn new(seconds: f32) -> Self {
        Self { seconds }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.origin.elapsed().as_secs_f32())
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Paces the loop to a target frame rate.
///
/// Each call to [`FrameLimiter::delay`] returns how long to sleep so frames
/// start one interval apart. A frame that overruns its slot resets the
/// schedule instead of trying to catch up with a burst of short frames.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FrameLimiter {
    /// `None`, zero, negative, or non-finite rates disable the limiter.
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            interval,
            next_deadline: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Marks the end of a frame at `now` and returns the sleep needed before
    /// the next one may start.
    pub fn delay(&mut self, now: Instant) -> Option<Duration> {
        let interval = self.interval?;
        match self.next_deadline {
            Some(deadline) if now < deadline => {
                self.next_deadline = Some(deadline + interval);
                Some(deadline - now)
            }
            _ => {
                self.next_deadline = Some(now + interval);
                None
            }
        }
    }
}
