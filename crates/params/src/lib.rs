//! Shared parameter store for values that cross the render/network boundary.
//!
//! The render loop reads the blend coefficient once per frame while the control
//! server writes it whenever a command arrives. Both sides go through
//! [`BlendStrength::get`] and [`BlendStrength::set`], which hold the lock for a
//! single copy of the value and nothing else.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Blend strength used by the bundled effects shader when nothing overrides it.
pub const DEFAULT_BLEND_STRENGTH: f32 = 2.0;

/// Cloneable handle to the blend-strength coefficient.
///
/// Every clone refers to the same value; hand one to the render loop and
/// another to the control server.
#[derive(Clone)]
pub struct BlendStrength {
    inner: Arc<Mutex<f32>>,
}

impl BlendStrength {
    pub fn new(initial: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Returns a copy of the current coefficient.
    pub fn get(&self) -> f32 {
        *self.inner.lock()
    }

    /// Replaces the coefficient.
    pub fn set(&self, value: f32) {
        *self.inner.lock() = value;
    }
}

impl Default for BlendStrength {
    fn default() -> Self {
        Self::new(DEFAULT_BLEND_STRENGTH)
    }
}

impl fmt::Debug for BlendStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlendStrength").field(&self.get()).finish()
    }
}
