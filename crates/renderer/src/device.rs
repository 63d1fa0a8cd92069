use anyhow::Result;

use crate::uniforms::{Uniform, UniformValue};

/// Drawing side of the viewer.
///
/// `draw_quad` renders into the back buffer; nothing is visible until
/// `present`. `resize` rebuilds size-dependent targets only; the caller
/// uploads `u_resolution` afterwards. Implementations must ignore zero-sized
/// resizes.
pub trait GraphicsDevice {
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue);
    fn draw_quad(&mut self) -> Result<()>;
    fn present(&mut self) -> Result<()>;
}
