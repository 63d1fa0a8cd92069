//! wgpu implementation of [`crate::GraphicsDevice`].
//!
//! - `context` owns instance/device/surface wiring and rebuilds swapchain
//!   state when the window resizes.
//! - `pipeline` links a [`crate::ShaderProgram`] into a render pipeline and
//!   owns the quad and uniform buffers.
//! - `state` glues them together behind the `GraphicsDevice` trait.

mod context;
mod pipeline;
mod state;

pub use state::GpuState;
