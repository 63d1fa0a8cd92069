use anyhow::{bail, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::device::GraphicsDevice;
use crate::program::ShaderProgram;
use crate::types::GraphicsBackend;
use crate::uniforms::{Uniform, UniformBlock, UniformTable, UniformValue};

use super::context::GpuContext;
use super::pipeline::{DepthTarget, QuadPipeline, QUAD_INDICES};

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// wgpu-backed [`GraphicsDevice`].
pub struct GpuState {
    pipeline: QuadPipeline,
    depth: DepthTarget,
    table: UniformTable,
    uniforms: UniformBlock,
    frame: Option<wgpu::SurfaceTexture>,
    context: GpuContext,
}

impl GpuState {
    pub fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        program: &ShaderProgram,
        backend: GraphicsBackend,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, backend)?;
        let pipeline = QuadPipeline::new(&context.device, context.surface_format, program)
            .context("failed to build render pipeline")?;
        let depth = DepthTarget::new(&context.device, context.size.width, context.size.height);

        let table = program.uniforms().clone();
        let uniforms = UniformBlock::new(&table);
        context
            .queue
            .write_buffer(&pipeline.uniform_buffer, 0, uniforms.as_bytes());

        let mut state = Self {
            pipeline,
            depth,
            table,
            uniforms,
            frame: None,
            context,
        };
        let PhysicalSize { width, height } = state.context.size;
        state.set_uniform(
            Uniform::Resolution,
            UniformValue::Vec2([width as f32, height as f32]),
        );
        Ok(state)
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.context.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out acquiring surface texture; skipping frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                bail!("GPU ran out of memory acquiring the next frame")
            }
            Err(other) => {
                warn!(error = %other, "surface error; skipping frame");
                Ok(None)
            }
        }
    }
}

impl GraphicsDevice for GpuState {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.context.resize(PhysicalSize::new(width, height)) {
            return Ok(());
        }
        self.depth = DepthTarget::new(&self.context.device, width, height);
        Ok(())
    }

    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        let slot = self.table.slot(uniform);
        let bytes = self.uniforms.write(slot, value.as_slice());
        self.context.queue.write_buffer(
            &self.pipeline.uniform_buffer,
            u64::from(slot.offset),
            bytes,
        );
    }

    fn draw_quad(&mut self) -> Result<()> {
        // A frame acquired but never presented is dropped here.
        self.frame = None;
        let Some(frame) = self.acquire_frame()? else {
            return Ok(());
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer frame encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewer pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.pipeline.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.pipeline.vertex_buffer.slice(..));
            render_pass.set_index_buffer(
                self.pipeline.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        self.frame = Some(frame);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }
}
