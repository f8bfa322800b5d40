use std::sync::Arc;

use mosaic::{MosaicUniforms, RenderBackend, RenderError, SurfaceSize};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::context::GpuContext;
use super::pipeline::{Pipelines, RenderTarget};

/// wgpu backend for a mosaic component bound to one window.
///
/// The mosaic is rendered into an offscreen target at backing-store size and
/// then stretched over the swapchain, which always follows the window's
/// physical size.
pub struct GpuState {
    context: GpuContext,
    pipelines: Pipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    target: Option<RenderTarget>,
    released: bool,
    // Declared last so the surface inside `context` is dropped first.
    window: Arc<Window>,
}

impl GpuState {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let context = GpuContext::new(window.as_ref(), window.inner_size())?;
        let pipelines = Pipelines::new(
            &context.device,
            context.surface_format(),
            context.premultiplied(),
        )?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mosaic uniform buffer"),
            size: std::mem::size_of::<MosaicUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mosaic uniform bind group"),
                layout: &pipelines.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        Ok(Self {
            context,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            target: None,
            released: false,
            window,
        })
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Follows the window's physical size; independent of the mosaic target.
    pub fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        if self.released {
            return;
        }
        self.context.resize(size);
    }

    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(|target| (target.width, target.height))
    }

    fn encode(&self, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget, frame: &wgpu::TextureView) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mosaic pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.mosaic);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mosaic blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipelines.blit);
        pass.set_bind_group(0, &target.blit_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl RenderBackend for GpuState {
    fn reallocate(&mut self, size: SurfaceSize) -> Result<SurfaceSize, RenderError> {
        if self.released {
            return Ok(size);
        }
        if size.is_empty() {
            self.target = None;
            return Ok(size);
        }
        let max = self.context.max_dimension;
        let (width, height) = (size.width.min(max), size.height.min(max));
        if (width, height) != (size.width, size.height) {
            tracing::warn!(
                requested_width = size.width,
                requested_height = size.height,
                max,
                "mosaic target clamped to device limits"
            );
        }
        self.target = Some(RenderTarget::new(
            &self.context.device,
            &self.pipelines,
            width,
            height,
        ));
        tracing::debug!(width, height, scale = size.scale, "reallocated mosaic target");
        Ok(SurfaceSize::new(width, height, size.scale))
    }

    fn draw(&mut self, uniforms: &MosaicUniforms) -> Result<(), RenderError> {
        if self.released {
            return Ok(());
        }
        let Some(target) = self.target.as_ref() else {
            return Ok(());
        };

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.reconfigure();
                return Err(RenderError::SurfaceLost);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; retrying next frame");
                return Err(RenderError::SurfaceLost);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(other) => return Err(RenderError::Backend(other.to_string())),
        };

        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("mosaic encoder"),
                });
        self.encode(&mut encoder, target, &view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(target) = self.target.take() {
            target.texture.destroy();
        }
        self.uniform_buffer.destroy();
        tracing::debug!("released GPU resources");
    }
}
