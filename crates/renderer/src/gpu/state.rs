use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{FrameDrop, RenderError};
use crate::frame::FrameBackend;
use crate::marshal::MarshalledParameters;
use crate::mask::MaskStatus;
use crate::params::{EFFECT_STRIDE, GLOBAL_STRIDE, MASK_STRIDE};
use crate::types::{AdapterProfile, EffectAssets, RendererConfig};

use super::context::GpuContext;
use super::pipeline::EffectPipeline;
use super::textures::{self, MaskResource, TextureResource};

/// Acquisition slower than this is reported; FIFO presentation normally
/// blocks for at most one refresh.
const SLOW_ACQUIRE: Duration = Duration::from_millis(50);

struct ParameterBuffers {
    global: wgpu::Buffer,
    effect: wgpu::Buffer,
    mask: wgpu::Buffer,
}

impl ParameterBuffers {
    fn new(device: &wgpu::Device) -> Self {
        let create = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            global: create("global parameters", GLOBAL_STRIDE),
            effect: create("effect parameters", EFFECT_STRIDE),
            mask: create("mask parameters", MASK_STRIDE),
        }
    }

    fn write(&self, queue: &wgpu::Queue, parameters: &MarshalledParameters<'_>) {
        queue.write_buffer(&self.global, 0, parameters.global);
        queue.write_buffer(&self.effect, 0, parameters.effect);
        queue.write_buffer(&self.mask, 0, parameters.mask);
    }
}

/// Every GPU object needed to draw the effect into a window surface.
pub struct GpuState {
    context: GpuContext,
    pipeline: EffectPipeline,
    buffers: ParameterBuffers,
    parameter_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
    _photo: TextureResource,
    _mask: TextureResource,
    mask_status: MaskStatus,
    mask_error: Option<RenderError>,
}

impl GpuState {
    /// Builds device, pipeline, buffers and textures in that order.
    pub(crate) fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        config: &RendererConfig,
        assets: &EffectAssets,
    ) -> Result<Self, RenderError> {
        let context = GpuContext::new(
            target,
            config.surface_size,
            config.surface_format,
            config.color_space,
            config.gpu_power,
        )?;
        let pipeline = EffectPipeline::new(&context.device, context.surface_format)?;

        let buffers = ParameterBuffers::new(&context.device);
        let parameter_bind_group = pipeline.parameter_bind_group(
            &context.device,
            [&buffers.global, &buffers.effect, &buffers.mask],
        );

        let max_dimension = context.adapter_profile.max_texture_dimension;
        let MaskResource {
            resource: mask,
            status: mask_status,
            error: mask_error,
        } = textures::upload_mask(
            &context.device,
            &context.queue,
            &assets.mask_bitmap,
            config.mask_options,
            max_dimension,
        );
        let photo = textures::upload_photo(
            &context.device,
            &context.queue,
            assets.photo.as_ref(),
            context.color_space,
            max_dimension,
        );
        let texture_bind_group = pipeline.texture_bind_group(&context.device, &photo, &mask);

        debug!(
            surface_width = context.config.width,
            surface_height = context.config.height,
            ?mask_status,
            "GPU state ready"
        );

        Ok(Self {
            context,
            pipeline,
            buffers,
            parameter_bind_group,
            texture_bind_group,
            _photo: photo,
            _mask: mask,
            mask_status,
            mask_error,
        })
    }

    pub fn mask_status(&self) -> MaskStatus {
        self.mask_status
    }

    /// The decode failure behind `MaskStatus::Unavailable`.
    pub fn mask_error(&self) -> Option<&RenderError> {
        self.mask_error.as_ref()
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.context.surface_format
    }

    /// Reconfigures the swapchain for a new physical size. Zero extents and
    /// sizes beyond the device texture limit keep the last configuration.
    pub fn resize_surface(&mut self, size: (u32, u32)) {
        self.context.resize(size.0, size.1);
    }

    fn check_device(&self) -> Result<(), RenderError> {
        if self.context.is_device_lost() {
            return Err(RenderError::DeviceLost(
                "device was lost since the previous frame".into(),
            ));
        }
        Ok(())
    }
}

impl FrameBackend for GpuState {
    type Target = wgpu::SurfaceTexture;

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, RenderError> {
        self.check_device()?;

        let started = Instant::now();
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Timeout) => {
                return Err(RenderError::TransientFrame(FrameDrop::SurfaceTimeout));
            }
            Err(wgpu::SurfaceError::Outdated) => {
                self.context.reconfigure();
                return Err(RenderError::TransientFrame(FrameDrop::SurfaceOutdated));
            }
            Err(wgpu::SurfaceError::Lost) => {
                self.context.reconfigure();
                return Err(RenderError::TransientFrame(FrameDrop::SurfaceLost));
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(error) => {
                debug!(%error, "surface texture unavailable");
                return Err(RenderError::TransientFrame(FrameDrop::SurfaceUnavailable));
            }
        };

        let waited = started.elapsed();
        if waited > SLOW_ACQUIRE {
            warn!(
                waited_ms = waited.as_millis() as u64,
                "acquiring frame took longer than expected"
            );
        }
        if frame.suboptimal {
            debug!("surface texture is suboptimal; it will be reconfigured on next resize");
        }
        Ok(frame)
    }

    fn submit(
        &mut self,
        frame: wgpu::SurfaceTexture,
        parameters: &MarshalledParameters<'_>,
    ) -> Result<(), RenderError> {
        self.buffers.write(&self.context.queue, parameters);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("ray effect encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ray effect pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.parameter_bind_group, &[]);
            pass.set_bind_group(1, &self.texture_bind_group, &[]);
            pass.draw(0..6, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        self.check_device()
    }
}
