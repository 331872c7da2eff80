//! Renderer crate for the ray-light effect.
//!
//! A fixed GLSL program draws animated light rays from a point, gates them
//! with a feathered polygon mask and composites the result over a photo. The
//! host owns the window and calls in once per display refresh:
//!
//! ```text
//!   host (shaderplay / any window)
//!          │ RendererConfig + EffectAssets
//!          ▼
//!   EffectRenderer::configure ──▶ GpuState (surface, pipeline, textures)
//!          │
//!   render_frame() ──▶ TimeSource ──▶ ParameterMarshaller ──▶ GPU uniforms ──▶ present
//! ```
//!
//! `EffectModel` holds the three parameter records. `FrameLoop` owns the model
//! and drives any `FrameBackend`; `EffectRenderer` is that loop bound to the
//! wgpu backend. `shading` mirrors the fragment math on the CPU so the effect
//! can be checked without a GPU.

mod compile;
pub mod error;
pub mod frame;
mod gpu;
pub mod marshal;
pub mod mask;
pub mod params;
pub mod runtime;
pub mod shading;
pub mod types;

pub use error::{ConfigurationError, DecodeError, FrameDrop, RenderError};
pub use frame::{FrameBackend, FrameCounters, FrameLoop, FrameStatus};
pub use gpu::GpuState;
pub use marshal::{MarshalledParameters, ParameterMarshaller};
pub use mask::{MaskColorSpace, MaskImage, MaskLoadOptions, MaskStatus, MASK_BITMAP};
pub use params::{
    EffectModel, EffectParameters, GlobalParameters, LayerValues, MaskParameters,
    RAY_LAYER_COUNT, REFERENCE_RESOLUTION,
};
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, RenderPolicy, SystemTimeSource,
    TimeSource,
};
pub use types::{AdapterProfile, ColorSpaceMode, EffectAssets, GpuPowerPreference, RendererConfig};
pub use wgpu::TextureFormat;

/// The effect bound to a window surface.
///
/// A value only exists after `configure` succeeded, so every method here can
/// assume a live device and pipeline.
pub struct EffectRenderer {
    frames: FrameLoop<GpuState, BoxedTimeSource>,
}

impl EffectRenderer {
    /// Creates the device, compiles the program, uploads the textures and
    /// prepares the parameter buffers.
    ///
    /// A mask that fails to decode is logged and rendering continues with
    /// the rays hidden; see [`EffectRenderer::mask_status`] and
    /// [`EffectRenderer::mask_error`].
    pub fn configure(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        config: &RendererConfig,
        assets: EffectAssets,
    ) -> Result<Self, RenderError> {
        let backend = GpuState::new(target, config, &assets)?;

        let mut model = config.model;
        model
            .global
            .set_resolution(config.logical_size.0, config.logical_size.1);
        model.global.elapsed_time = 0.0;
        model.mask.set_texture_dimensions(0, 0);
        if let MaskStatus::Loaded { width, height } = backend.mask_status() {
            model.mask.set_texture_dimensions(width, height);
        }

        tracing::info!(
            adapter = %backend.adapter_profile().name,
            surface_format = ?backend.surface_format(),
            logical_width = config.logical_size.0,
            logical_height = config.logical_size.1,
            policy = ?config.policy,
            "effect renderer configured"
        );

        let clock = time_source_for_policy(config.policy);
        Ok(Self {
            frames: FrameLoop::new(backend, clock, model),
        })
    }

    /// Draws one frame. Call once per display refresh.
    pub fn render_frame(&mut self) -> Result<FrameStatus, RenderError> {
        self.frames.render_frame()
    }

    /// Logical size changed; only `GlobalParameters::resolution` is touched.
    pub fn on_surface_resize(&mut self, logical: (f32, f32)) {
        self.frames.on_surface_resize(logical);
    }

    /// Physical size changed; reconfigures the swapchain.
    pub fn resize_surface(&mut self, physical: (u32, u32)) {
        self.frames.backend_mut().resize_surface(physical);
    }

    pub fn mask_status(&self) -> MaskStatus {
        self.frames.backend().mask_status()
    }

    /// Why the mask is unavailable, as `RenderError::ResourceDecode`.
    pub fn mask_error(&self) -> Option<&RenderError> {
        self.frames.backend().mask_error()
    }

    pub fn model(&self) -> &EffectModel {
        self.frames.model()
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        self.frames.backend().adapter_profile()
    }

    pub fn stats(&self) -> FrameCounters {
        self.frames.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn renderer_can_move_to_a_render_thread() {
        assert_send::<EffectRenderer>();
        assert_send::<FrameLoop<GpuState, BoxedTimeSource>>();
    }

    #[test]
    fn default_config_renders_half_the_reference_size() {
        let config = RendererConfig::default();
        assert_eq!(config.logical_size, (450.0, 600.0));
        assert_eq!(config.surface_size, (450, 600));
        assert_eq!(config.policy, RenderPolicy::Animate);
        assert!(config.surface_format.is_none());
    }

    #[test]
    fn default_assets_carry_the_embedded_mask() {
        let assets = EffectAssets::default();
        assert!(assets.photo.is_none());
        assert_eq!(assets.mask_bitmap.as_ref(), MASK_BITMAP);
    }
}
