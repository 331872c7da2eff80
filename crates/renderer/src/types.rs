use std::borrow::Cow;

use image::RgbaImage;

use crate::mask::{MaskLoadOptions, MASK_BITMAP};
use crate::params::{EffectModel, REFERENCE_RESOLUTION};
use crate::runtime::RenderPolicy;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain, matching how the photo is authored.
    #[default]
    Auto,
    /// Treat shader outputs and the photo as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains/textures for conversion.
    Linear,
}

/// Adapter selection hint forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Summary of the adapter picked during configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Mirrors the host's launch flags: how large the surface is, which output
/// format to prefer, and the parameter model to render.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Logical surface size in points; becomes `GlobalParameters::resolution`.
    pub logical_size: (f32, f32),
    /// Swapchain size in physical pixels.
    pub surface_size: (u32, u32),
    /// Preferred output pixel format; ignored if the surface cannot present it.
    pub surface_format: Option<wgpu::TextureFormat>,
    pub color_space: ColorSpaceMode,
    pub gpu_power: GpuPowerPreference,
    pub policy: RenderPolicy,
    pub mask_options: MaskLoadOptions,
    /// Initial parameter model. `global.resolution` is overwritten from
    /// `logical_size` and `mask.texture_dimensions` from the decoded mask.
    pub model: EffectModel,
}

impl Default for RendererConfig {
    /// Half-scale rendition of the 900x1200 reference composition.
    fn default() -> Self {
        let logical = (REFERENCE_RESOLUTION.0 * 0.5, REFERENCE_RESOLUTION.1 * 0.5);
        Self {
            logical_size: logical,
            surface_size: (logical.0 as u32, logical.1 as u32),
            surface_format: None,
            color_space: ColorSpaceMode::default(),
            gpu_power: GpuPowerPreference::default(),
            policy: RenderPolicy::default(),
            mask_options: MaskLoadOptions::default(),
            model: EffectModel::default(),
        }
    }
}

/// Host-supplied resources consumed once at configuration.
#[derive(Debug, Clone)]
pub struct EffectAssets {
    /// Decoded background photograph (straight alpha). `None` renders over
    /// transparency.
    pub photo: Option<RgbaImage>,
    /// Encoded mask bitmap.
    pub mask_bitmap: Cow<'static, [u8]>,
}

impl Default for EffectAssets {
    fn default() -> Self {
        Self {
            photo: None,
            mask_bitmap: Cow::Borrowed(MASK_BITMAP),
        }
    }
}
