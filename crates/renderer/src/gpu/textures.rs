use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::{DecodeError, RenderError};
use crate::mask::{MaskColorSpace, MaskImage, MaskLoadOptions, MaskStatus};

use super::context::{fits_texture_limit, SurfaceColorSpace};

pub(crate) struct TextureResource {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Mask texture plus what was learned while decoding it.
pub(crate) struct MaskResource {
    pub resource: TextureResource,
    pub status: MaskStatus,
    /// Why the placeholder was used, when it was.
    pub error: Option<RenderError>,
}

/// Decodes the mask bitmap and checks it against the device texture limit.
pub(crate) fn decode_mask(
    bytes: &[u8],
    options: MaskLoadOptions,
    max_dimension: u32,
) -> Result<MaskImage, RenderError> {
    let image = MaskImage::decode(bytes, options)?;
    if !fits_texture_limit(image.width(), image.height(), max_dimension) {
        return Err(RenderError::ResourceDecode(DecodeError::TooLarge {
            width: image.width(),
            height: image.height(),
            max_dimension,
        }));
    }
    Ok(image)
}

/// Decodes and uploads the mask bitmap. A decode failure is not fatal: the
/// effect keeps running with a transparent placeholder and zero dimensions,
/// which the fragment program treats as "no mask".
pub(crate) fn upload_mask(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bytes: &[u8],
    options: MaskLoadOptions,
    max_dimension: u32,
) -> MaskResource {
    let image = match decode_mask(bytes, options, max_dimension) {
        Ok(image) => image,
        Err(error) => {
            tracing::warn!(
                error = %error,
                len = bytes.len(),
                "failed to decode mask bitmap; rays stay hidden"
            );
            return MaskResource {
                resource: placeholder(device, queue, "mask placeholder", mask_format(options)),
                status: MaskStatus::Unavailable,
                error: Some(error),
            };
        }
    };

    let (width, height) = (image.width(), image.height());
    let mut data = Vec::new();
    for level in image.levels() {
        data.extend_from_slice(level.as_raw());
    }
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("mask texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: image.levels().len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: mask_format(image.options()),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = nearest_sampler(device, "mask sampler");
    tracing::debug!(width, height, mip_levels = image.levels().len(), "uploaded mask texture");

    MaskResource {
        resource: TextureResource {
            _texture: texture,
            view,
            sampler,
        },
        status: MaskStatus::Loaded { width, height },
        error: None,
    }
}

/// Shrinks a photo so neither side exceeds `max_dimension`, keeping its
/// aspect ratio. Photos that already fit are borrowed untouched.
pub(crate) fn fit_to_limit(photo: &RgbaImage, max_dimension: u32) -> Cow<'_, RgbaImage> {
    let (width, height) = photo.dimensions();
    if fits_texture_limit(width, height, max_dimension) {
        return Cow::Borrowed(photo);
    }

    let max = u64::from(max_dimension.max(1));
    let longest = u64::from(width.max(height));
    let scale = |side: u32| ((u64::from(side) * max + longest / 2) / longest).clamp(1, max) as u32;
    let (fitted_width, fitted_height) = (scale(width), scale(height));
    tracing::warn!(
        width,
        height,
        fitted_width,
        fitted_height,
        max_dimension,
        "photo exceeds GPU limits; downscaling"
    );
    Cow::Owned(imageops::resize(
        photo,
        fitted_width,
        fitted_height,
        FilterType::Triangle,
    ))
}

/// Uploads the background photo, or a transparent texel when there is none.
pub(crate) fn upload_photo(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    photo: Option<&RgbaImage>,
    color_space: SurfaceColorSpace,
    max_dimension: u32,
) -> TextureResource {
    let format = photo_format(color_space);
    let Some(photo) = photo.filter(|photo| photo.width() > 0 && photo.height() > 0) else {
        tracing::debug!("no photo supplied; compositing over transparency");
        return placeholder(device, queue, "photo placeholder", format);
    };
    let photo = fit_to_limit(photo, max_dimension);

    let (width, height) = photo.dimensions();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("photo texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        photo.as_raw(),
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("photo sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    tracing::debug!(width, height, ?format, "uploaded photo texture");

    TextureResource {
        _texture: texture,
        view,
        sampler,
    }
}

fn placeholder(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    format: wgpu::TextureFormat,
) -> TextureResource {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &[0u8, 0, 0, 0],
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = nearest_sampler(device, label);

    TextureResource {
        _texture: texture,
        view,
        sampler,
    }
}

fn nearest_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

pub(crate) fn photo_format(color_space: SurfaceColorSpace) -> wgpu::TextureFormat {
    match color_space {
        SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// Mask texels are coordinates, so they default to a non-sRGB format.
pub(crate) fn mask_format(options: MaskLoadOptions) -> wgpu::TextureFormat {
    match options.color_space {
        MaskColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        MaskColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}
