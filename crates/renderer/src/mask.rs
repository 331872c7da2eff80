//! Mask bitmap decoding.
//!
//! The mask is a tiny RGBA raster whose texels are polygon vertices rather than
//! colours: texel `k` (row-major) stores vertex `k` with its red and green
//! channels holding normalised image-space x and y. Only the first
//! `MaskParameters::texel_count` texels are meaningful; the rest are zero.
//! Because the channels are coordinates, the texture must be read without sRGB
//! conversion and at native resolution.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::DecodeError;

/// Point mask shipped with the effect (4x4 texels, 14 vertices).
pub const MASK_BITMAP: &[u8] = include_bytes!("../assets/point_mask.png");

/// How decoded texel values are interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskColorSpace {
    /// Texel bytes reach the shader unchanged.
    #[default]
    Linear,
    /// Texels are treated as sRGB-encoded and linearised on sample.
    Srgb,
}

/// Decoding options for the mask provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskLoadOptions {
    pub color_space: MaskColorSpace,
    /// Build a mip chain on upload. Off by default: the mask is point-sampled.
    pub mipmaps: bool,
}

/// Outcome of loading the mask during configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStatus {
    Loaded { width: u32, height: u32 },
    Unavailable,
}

/// A decoded mask bitmap plus the options it was decoded with.
#[derive(Debug, Clone)]
pub struct MaskImage {
    levels: Vec<RgbaImage>,
    options: MaskLoadOptions,
}

impl MaskImage {
    /// Decodes an encoded raster (PNG or any format `image` was built with).
    pub fn decode(bytes: &[u8], options: MaskLoadOptions) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroExtent { width, height });
        }

        let levels = if options.mipmaps {
            mip_chain(rgba)
        } else {
            vec![rgba]
        };
        tracing::debug!(
            width,
            height,
            mip_levels = levels.len(),
            color_space = ?options.color_space,
            "decoded mask bitmap"
        );
        Ok(Self { levels, options })
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width()
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height()
    }

    pub fn options(&self) -> MaskLoadOptions {
        self.options
    }

    /// Base level followed by successively halved levels.
    pub fn levels(&self) -> &[RgbaImage] {
        &self.levels
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        self.levels[0].get_pixel(x, y).0
    }

    /// Normalised image-space position stored in texel `index` (row-major).
    pub fn vertex(&self, index: u32) -> Option<[f32; 2]> {
        let (width, height) = (self.width(), self.height());
        if index >= width * height {
            return None;
        }
        let [r, g, _, _] = self.texel(index % width, index / width);
        Some([f32::from(r) / 255.0, f32::from(g) / 255.0])
    }

    /// The first `count` vertices, clamped to the texel capacity.
    pub fn vertices(&self, count: usize) -> impl Iterator<Item = [f32; 2]> + '_ {
        let capacity = (self.width() * self.height()) as usize;
        (0..count.min(capacity) as u32).filter_map(move |index| self.vertex(index))
    }
}

fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base];
    loop {
        let last = &levels[levels.len() - 1];
        let (width, height) = last.dimensions();
        if width == 1 && height == 1 {
            break;
        }
        let next = imageops::resize(
            last,
            (width / 2).max(1),
            (height / 2).max(1),
            FilterType::Triangle,
        );
        levels.push(next);
    }
    levels
}
