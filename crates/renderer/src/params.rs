//! CPU mirrors of the three uniform blocks consumed by the ray fragment program.
//!
//! Every record is `#[repr(C)]` with explicit padding so that the byte image
//! produced by `bytemuck::bytes_of` is exactly the `std140` block declared in
//! `compile.rs`. Vector fields start on 16-byte rows; strides are multiples of
//! 16. Changing a field here requires the matching change in the GLSL header.

use std::ops::{Index, IndexMut};

use bytemuck::{Pod, Zeroable};

/// Number of independently parameterised ray layers.
pub const RAY_LAYER_COUNT: usize = 3;

/// Reference composition size the default parameters were tuned against.
pub const REFERENCE_RESOLUTION: (f32, f32) = (900.0, 1200.0);

/// One scalar per ray layer, padded to a full 16-byte row.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LayerValues {
    values: [f32; RAY_LAYER_COUNT],
    _pad: f32,
}

impl LayerValues {
    pub const fn new(values: [f32; RAY_LAYER_COUNT]) -> Self {
        Self { values, _pad: 0.0 }
    }

    pub const fn splat(value: f32) -> Self {
        Self::new([value; RAY_LAYER_COUNT])
    }

    pub fn values(&self) -> [f32; RAY_LAYER_COUNT] {
        self.values
    }
}

impl Index<usize> for LayerValues {
    type Output = f32;

    fn index(&self, layer: usize) -> &f32 {
        &self.values[layer]
    }
}

impl IndexMut<usize> for LayerValues {
    fn index_mut(&mut self, layer: usize) -> &mut f32 {
        &mut self.values[layer]
    }
}

/// Per-frame globals (`GlobalParams` block, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlobalParameters {
    /// Logical render-surface size in points.
    pub resolution: [f32; 2],
    /// Seconds since the first rendered frame.
    pub elapsed_time: f32,
    _pad0: f32,
    _pad1: [f32; 4],
}

impl GlobalParameters {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            resolution: [width, height],
            elapsed_time: 0.0,
            _pad0: 0.0,
            _pad1: [0.0; 4],
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution = [width, height];
    }
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self::new(REFERENCE_RESOLUTION.0, REFERENCE_RESOLUTION.1)
    }
}

/// Ray layer description (`EffectParams` block, binding 1).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct EffectParameters {
    /// Width of the mask's soft edge in pixels.
    pub edge_feather_width: f32,
    /// Vertical offset of the ray origin in pixels.
    pub center_shift: f32,
    _pad0: [f32; 2],
    /// RGBA colour of each ray layer.
    pub colors: [[f32; 4]; RAY_LAYER_COUNT],
    pub strength: LayerValues,
    pub length_px: LayerValues,
    pub sharpness: LayerValues,
    pub density: LayerValues,
    pub speed: LayerValues,
    pub falloff: LayerValues,
    pub start_softness_px: LayerValues,
    pub join_softness: LayerValues,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            edge_feather_width: 0.5,
            center_shift: 0.0,
            _pad0: [0.0; 2],
            colors: [
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 1.0, 1.0],
                [1.0, 0.0, 0.6, 1.0],
            ],
            strength: LayerValues::splat(1.0),
            length_px: LayerValues::new([300.0, 200.0, 400.0]),
            sharpness: LayerValues::splat(1.0),
            density: LayerValues::new([0.45, 0.2, 0.2]),
            speed: LayerValues::splat(1.0),
            falloff: LayerValues::new([0.02, 0.02, 0.01]),
            start_softness_px: LayerValues::splat(1.0),
            join_softness: LayerValues::new([0.1, 1.0, 1.0]),
        }
    }
}

/// Polygon mask description (`MaskParams` block, binding 2).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaskParameters {
    /// `[min_x, min_y, max_x, max_y]` in normalised image coordinates.
    pub point_bounding_box: [f32; 4],
    /// Number of texels holding polygon vertices.
    pub texel_count: i32,
    _pad0: i32,
    /// Decoded mask texture size in texels; `[0, 0]` until a mask is loaded.
    pub texture_dimensions: [f32; 2],
    _pad1: [i32; 4],
}

impl MaskParameters {
    /// Records the decoded texture extent. Called once, after the mask loads.
    pub fn set_texture_dimensions(&mut self, width: u32, height: u32) {
        self.texture_dimensions = [width as f32, height as f32];
    }

    pub fn has_texture(&self) -> bool {
        self.texture_dimensions[0] >= 1.0 && self.texture_dimensions[1] >= 1.0
    }
}

impl Default for MaskParameters {
    fn default() -> Self {
        Self {
            point_bounding_box: [0.48, 0.67, 0.62, 0.92],
            texel_count: 14,
            _pad0: 0,
            texture_dimensions: [0.0, 0.0],
            _pad1: [0; 4],
        }
    }
}

/// The three parameter groups consumed together by one draw.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectModel {
    pub global: GlobalParameters,
    pub effect: EffectParameters,
    pub mask: MaskParameters,
}

impl EffectModel {
    /// Default look at the given logical resolution.
    pub fn with_resolution(width: f32, height: f32) -> Self {
        Self {
            global: GlobalParameters::new(width, height),
            ..Self::default()
        }
    }
}

pub const GLOBAL_STRIDE: usize = std::mem::size_of::<GlobalParameters>();
pub const EFFECT_STRIDE: usize = std::mem::size_of::<EffectParameters>();
pub const MASK_STRIDE: usize = std::mem::size_of::<MaskParameters>();

const _: () = assert!(std::mem::size_of::<LayerValues>() == 16);
const _: () = assert!(GLOBAL_STRIDE == 32);
const _: () = assert!(EFFECT_STRIDE == 192);
const _: () = assert!(MASK_STRIDE == 48);

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn global_parameters_follow_std140_layout() {
        assert_eq!(offset_of!(GlobalParameters, resolution), 0);
        assert_eq!(offset_of!(GlobalParameters, elapsed_time), 8);
        assert_eq!(GLOBAL_STRIDE % 16, 0);
    }

    #[test]
    fn effect_parameters_follow_std140_layout() {
        assert_eq!(offset_of!(EffectParameters, edge_feather_width), 0);
        assert_eq!(offset_of!(EffectParameters, center_shift), 4);
        assert_eq!(offset_of!(EffectParameters, colors), 16);
        assert_eq!(offset_of!(EffectParameters, strength), 64);
        assert_eq!(offset_of!(EffectParameters, length_px), 80);
        assert_eq!(offset_of!(EffectParameters, sharpness), 96);
        assert_eq!(offset_of!(EffectParameters, density), 112);
        assert_eq!(offset_of!(EffectParameters, speed), 128);
        assert_eq!(offset_of!(EffectParameters, falloff), 144);
        assert_eq!(offset_of!(EffectParameters, start_softness_px), 160);
        assert_eq!(offset_of!(EffectParameters, join_softness), 176);
    }

    #[test]
    fn mask_parameters_follow_std140_layout() {
        assert_eq!(offset_of!(MaskParameters, point_bounding_box), 0);
        assert_eq!(offset_of!(MaskParameters, texel_count), 16);
        assert_eq!(offset_of!(MaskParameters, texture_dimensions), 24);
    }

    #[test]
    fn defaults_reproduce_reference_look() {
        let effect = EffectParameters::default();
        assert_eq!(effect.colors[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(effect.colors[1], [0.0, 1.0, 1.0, 1.0]);
        assert_eq!(effect.colors[2], [1.0, 0.0, 0.6, 1.0]);
        assert_eq!(effect.length_px.values(), [300.0, 200.0, 400.0]);
        assert_eq!(effect.density[0], 0.45);
        assert_eq!(effect.join_softness[0], 0.1);

        let mask = MaskParameters::default();
        assert!(!mask.has_texture());
        assert_eq!(mask.texel_count, 14);
    }

    #[test]
    fn layer_values_index_by_layer() {
        let mut values = LayerValues::new([1.0, 2.0, 3.0]);
        values[1] = 5.0;
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 5.0);
        assert_eq!(values[2], 3.0);
        let bytes = bytemuck::bytes_of(&values);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
    }
}
