//! Copies the parameter model into the byte regions uploaded to the uniform
//! buffers each frame.
//!
//! Regions are allocated once, at the stride of each record, and rewritten in
//! place; the steady-state path does not allocate.

use crate::params::{
    EffectModel, EffectParameters, GlobalParameters, MaskParameters, EFFECT_STRIDE, GLOBAL_STRIDE,
    MASK_STRIDE,
};

pub struct ParameterMarshaller {
    global: Box<[u8]>,
    effect: Box<[u8]>,
    mask: Box<[u8]>,
}

/// Borrowed view of the three marshalled regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarshalledParameters<'a> {
    pub global: &'a [u8],
    pub effect: &'a [u8],
    pub mask: &'a [u8],
}

impl ParameterMarshaller {
    pub fn new() -> Self {
        Self {
            global: vec![0u8; GLOBAL_STRIDE].into_boxed_slice(),
            effect: vec![0u8; EFFECT_STRIDE].into_boxed_slice(),
            mask: vec![0u8; MASK_STRIDE].into_boxed_slice(),
        }
    }

    /// Overwrites all three regions with the model's current field values.
    pub fn marshal(&mut self, model: &EffectModel) -> MarshalledParameters<'_> {
        write_region(&mut self.global, bytemuck::bytes_of(&model.global), "global");
        write_region(&mut self.effect, bytemuck::bytes_of(&model.effect), "effect");
        write_region(&mut self.mask, bytemuck::bytes_of(&model.mask), "mask");
        self.regions()
    }

    /// Bytes written by the most recent `marshal` call.
    pub fn regions(&self) -> MarshalledParameters<'_> {
        MarshalledParameters {
            global: &self.global,
            effect: &self.effect,
            mask: &self.mask,
        }
    }
}

impl Default for ParameterMarshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl MarshalledParameters<'_> {
    pub fn read_global(&self) -> GlobalParameters {
        bytemuck::pod_read_unaligned(&self.global[..GLOBAL_STRIDE])
    }

    pub fn read_effect(&self) -> EffectParameters {
        bytemuck::pod_read_unaligned(&self.effect[..EFFECT_STRIDE])
    }

    pub fn read_mask(&self) -> MaskParameters {
        bytemuck::pod_read_unaligned(&self.mask[..MASK_STRIDE])
    }
}

fn write_region(region: &mut [u8], bytes: &[u8], name: &str) {
    assert!(
        bytes.len() <= region.len(),
        "{name} parameters ({} bytes) overflow their {}-byte region",
        bytes.len(),
        region.len()
    );
    region[..bytes.len()].copy_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customised_model() -> EffectModel {
        let mut model = EffectModel::with_resolution(900.0, 1200.0);
        model.global.elapsed_time = 12.75;
        model.effect.center_shift = -14.0;
        model.effect.colors[2] = [0.25, 0.5, 0.75, 0.5];
        model.effect.strength[1] = 0.0;
        model.effect.join_softness[2] = 0.33;
        model.mask.texel_count = 9;
        model.mask.set_texture_dimensions(4, 4);
        model
    }

    #[test]
    fn regions_are_sized_to_strides() {
        let marshaller = ParameterMarshaller::new();
        let regions = marshaller.regions();
        assert_eq!(regions.global.len(), 32);
        assert_eq!(regions.effect.len(), 192);
        assert_eq!(regions.mask.len(), 48);
    }

    #[test]
    fn each_group_reads_back_unchanged() {
        let model = customised_model();
        let mut marshaller = ParameterMarshaller::new();
        let regions = marshaller.marshal(&model);
        assert_eq!(regions.read_global(), model.global);
        assert_eq!(regions.read_effect(), model.effect);
        assert_eq!(regions.read_mask(), model.mask);
    }

    #[test]
    fn marshal_overwrites_previous_bytes() {
        let mut marshaller = ParameterMarshaller::new();
        let mut model = customised_model();
        marshaller.marshal(&model);
        model.global.elapsed_time = 13.0;
        let regions = marshaller.marshal(&model);
        assert_eq!(regions.read_global().elapsed_time, 13.0);
        assert_eq!(&regions.global[8..12], &13.0f32.to_ne_bytes());
    }

    #[test]
    fn fields_land_at_block_offsets() {
        let model = customised_model();
        let mut marshaller = ParameterMarshaller::new();
        let regions = marshaller.marshal(&model);
        assert_eq!(&regions.global[0..4], &900.0f32.to_ne_bytes());
        assert_eq!(&regions.global[4..8], &1200.0f32.to_ne_bytes());
        assert_eq!(&regions.effect[4..8], &(-14.0f32).to_ne_bytes());
        assert_eq!(&regions.mask[16..20], &9i32.to_ne_bytes());
        assert_eq!(&regions.mask[24..28], &4.0f32.to_ne_bytes());
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn oversized_record_fails_fast() {
        let mut region = [0u8; 8];
        write_region(&mut region, &[1u8; 16], "test");
    }
}
