//! CPU evaluation of the ray fragment program.
//!
//! Mirrors `FRAGMENT_SHADER_GLSL` in `compile.rs` function for function, so the
//! per-pixel contract (layer intensities, mask weight, premultiplied
//! composite) can be checked without a GPU. Keep both sides in sync.

use crate::mask::MaskImage;
use crate::params::{EffectModel, EffectParameters, MaskParameters, RAY_LAYER_COUNT};

/// Angular streak count per unit of `density`.
const STREAKS_PER_DENSITY: f32 = 48.0;
/// Exponent applied to `sharpness` when narrowing streaks.
const SHARPNESS_EXPONENT: f32 = 4.0;

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Ray origin in logical pixels: bounding-box centre shifted vertically.
pub fn ray_origin(model: &EffectModel) -> [f32; 2] {
    let [min_x, min_y, max_x, max_y] = model.mask.point_bounding_box;
    let [width, height] = model.global.resolution;
    [
        (min_x + max_x) * 0.5 * width,
        (min_y + max_y) * 0.5 * height + model.effect.center_shift,
    ]
}

/// Intensity in `[0, 1]` of ray layer `layer` at offset `delta` from the origin.
pub fn layer_intensity(effect: &EffectParameters, layer: usize, delta: [f32; 2], time: f32) -> f32 {
    let strength = effect.strength[layer];
    let length_px = effect.length_px[layer];
    if strength <= 0.0 || length_px <= 0.0 {
        return 0.0;
    }

    let radius = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt();
    let theta = delta[1].atan2(delta[0]);
    let count = (effect.density[layer] * STREAKS_PER_DENSITY).round().max(1.0);
    let wave = 0.5 + 0.5 * (theta * count + time * effect.speed[layer]).sin();
    let streak = wave.powf(effect.sharpness[layer].max(1e-3) * SHARPNESS_EXPONENT);
    let reach = 1.0 - smoothstep(0.0, length_px, radius);
    let decay = (-effect.falloff[layer].max(0.0) * radius).exp();
    let soft = effect.start_softness_px[layer];
    let start = if soft > 0.0 {
        smoothstep(0.0, soft, radius)
    } else {
        1.0
    };

    (strength * streak * reach * decay * start).clamp(0.0, 1.0)
}

/// Additive-then-clamp blend of all layers, premultiplied `[r, g, b, a]`.
pub fn ray_color(model: &EffectModel, frag: [f32; 2]) -> [f32; 4] {
    let origin = ray_origin(model);
    let delta = [frag[0] - origin[0], frag[1] - origin[1]];
    let effect = &model.effect;
    let mut rays = [0.0f32; 4];
    for layer in 0..RAY_LAYER_COUNT {
        let weight = layer_intensity(effect, layer, delta, model.global.elapsed_time)
            * effect.join_softness[layer].clamp(0.0, 1.0);
        let [r, g, b, a] = effect.colors[layer];
        rays[0] += r * a * weight;
        rays[1] += g * a * weight;
        rays[2] += b * a * weight;
        rays[3] += a * weight;
    }
    rays.map(|channel| channel.clamp(0.0, 1.0))
}

/// Signed distance in pixels from `point` to the polygon, positive inside.
fn signed_polygon_distance(vertices: &[[f32; 2]], point: [f32; 2]) -> f32 {
    let mut distance_sq = f32::MAX;
    let mut inside = false;
    let mut previous = vertices[vertices.len() - 1];
    for &current in vertices {
        let edge = [previous[0] - current[0], previous[1] - current[1]];
        let to_point = [point[0] - current[0], point[1] - current[1]];
        let edge_len_sq = (edge[0] * edge[0] + edge[1] * edge[1]).max(f32::EPSILON);
        let t = ((to_point[0] * edge[0] + to_point[1] * edge[1]) / edge_len_sq).clamp(0.0, 1.0);
        let dx = to_point[0] - edge[0] * t;
        let dy = to_point[1] - edge[1] * t;
        distance_sq = distance_sq.min(dx * dx + dy * dy);

        // Even-odd crossing test on a horizontal ray.
        if (current[1] > point[1]) != (previous[1] > point[1]) {
            let cross_x = current[0]
                + (point[1] - current[1]) * (previous[0] - current[0]) / (previous[1] - current[1]);
            if point[0] < cross_x {
                inside = !inside;
            }
        }
        previous = current;
    }
    let distance = distance_sq.sqrt();
    if inside {
        distance
    } else {
        -distance
    }
}

/// Mask weight in `[0, 1]` at normalised position `uv`.
///
/// Zero whenever no mask texture is bound (`texture_dimensions` unset or no
/// image), when fewer than three vertices are meaningful, or outside the
/// feathered bounding box.
pub fn mask_weight(model: &EffectModel, mask_image: Option<&MaskImage>, uv: [f32; 2]) -> f32 {
    let mask: &MaskParameters = &model.mask;
    let Some(image) = mask_image else {
        return 0.0;
    };
    if !mask.has_texture() {
        return 0.0;
    }

    let capacity = (mask.texture_dimensions[0] as i32) * (mask.texture_dimensions[1] as i32);
    let count = mask.texel_count.clamp(0, capacity);
    if count < 3 {
        return 0.0;
    }

    let [width, height] = model.global.resolution;
    let feather = model.effect.edge_feather_width;
    let grow = [
        feather.max(0.0) / width.max(1.0),
        feather.max(0.0) / height.max(1.0),
    ];
    let [min_x, min_y, max_x, max_y] = mask.point_bounding_box;
    if uv[0] < min_x - grow[0]
        || uv[0] > max_x + grow[0]
        || uv[1] < min_y - grow[1]
        || uv[1] > max_y + grow[1]
    {
        return 0.0;
    }

    let vertices: Vec<[f32; 2]> = image
        .vertices(count as usize)
        .map(|[x, y]| [x * width, y * height])
        .collect();
    if vertices.len() < 3 {
        return 0.0;
    }
    let signed = signed_polygon_distance(&vertices, [uv[0] * width, uv[1] * height]);
    let coverage = if feather > 0.0 {
        smoothstep(-feather, feather, signed)
    } else if signed >= 0.0 {
        1.0
    } else {
        0.0
    };
    coverage * count as f32 / capacity as f32
}

/// Final premultiplied colour for one pixel.
///
/// `photo` is the straight-alpha background sample at `uv`.
pub fn shade(
    model: &EffectModel,
    mask_image: Option<&MaskImage>,
    uv: [f32; 2],
    photo: [f32; 4],
) -> [f32; 4] {
    let [width, height] = model.global.resolution;
    let frag = [uv[0] * width, uv[1] * height];
    let gate = mask_weight(model, mask_image, uv);
    let rays = ray_color(model, frag).map(|channel| channel * gate);
    let keep = 1.0 - rays[3];
    [
        rays[0] + photo[0] * photo[3] * keep,
        rays[1] + photo[1] * photo[3] * keep,
        rays[2] + photo[2] * photo[3] * keep,
        rays[3] + photo[3] * keep,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{MaskLoadOptions, MASK_BITMAP};

    fn loaded() -> (EffectModel, MaskImage) {
        let image = MaskImage::decode(MASK_BITMAP, MaskLoadOptions::default()).expect("decode");
        let mut model = EffectModel::with_resolution(900.0, 1200.0);
        model
            .mask
            .set_texture_dimensions(image.width(), image.height());
        (model, image)
    }

    fn bbox_center(model: &EffectModel) -> [f32; 2] {
        let [min_x, min_y, max_x, max_y] = model.mask.point_bounding_box;
        [(min_x + max_x) * 0.5, (min_y + max_y) * 0.5]
    }

    #[test]
    fn center_weight_is_center_texel_scaled_by_texel_count() {
        let (model, image) = loaded();
        assert_eq!(model.global.elapsed_time, 0.0);
        // Coverage is 1 at the bbox centre and the centre texel is opaque, so
        // only the texel-count factor scales the weight.
        let center_texel = image.texel(image.width() / 2, image.height() / 2);
        assert_eq!(center_texel[3], 255);
        let intensity = f32::from(center_texel[3]) / 255.0;
        let expected = intensity * model.mask.texel_count as f32 / 16.0;
        let weight = mask_weight(&model, Some(&image), bbox_center(&model));
        assert!((weight - expected).abs() < 1e-6, "{weight} vs {expected}");
    }

    #[test]
    fn unset_dimensions_disable_the_mask() {
        let (mut model, image) = loaded();
        model.mask.texture_dimensions = [0.0, 0.0];
        for uv in [[0.5, 0.5], bbox_center(&model), [0.0, 0.0]] {
            assert_eq!(mask_weight(&model, Some(&image), uv), 0.0);
        }
        let (model, _) = loaded();
        assert_eq!(mask_weight(&model, None, bbox_center(&model)), 0.0);
    }

    #[test]
    fn weight_is_zero_outside_the_polygon() {
        let (model, image) = loaded();
        assert_eq!(mask_weight(&model, Some(&image), [0.1, 0.1]), 0.0);
        // Inside the bounding box but left of the polygon's leftmost edge.
        let near_corner = [0.4805, 0.6705];
        assert!(mask_weight(&model, Some(&image), near_corner) < 1e-3);
    }

    #[test]
    fn feather_softens_the_edge() {
        let (model, image) = loaded();
        // Left edge of the polygon runs at x = 124/255 between y = .702 and .918.
        let edge_x = 124.0 / 255.0;
        let y = 0.8;
        let at_edge = mask_weight(&model, Some(&image), [edge_x, y]);
        let scale = 14.0 / 16.0;
        assert!(at_edge > 0.2 * scale && at_edge < 0.8 * scale, "{at_edge}");
        let inside = mask_weight(&model, Some(&image), [edge_x + 2.0 / 900.0, y]);
        assert!((inside - scale).abs() < 1e-6);
    }

    #[test]
    fn too_few_vertices_disable_the_mask() {
        let (mut model, image) = loaded();
        model.mask.texel_count = 2;
        assert_eq!(mask_weight(&model, Some(&image), bbox_center(&model)), 0.0);
    }

    #[test]
    fn layer_intensity_stays_in_unit_range() {
        let effect = EffectParameters::default();
        for layer in 0..RAY_LAYER_COUNT {
            for step in 0..64 {
                let angle = step as f32 * 0.1;
                let radius = step as f32 * 7.0;
                let delta = [angle.cos() * radius, angle.sin() * radius];
                let value = layer_intensity(&effect, layer, delta, step as f32 * 0.25);
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }

    #[test]
    fn rays_fade_out_past_their_length() {
        let effect = EffectParameters::default();
        assert_eq!(layer_intensity(&effect, 1, [0.0, 250.0], 0.0), 0.0);
        assert_eq!(layer_intensity(&effect, 0, [0.0, 0.0], 0.0), 0.0);
    }

    #[test]
    fn zero_strength_disables_a_layer() {
        let mut model = EffectModel::default();
        for layer in 0..RAY_LAYER_COUNT {
            model.effect.strength[layer] = 0.0;
        }
        let origin = ray_origin(&model);
        let frag = [origin[0] + 20.0, origin[1] + 5.0];
        assert_eq!(ray_color(&model, frag), [0.0; 4]);

        model.effect.strength[1] = 1.0;
        let color = ray_color(&model, frag);
        // Only the cyan layer contributes.
        assert_eq!(color[0], 0.0);
        assert!((color[1] - color[2]).abs() < 1e-6);
    }

    #[test]
    fn center_shift_moves_the_origin() {
        let mut model = EffectModel::default();
        let before = ray_origin(&model);
        model.effect.center_shift = 30.0;
        let after = ray_origin(&model);
        assert_eq!(before[0], after[0]);
        assert!((after[1] - before[1] - 30.0).abs() < 1e-4);
    }

    #[test]
    fn output_is_premultiplied() {
        let (mut model, image) = loaded();
        let photo = [0.8, 0.6, 0.4, 1.0];
        let center = bbox_center(&model);
        for frame in 0..8 {
            model.global.elapsed_time = frame as f32 * 0.37;
            for offset in [-0.03, -0.01, 0.0, 0.02] {
                let uv = [center[0] + offset, center[1] + offset];
                let [r, g, b, a] = shade(&model, Some(&image), uv, photo);
                assert!(a <= 1.0 + 1e-6);
                for channel in [r, g, b] {
                    assert!(channel <= a + 1e-6);
                }
            }
        }
    }

    #[test]
    fn without_a_mask_the_photo_passes_through() {
        let model = EffectModel::default();
        let photo = [0.2, 0.4, 0.6, 0.5];
        let [r, g, b, a] = shade(&model, None, [0.55, 0.8], photo);
        assert!((r - 0.1).abs() < 1e-6);
        assert!((g - 0.2).abs() < 1e-6);
        assert!((b - 0.3).abs() < 1e-6);
        assert!((a - 0.5).abs() < 1e-6);
    }
}
