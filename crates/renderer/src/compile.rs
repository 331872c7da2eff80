use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::ConfigurationError;

/// Compiles the static full-screen quad vertex shader.
pub(crate) fn compile_vertex_shader(
    device: &wgpu::Device,
) -> Result<wgpu::ShaderModule, ConfigurationError> {
    compile_glsl(device, "fullscreen quad vertex", VERTEX_SHADER_GLSL, ShaderStage::Vertex)
}

/// Compiles the ray/mask fragment program.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
) -> Result<wgpu::ShaderModule, ConfigurationError> {
    compile_glsl(
        device,
        "ray effect fragment",
        FRAGMENT_SHADER_GLSL,
        ShaderStage::Fragment,
    )
}

/// Hands GLSL to naga inside a validation error scope so that a broken
/// program is reported instead of tripping wgpu's uncaptured-error handler.
fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, ConfigurationError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(ConfigurationError::PipelineCompile(format!("{label}: {error}")));
    }
    tracing::debug!(shader = label, "compiled shader module");
    Ok(module)
}

/// Six vertices, two triangles, covering clip space. `v_uv` has its origin at
/// the top-left so it lines up with image coordinates.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(-1.0, 1.0),
    vec2(-1.0, 1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Ray/mask fragment program.
///
/// The three uniform blocks must match `GlobalParameters`, `EffectParameters`
/// and `MaskParameters` in `params.rs` field for field. Per-layer values are
/// `vec4`s whose `w` is the row padding. `shading.rs` is the CPU mirror of
/// everything below `main`'s inputs.
const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform GlobalParams {
    vec2 resolution;
    float elapsed_time;
    float _pad0;
    vec4 _pad1;
} globals;

layout(std140, set = 0, binding = 1) uniform EffectParams {
    float edge_feather_width;
    float center_shift;
    vec2 _pad0;
    vec4 color0;
    vec4 color1;
    vec4 color2;
    vec4 strength;
    vec4 length_px;
    vec4 sharpness;
    vec4 density;
    vec4 speed;
    vec4 falloff;
    vec4 start_softness_px;
    vec4 join_softness;
} effect;

layout(std140, set = 0, binding = 2) uniform MaskParams {
    vec4 point_bounding_box;
    int texel_count;
    int _pad0;
    vec2 texture_dimensions;
    ivec4 _pad1;
} mask;

layout(set = 1, binding = 0) uniform texture2D photo_texture;
layout(set = 1, binding = 1) uniform sampler photo_sampler;
layout(set = 1, binding = 2) uniform texture2D mask_texture;
layout(set = 1, binding = 3) uniform sampler mask_sampler;

const float STREAKS_PER_DENSITY = 48.0;
const float SHARPNESS_EXPONENT = 4.0;

float layer_intensity(
    vec2 delta,
    float strength,
    float length_px,
    float sharpness,
    float density,
    float speed,
    float falloff,
    float start_softness_px
) {
    if (strength <= 0.0 || length_px <= 0.0) {
        return 0.0;
    }
    float radius = length(delta);
    float theta = atan(delta.y, delta.x);
    float count = max(floor(density * STREAKS_PER_DENSITY + 0.5), 1.0);
    float wave = 0.5 + 0.5 * sin(theta * count + globals.elapsed_time * speed);
    float streak = pow(wave, max(sharpness, 0.001) * SHARPNESS_EXPONENT);
    float reach = 1.0 - smoothstep(0.0, length_px, radius);
    float decay = exp(-max(falloff, 0.0) * radius);
    float start = 1.0;
    if (start_softness_px > 0.0) {
        start = smoothstep(0.0, start_softness_px, radius);
    }
    return clamp(strength * streak * reach * decay * start, 0.0, 1.0);
}

vec4 accumulate_layer(vec4 rays, vec4 color, float weight) {
    return rays + vec4(color.rgb * color.a * weight, color.a * weight);
}

vec2 polygon_vertex(int index, ivec2 dims) {
    ivec2 texel = ivec2(index % dims.x, index / dims.x);
    vec2 uv = (vec2(texel) + vec2(0.5)) / vec2(dims);
    vec2 point = textureLod(sampler2D(mask_texture, mask_sampler), uv, 0.0).rg;
    return point * globals.resolution;
}

float mask_weight(vec2 uv, vec2 frag) {
    if (mask.texture_dimensions.x < 1.0 || mask.texture_dimensions.y < 1.0) {
        return 0.0;
    }
    ivec2 dims = ivec2(mask.texture_dimensions);
    int capacity = dims.x * dims.y;
    int count = clamp(mask.texel_count, 0, capacity);
    if (count < 3) {
        return 0.0;
    }

    float feather = effect.edge_feather_width;
    vec2 grow = vec2(max(feather, 0.0)) / max(globals.resolution, vec2(1.0));
    vec4 bbox = mask.point_bounding_box;
    if (uv.x < bbox.x - grow.x || uv.x > bbox.z + grow.x
        || uv.y < bbox.y - grow.y || uv.y > bbox.w + grow.y) {
        return 0.0;
    }

    vec2 previous = polygon_vertex(count - 1, dims);
    float distance_sq = 3.0e38;
    bool inside = false;
    for (int index = 0; index < count; index++) {
        vec2 current = polygon_vertex(index, dims);
        vec2 edge = previous - current;
        vec2 to_point = frag - current;
        float t = clamp(dot(to_point, edge) / max(dot(edge, edge), 1.0e-7), 0.0, 1.0);
        vec2 offset = to_point - edge * t;
        distance_sq = min(distance_sq, dot(offset, offset));
        if ((current.y > frag.y) != (previous.y > frag.y)) {
            float cross_x = current.x
                + (frag.y - current.y) * (previous.x - current.x) / (previous.y - current.y);
            if (frag.x < cross_x) {
                inside = !inside;
            }
        }
        previous = current;
    }

    float signed_distance = inside ? sqrt(distance_sq) : -sqrt(distance_sq);
    float coverage;
    if (feather > 0.0) {
        coverage = smoothstep(-feather, feather, signed_distance);
    } else {
        coverage = signed_distance >= 0.0 ? 1.0 : 0.0;
    }
    return coverage * float(count) / float(capacity);
}

void main() {
    vec2 uv = v_uv;
    vec2 frag = uv * globals.resolution;
    vec4 photo = texture(sampler2D(photo_texture, photo_sampler), uv);

    vec4 bbox = mask.point_bounding_box;
    vec2 origin = (bbox.xy + bbox.zw) * 0.5 * globals.resolution
        + vec2(0.0, effect.center_shift);
    vec2 delta = frag - origin;

    vec4 rays = vec4(0.0);
    float w0 = layer_intensity(delta, effect.strength.x, effect.length_px.x, effect.sharpness.x,
        effect.density.x, effect.speed.x, effect.falloff.x, effect.start_softness_px.x)
        * clamp(effect.join_softness.x, 0.0, 1.0);
    float w1 = layer_intensity(delta, effect.strength.y, effect.length_px.y, effect.sharpness.y,
        effect.density.y, effect.speed.y, effect.falloff.y, effect.start_softness_px.y)
        * clamp(effect.join_softness.y, 0.0, 1.0);
    float w2 = layer_intensity(delta, effect.strength.z, effect.length_px.z, effect.sharpness.z,
        effect.density.z, effect.speed.z, effect.falloff.z, effect.start_softness_px.z)
        * clamp(effect.join_softness.z, 0.0, 1.0);
    rays = accumulate_layer(rays, effect.color0, w0);
    rays = accumulate_layer(rays, effect.color1, w1);
    rays = accumulate_layer(rays, effect.color2, w2);
    rays = clamp(rays, vec4(0.0), vec4(1.0));

    rays *= mask_weight(uv, frag);
    float keep = 1.0 - rays.a;
    out_color = vec4(rays.rgb + photo.rgb * photo.a * keep, rays.a + photo.a * keep);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    fn block<'a>(source: &'a str, name: &str) -> Vec<&'a str> {
        let start = source
            .find(&format!("uniform {name} {{"))
            .unwrap_or_else(|| panic!("block {name} missing"));
        let body = &source[start..];
        let end = body.find('}').expect("unterminated block");
        body[..end]
            .lines()
            .skip(1)
            .filter_map(|line| line.trim().strip_suffix(';'))
            .filter_map(|decl| decl.split_whitespace().nth(1))
            .collect()
    }

    #[test]
    fn global_block_matches_record_order() {
        assert_eq!(
            block(FRAGMENT_SHADER_GLSL, "GlobalParams"),
            ["resolution", "elapsed_time", "_pad0", "_pad1"]
        );
    }

    #[test]
    fn effect_block_matches_record_order() {
        assert_eq!(
            block(FRAGMENT_SHADER_GLSL, "EffectParams"),
            [
                "edge_feather_width",
                "center_shift",
                "_pad0",
                "color0",
                "color1",
                "color2",
                "strength",
                "length_px",
                "sharpness",
                "density",
                "speed",
                "falloff",
                "start_softness_px",
                "join_softness",
            ]
        );
    }

    #[test]
    fn mask_block_matches_record_order() {
        assert_eq!(
            block(FRAGMENT_SHADER_GLSL, "MaskParams"),
            [
                "point_bounding_box",
                "texel_count",
                "_pad0",
                "texture_dimensions",
                "_pad1"
            ]
        );
    }

    #[test]
    fn vertex_stage_emits_six_vertices() {
        assert!(VERTEX_SHADER_GLSL.contains("vec2[6]"));
        assert!(VERTEX_SHADER_GLSL.contains("out vec2 v_uv"));
    }

    #[test]
    fn fragment_constants_match_cpu_mirror() {
        assert!(FRAGMENT_SHADER_GLSL.contains("STREAKS_PER_DENSITY = 48.0"));
        assert!(FRAGMENT_SHADER_GLSL.contains("SHARPNESS_EXPONENT = 4.0"));
    }
}
