use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the mosaic fragment program.
///
/// Validation errors surface through the device error scope opened by the
/// caller, not through this function.
pub(crate) fn compile_mosaic_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mosaic fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(MOSAIC_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Compiles the pass that scales the mosaic target onto the swapchain.
pub(crate) fn compile_blit_shader(device: &wgpu::Device, premultiply: bool) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mosaic blit fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(blit_shader_source(premultiply)),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Blit program with the alpha handling the surface compositor expects.
fn blit_shader_source(premultiply: bool) -> String {
    let define = if premultiply {
        "#define PREMULTIPLY_ALPHA\n"
    } else {
        ""
    };
    format!("#version 450\n{define}{BLIT_BODY}")
}

/// Per-pixel mosaic program.
///
/// The `MosaicParams` block must match `mosaic::MosaicUniforms` byte for byte
/// and the body must track `mosaic::shading`. `gl_FragCoord` is flipped so the
/// origin sits bottom-left like the software canvas.
pub(crate) const MOSAIC_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform MosaicParams {
    vec2 u_resolution;
    float u_time;
    float u_pixel_size;
    float u_noise_scale;
    float u_contrast;
    float u_speed;
    float u_palette_mix;
    float u_tone_gamma;
    float u_tint_amount;
    float u_edge_feather;
    float u_edge_min_alpha;
    vec4 u_tint;
    vec4 u_palette[8];
    uint u_palette_count;
} params;

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(127.1, 311.7))) * 43758.5453123);
}

float valueNoise(vec2 p) {
    vec2 i = floor(p);
    vec2 f = fract(p);
    float a = hash(i);
    float b = hash(i + vec2(1.0, 0.0));
    float c = hash(i + vec2(0.0, 1.0));
    float d = hash(i + vec2(1.0, 1.0));
    vec2 u = f * f * (3.0 - 2.0 * f);
    return mix(a, b, u.x) + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y;
}

vec3 paletteRamp(float t) {
    int count = int(clamp(params.u_palette_count, 1u, 8u));
    float segs = float(max(count - 1, 1));
    float idx = clamp(t * segs, 0.0, segs);
    int i = min(int(floor(idx)), count - 1);
    int j = min(i + 1, count - 1);
    float f = fract(idx);
    return mix(params.u_palette[i].rgb, params.u_palette[j].rgb, f);
}

float axisMask(float x, float feather) {
    if (feather <= 0.0) {
        return 1.0;
    }
    return smoothstep(0.0, feather, x) * smoothstep(0.0, feather, 1.0 - x);
}

void main() {
    vec2 res = params.u_resolution;
    vec2 fragCoord = vec2(gl_FragCoord.x, res.y - gl_FragCoord.y);
    vec2 uv = fragCoord / res;

    float pixelSize = params.u_pixel_size;
    if (pixelSize <= 0.0) {
        pixelSize = 1.0;
    }
    vec2 grid = max(vec2(1.0), res / pixelSize);
    uv = floor(uv * grid) / grid;

    float t = params.u_time * params.u_speed;
    float angle = valueNoise(uv * params.u_noise_scale * 2.0 + t) * 6.28318;
    vec2 dir = vec2(cos(angle), sin(angle));
    float n = valueNoise(uv * params.u_noise_scale + dir * 0.25 + t * 0.2);
    n = pow(max(n, 1e-4), params.u_contrast);

    float tt = pow(n, params.u_tone_gamma);
    vec3 pal = paletteRamp(tt);
    vec3 col = mix(vec3(n), pal, clamp(params.u_palette_mix, 0.0, 1.0));

    float highlight = smoothstep(0.55, 1.0, n);
    col = mix(col, params.u_tint.rgb, clamp(params.u_tint_amount, 0.0, 1.0) * highlight);

    float mask = axisMask(uv.x, params.u_edge_feather) * axisMask(uv.y, params.u_edge_feather);
    float alpha = mix(params.u_edge_min_alpha, 1.0, mask);

    outColor = vec4(clamp(col, 0.0, 1.0), alpha);
}
";

const BLIT_BODY: &str = r"layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D mosaic_texture;
layout(set = 0, binding = 1) uniform sampler mosaic_sampler;

void main() {
    vec2 uv = vec2(v_uv.x, 1.0 - v_uv.y);
    vec4 texel = texture(sampler2D(mosaic_texture, mosaic_sampler), uv);
#ifdef PREMULTIPLY_ALPHA
    outColor = vec4(texel.rgb * texel.a, texel.a);
#else
    outColor = texel;
#endif
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
