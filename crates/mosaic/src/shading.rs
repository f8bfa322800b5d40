//! Per-pixel mosaic algorithm.
//!
//! These functions are the reference the GLSL program is written against and
//! drive the software canvas directly. They use `f32` throughout to stay close
//! to what the GPU computes; exact bit equality with a driver is not expected
//! because `sin` differs between implementations.

use crate::uniforms::MosaicUniforms;

const TAU: f32 = 6.28318;
const NOISE_FLOOR: f32 = 1e-4;
const HIGHLIGHT_START: f32 = 0.55;

/// Output of one fragment: straight (non-premultiplied) colour plus alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub color: [f32; 3],
    pub alpha: f32,
}

pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [mix(a[0], b[0], t), mix(a[1], b[1], t), mix(a[2], b[2], t)]
}

/// Hermite threshold; a zero-width band degenerates to a step at `edge0`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn hash(p: [f32; 2]) -> f32 {
    fract((p[0] * 127.1 + p[1] * 311.7).sin() * 43758.547)
}

/// Bilinear value noise over the hash lattice, smoothed with Hermite weights.
pub fn value_noise(p: [f32; 2]) -> f32 {
    let i = [p[0].floor(), p[1].floor()];
    let f = [fract(p[0]), fract(p[1])];
    let a = hash(i);
    let b = hash([i[0] + 1.0, i[1]]);
    let c = hash([i[0], i[1] + 1.0]);
    let d = hash([i[0] + 1.0, i[1] + 1.0]);
    let u = [
        f[0] * f[0] * (3.0 - 2.0 * f[0]),
        f[1] * f[1] * (3.0 - 2.0 * f[1]),
    ];
    mix(a, b, u[0]) + (c - a) * u[1] * (1.0 - u[0]) + (d - b) * u[0] * u[1]
}

/// Snaps a normalised coordinate to the mosaic grid.
///
/// The cell count never drops below one per axis, whatever `pixel_size` is.
pub fn quantize_uv(uv: [f32; 2], resolution: [f32; 2], pixel_size: f32) -> [f32; 2] {
    let pixel_size = if pixel_size > 0.0 { pixel_size } else { 1.0 };
    let grid = [
        (resolution[0] / pixel_size).max(1.0),
        (resolution[1] / pixel_size).max(1.0),
    ];
    [
        (uv[0] * grid[0]).floor() / grid[0],
        (uv[1] * grid[1]).floor() / grid[1],
    ]
}

/// Drifting noise sample at a quantised coordinate, after the contrast curve.
pub fn mosaic_noise(uv: [f32; 2], noise_scale: f32, t: f32, contrast: f32) -> f32 {
    let angle = value_noise([uv[0] * noise_scale * 2.0 + t, uv[1] * noise_scale * 2.0 + t]) * TAU;
    let dir = [angle.cos(), angle.sin()];
    let n = value_noise([
        uv[0] * noise_scale + dir[0] * 0.25 + t * 0.2,
        uv[1] * noise_scale + dir[1] * 0.25 + t * 0.2,
    ]);
    n.max(NOISE_FLOOR).powf(contrast)
}

/// Looks up the palette ramp at position `tt` in `[0, 1]`.
///
/// Interpolates between entries `floor(tt * (k - 1))` and the next one, in the
/// declared order. A single-entry palette is constant.
pub fn palette_ramp(palette: &[[f32; 4]], count: usize, tt: f32) -> [f32; 3] {
    if palette.is_empty() {
        return [1.0, 1.0, 1.0];
    }
    let count = count.clamp(1, palette.len());
    let segments = (count.saturating_sub(1)).max(1) as f32;
    let index = (tt * segments).clamp(0.0, segments);
    let i = (index.floor() as usize).min(count - 1);
    let j = (i + 1).min(count - 1);
    let f = fract(index);
    let lo = [palette[i][0], palette[i][1], palette[i][2]];
    let hi = [palette[j][0], palette[j][1], palette[j][2]];
    mix3(lo, hi, f)
}

/// Steps 6 to 8 of the fragment program: palette, grayscale blend, highlight.
pub fn colorize(n: f32, uniforms: &MosaicUniforms) -> [f32; 3] {
    let tt = n.powf(uniforms.tone_gamma);
    let pal = palette_ramp(&uniforms.palette, uniforms.palette_len(), tt);
    let gray = [n, n, n];
    let mut col = mix3(gray, pal, uniforms.palette_mix.clamp(0.0, 1.0));

    let highlight = smoothstep(HIGHLIGHT_START, 1.0, n);
    let tint = [uniforms.tint[0], uniforms.tint[1], uniforms.tint[2]];
    col = mix3(col, tint, uniforms.tint_amount.clamp(0.0, 1.0) * highlight);
    [
        col[0].clamp(0.0, 1.0),
        col[1].clamp(0.0, 1.0),
        col[2].clamp(0.0, 1.0),
    ]
}

/// Per-axis feather mask: 0 at both ends, 1 once `feather` in from each side.
pub fn axis_mask(x: f32, feather: f32) -> f32 {
    smoothstep(0.0, feather, x) * smoothstep(0.0, feather, 1.0 - x)
}

/// Rectangular edge fade remapped into `[min_alpha, 1]`.
pub fn edge_alpha(uv: [f32; 2], feather: f32, min_alpha: f32) -> f32 {
    let mask = axis_mask(uv[0], feather) * axis_mask(uv[1], feather);
    mix(min_alpha, 1.0, mask)
}

/// Shades the pixel whose centre is at `frag_coord` (bottom-left origin).
///
/// Returns `None` when the surface has no area, mirroring the skipped draw.
pub fn shade_fragment(frag_coord: [f32; 2], uniforms: &MosaicUniforms) -> Option<Fragment> {
    if uniforms.has_empty_resolution() {
        return None;
    }
    let resolution = uniforms.resolution;
    let uv = [frag_coord[0] / resolution[0], frag_coord[1] / resolution[1]];
    let uv = quantize_uv(uv, resolution, uniforms.pixel_size);
    let t = uniforms.time * uniforms.speed;

    let n = mosaic_noise(uv, uniforms.noise_scale, t, uniforms.contrast);
    let color = colorize(n, uniforms);
    let alpha = edge_alpha(uv, uniforms.edge_feather, uniforms.edge_min_alpha);
    Some(Fragment { color, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(black_to_white_mix: f32) -> MosaicUniforms {
        let mut uniforms = MosaicUniforms::default();
        uniforms.palette[0] = [0.0, 0.0, 0.0, 1.0];
        for slot in &mut uniforms.palette[1..] {
            *slot = [1.0, 1.0, 1.0, 1.0];
        }
        uniforms.palette_count = 2;
        uniforms.palette_mix = black_to_white_mix;
        uniforms.tone_gamma = 1.0;
        uniforms.tint = [1.0, 0.0, 0.0, 1.0];
        uniforms.tint_amount = 0.0;
        uniforms
    }

    #[test]
    fn half_noise_maps_to_mid_gray() {
        let color = colorize(0.5, &two_tone(1.0));
        for channel in color {
            assert!((channel * 255.0 - 127.5).abs() <= 0.51, "channel {channel}");
        }
    }

    #[test]
    fn zero_tint_amount_ignores_tint_colour() {
        let mut uniforms = two_tone(1.0);
        let before = colorize(0.95, &uniforms);
        uniforms.tint = [0.0, 1.0, 0.0, 1.0];
        assert_eq!(before, colorize(0.95, &uniforms));
    }

    #[test]
    fn ramp_interpolates_between_bounding_entries() {
        let palette = [
            [0.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
        ];
        let k = palette.len();
        for step in 0..=100 {
            let n = step as f32 / 100.0;
            let position = n * (k - 1) as f32;
            let lo = position.floor() as usize;
            let hi = (position.ceil() as usize).min(k - 1);
            let f = position - position.floor();
            let got = palette_ramp(&palette, k, n);
            for channel in 0..3 {
                let expected = mix(palette[lo][channel], palette[hi][channel], f);
                assert!(
                    (got[channel] - expected).abs() < 1e-5,
                    "n={n} channel={channel} got={} expected={expected}",
                    got[channel]
                );
            }
        }
    }

    #[test]
    fn ramp_respects_declared_order() {
        let palette = [[1.0, 1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0]];
        assert_eq!(palette_ramp(&palette, 2, 0.0), [1.0, 1.0, 1.0]);
        assert_eq!(palette_ramp(&palette, 2, 1.0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn single_colour_palette_is_constant() {
        let mut uniforms = MosaicUniforms::default();
        uniforms.palette = [[0.2, 0.4, 0.6, 1.0]; 8];
        uniforms.palette_count = 1;
        uniforms.palette_mix = 1.0;
        uniforms.tone_gamma = 1.0;
        for step in 0..=20 {
            let n = step as f32 / 20.0;
            let ramp = palette_ramp(&uniforms.palette, 1, n);
            assert_eq!(ramp, [0.2, 0.4, 0.6]);
            let color = colorize(n, &uniforms);
            assert!(color.iter().all(|channel| channel.is_finite()));
        }

        uniforms.palette_mix = 0.5;
        let color = colorize(0.0, &uniforms);
        assert!((color[0] - 0.1).abs() < 1e-6);
        assert!((color[2] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn edge_alpha_is_axis_symmetric() {
        for step in 0..=50 {
            let eps = step as f32 / 100.0;
            let left = edge_alpha([eps, 0.5], 0.12, 0.2);
            let right = edge_alpha([1.0 - eps, 0.5], 0.12, 0.2);
            assert!((left - right).abs() < 1e-5, "eps={eps}");
        }
    }

    #[test]
    fn edge_alpha_midway_through_feather_band() {
        let alpha = edge_alpha([0.05, 0.5], 0.1, 0.2);
        assert!((alpha - 0.6).abs() < 1e-4, "alpha={alpha}");
        assert!((axis_mask(0.05, 0.1) - 0.5).abs() < 1e-4);
        assert_eq!(axis_mask(0.5, 0.1), 1.0);
    }

    #[test]
    fn zero_feather_disables_the_fade() {
        assert_eq!(edge_alpha([0.0, 0.0], 0.0, 0.2), 1.0);
    }

    #[test]
    fn value_noise_stays_in_unit_range() {
        for x in 0..40 {
            for y in 0..40 {
                let n = value_noise([x as f32 * 0.37 - 3.0, y as f32 * 0.41 + 7.0]);
                assert!((-1e-4..=1.0001).contains(&n), "noise {n}");
            }
        }
    }

    #[test]
    fn quantize_never_divides_by_zero() {
        let uv = quantize_uv([0.73, 0.21], [4.0, 4.0], 100.0);
        assert_eq!(uv, [0.0, 0.0]);
        let uv = quantize_uv([0.73, 0.21], [4.0, 4.0], 0.0);
        assert!(uv.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn shading_skips_empty_surfaces() {
        let mut uniforms = two_tone(1.0);
        uniforms.pixel_size = 6.0;
        uniforms.resolution = [0.0, 480.0];
        assert!(shade_fragment([0.5, 0.5], &uniforms).is_none());
        uniforms.resolution = [640.0, 480.0];
        let fragment = shade_fragment([320.5, 240.5], &uniforms).expect("fragment");
        assert!(fragment.color.iter().all(|c| (0.0..=1.0).contains(c)));
        assert!((0.0..=1.0).contains(&fragment.alpha));
    }
}
