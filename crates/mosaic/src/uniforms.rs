use bytemuck::{Pod, Zeroable};

use crate::color::{ColorResolver, Rgb};
use crate::config::{RenderConfiguration, MAX_PALETTE};

/// CPU mirror of the `MosaicParams` uniform block.
///
/// Field order and padding follow std140; the GLSL declaration lives in
/// `renderer::compile` and must stay in sync with this struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MosaicUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub pixel_size: f32,
    pub noise_scale: f32,
    pub contrast: f32,
    pub speed: f32,
    pub palette_mix: f32,
    pub tone_gamma: f32,
    pub tint_amount: f32,
    pub edge_feather: f32,
    pub edge_min_alpha: f32,
    pub tint: [f32; 4],
    pub palette: [[f32; 4]; MAX_PALETTE],
    pub palette_count: u32,
    pub _padding: [u32; 3],
}

impl MosaicUniforms {
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width as f32, height as f32];
    }

    pub fn set_time(&mut self, seconds: f64) {
        self.time = seconds as f32;
    }

    /// True when either axis has collapsed to zero pixels.
    pub fn has_empty_resolution(&self) -> bool {
        !(self.resolution[0] >= 1.0 && self.resolution[1] >= 1.0)
    }

    pub fn palette_len(&self) -> usize {
        (self.palette_count as usize).clamp(1, MAX_PALETTE)
    }
}

impl Default for MosaicUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Translates a [`RenderConfiguration`] into a complete uniform block.
///
/// Colours go through the injected resolver on every sync, never cached, so
/// theme variables edited between syncs are picked up immediately.
pub struct UniformSyncer<R> {
    resolver: R,
}

impl<R: ColorResolver> UniformSyncer<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Builds a full parameter block with zero resolution and time.
    pub fn stage(&self, config: &RenderConfiguration) -> MosaicUniforms {
        let config = config.sanitized();

        let resolved: Vec<Rgb> = config
            .palette
            .iter()
            .map(|color| self.resolve_or_white(color, "palette"))
            .collect();
        let count = resolved.len().clamp(1, MAX_PALETTE);
        let last = resolved.last().copied().unwrap_or(Rgb::WHITE);
        let palette: [[f32; 4]; MAX_PALETTE] = std::array::from_fn(|index| {
            resolved.get(index).copied().unwrap_or(last).to_vec4()
        });

        MosaicUniforms {
            resolution: [0.0, 0.0],
            time: 0.0,
            pixel_size: config.pixel_size,
            noise_scale: config.noise_scale,
            contrast: config.contrast,
            speed: config.speed,
            palette_mix: config.palette_mix,
            tone_gamma: config.tone_gamma,
            tint_amount: config.tint_amount,
            edge_feather: config.edge_feather,
            edge_min_alpha: config.edge_min_alpha,
            tint: self.resolve_or_white(&config.tint, "tint").to_vec4(),
            palette,
            palette_count: count as u32,
            _padding: [0; 3],
        }
    }

    /// Replaces every configuration-derived field of `target` in one store.
    ///
    /// Resolution and time belong to the resize and frame paths and are carried
    /// over from the live block.
    pub fn sync(&self, config: &RenderConfiguration, target: &mut MosaicUniforms) {
        let mut staged = self.stage(config);
        staged.resolution = target.resolution;
        staged.time = target.time;
        *target = staged;
        tracing::trace!(
            palette = target.palette_count,
            pixel_size = target.pixel_size,
            "synced mosaic uniforms"
        );
    }

    fn resolve_or_white(&self, color: &str, field: &'static str) -> Rgb {
        match self.resolver.resolve(color) {
            Ok(rgb) => rgb,
            Err(err) => {
                tracing::warn!(field, color, error = %err, "failed to resolve colour; using white");
                Rgb::WHITE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{CssColorResolver, ThemeVariables};
    use std::mem::{offset_of, size_of};

    #[test]
    fn mosaic_uniforms_follow_std140_layout() {
        assert_eq!(offset_of!(MosaicUniforms, resolution), 0);
        assert_eq!(offset_of!(MosaicUniforms, time), 8);
        assert_eq!(offset_of!(MosaicUniforms, edge_min_alpha), 44);
        assert_eq!(offset_of!(MosaicUniforms, tint), 48);
        assert_eq!(offset_of!(MosaicUniforms, palette), 64);
        assert_eq!(offset_of!(MosaicUniforms, palette_count), 192);
        assert_eq!(size_of::<MosaicUniforms>(), 208);
        assert_eq!(size_of::<MosaicUniforms>() % 16, 0);
    }

    #[test]
    fn short_palettes_pad_with_last_colour() {
        let syncer = UniformSyncer::new(CssColorResolver::default());
        let config = RenderConfiguration {
            palette: vec!["#000000".into(), "#ff0000".into()],
            ..RenderConfiguration::default()
        };
        let block = syncer.stage(&config);
        assert_eq!(block.palette_count, 2);
        assert_eq!(block.palette[0], [0.0, 0.0, 0.0, 1.0]);
        for slot in &block.palette[1..] {
            assert_eq!(*slot, [1.0, 0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn empty_palette_falls_back_to_single_colour() {
        let syncer = UniformSyncer::new(CssColorResolver::default());
        let config = RenderConfiguration {
            palette: Vec::new(),
            ..RenderConfiguration::default()
        };
        let block = syncer.stage(&config);
        assert_eq!(block.palette_count, 1);
        assert!(block.palette.iter().all(|slot| *slot == [1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn unresolvable_colours_become_white() {
        let syncer = UniformSyncer::new(CssColorResolver::default());
        let config = RenderConfiguration {
            palette: vec!["#000".into(), "definitely-not-a-colour".into()],
            tint: "var(--undefined)".into(),
            ..RenderConfiguration::default()
        };
        let block = syncer.stage(&config);
        assert_eq!(block.palette[1], [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(block.tint, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn sync_preserves_resolution_and_time() {
        let syncer = UniformSyncer::new(CssColorResolver::default());
        let mut live = syncer.stage(&RenderConfiguration::default());
        live.set_resolution(640, 360);
        live.set_time(12.5);

        let next = RenderConfiguration {
            pixel_size: 12.0,
            palette_mix: 0.9,
            ..RenderConfiguration::default()
        };
        syncer.sync(&next, &mut live);
        assert_eq!(live.resolution, [640.0, 360.0]);
        assert_eq!(live.time, 12.5);
        assert_eq!(live.pixel_size, 12.0);
        assert_eq!(live.palette_mix, 0.9);
    }

    #[test]
    fn theme_edits_show_up_on_next_sync() {
        let theme = ThemeVariables::new();
        theme.set("--accent", "#000000");
        let syncer = UniformSyncer::new(CssColorResolver::new(theme.clone()));
        let config = RenderConfiguration {
            palette: vec!["var(--accent)".into()],
            ..RenderConfiguration::default()
        };
        let mut live = MosaicUniforms::default();
        syncer.sync(&config, &mut live);
        assert_eq!(live.palette[0], [0.0, 0.0, 0.0, 1.0]);

        theme.set("--accent", "#ffffff");
        syncer.sync(&config, &mut live);
        assert_eq!(live.palette[0], [1.0, 1.0, 1.0, 1.0]);
    }
}
