use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Number of palette slots available to the shader.
pub const MAX_PALETTE: usize = 8;

/// Colour used when a configuration supplies an empty palette.
pub const FALLBACK_PALETTE_COLOR: &str = "#ffffff";

/// Smallest value accepted for exponents and frequency multipliers.
pub const MIN_POSITIVE: f32 = 1e-4;

/// Upper bound applied to the platform device pixel ratio in `auto` quality.
pub const AUTO_MAX_PIXEL_RATIO: f64 = 2.0;

const FIXED_QUALITY_STEPS: [f32; 4] = [0.75, 1.0, 1.5, 2.0];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Pixel density policy for the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Quality {
    /// Follow the platform device pixel ratio, capped at 2.
    #[default]
    Auto,
    /// Fixed multiplier, one of 0.75, 1, 1.5 or 2.
    Fixed(f32),
}

impl Quality {
    /// Effective backing-store scale for the reported device pixel ratio.
    pub fn scale(self, device_pixel_ratio: f64) -> f64 {
        match self {
            Quality::Auto => {
                if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
                    device_pixel_ratio.min(AUTO_MAX_PIXEL_RATIO)
                } else {
                    1.0
                }
            }
            Quality::Fixed(value) => f64::from(value),
        }
    }

    fn from_number(value: f64) -> Result<Self, String> {
        FIXED_QUALITY_STEPS
            .iter()
            .copied()
            .find(|step| (f64::from(*step) - value).abs() < 1e-6)
            .map(Quality::Fixed)
            .ok_or_else(|| {
                format!("unsupported quality {value}; expected auto, 0.75, 1, 1.5 or 2")
            })
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("quality must not be empty".to_string());
        }
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Quality::Auto);
        }
        let number: f64 = trimmed
            .parse()
            .map_err(|_| format!("invalid quality '{trimmed}'; use auto or 0.75/1/1.5/2"))?;
        Quality::from_number(number)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Auto => f.write_str("auto"),
            Quality::Fixed(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for Quality {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Quality::Auto => serializer.serialize_str("auto"),
            Quality::Fixed(value) => serializer.serialize_f64(f64::from(*value)),
        }
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Quality;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("\"auto\" or one of 0.75, 1, 1.5, 2")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Quality::from_number(v as f64).map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Quality::from_number(v as f64).map_err(E::custom)
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Quality::from_number(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// Every knob the mosaic exposes to its host.
///
/// Values are accepted as given and clamped by [`RenderConfiguration::sanitized`]
/// right before they reach the uniform block, so a host can never push the
/// shader into an invalid state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfiguration {
    pub pixel_size: f32,
    pub noise_scale: f32,
    pub contrast: f32,
    pub speed: f32,
    /// Up to eight colours: hex, `rgb()`, CSS names or `var(--name)`.
    pub palette: Vec<String>,
    /// 0 keeps the grayscale noise, 1 uses the palette ramp fully.
    pub palette_mix: f32,
    /// Curves how noise values travel along the palette (1 = linear).
    pub tone_gamma: f32,
    /// Highlight colour blended into the brightest cells.
    pub tint: String,
    pub tint_amount: f32,
    /// Fraction of each axis over which the edge alpha ramps in.
    pub edge_feather: f32,
    /// Alpha at the very edge of the surface.
    pub edge_min_alpha: f32,
    pub quality: Quality,
    pub paused: bool,
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        Self {
            pixel_size: 6.0,
            noise_scale: 1.6,
            contrast: 1.1,
            speed: 0.25,
            palette: vec![
                "#ffffffff".to_string(),
                "#b48cff".to_string(),
                "#a78bfa".to_string(),
                "#ff9acb".to_string(),
                "#ff6d98".to_string(),
            ],
            palette_mix: 0.35,
            tone_gamma: 1.0,
            tint: "#c7b3ff".to_string(),
            tint_amount: 0.12,
            edge_feather: 0.12,
            edge_min_alpha: 0.20,
            quality: Quality::Auto,
            paused: false,
        }
    }
}

impl RenderConfiguration {
    /// Returns a copy with every field clamped into its valid range.
    ///
    /// Non-finite numbers fall back to the default for that field.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();

        let mut palette = self.palette.clone();
        if palette.is_empty() {
            tracing::debug!("empty palette; using fallback colour");
            palette.push(FALLBACK_PALETTE_COLOR.to_string());
        } else if palette.len() > MAX_PALETTE {
            tracing::warn!(
                supplied = palette.len(),
                max = MAX_PALETTE,
                "palette exceeds the supported colour count; extra entries are ignored"
            );
            palette.truncate(MAX_PALETTE);
        }

        let pixel_size = if !self.pixel_size.is_finite() {
            defaults.pixel_size
        } else if self.pixel_size <= 0.0 {
            1.0
        } else {
            self.pixel_size
        };

        Self {
            pixel_size,
            noise_scale: positive(self.noise_scale, defaults.noise_scale),
            contrast: positive(self.contrast, defaults.contrast),
            speed: if self.speed.is_finite() { self.speed } else { 0.0 },
            palette,
            palette_mix: ranged(self.palette_mix, 0.0, 1.0, defaults.palette_mix),
            tone_gamma: positive(self.tone_gamma, defaults.tone_gamma),
            tint: self.tint.clone(),
            tint_amount: ranged(self.tint_amount, 0.0, 1.0, defaults.tint_amount),
            edge_feather: ranged(self.edge_feather, 0.0, 0.5, defaults.edge_feather),
            edge_min_alpha: ranged(self.edge_min_alpha, 0.0, 1.0, defaults.edge_min_alpha),
            quality: self.quality,
            paused: self.paused,
        }
    }
}

fn positive(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(MIN_POSITIVE)
    } else {
        fallback
    }
}

fn ranged(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// On-disk layout: a `[mosaic]` table plus `[theme]` variables.
///
/// ```toml
/// [mosaic]
/// pixel_size = 8
/// palette = ["var(--accent)", "#ff9acb"]
///
/// [theme]
/// "--accent" = "#b48cff"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicFile {
    pub mosaic: RenderConfiguration,
    pub theme: BTreeMap<String, String>,
}

impl MosaicFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: MosaicFile = toml::from_str(input)?;
        file.validate()?;
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in &self.theme {
            if name.trim_start_matches('-').trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "theme variable name '{name}' is empty"
                )));
            }
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "theme variable '{name}' has no value"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[mosaic]
pixel_size = 8
speed = -0.5
palette = ["#000000", "var(--accent)", "hotpink"]
quality = 1.5
paused = true

[theme]
"--accent" = "#b48cff"
"##;

    #[test]
    fn parses_sample_file() {
        let file = MosaicFile::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(file.mosaic.pixel_size, 8.0);
        assert_eq!(file.mosaic.speed, -0.5);
        assert_eq!(file.mosaic.palette.len(), 3);
        assert_eq!(file.mosaic.quality, Quality::Fixed(1.5));
        assert!(file.mosaic.paused);
        assert_eq!(file.mosaic.noise_scale, 1.6);
        assert_eq!(
            file.theme.get("--accent").map(String::as_str),
            Some("#b48cff")
        );
    }

    #[test]
    fn empty_document_yields_defaults() {
        let file = MosaicFile::from_toml_str("").expect("parse empty");
        assert_eq!(file.mosaic, RenderConfiguration::default());
        assert!(file.theme.is_empty());
    }

    #[test]
    fn quality_accepts_auto_and_fixed_steps() {
        assert_eq!("auto".parse::<Quality>().unwrap(), Quality::Auto);
        assert_eq!("AUTO".parse::<Quality>().unwrap(), Quality::Auto);
        assert_eq!("0.75".parse::<Quality>().unwrap(), Quality::Fixed(0.75));
        assert_eq!("2".parse::<Quality>().unwrap(), Quality::Fixed(2.0));
        assert!("3".parse::<Quality>().is_err());
        assert!("".parse::<Quality>().is_err());

        let file = MosaicFile::from_toml_str("[mosaic]\nquality = 2\n").unwrap();
        assert_eq!(file.mosaic.quality, Quality::Fixed(2.0));
        assert!(MosaicFile::from_toml_str("[mosaic]\nquality = 1.25\n").is_err());
    }

    #[test]
    fn auto_quality_caps_device_pixel_ratio() {
        assert_eq!(Quality::Auto.scale(3.0), 2.0);
        assert_eq!(Quality::Auto.scale(1.25), 1.25);
        assert_eq!(Quality::Auto.scale(0.0), 1.0);
        assert_eq!(Quality::Auto.scale(f64::NAN), 1.0);
        assert_eq!(Quality::Fixed(0.75).scale(3.0), 0.75);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let config = RenderConfiguration {
            pixel_size: -4.0,
            noise_scale: 0.0,
            contrast: f32::NAN,
            speed: f32::INFINITY,
            palette: Vec::new(),
            palette_mix: 1.5,
            tone_gamma: -1.0,
            tint_amount: -0.2,
            edge_feather: 0.9,
            edge_min_alpha: 2.0,
            ..RenderConfiguration::default()
        };
        let clean = config.sanitized();
        assert_eq!(clean.pixel_size, 1.0);
        assert_eq!(clean.noise_scale, MIN_POSITIVE);
        assert_eq!(clean.contrast, 1.1);
        assert_eq!(clean.speed, 0.0);
        assert_eq!(clean.palette, vec![FALLBACK_PALETTE_COLOR.to_string()]);
        assert_eq!(clean.palette_mix, 1.0);
        assert_eq!(clean.tone_gamma, MIN_POSITIVE);
        assert_eq!(clean.tint_amount, 0.0);
        assert_eq!(clean.edge_feather, 0.5);
        assert_eq!(clean.edge_min_alpha, 1.0);
    }

    #[test]
    fn sanitize_truncates_long_palettes_in_order() {
        let palette: Vec<String> = (0..10).map(|i| format!("#0{i}0000")).collect();
        let config = RenderConfiguration {
            palette: palette.clone(),
            ..RenderConfiguration::default()
        };
        let clean = config.sanitized();
        assert_eq!(clean.palette.len(), MAX_PALETTE);
        assert_eq!(clean.palette[..], palette[..MAX_PALETTE]);
    }

    #[test]
    fn rejects_blank_theme_entries() {
        let err = MosaicFile::from_toml_str("[theme]\n\"--\" = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = MosaicFile::from_toml_str("[theme]\n\"--accent\" = \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn round_trips_through_toml() {
        let file = MosaicFile::from_toml_str(SAMPLE).unwrap();
        let rendered = file.to_toml_string().unwrap();
        let reparsed = MosaicFile::from_toml_str(&rendered).unwrap();
        assert_eq!(file, reparsed);
    }
}
