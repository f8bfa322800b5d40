//! Colour resolution for palette, tint and theme references.
//!
//! Hosts describe colours the way a stylesheet would. [`CssColorResolver`]
//! understands hex notation, `rgb()`/`rgba()`, the CSS named colours and
//! `var(--name, fallback)` lookups into a shared [`ThemeVariables`] table.
//! Theme lookups happen on every resolve call, so edits to the table show up
//! on the next uniform sync.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

const MAX_VARIABLE_DEPTH: usize = 8;

/// Normalised RGB triple, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        )
    }

    fn from_hex_value(value: u32) -> Self {
        Self::from_bytes((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Padded to a vec4 slot for std140 uniform arrays.
    pub fn to_vec4(self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("colour value is empty")]
    Empty,
    #[error("invalid hex colour '{0}'")]
    InvalidHex(String),
    #[error("invalid colour function '{0}'")]
    InvalidFunction(String),
    #[error("unknown colour name '{0}'")]
    UnknownName(String),
    #[error("theme variable '{0}' is not defined")]
    UndefinedVariable(String),
    #[error("theme variable '{0}' nests too deeply")]
    RecursiveVariable(String),
}

/// Translates a host colour description into normalised RGB.
pub trait ColorResolver {
    fn resolve(&self, input: &str) -> Result<Rgb, ColorError>;
}

impl<R: ColorResolver + ?Sized> ColorResolver for &R {
    fn resolve(&self, input: &str) -> Result<Rgb, ColorError> {
        (**self).resolve(input)
    }
}

/// Shared, mutable table of theme variables (`--accent = "#b48cff"`).
///
/// Cloning shares the underlying table; names are stored lowercase without the
/// leading dashes so `accent` and `--Accent` address the same entry.
#[derive(Debug, Clone, Default)]
pub struct ThemeVariables {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl ThemeVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: &BTreeMap<String, String>) -> Self {
        let theme = Self::new();
        theme.replace_all(entries);
        theme
    }

    pub fn set(&self, name: &str, value: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|err| err.into_inner());
        guard.insert(normalize_name(name), value.into());
    }

    pub fn replace_all(&self, entries: &BTreeMap<String, String>) {
        let mut guard = self.inner.write().unwrap_or_else(|err| err.into_inner());
        guard.clear();
        for (name, value) in entries {
            guard.insert(normalize_name(name), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(|err| err.into_inner());
        guard.get(&normalize_name(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|err| err.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches("--").to_ascii_lowercase()
}

/// Resolver covering the colour syntax a stylesheet would accept.
#[derive(Debug, Clone, Default)]
pub struct CssColorResolver {
    theme: ThemeVariables,
}

impl CssColorResolver {
    pub fn new(theme: ThemeVariables) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &ThemeVariables {
        &self.theme
    }

    fn resolve_depth(&self, input: &str, depth: usize) -> Result<Rgb, ColorError> {
        let value = input.trim();
        if value.is_empty() {
            return Err(ColorError::Empty);
        }
        let lower = value.to_ascii_lowercase();

        if let Some(body) = function_body(&lower, "var") {
            return self.resolve_variable(value, body, depth);
        }
        if let Some(hex) = lower.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorError::InvalidHex(value.to_string()));
        }
        if let Some(body) = function_body(&lower, "rgba").or_else(|| function_body(&lower, "rgb"))
        {
            return parse_rgb_function(body)
                .ok_or_else(|| ColorError::InvalidFunction(value.to_string()));
        }
        if lower == "transparent" {
            return Ok(Rgb::BLACK);
        }
        named_color(&lower)
            .map(Rgb::from_hex_value)
            .ok_or_else(|| ColorError::UnknownName(value.to_string()))
    }

    fn resolve_variable(&self, original: &str, body: &str, depth: usize) -> Result<Rgb, ColorError> {
        let (name, fallback) = match body.split_once(',') {
            Some((name, fallback)) => (name.trim(), Some(fallback.trim())),
            None => (body.trim(), None),
        };
        if !name.starts_with("--") || name.len() <= 2 {
            return Err(ColorError::InvalidFunction(original.to_string()));
        }
        if depth >= MAX_VARIABLE_DEPTH {
            return Err(ColorError::RecursiveVariable(name.to_string()));
        }
        match self.theme.get(name) {
            Some(value) => self.resolve_depth(&value, depth + 1),
            None => match fallback {
                Some(fallback) if !fallback.is_empty() => self.resolve_depth(fallback, depth + 1),
                _ => Err(ColorError::UndefinedVariable(name.to_string())),
            },
        }
    }
}

impl ColorResolver for CssColorResolver {
    fn resolve(&self, input: &str) -> Result<Rgb, ColorError> {
        self.resolve_depth(input, 0)
    }
}

fn function_body<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_hex(digits: &str) -> Option<Rgb> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |index: usize| u8::from_str_radix(&digits[index..index + 1], 16).ok();
    let byte = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).ok();
    // Alpha digits are accepted and ignored; only RGB reaches the shader.
    match digits.len() {
        3 | 4 => Some(Rgb::from_bytes(
            nibble(0)? * 17,
            nibble(1)? * 17,
            nibble(2)? * 17,
        )),
        6 | 8 => Some(Rgb::from_bytes(byte(0)?, byte(2)?, byte(4)?)),
        _ => None,
    }
}

fn parse_rgb_function(body: &str) -> Option<Rgb> {
    let channels_part = body.split('/').next()?;
    let parts: Vec<&str> = channels_part
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }
    let channel = |part: &str| -> Option<f32> {
        let value = if let Some(percent) = part.strip_suffix('%') {
            percent.parse::<f32>().ok()? / 100.0
        } else {
            part.parse::<f32>().ok()? / 255.0
        };
        value.is_finite().then(|| value.clamp(0.0, 1.0))
    };
    Some(Rgb::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
    ))
}

fn named_color(name: &str) -> Option<u32> {
    NAMED_COLORS
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .map(|index| NAMED_COLORS[index].1)
}

/// CSS Color Module Level 4 named colours, sorted for binary search.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];
