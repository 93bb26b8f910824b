use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An sRGB color as edited in the settings panel.
///
/// Channels are stored gamma-encoded in `0.0..=1.0`, exactly as written in a
/// `#rrggbb` string. Use [`Color::to_linear`] before handing a color to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Errors from parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
    #[error("unknown color name: {0}")]
    UnknownName(String),
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parse `#rrggbb`, `#rgb`, or one of the CSS color names used by the viewer.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ColorParseError::Empty);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| ColorParseError::InvalidHex(s.to_string()));
        }
        Self::named(s).ok_or_else(|| ColorParseError::UnknownName(s.to_string()))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                Some(Self::from_rgb8((v >> 16) as u8, (v >> 8) as u8, v as u8))
            }
            3 => {
                let v = u16::from_str_radix(hex, 16).ok()?;
                let expand = |n: u16| ((n & 0xf) as u8) * 17;
                Some(Self::from_rgb8(expand(v >> 8), expand(v >> 4), expand(v)))
            }
            _ => None,
        }
    }

    fn named(name: &str) -> Option<Self> {
        let c = match name.to_ascii_lowercase().as_str() {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::from_rgb8(255, 0, 0),
            "green" => Self::from_rgb8(0, 128, 0),
            "blue" => Self::from_rgb8(0, 0, 255),
            "orange" => Self::from_rgb8(255, 165, 0),
            "hotpink" => Self::from_rgb8(255, 105, 180),
            "lightblue" => Self::from_rgb8(173, 216, 230),
            "gray" | "grey" => Self::from_rgb8(128, 128, 128),
            _ => return None,
        };
        Some(c)
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Convert the gamma-encoded channels to linear light.
    pub fn to_linear(&self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Standard sRGB transfer function, gamma-encoded to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_hex() {
        let c = Color::parse("#081c76").unwrap();
        assert_eq!(c.to_rgb8(), [0x08, 0x1c, 0x76]);
        assert_eq!(c.to_hex(), "#081c76");
    }

    #[test]
    fn parse_short_hex_and_names() {
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("red").unwrap().to_hex(), "#ff0000");
        assert_eq!(Color::parse("White").unwrap(), Color::WHITE);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Color::parse(""), Err(ColorParseError::Empty)));
        assert!(matches!(
            Color::parse("#12345"),
            Err(ColorParseError::InvalidHex(_))
        ));
        assert!(matches!(
            Color::parse("#gg0000"),
            Err(ColorParseError::InvalidHex(_))
        ));
        assert!(matches!(
            Color::parse("mauve-ish"),
            Err(ColorParseError::UnknownName(_))
        ));
    }

    #[test]
    fn linear_conversion_endpoints() {
        let [r, g, b] = Color::WHITE.to_linear();
        assert!((r - 1.0).abs() < 1e-6 && (g - 1.0).abs() < 1e-6 && (b - 1.0).abs() < 1e-6);
        assert_eq!(Color::BLACK.to_linear(), [0.0, 0.0, 0.0]);
        // mid-gray is darker in linear light
        assert!(srgb_to_linear(0.5) < 0.25);
    }
}
