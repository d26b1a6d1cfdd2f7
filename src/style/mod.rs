//! # Style
//!
//! Colors and the resolved text style passed to the canvas. Every drawing
//! decision the layout rules make about appearance ends up in one of these.

use serde::{Deserialize, Serialize};

/// An RGBA color with components in `0.0..=1.0`.
///
/// Serialized as a `#rrggbb` hex string so themes read naturally in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Parse `#rgb` or `#rrggbb`. Malformed input yields black.
    pub fn hex(hex: &str) -> Self {
        Self::parse_hex(hex).unwrap_or(Color::BLACK)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let (r, g, b) = match hex.len() {
            3 => (
                u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?,
                u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?,
                u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?,
            ),
            6 => (
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            ),
            _ => return None,
        };
        Some(Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        })
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("transparent") {
            return Ok(Color::TRANSPARENT);
        }
        Color::parse_hex(&value).ok_or_else(|| format!("invalid color '{}'", value))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        if c.is_transparent() {
            "transparent".to_string()
        } else {
            c.to_hex()
        }
    }
}

/// Everything the canvas needs to place one run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub family: String,
    /// 100-900.
    pub weight: u32,
    pub italic: bool,
    pub size: f64,
    pub color: Color,
}

impl TextStyle {
    pub fn new(family: &str, size: f64, color: Color) -> Self {
        Self {
            family: family.to_string(),
            weight: 400,
            italic: false,
            size,
            color,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = 700;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_short_and_long() {
        assert_eq!(Color::hex("#fff"), Color::WHITE);
        let c = Color::hex("#666666");
        assert!((c.r - 0.4).abs() < 1e-9);
        assert_eq!(c.to_hex(), "#666666");
    }

    #[test]
    fn test_malformed_hex_is_black() {
        assert_eq!(Color::hex("#zzzzzz"), Color::BLACK);
        assert_eq!(Color::hex("#12345"), Color::BLACK);
        assert_eq!(Color::hex("#é12"), Color::BLACK);
    }

    #[test]
    fn test_color_serde_as_hex_string() {
        let c: Color = serde_json::from_str("\"#4caf50\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#4caf50\"");
        assert!(serde_json::from_str::<Color>("\"teal\"").is_err());
    }

    #[test]
    fn test_bold_sets_weight() {
        let s = TextStyle::new("Helvetica", 12.0, Color::BLACK).bold();
        assert_eq!(s.weight, 700);
    }
}
