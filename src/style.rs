//! # Visual Style
//!
//! The handful of style values an item carries: colors for frames and font
//! settings for text. Colors persist as `#AARRGGBB` strings.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
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

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn argb8(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        }
    }

    /// Parse `#AARRGGBB` or `#RRGGBB` (opaque). Returns `None` on anything else.
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            8 => Some(Self::argb8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            6 => Some(Self::argb8(255, byte(0)?, byte(2)?, byte(4)?)),
            _ => None,
        }
    }

    /// Format as `#AARRGGBB`.
    pub fn to_hex(&self) -> String {
        let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            to_byte(self.a),
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b)
        )
    }

    pub fn is_visible(&self) -> bool {
        self.a > 0.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
}

/// Text style snapshot handed to the canvas and the text measurer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub align: TextAlign,
    pub justify: bool,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 12.0,
            font_weight: 400,
            align: TextAlign::Left,
            justify: false,
            color: Color::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_keeps_alpha_first() {
        let c = Color::parse_hex("#80ff0000").unwrap();
        assert!((c.a - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.to_hex(), "#80ff0000");
    }

    #[test]
    fn six_digit_hex_is_opaque() {
        let c = Color::parse_hex("#00ff00").unwrap();
        assert_eq!(c.a, 1.0);
        assert_eq!(c.to_hex(), "#ff00ff00");
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(Color::parse_hex("ff0000").is_none());
        assert!(Color::parse_hex("#ff00").is_none());
        assert!(Color::parse_hex("#zz000000").is_none());
    }

    #[test]
    fn color_serializes_as_string() {
        let json = serde_json::to_string(&Color::WHITE).unwrap();
        assert_eq!(json, "\"#ffffffff\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::WHITE);
    }
}
