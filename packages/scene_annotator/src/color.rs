//! Hex color parsing.
//!
//! Desired colors arrive as `#RRGGBB` strings. The scene takes normalized
//! RGB triples, so each byte is divided by 255.

use serde::Serialize;

/// Normalized RGB color, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` form. Channels are clamped and rounded.
    pub fn to_hex(self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

/// A color string that is not of the form `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError {
    pub input: String,
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed color '{}', expected #RRGGBB", self.input)
    }
}

impl std::error::Error for ColorParseError {}

/// Parse a `#RRGGBB` hex string into normalized RGB.
pub fn parse_hex_color(input: &str) -> Result<Rgb, ColorParseError> {
    let err = || ColorParseError {
        input: input.to_string(),
    };

    let hex = input.trim().strip_prefix('#').ok_or_else(err)?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(err());
    }

    let channel = |range: std::ops::Range<usize>| -> Result<f32, ColorParseError> {
        u8::from_str_radix(&hex[range], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| err())
    };

    Ok(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}
