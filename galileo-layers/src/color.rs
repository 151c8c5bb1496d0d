use serde::{Deserialize, Serialize};

/// RGBA color of a style.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value).ok_or_else(|| format!("invalid color {value}"))
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

impl Color {
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses a color from the hex string. Hex string can be either HEX6 (`#RRGGBB`) or HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        let hex_string = hex_string.trim();
        if hex_string.len() != 7 && hex_string.len() != 9 || !hex_string.starts_with('#') {
            return None;
        }

        let channel = |from: usize| u8::from_str_radix(hex_string.get(from..from + 2)?, 16).ok();
        let a = if hex_string.len() == 9 {
            channel(7)?
        } else {
            255
        };

        Some(Self::rgba(channel(1)?, channel(3)?, channel(5)?, a))
    }

    /// Parses a color given as an array of `[r, g, b, a]` channel values, as used by ArcGIS
    /// services. Missing alpha channel means opaque color.
    pub fn try_from_channels(channels: &[serde_json::Value]) -> Option<Self> {
        let channel = |index: usize| -> Option<u8> {
            channels
                .get(index)?
                .as_f64()
                .map(|value| value.clamp(0.0, 255.0).round() as u8)
        };

        let a = if channels.len() > 3 { channel(3)? } else { 255 };
        Some(Self::rgba(channel(0)?, channel(1)?, channel(2)?, a))
    }

    /// Returns a new color instance, copied from the base one but with the given opacity in range
    /// `[0.0, 1.0]`.
    pub fn with_opacity(&self, opacity: f64) -> Self {
        Self {
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..*self
        }
    }

    /// Opacity component of the color.
    pub fn a(&self) -> u8 {
        self.a
    }
}
