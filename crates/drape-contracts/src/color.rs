use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_BASE_COLOR: HexColor = HexColor([0xEF, 0xBD, 0x48]);

/// A well-formed `#RRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor([u8; 3]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color '{0}' (expected #RRGGBB)")]
pub struct InvalidColor(pub String);

impl HexColor {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidColor> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(InvalidColor(raw.to_string()));
        }
        let channel = |idx: usize| {
            u8::from_str_radix(&digits[idx..idx + 2], 16).map_err(|_| InvalidColor(raw.to_string()))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        (self.0[0], self.0[1], self.0[2])
    }

    /// Text color that stays readable on top of this color.
    pub fn contrasting(self) -> &'static str {
        let (r, g, b) = self.rgb();
        let brightness = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
        if brightness > 128 {
            "black"
        } else {
            "white"
        }
    }
}

impl Default for HexColor {
    fn default() -> Self {
        DEFAULT_BASE_COLOR
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for HexColor {
    type Err = InvalidColor;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
