use std::fmt;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use regex::Regex;

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn parse_hex(raw: &str) -> Result<Self> {
        static HEX_RE: OnceLock<Regex> = OnceLock::new();
        let re = HEX_RE.get_or_init(|| {
            Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
                .expect("hex color regex should compile")
        });

        let trimmed = raw.trim();
        let digits = re
            .captures(trimmed)
            .and_then(|capture| capture.get(1))
            .ok_or_else(|| anyhow!("'{trimmed}' is not a hex color (#rgb, #rrggbb or #rrggbbaa)"))?
            .as_str();

        let channel = |index: usize, width: usize| -> Result<u8> {
            let slice = &digits[index * width..index * width + width];
            let value = u8::from_str_radix(slice, 16)
                .map_err(|error| anyhow!("bad hex channel '{slice}' in '{trimmed}': {error}"))?;
            Ok(if width == 1 { value * 17 } else { value })
        };

        match digits.len() {
            3 => Ok(Self::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            6 => Ok(Self::rgb(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            _ => Ok(Self::rgba(
                channel(0, 2)?,
                channel(1, 2)?,
                channel(2, 2)?,
                channel(3, 2)?,
            )),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}
