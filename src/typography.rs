use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};

use crate::canvas::text_lines;

#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub xmin: i32,
    pub ymin: i32,
    pub width: usize,
    pub height: usize,
    pub advance: f32,
    pub bitmap: Vec<u8>,
}

/// Vertical metrics at one pixel size. `descent` is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

/// A parsed font plus a rasterized glyph cache keyed by character and size.
pub struct Typeface {
    name: String,
    font: Font,
    glyph_cache: Mutex<HashMap<(char, u32), GlyphBitmap>>,
}

impl Typeface {
    pub fn from_path(font_path: &Path) -> Result<Self> {
        let font_bytes = std::fs::read(font_path)
            .with_context(|| format!("failed to read font file {}", font_path.display()))?;
        let name = font_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font".to_owned());
        Self::from_bytes(name, font_bytes)
    }

    pub fn from_bytes(name: impl Into<String>, font_bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|error| anyhow!("failed to parse font {name}: {error}"))?;
        Ok(Self {
            name,
            font,
            glyph_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Characters of `text` the font has no glyph for, line breaks aside.
    pub fn missing_codepoints(&self, text: &str) -> Vec<char> {
        text.chars()
            .filter(|ch| !matches!(ch, '\n' | '\r' | '\t'))
            .filter(|ch| self.font.lookup_glyph_index(*ch) == 0)
            .collect()
    }

    /// Advance width of the widest line.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        text_lines(text)
            .map(|line| self.measure_line(line, size))
            .fold(0.0, f32::max)
    }

    pub fn measure_line(&self, line: &str, size: f32) -> f32 {
        line.chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum()
    }

    pub fn line_metrics(&self, size: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(size) {
            Some(metrics) => LineMetrics {
                ascent: metrics.ascent,
                descent: metrics.descent,
            },
            None => LineMetrics {
                ascent: size * 0.8,
                descent: -size * 0.2,
            },
        }
    }

    pub fn glyph(&self, ch: char, size: f32) -> GlyphBitmap {
        let key = (ch, size.to_bits());
        let mut cache = match self.glyph_cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(key)
            .or_insert_with(|| {
                let (metrics, bitmap) = self.font.rasterize(ch, size);
                GlyphBitmap {
                    xmin: metrics.xmin,
                    ymin: metrics.ymin,
                    width: metrics.width,
                    height: metrics.height,
                    advance: metrics.advance_width,
                    bitmap,
                }
            })
            .clone()
    }
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface").field("name", &self.name).finish()
    }
}
