//! Immediate-mode drawing surface used by the scene composer.

use std::sync::Arc;

use anyhow::Result;

use crate::color::Rgba;
use crate::terrain::Point;
use crate::typography::Typeface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Rgba,
    pub align: HAlign,
    pub baseline: VAlign,
}

/// Distance between consecutive lines of one text call, as a multiple of size.
pub const TEXT_LEADING: f32 = 1.25;

/// Lines of a text call; `\n` breaks, a trailing `\r` is dropped.
pub fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Replaces every pixel with `color` and resets the translation.
    fn fill_background(&mut self, color: Rgba);
    fn fill_polygon(&mut self, points: &[Point], color: Rgba);
    fn fill_rounded_rect(&mut self, rect: RectSpec, radius: f32, color: Rgba);
    /// Whether every character of `text` would reach the surface.
    fn can_render(&self, text: &str) -> bool;
    /// Advance width of the widest line of `text` at `size` pixels.
    fn text_width(&self, text: &str, size: f32) -> f32;
    /// Draws `text`, one line per `\n`, each line aligned on its own.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);
    /// Offsets every following draw call until [`Canvas::reset_translation`].
    fn translate(&mut self, dx: f32, dy: f32);
    fn reset_translation(&mut self);
}

/// A canvas that can be allocated at a given pixel size.
pub trait Surface: Canvas + Sized {
    fn allocate(width: u32, height: u32, typeface: Option<Arc<Typeface>>) -> Result<Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Background(Rgba),
    Polygon {
        vertices: usize,
        color: Rgba,
        translation: (f32, f32),
    },
    RoundedRect {
        rect: RectSpec,
        radius: f32,
        color: Rgba,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        style: TextStyle,
    },
}

/// Records draw calls instead of rasterizing. Text is measured as
/// `advance * size` per character.
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    advance: f32,
    translation: (f32, f32),
    passes: usize,
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            advance: 0.5,
            translation: (0.0, 0.0),
            passes: 0,
            calls: Vec::new(),
        }
    }

    /// Calls since the most recent background fill.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Number of background fills seen, i.e. draw passes started.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn texts(&self) -> impl Iterator<Item = (&str, &TextStyle)> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::Text { text, style, .. } => Some((text.as_str(), style)),
            _ => None,
        })
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_background(&mut self, color: Rgba) {
        self.calls.clear();
        self.translation = (0.0, 0.0);
        self.passes += 1;
        self.calls.push(DrawCall::Background(color));
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba) {
        self.calls.push(DrawCall::Polygon {
            vertices: points.len(),
            color,
            translation: self.translation,
        });
    }

    fn fill_rounded_rect(&mut self, rect: RectSpec, radius: f32, color: Rgba) {
        self.calls.push(DrawCall::RoundedRect {
            rect,
            radius,
            color,
        });
    }

    fn can_render(&self, _text: &str) -> bool {
        true
    }

    fn text_width(&self, text: &str, size: f32) -> f32 {
        let widest = text_lines(text)
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        widest as f32 * size * self.advance
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        self.calls.push(DrawCall::Text {
            text: text.to_owned(),
            x,
            y,
            style: *style,
        });
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.translation.0 += dx;
        self.translation.1 += dy;
    }

    fn reset_translation(&mut self) {
        self.translation = (0.0, 0.0);
    }
}

impl Surface for RecordingCanvas {
    fn allocate(width: u32, height: u32, _typeface: Option<Arc<Typeface>>) -> Result<Self> {
        Ok(Self::new(width, height))
    }
}
