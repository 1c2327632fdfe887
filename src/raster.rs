use std::io::Cursor;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbaImage};
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Transform,
};
use tracing::warn;

use crate::canvas::{text_lines, Canvas, HAlign, RectSpec, Surface, TextStyle, VAlign, TEXT_LEADING};
use crate::color::Rgba;
use crate::error_codes::{CodedError, IMAGE_ENCODE_FAILED, SURFACE_ALLOCATION_FAILED};
use crate::terrain::Point;
use crate::typography::{GlyphBitmap, Typeface};

/// Software canvas backed by a tiny-skia pixmap. Text goes through fontdue.
pub struct PixmapCanvas {
    pixmap: Pixmap,
    typeface: Option<Arc<Typeface>>,
    translation: (f32, f32),
}

impl PixmapCanvas {
    pub fn new(width: u32, height: u32, typeface: Option<Arc<Typeface>>) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            anyhow!(CodedError::resource(
                SURFACE_ALLOCATION_FAILED,
                format!("failed to allocate {width}x{height} drawing surface"),
            ))
        })?;
        Ok(Self {
            pixmap,
            typeface,
            translation: (0.0, 0.0),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA bytes, row major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            out.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        out
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let image = RgbaImage::from_raw(width, height, self.to_rgba())
            .ok_or_else(|| anyhow!("pixel buffer does not match {width}x{height}"))?;

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|error| {
                anyhow!(CodedError::resource(
                    IMAGE_ENCODE_FAILED,
                    format!("failed to encode {width}x{height} PNG: {error}"),
                ))
            })
            .context("PNG encoding failed")?;
        Ok(bytes)
    }

    fn transform(&self) -> Transform {
        Transform::from_translate(self.translation.0, self.translation.1)
    }

    fn fill_path(&mut self, builder: PathBuilder, color: Rgba) {
        let Some(path) = builder.finish() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        let transform = self.transform();
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
    }

    fn draw_line(
        &mut self,
        typeface: &Typeface,
        line: &str,
        x: f32,
        baseline: f32,
        style: &TextStyle,
    ) {
        let mut pen_x = x;
        for ch in line.chars() {
            let glyph = typeface.glyph(ch, style.size);
            if glyph.width > 0 && glyph.height > 0 {
                let gx = (pen_x + glyph.xmin as f32).round() as i32;
                let gy = (baseline - glyph.height as f32 - glyph.ymin as f32).round() as i32;
                self.blend_glyph(gx, gy, &glyph, style.color);
            }
            pen_x += glyph.advance;
        }
    }

    fn blend_glyph(&mut self, x: i32, y: i32, glyph: &GlyphBitmap, color: Rgba) {
        let width = self.pixmap.width() as i32;
        let height = self.pixmap.height() as i32;
        let pixels = self.pixmap.pixels_mut();

        for row in 0..glyph.height {
            let py = y + row as i32;
            if py < 0 || py >= height {
                continue;
            }

            for col in 0..glyph.width {
                let px = x + col as i32;
                if px < 0 || px >= width {
                    continue;
                }

                let mask = glyph.bitmap[row * glyph.width + col];
                if mask == 0 {
                    continue;
                }

                let alpha = ((u16::from(mask) * u16::from(color.a)) / 255) as u8;
                let index = (py * width + px) as usize;
                pixels[index] = blend_pixel(pixels[index], color, alpha);
            }
        }
    }
}

/// Source-over of a straight color with coverage `alpha` onto a premultiplied pixel.
fn blend_pixel(dst: PremultipliedColorU8, color: Rgba, alpha: u8) -> PremultipliedColorU8 {
    if alpha == 0 {
        return dst;
    }
    let a = u16::from(alpha);
    let inv = 255 - a;
    let over = |src: u8, dst: u8| -> u8 {
        let premul = u16::from(src) * a / 255;
        (premul + (u16::from(dst) * inv + 127) / 255).min(255) as u8
    };
    let out_a = (a + (u16::from(dst.alpha()) * inv + 127) / 255).min(255) as u8;
    let r = over(color.r, dst.red()).min(out_a);
    let g = over(color.g, dst.green()).min(out_a);
    let b = over(color.b, dst.blue()).min(out_a);
    PremultipliedColorU8::from_rgba(r, g, b, out_a).unwrap_or(dst)
}

impl Canvas for PixmapCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn fill_background(&mut self, color: Rgba) {
        self.translation = (0.0, 0.0);
        self.pixmap
            .fill(Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for point in rest {
            builder.line_to(point.x, point.y);
        }
        builder.close();
        self.fill_path(builder, color);
    }

    fn fill_rounded_rect(&mut self, rect: RectSpec, radius: f32, color: Rgba) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let r = radius.max(0.0).min(rect.width / 2.0).min(rect.height / 2.0);
        let (left, top) = (rect.x, rect.y);
        let (right, bottom) = (rect.x + rect.width, rect.y + rect.height);

        let mut builder = PathBuilder::new();
        builder.move_to(left + r, top);
        builder.line_to(right - r, top);
        builder.quad_to(right, top, right, top + r);
        builder.line_to(right, bottom - r);
        builder.quad_to(right, bottom, right - r, bottom);
        builder.line_to(left + r, bottom);
        builder.quad_to(left, bottom, left, bottom - r);
        builder.line_to(left, top + r);
        builder.quad_to(left, top, left + r, top);
        builder.close();
        self.fill_path(builder, color);
    }

    fn can_render(&self, text: &str) -> bool {
        self.typeface
            .as_ref()
            .is_some_and(|typeface| typeface.missing_codepoints(text).is_empty())
    }

    fn text_width(&self, text: &str, size: f32) -> f32 {
        self.typeface
            .as_ref()
            .map_or(0.0, |typeface| typeface.measure(text, size))
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        let Some(typeface) = self.typeface.clone() else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let missing = typeface.missing_codepoints(text);
        if !missing.is_empty() {
            warn!(font = typeface.name(), ?missing, "skipping text the font cannot render");
            return;
        }

        let metrics = typeface.line_metrics(style.size);
        let leading = style.size * TEXT_LEADING;
        let lines = text_lines(text).collect::<Vec<_>>();
        // Offset from `y` to the first baseline; a middle-aligned block is
        // centered as a whole.
        let first_baseline = match style.baseline {
            VAlign::Top => metrics.ascent,
            VAlign::Middle => {
                (metrics.ascent + metrics.descent) / 2.0
                    - (lines.len() - 1) as f32 * leading / 2.0
            }
        };

        for (index, line) in lines.iter().enumerate() {
            let width = typeface.measure_line(line, style.size);
            let origin_x = match style.align {
                HAlign::Left => x,
                HAlign::Center => x - width / 2.0,
                HAlign::Right => x - width,
            } + self.translation.0;
            let baseline = y + first_baseline + index as f32 * leading + self.translation.1;
            self.draw_line(&typeface, line, origin_x, baseline, style);
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.translation.0 += dx;
        self.translation.1 += dy;
    }

    fn reset_translation(&mut self) {
        self.translation = (0.0, 0.0);
    }
}

impl Surface for PixmapCanvas {
    fn allocate(width: u32, height: u32, typeface: Option<Arc<Typeface>>) -> Result<Self> {
        Self::new(width, height, typeface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typography::tests::fixture_typeface;

    const INK_BACKGROUND: Rgba = Rgba::rgb(0, 0, 0);

    fn white(size: f32, align: HAlign, baseline: VAlign) -> TextStyle {
        TextStyle {
            size,
            color: Rgba::rgb(255, 255, 255),
            align,
            baseline,
        }
    }

    /// `(min_x, min_y, max_x, max_y)` of every pixel that is not background.
    fn ink_bounds(canvas: &PixmapCanvas) -> Option<(u32, u32, u32, u32)> {
        let rgba = canvas.to_rgba();
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (index, px) in rgba.chunks_exact(4).enumerate() {
            if px[..3] == [INK_BACKGROUND.r, INK_BACKGROUND.g, INK_BACKGROUND.b] {
                continue;
            }
            let x = index as u32 % canvas.width();
            let y = index as u32 / canvas.width();
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    fn inked_canvas(width: u32, height: u32) -> PixmapCanvas {
        let mut canvas = PixmapCanvas::new(width, height, Some(fixture_typeface())).unwrap();
        canvas.fill_background(INK_BACKGROUND);
        canvas
    }

    fn pixel(canvas: &PixmapCanvas, x: u32, y: u32) -> [u8; 4] {
        let rgba = canvas.to_rgba();
        let index = ((y * canvas.width() + x) * 4) as usize;
        [rgba[index], rgba[index + 1], rgba[index + 2], rgba[index + 3]]
    }

    #[test]
    fn zero_sized_surface_is_a_resource_error() {
        let error = PixmapCanvas::new(0, 10, None).err().expect("allocation should fail");
        let coded = crate::error_codes::find_coded_error(&error).unwrap();
        assert_eq!(coded.code, SURFACE_ALLOCATION_FAILED);
    }

    #[test]
    fn polygon_fill_respects_translation() {
        let mut canvas = PixmapCanvas::new(20, 20, None).unwrap();
        canvas.fill_background(Rgba::rgb(0, 0, 0));
        canvas.translate(0.0, 10.0);
        canvas.fill_polygon(
            &[
                Point::new(0.0, 0.0),
                Point::new(20.0, 0.0),
                Point::new(20.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            Rgba::rgb(255, 0, 0),
        );
        canvas.reset_translation();

        assert_eq!(pixel(&canvas, 5, 5), [0, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 5, 15), [255, 0, 0, 255]);
    }

    #[test]
    fn translucent_fill_blends_over_background() {
        let mut canvas = PixmapCanvas::new(4, 4, None).unwrap();
        canvas.fill_background(Rgba::rgb(0, 0, 0));
        canvas.fill_rounded_rect(
            RectSpec {
                x: 0.0,
                y: 0.0,
                width: 4.0,
                height: 4.0,
            },
            0.0,
            Rgba::rgba(255, 255, 255, 128),
        );
        let [r, g, b, a] = pixel(&canvas, 2, 2);
        assert_eq!(a, 255);
        assert!((120..=136).contains(&r) && r == g && g == b, "got {r},{g},{b}");
    }

    #[test]
    fn text_without_typeface_is_skipped() {
        let mut canvas = PixmapCanvas::new(8, 8, None).unwrap();
        canvas.fill_background(Rgba::rgb(10, 10, 10));
        let before = canvas.to_rgba();
        let style = TextStyle {
            size: 12.0,
            color: Rgba::rgb(255, 255, 255),
            align: HAlign::Left,
            baseline: VAlign::Top,
        };
        canvas.draw_text("乳白", 0.0, 0.0, &style);
        assert_eq!(canvas.text_width("乳白", 12.0), 0.0);
        assert_eq!(canvas.to_rgba(), before);
    }

    #[test]
    fn glyph_blend_keeps_pixels_premultiplied() {
        let dst = PremultipliedColorU8::from_rgba(20, 20, 20, 255).unwrap();
        let out = blend_pixel(dst, Rgba::rgba(255, 255, 255, 51), 51);
        assert_eq!(out.alpha(), 255);
        assert!(out.red() > 20 && out.red() < 80);
    }

    #[test]
    fn png_encoding_produces_png_signature() {
        let mut canvas = PixmapCanvas::new(3, 2, None).unwrap();
        canvas.fill_background(Rgba::rgb(50, 50, 50));
        let bytes = canvas.encode_png().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn top_aligned_text_hangs_below_its_y() {
        let mut canvas = inked_canvas(120, 80);
        canvas.draw_text("AB", 10.0, 20.0, &white(28.0, HAlign::Left, VAlign::Top));

        let (x0, y0, _, y1) = ink_bounds(&canvas).expect("text should leave ink");
        assert!(x0 >= 9, "ink starts at x={x0}");
        assert!(y0 >= 20 && y0 < 20 + 14, "ink starts at y={y0}");
        assert!(y1 < 20 + 28, "ink ends at y={y1}");
    }

    #[test]
    fn right_aligned_text_ends_at_its_x() {
        let mut canvas = inked_canvas(120, 60);
        canvas.draw_text("W", 100.0, 10.0, &white(28.0, HAlign::Right, VAlign::Top));

        let (x0, _, x1, _) = ink_bounds(&canvas).expect("text should leave ink");
        assert!(x1 <= 101, "ink runs past the anchor to x={x1}");
        assert!(x1 >= 95, "ink stops short at x={x1}");
        assert!(x0 >= 100 - 30, "ink starts at x={x0}");
    }

    #[test]
    fn newlines_stack_centered_lines() {
        let style = white(28.0, HAlign::Center, VAlign::Middle);

        let mut single = inked_canvas(200, 200);
        single.draw_text("AAAA", 100.0, 100.0, &style);
        let (_, sy0, _, sy1) = ink_bounds(&single).unwrap();

        let mut double = inked_canvas(200, 200);
        double.draw_text("AAAA\nBB", 100.0, 100.0, &style);
        let (x0, y0, x1, y1) = ink_bounds(&double).unwrap();

        let leading = 28.0 * TEXT_LEADING;
        assert!(
            (y1 - y0) as f32 >= (sy1 - sy0) as f32 + leading - 2.0,
            "two lines span {y0}..{y1}, one line spans {sy0}..{sy1}"
        );
        // The block is centered on y as a whole, each line on x.
        let block_mid = (y0 + y1) as f32 / 2.0;
        assert!((block_mid - 100.0).abs() <= 4.0, "block centered at {block_mid}");
        let mid_x = (x0 + x1) as f32 / 2.0;
        assert!((mid_x - 100.0).abs() <= 3.0, "lines centered at {mid_x}");
        assert_eq!(double.text_width("AAAA\nBB", 28.0), single.text_width("AAAA", 28.0));
    }

    #[test]
    fn text_with_a_missing_glyph_leaves_pixels_untouched() {
        let mut canvas = inked_canvas(120, 60);
        let before = canvas.to_rgba();

        assert!(canvas.can_render("AB"));
        assert!(!canvas.can_render("A乳"));
        canvas.draw_text("A乳", 10.0, 10.0, &white(28.0, HAlign::Left, VAlign::Top));
        assert_eq!(canvas.to_rgba(), before);
    }

    #[test]
    fn canvas_without_typeface_renders_nothing() {
        let canvas = PixmapCanvas::new(8, 8, None).unwrap();
        assert!(!canvas.can_render("A"));
        assert!(!canvas.can_render(""));
    }
}
