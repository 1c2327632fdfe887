//! Scene composition: background, vertical color label, poem block and the
//! terrain layers, drawn into one surface.
//!
//! The same draw pass backs the interactive surface and offscreen export.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::canvas::{Canvas, HAlign, RectSpec, Surface, TextStyle, VAlign};
use crate::color::Rgba;
use crate::noise_field::{NoiseField, PerlinField};
use crate::raster::PixmapCanvas;
use crate::schema::{Poem, WaveSceneConfig, DARK_BACKGROUND, LIGHT_BACKGROUND};
use crate::terrain::{grow_layers, Mountain, LAYER_COUNT};
use crate::typography::Typeface;

pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);

pub const LABEL_SIZE: f32 = 150.0;
pub const LABEL_RIGHT_INSET: f32 = 30.0;
pub const LABEL_LINE_SPACING: f32 = 1.2;
pub const LABEL_TOP_ONSCREEN: f32 = 50.0;
pub const LABEL_TOP_OFFSCREEN: f32 = 100.0;
pub const LABEL_ON_DARK: Rgba = Rgba::rgba(255, 255, 255, 51);
pub const LABEL_ON_LIGHT: Rgba = Rgba::rgba(0, 0, 0, 51);

pub const POEM_SIZE: f32 = 28.0;
pub const TITLE_SIZE: f32 = 16.0;
pub const AUTHOR_SIZE: f32 = 12.0;
pub const TITLE_AUTHOR_GAP: f32 = 15.0;
pub const AUTHOR_PADDING: f32 = 4.0;
pub const POEM_Y_RATIO: f32 = 0.25;
pub const AUTHOR_Y_OFFSET: f32 = 30.0;
pub const AUTHOR_TEXT_NUDGE: f32 = 2.0;
pub const AUTHOR_BADGE_RADIUS: f32 = 3.0;
pub const AUTHOR_BADGE_HEIGHT: f32 = 22.0;
pub const AUTHOR_BADGE_COLOR: Rgba = Rgba::rgb(0xc9, 0x33, 0x3e);

/// Terrain is drawn shifted down by this share of the canvas height.
pub const TERRAIN_Y_RATIO: f32 = 0.67;

/// Everything one draw pass reads.
pub struct DrawContext<'a> {
    pub config: &'a WaveSceneConfig,
    pub mountains: &'a [Mountain],
    pub noise: &'a dyn NoiseField,
    pub pixel_density: f32,
    pub label_top: f32,
}

/// Runs the full draw pass: background, label, poem, terrain.
pub fn draw_scene<C: Canvas + ?Sized>(canvas: &mut C, ctx: &DrawContext<'_>) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;

    canvas.fill_background(ctx.config.background_color);

    if let Some(label) = ctx.config.label() {
        draw_label(canvas, label, ctx, width);
    }

    if let Some(poem) = ctx.config.poem() {
        draw_poem(canvas, poem, ctx.config.is_dark_mode, width, height);
    }

    canvas.translate(0.0, height * TERRAIN_Y_RATIO);
    for mountain in ctx.mountains {
        let polygon = mountain.polygon(width, height, ctx.noise);
        canvas.fill_polygon(&polygon, mountain.color());
    }
    canvas.reset_translation();
}

fn draw_label<C: Canvas + ?Sized>(canvas: &mut C, label: &str, ctx: &DrawContext<'_>, width: f32) {
    if !canvas.can_render(label) {
        debug!("label skipped, canvas cannot render it");
        return;
    }
    let size = LABEL_SIZE / ctx.pixel_density.max(f32::EPSILON);
    let style = TextStyle {
        size,
        color: if ctx.config.is_dark_mode {
            LABEL_ON_DARK
        } else {
            LABEL_ON_LIGHT
        },
        align: HAlign::Right,
        baseline: VAlign::Top,
    };

    let mut y = ctx.label_top;
    let mut buffer = [0_u8; 4];
    for ch in label.chars() {
        canvas.draw_text(ch.encode_utf8(&mut buffer), width - LABEL_RIGHT_INSET, y, &style);
        y += size * LABEL_LINE_SPACING;
    }
}

/// Horizontal layout of the title/author line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BylineLayout {
    pub start_x: f32,
    pub start_y: f32,
    pub title_width: f32,
    pub author_width: f32,
    pub badge: RectSpec,
}

pub fn byline_layout<C: Canvas + ?Sized>(
    canvas: &C,
    title_text: &str,
    author: &str,
    width: f32,
    height: f32,
) -> BylineLayout {
    let title_width = canvas.text_width(title_text, TITLE_SIZE);
    let author_width = canvas.text_width(author, AUTHOR_SIZE);
    let start_x = width / 2.0 - (author_width + title_width + TITLE_AUTHOR_GAP) / 2.0;
    let start_y = height * POEM_Y_RATIO + AUTHOR_Y_OFFSET;

    BylineLayout {
        start_x,
        start_y,
        title_width,
        author_width,
        badge: RectSpec {
            x: start_x + title_width + TITLE_AUTHOR_GAP - AUTHOR_PADDING,
            y: start_y - AUTHOR_PADDING,
            width: author_width + AUTHOR_PADDING * 2.0,
            height: AUTHOR_BADGE_HEIGHT,
        },
    }
}

pub fn bracketed_title(title: &str) -> String {
    format!("「{title}」")
}

fn draw_poem<C: Canvas + ?Sized>(
    canvas: &mut C,
    poem: &Poem,
    is_dark_mode: bool,
    width: f32,
    height: f32,
) {
    let title_text = bracketed_title(&poem.title);
    // Content, title and author badge go together or not at all.
    let renderable = [poem.content.as_str(), title_text.as_str(), poem.author.as_str()]
        .into_iter()
        .all(|text| canvas.can_render(text));
    if !renderable {
        debug!("poem skipped, canvas cannot render its text");
        return;
    }

    let text_color = if is_dark_mode {
        LIGHT_BACKGROUND
    } else {
        DARK_BACKGROUND
    };

    canvas.draw_text(
        &poem.content,
        width / 2.0,
        height * POEM_Y_RATIO,
        &TextStyle {
            size: POEM_SIZE,
            color: text_color,
            align: HAlign::Center,
            baseline: VAlign::Middle,
        },
    );

    let layout = byline_layout(canvas, &title_text, &poem.author, width, height);

    canvas.fill_rounded_rect(layout.badge, AUTHOR_BADGE_RADIUS, AUTHOR_BADGE_COLOR);
    canvas.draw_text(
        &title_text,
        layout.start_x,
        layout.start_y,
        &TextStyle {
            size: TITLE_SIZE,
            color: text_color,
            align: HAlign::Left,
            baseline: VAlign::Top,
        },
    );
    canvas.draw_text(
        &poem.author,
        layout.start_x + layout.title_width + TITLE_AUTHOR_GAP,
        layout.start_y + AUTHOR_TEXT_NUDGE,
        &TextStyle {
            size: AUTHOR_SIZE,
            color: LIGHT_BACKGROUND,
            align: HAlign::Left,
            baseline: VAlign::Top,
        },
    );
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f32,
}

/// Interactive scene: owns its config, terrain batch and on-screen surface.
pub struct Scene<S: Surface = PixmapCanvas> {
    config: WaveSceneConfig,
    pixel_density: f32,
    mountains: Vec<Mountain>,
    noise: PerlinField,
    typeface: Option<Arc<Typeface>>,
    surface: S,
    rng: StdRng,
    resize: crate::debounce::Debouncer<ResizeRequest>,
    rebuilds: u64,
    redraws: u64,
}

impl<S: Surface> Scene<S> {
    /// Allocates the surface, grows the first terrain batch and draws once.
    pub fn initialize(
        container_width: u32,
        container_height: u32,
        pixel_density: f32,
        config: WaveSceneConfig,
        typeface: Option<Arc<Typeface>>,
    ) -> Result<Self> {
        let mut rng = StdRng::from_rng(&mut rand::rng());
        let noise = PerlinField::new(rng.random());
        Self::initialize_with(
            container_width,
            container_height,
            pixel_density,
            config,
            typeface,
            noise,
            rng,
        )
    }

    /// Like [`Scene::initialize`] with caller-provided randomness.
    pub fn initialize_with(
        container_width: u32,
        container_height: u32,
        pixel_density: f32,
        config: WaveSceneConfig,
        typeface: Option<Arc<Typeface>>,
        noise: PerlinField,
        rng: StdRng,
    ) -> Result<Self> {
        let pixel_density = sanitize_density(pixel_density)?;
        let surface = S::allocate(container_width, container_height, typeface.clone())
            .context("failed to allocate on-screen surface")?;

        let mut scene = Self {
            config,
            pixel_density,
            mountains: Vec::new(),
            noise,
            typeface,
            surface,
            rng,
            resize: crate::debounce::Debouncer::new(RESIZE_DEBOUNCE),
            rebuilds: 0,
            redraws: 0,
        };
        scene.rebuild_terrain();
        scene.redraw();
        info!(
            width = container_width,
            height = container_height,
            pixel_density,
            "scene initialized"
        );
        Ok(scene)
    }

    pub fn config(&self) -> &WaveSceneConfig {
        &self.config
    }

    pub fn mountains(&self) -> &[Mountain] {
        &self.mountains
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pixel_density(&self) -> f32 {
        self.pixel_density
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Swaps in a new config snapshot, regrows terrain and redraws once.
    pub fn update(&mut self, config: WaveSceneConfig) {
        self.config = config;
        self.rebuild_terrain();
        self.redraw();
        debug!(wave_color = %self.config.wave_color, "scene updated");
    }

    /// Schedules a resize; bursts inside [`RESIZE_DEBOUNCE`] collapse into one.
    pub fn resize(&mut self, width: u32, height: u32, pixel_density: f32, now: Instant) {
        let request = ResizeRequest {
            width,
            height,
            pixel_density,
        };
        if let Some(dropped) = self.resize.schedule(request, now) {
            debug!(?dropped, "coalesced resize");
        }
    }

    /// Applies the pending resize once its window has passed.
    ///
    /// Returns `true` if the surface was rebuilt.
    pub fn poll_resize(&mut self, now: Instant) -> Result<bool> {
        let Some(request) = self.resize.take_due(now) else {
            return Ok(false);
        };
        self.apply_resize(request)?;
        Ok(true)
    }

    fn apply_resize(&mut self, request: ResizeRequest) -> Result<()> {
        let pixel_density = sanitize_density(request.pixel_density)?;
        self.surface = S::allocate(request.width, request.height, self.typeface.clone())
            .context("failed to reallocate surface on resize")?;
        self.pixel_density = pixel_density;
        self.rebuild_terrain();
        self.redraw();
        info!(
            width = request.width,
            height = request.height,
            "scene resized"
        );
        Ok(())
    }

    /// Runs the draw pass into the on-screen surface.
    pub fn redraw(&mut self) {
        let ctx = DrawContext {
            config: &self.config,
            mountains: &self.mountains,
            noise: &self.noise,
            pixel_density: self.pixel_density,
            label_top: LABEL_TOP_ONSCREEN,
        };
        draw_scene(&mut self.surface, &ctx);
        self.redraws += 1;
    }

    fn rebuild_terrain(&mut self) {
        let height = self.surface.height() as f32;
        self.mountains = grow_layers(LAYER_COUNT, self.config.wave_color, height, &mut self.rng);
        self.rebuilds += 1;
    }

    /// Renders the current config into an isolated surface of
    /// `screen_width`×`screen_height` and resolves with PNG bytes.
    ///
    /// The returned future owns a snapshot of everything it reads; the scene
    /// can keep changing while it runs.
    pub fn render_offscreen(
        &self,
        screen_width: u32,
        screen_height: u32,
    ) -> impl Future<Output = Result<Vec<u8>>> + 'static {
        let job = OffscreenJob {
            config: self.config.clone(),
            noise: self.noise.clone(),
            typeface: self.typeface.clone(),
            pixel_density: self.pixel_density,
            width: screen_width,
            height: screen_height,
        };
        async move { job.run().await }
    }
}

/// Renders `config` straight to PNG bytes without an on-screen scene.
pub async fn render_wallpaper(
    config: WaveSceneConfig,
    typeface: Option<Arc<Typeface>>,
    pixel_density: f32,
    screen_width: u32,
    screen_height: u32,
) -> Result<Vec<u8>> {
    let job = OffscreenJob {
        config,
        noise: PerlinField::new(rand::rng().random()),
        typeface,
        pixel_density: sanitize_density(pixel_density)?,
        width: screen_width,
        height: screen_height,
    };
    job.run().await
}

fn sanitize_density(pixel_density: f32) -> Result<f32> {
    if !pixel_density.is_finite() || pixel_density <= 0.0 {
        bail!("pixel density must be a positive number, got {pixel_density}");
    }
    Ok(pixel_density)
}

struct OffscreenJob {
    config: WaveSceneConfig,
    noise: PerlinField,
    typeface: Option<Arc<Typeface>>,
    pixel_density: f32,
    width: u32,
    height: u32,
}

impl OffscreenJob {
    async fn run(self) -> Result<Vec<u8>> {
        let mut surface = OffscreenSurface::acquire(self.width, self.height, self.typeface.clone())
            .await
            .context("failed to acquire offscreen surface")?;

        let mut rng = StdRng::from_rng(&mut rand::rng());
        let mountains = grow_layers(
            LAYER_COUNT,
            self.config.wave_color,
            self.height as f32,
            &mut rng,
        );
        let ctx = DrawContext {
            config: &self.config,
            mountains: &mountains,
            noise: &self.noise,
            pixel_density: self.pixel_density,
            label_top: LABEL_TOP_OFFSCREEN,
        };
        draw_scene(surface.canvas_mut(), &ctx);

        let bytes = surface.canvas().encode_png()?;
        info!(
            width = self.width,
            height = self.height,
            bytes = bytes.len(),
            "offscreen render complete"
        );
        Ok(bytes)
    }
}

/// Offscreen surface scoped to one export; released on drop, success or not.
pub struct OffscreenSurface {
    canvas: PixmapCanvas,
}

impl OffscreenSurface {
    pub async fn acquire(
        width: u32,
        height: u32,
        typeface: Option<Arc<Typeface>>,
    ) -> Result<Self> {
        let canvas = PixmapCanvas::new(width, height, typeface)?;
        debug!(width, height, "offscreen surface acquired");
        Ok(Self { canvas })
    }

    pub fn canvas(&self) -> &PixmapCanvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut PixmapCanvas {
        &mut self.canvas
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        debug!(
            width = self.canvas.width(),
            height = self.canvas.height(),
            "offscreen surface released"
        );
    }
}
