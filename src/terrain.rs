//! Layered mountain silhouettes.
//!
//! A batch of [`Mountain`]s is grown from one base color: every layer sits a
//! fixed step higher than the previous one and is a fixed step more
//! transparent. Each layer owns random offsets into a shared noise field, so
//! the ridges differ from each other but stay stable for the life of the batch.

use rand::Rng;

use crate::color::Rgba;
use crate::noise_field::NoiseField;

pub const LAYER_COUNT: usize = 4;
pub const ALPHA_STEP: u8 = 50;
pub const HEIGHT_STEP: f32 = 35.0;
pub const VERTEX_STEP: f32 = 6.0;
pub const NOISE_STEP: f64 = 0.03;
pub const MAX_NOISE_HEIGHT: f32 = 80.0;
/// Share of the canvas height the layers are stacked in.
pub const HEIGHT_BUDGET_RATIO: f32 = 0.3;
/// Horizontal overshoot of the bottom-right closing vertex.
pub const CLOSING_PAD: f32 = 100.0;

const OFFSET_RANGE: std::ops::Range<f64> = 100.0..200.0;
const PHASE_RANGE: std::ops::Range<f64> = 0.0..100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One terrain layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mountain {
    color: Rgba,
    baseline_y: f32,
    noise_offset_x: f64,
    noise_offset_y: f64,
    time_phase: f64,
}

impl Mountain {
    pub fn new<R: Rng + ?Sized>(color: Rgba, baseline_y: f32, rng: &mut R) -> Self {
        Self {
            color,
            baseline_y,
            noise_offset_x: rng.random_range(OFFSET_RANGE),
            noise_offset_y: rng.random_range(OFFSET_RANGE),
            time_phase: rng.random_range(PHASE_RANGE),
        }
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn baseline_y(&self) -> f32 {
        self.baseline_y
    }

    pub fn noise_offsets(&self) -> (f64, f64) {
        (self.noise_offset_x, self.noise_offset_y)
    }

    pub fn time_phase(&self) -> f64 {
        self.time_phase
    }

    /// Top-edge vertices, left to right.
    ///
    /// There are `ceil(width / VERTEX_STEP) + 1` of them; the last one may sit
    /// past the right edge so the ridge always reaches it.
    pub fn ridge<N: NoiseField + ?Sized>(&self, canvas_width: f32, noise: &N) -> Vec<Point> {
        let count = ridge_vertex_count(canvas_width);
        let mut points = Vec::with_capacity(count + 2);
        let mut x_accum = 0.0_f64;

        for index in 0..count {
            let value = noise.sample(
                x_accum + self.noise_offset_x,
                self.time_phase + self.noise_offset_y,
            ) as f32;
            let displacement = value.clamp(0.0, 1.0) * MAX_NOISE_HEIGHT;
            points.push(Point::new(
                index as f32 * VERTEX_STEP,
                self.baseline_y - displacement,
            ));
            x_accum += NOISE_STEP;
        }

        points
    }

    /// Closed fill polygon: the ridge plus two vertices along the bottom edge.
    pub fn polygon<N: NoiseField + ?Sized>(
        &self,
        canvas_width: f32,
        canvas_height: f32,
        noise: &N,
    ) -> Vec<Point> {
        let mut points = self.ridge(canvas_width, noise);
        points.push(Point::new(canvas_width + CLOSING_PAD, canvas_height));
        points.push(Point::new(0.0, canvas_height));
        points
    }
}

pub fn ridge_vertex_count(canvas_width: f32) -> usize {
    if !canvas_width.is_finite() || canvas_width <= 0.0 {
        return 1;
    }
    (canvas_width / VERTEX_STEP).ceil() as usize + 1
}

/// Alpha of layer `index`; saturates at zero instead of wrapping.
pub fn layer_alpha(index: usize) -> u8 {
    let step = u32::from(ALPHA_STEP).saturating_mul(index as u32);
    255_u32.saturating_sub(step) as u8
}

pub fn layer_baseline(index: usize, canvas_height: f32) -> f32 {
    canvas_height * HEIGHT_BUDGET_RATIO - HEIGHT_STEP * index as f32
}

/// Builds a fresh batch of `layer_count` layers, back to front.
pub fn grow_layers<R: Rng + ?Sized>(
    layer_count: usize,
    base_color: Rgba,
    canvas_height: f32,
    rng: &mut R,
) -> Vec<Mountain> {
    (0..layer_count)
        .map(|index| {
            Mountain::new(
                base_color.with_alpha(layer_alpha(index)),
                layer_baseline(index, canvas_height),
                rng,
            )
        })
        .collect()
}
