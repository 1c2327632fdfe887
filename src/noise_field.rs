//! Smooth 2-D noise used to shape ridge lines.
//!
//! Octaves are summed with a configurable falloff, then normalized so the
//! field always lands in `[0, 1]`.

use noise::{NoiseFn, Perlin};

/// Continuous, deterministic scalar field over the plane.
pub trait NoiseField {
    /// Returns a value in `[0, 1]`.
    fn sample(&self, x: f64, y: f64) -> f64;
}

/// Octave count and per-octave amplitude multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseDetail {
    pub octaves: u32,
    pub falloff: f64,
}

impl Default for NoiseDetail {
    fn default() -> Self {
        Self {
            octaves: 3,
            falloff: 1.4,
        }
    }
}

#[derive(Clone)]
pub struct PerlinField {
    perlin: Perlin,
    detail: NoiseDetail,
}

impl PerlinField {
    pub fn new(seed: u32) -> Self {
        Self::with_detail(seed, NoiseDetail::default())
    }

    pub fn with_detail(seed: u32, detail: NoiseDetail) -> Self {
        Self {
            perlin: Perlin::new(seed),
            detail: NoiseDetail {
                octaves: detail.octaves.max(1),
                falloff: detail.falloff.max(0.0),
            },
        }
    }

    pub fn detail(&self) -> NoiseDetail {
        self.detail
    }
}

impl NoiseField for PerlinField {
    fn sample(&self, x: f64, y: f64) -> f64 {
        let mut amplitude = 0.5;
        let mut frequency = 1.0;
        let mut total = 0.0;
        let mut weight = 0.0;

        for _ in 0..self.detail.octaves {
            // Perlin output is roughly [-1, 1].
            let value = self.perlin.get([x * frequency, y * frequency]);
            total += (value * 0.5 + 0.5) * amplitude;
            weight += amplitude;
            amplitude *= self.detail.falloff;
            frequency *= 2.0;
        }

        if weight <= f64::EPSILON {
            return 0.5;
        }
        (total / weight).clamp(0.0, 1.0)
    }
}
