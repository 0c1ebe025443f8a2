//! Ambient dust
//!
//! A fixed population of faint specks drifting across the background. The
//! space is toroidal: anything leaving one edge comes back on the other.
//! Particles are never added or removed after `initialize`.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Speck radius range (px)
const RADIUS_MIN: f32 = 0.3;
const RADIUS_SPAN: f32 = 1.6;
/// Opacity range
const ALPHA_MIN: f32 = 0.15;
const ALPHA_SPAN: f32 = 0.35;
/// Max drift per frame (px), each axis, either direction
const DRIFT_X: f32 = 0.075;
const DRIFT_Y: f32 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub radius: f32,
    pub alpha: f32,
    pub vel: Vec2,
}

/// 2D surface the dust is painted on
pub trait DustPainter {
    fn clear(&mut self, width: f32, height: f32);
    /// White dot at `pos`
    fn dot(&mut self, pos: Vec2, radius: f32, alpha: f32);
}

pub struct ParticleField {
    particles: Vec<Particle>,
    bounds: Vec2,
    rng: Pcg32,
}

impl ParticleField {
    pub fn new(width: f32, height: f32, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            bounds: Vec2::new(width.max(0.0), height.max(0.0)),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Replace the population with `count` fresh particles
    pub fn initialize(&mut self, count: usize) {
        let bounds = self.bounds;
        let rng = &mut self.rng;
        self.particles = (0..count)
            .map(|_| Particle {
                pos: Vec2::new(rng.random::<f32>() * bounds.x, rng.random::<f32>() * bounds.y),
                radius: rng.random::<f32>() * RADIUS_SPAN + RADIUS_MIN,
                alpha: rng.random::<f32>() * ALPHA_SPAN + ALPHA_MIN,
                vel: Vec2::new(
                    (rng.random::<f32>() - 0.5) * 2.0 * DRIFT_X,
                    (rng.random::<f32>() - 0.5) * 2.0 * DRIFT_Y,
                ),
            })
            .collect();
        log::debug!("Dust initialized with {} particles", count);
    }

    /// New surface size. Positions are left alone; anything now outside
    /// wraps on its next tick.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.bounds = Vec2::new(width.max(0.0), height.max(0.0));
    }

    /// Advance one frame
    pub fn tick(&mut self) {
        let Vec2 { x: w, y: h } = self.bounds;
        for p in &mut self.particles {
            p.pos += p.vel;
            p.pos.x = wrap(p.pos.x, w);
            p.pos.y = wrap(p.pos.y, h);
        }
    }

    pub fn draw(&self, painter: &mut impl DustPainter) {
        painter.clear(self.bounds.x, self.bounds.y);
        for p in &self.particles {
            painter.dot(p.pos, p.radius, p.alpha);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }
}

/// Falling off the low edge lands on the high edge and vice versa
#[inline]
fn wrap(v: f32, max: f32) -> f32 {
    if v < 0.0 {
        max
    } else if v > max {
        0.0
    } else {
        v
    }
}
