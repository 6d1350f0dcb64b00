use super::particle::Particle;
use crate::util::Rng;

const MIN_PARTICLES: usize = 50;
const MAX_PARTICLES: usize = 100; // exclusive

/// Canvas position in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What a trigger asks for: who fired it, what they said, where it bursts
#[derive(Debug, Clone, PartialEq)]
pub struct FireworkOptions {
    pub username: String,
    pub message: String,
    pub origin: Point,
}

/// One burst: a ring of particles plus the text it was fired with
#[derive(Debug, Clone)]
pub struct Firework {
    username: String,
    message: String,
    origin: Point,
    hue: f64,
    particles: Vec<Particle>,
}

impl Firework {
    /// Random hue and 50-99 random particles
    pub fn new(options: FireworkOptions, rng: &mut Rng) -> Self {
        let hue = rng.range_f64(0.0, 360.0);
        let count = rng.range_usize(MIN_PARTICLES, MAX_PARTICLES);
        let particles = (0..count).map(|_| Particle::new(rng)).collect();
        Self::with_particles(options, hue, particles)
    }

    /// Build from explicit parts (tests)
    pub fn with_particles(options: FireworkOptions, hue: f64, particles: Vec<Particle>) -> Self {
        Self {
            username: options.username,
            message: options.message,
            origin: options.origin,
            hue,
            particles,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn hue(&self) -> f64 {
        self.hue
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The first surviving particle; it drives the text fade
    pub fn lead(&self) -> Option<&Particle> {
        self.particles.first()
    }

    /// No particles left; the owner must drop this firework
    pub fn is_exhausted(&self) -> bool {
        self.particles.is_empty()
    }

    /// Advance every particle once, then drop the spent ones
    pub fn update(&mut self, elapsed_ms: f64) {
        for particle in &mut self.particles {
            particle.update(elapsed_ms);
        }
        self.particles.retain(|p| !p.is_spent());
    }
}
