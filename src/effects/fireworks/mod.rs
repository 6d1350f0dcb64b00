//! Fireworks
//!
//! Keeps every active burst, advances them once per frame and paints them onto
//! a `Surface`. A burst whose last particle burns out is dropped in the same
//! pass, before it would be drawn.
//!
//! Text fade uses the lead particle: `alpha = (0.9 * max - d) / d`, or 1 while
//! the lead has not moved. The value is not clamped here: it is far above 1
//! early in the flight and falls to 0 as the lead reaches its 90% mark.

mod firework;
mod particle;

pub use firework::{Firework, FireworkOptions, Point};
pub use particle::{Particle, SPENT_RATIO};

use crate::drawing::{GradientStop, Hsla, Surface};
use crate::util::Rng;

const SATURATION: f64 = 70.0;
const LIGHTNESS: f64 = 70.0;

const USERNAME_FONT_SIZE: f64 = 40.0;
const MESSAGE_FONT_SIZE: f64 = 25.0;
const MESSAGE_OFFSET_Y: f64 = 30.0;

/// Streak length is `speed * TRAIL_PER_SPEED`
const TRAIL_PER_SPEED: f64 = 250.0;
const MIN_LINE_WIDTH: usize = 3;
const MAX_LINE_WIDTH: usize = 8; // exclusive

/// Opacity of a firework's text and streaks, driven by its lead particle
pub fn fade_alpha(lead: &Particle) -> f64 {
    if lead.distance() == 0.0 {
        1.0
    } else {
        (lead.max_distance() * SPENT_RATIO - lead.distance()) / lead.distance()
    }
}

/// All bursts currently on screen, drawn oldest first
pub struct Fireworks {
    fireworks: Vec<Firework>,
    rng: Rng,
}

impl Fireworks {
    pub fn new(rng: Rng) -> Self {
        Self {
            fireworks: Vec::new(),
            rng,
        }
    }

    /// Launch a new burst with random hue and particles
    pub fn spawn(&mut self, options: FireworkOptions) {
        let firework = Firework::new(options, &mut self.rng);
        self.fireworks.push(firework);
    }

    /// Add a prepared burst
    pub fn push(&mut self, firework: Firework) {
        self.fireworks.push(firework);
    }

    pub fn len(&self) -> usize {
        self.fireworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fireworks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Firework> {
        self.fireworks.iter()
    }

    /// Advance every burst by `elapsed_ms`, drop the burnt-out ones and draw the rest
    pub fn update(&mut self, surface: &mut dyn Surface, elapsed_ms: f64) {
        let rng = &mut self.rng;
        self.fireworks.retain_mut(|firework| {
            firework.update(elapsed_ms);
            if firework.is_exhausted() {
                return false;
            }
            draw_firework(surface, firework, rng);
            true
        });
    }
}

fn draw_firework(surface: &mut dyn Surface, firework: &Firework, rng: &mut Rng) {
    if !surface.has_context() {
        return;
    }
    let Some(lead) = firework.lead() else {
        return;
    };

    let color = Hsla::new(firework.hue(), SATURATION, LIGHTNESS, fade_alpha(lead));
    let origin = firework.origin();

    surface.save();
    surface.translate(origin.x, origin.y);

    draw_centered_text(surface, firework.username(), color, USERNAME_FONT_SIZE);

    surface.translate(0.0, MESSAGE_OFFSET_Y);
    draw_centered_text(surface, firework.message(), color, MESSAGE_FONT_SIZE);
    surface.translate(0.0, -MESSAGE_OFFSET_Y);

    for particle in firework.particles() {
        draw_particle(surface, particle, color, rng);
    }

    surface.restore();
}

fn draw_centered_text(surface: &mut dyn Surface, text: &str, color: Hsla, size: f64) {
    let width = surface.measure_text(text, size);
    surface.fill_text(text, -width / 2.0, 0.0, size, color);
}

/// Streak centered on the particle, fading out towards both ends
fn draw_particle(surface: &mut dyn Surface, particle: &Particle, color: Hsla, rng: &mut Rng) {
    surface.save();

    // Re-rolled every frame for a flicker
    let line_width = rng.range_usize(MIN_LINE_WIDTH, MAX_LINE_WIDTH) as f64;

    surface.rotate(particle.direction());

    let length = particle.speed() * TRAIL_PER_SPEED;
    let x1 = particle.distance() - length / 2.0;
    let x2 = particle.distance() + length / 2.0;

    let stops = [
        GradientStop::new(0.0, color.with_alpha(0.0)),
        GradientStop::new(0.5, color),
        GradientStop::new(1.0, color.with_alpha(0.0)),
    ];
    surface.stroke_gradient_line(x1, 0.0, x2, 0.0, line_width, &stops);

    surface.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::recording::{DrawOp, RecordingSurface};
    use crate::util::Rng;
    use proptest::prelude::*;

    fn options(username: &str, message: &str) -> FireworkOptions {
        FireworkOptions {
            username: username.to_string(),
            message: message.to_string(),
            origin: Point::new(100.0, 80.0),
        }
    }

    fn spent_firework(count: usize) -> Firework {
        let particles = (0..count)
            .map(|_| {
                let p = Particle::with_motion(1.0, 0.2);
                let d = p.max_distance() * 0.91;
                p.with_distance(d)
            })
            .collect();
        Firework::with_particles(options("gone", "bye"), 10.0, particles)
    }

    #[test]
    fn test_spawn_appends() {
        let mut fireworks = Fireworks::new(Rng::new(1));
        assert!(fireworks.is_empty());
        fireworks.spawn(options("a", "1"));
        fireworks.spawn(options("b", "2"));
        assert_eq!(fireworks.len(), 2);
        let names: Vec<&str> = fireworks.iter().map(Firework::username).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_exhausted_firework_removed_without_drawing() {
        let mut fireworks = Fireworks::new(Rng::new(1));
        fireworks.push(spent_firework(50));
        let mut surface = RecordingSurface::new(800, 600);

        fireworks.update(&mut surface, 1.0);

        assert_eq!(fireworks.len(), 0);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn test_draws_text_and_every_particle() {
        let mut fireworks = Fireworks::new(Rng::new(2));
        fireworks.spawn(options("alice", "hi"));
        let mut surface = RecordingSurface::new(800, 600);

        fireworks.update(&mut surface, 16.0);

        let particle_count = fireworks.iter().next().map_or(0, |f| f.particles().len());
        assert!(particle_count >= 50);
        assert_eq!(surface.texts(), ["alice", "hi"]);
        assert_eq!(surface.stroke_count(), particle_count);
    }

    #[test]
    fn test_transform_is_balanced_per_firework() {
        let mut fireworks = Fireworks::new(Rng::new(3));
        fireworks.spawn(options("a", "1"));
        fireworks.spawn(options("b", "2"));
        let mut surface = RecordingSurface::new(800, 600);

        fireworks.update(&mut surface, 16.0);

        assert_eq!(surface.depth(), 0);
        assert_eq!(surface.unbalanced_restores, 0);
        assert_eq!(surface.max_depth, 2);

        // Each firework starts from an untransformed surface: its opening Save
        // happens at depth zero
        let mut depth = 0usize;
        let mut opening_depths = Vec::new();
        for (i, op) in surface.ops.iter().enumerate() {
            match op {
                DrawOp::Save => {
                    if surface.ops.get(i + 1) == Some(&DrawOp::Translate(100.0, 80.0)) {
                        opening_depths.push(depth);
                    }
                    depth += 1;
                },
                DrawOp::Restore => depth -= 1,
                _ => {},
            }
        }
        assert_eq!(opening_depths, [0, 0]);
    }

    #[test]
    fn test_text_layout() {
        let mut fireworks = Fireworks::new(Rng::new(4));
        fireworks.spawn(options("alice", "hi"));
        let mut surface = RecordingSurface::new(800, 600);
        fireworks.update(&mut surface, 0.0);

        let fills: Vec<(f64, f64, f64)> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { x, y, size, .. } => Some((*x, *y, *size)),
                _ => None,
            })
            .collect();
        // RecordingSurface measures 10 units per char
        assert_eq!(fills, [(-25.0, 0.0, 40.0), (-10.0, 0.0, 25.0)]);

        // Message is drawn 30 units below the origin, then the offset is undone
        let translates: Vec<(f64, f64)> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Translate(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(translates, [(100.0, 80.0), (0.0, 30.0), (0.0, -30.0)]);
    }

    #[test]
    fn test_draw_order_is_insertion_order() {
        let mut fireworks = Fireworks::new(Rng::new(5));
        fireworks.spawn(options("first", "x"));
        fireworks.spawn(options("second", "y"));
        let mut surface = RecordingSurface::new(800, 600);
        fireworks.update(&mut surface, 16.0);
        assert_eq!(surface.texts(), ["first", "x", "second", "y"]);
    }

    #[test]
    fn test_only_exhausted_fireworks_are_dropped() {
        let mut fireworks = Fireworks::new(Rng::new(6));
        fireworks.spawn(options("keep", "1"));
        fireworks.push(spent_firework(10));
        fireworks.spawn(options("also", "2"));
        let mut surface = RecordingSurface::new(800, 600);

        fireworks.update(&mut surface, 16.0);

        assert_eq!(fireworks.len(), 2);
        assert_eq!(surface.texts(), ["keep", "1", "also", "2"]);
    }

    #[test]
    fn test_fade_alpha_formula() {
        let fresh = Particle::with_motion(0.0, 0.2);
        assert_eq!(fade_alpha(&fresh), 1.0);

        // (180 - 20) / 20 = 8: intentionally not clamped
        let early = Particle::with_motion(0.0, 0.2).with_distance(20.0);
        assert!((fade_alpha(&early) - 8.0).abs() < 1e-9);

        let half = Particle::with_motion(0.0, 0.2).with_distance(90.0);
        assert!((fade_alpha(&half) - 1.0).abs() < 1e-9);

        // Zero right at the removal threshold, negative past it
        let late = Particle::with_motion(0.0, 0.2).with_distance(180.0);
        assert!(fade_alpha(&late).abs() < 1e-9);
        let spent = Particle::with_motion(0.0, 0.2).with_distance(190.0);
        assert!(fade_alpha(&spent) < 0.0);
    }

    #[test]
    fn test_text_uses_lead_particle_alpha() {
        let lead = Particle::with_motion(0.0, 0.2).with_distance(90.0);
        let other = Particle::with_motion(1.0, 0.3);
        let fw = Firework::with_particles(options("a", "b"), 120.0, vec![lead, other]);
        let mut fireworks = Fireworks::new(Rng::new(7));
        fireworks.push(fw);
        let mut surface = RecordingSurface::new(800, 600);

        fireworks.update(&mut surface, 0.0);

        for op in &surface.ops {
            if let DrawOp::FillText { color, .. } = op {
                assert_eq!(color.hue, 120.0);
                assert_eq!((color.saturation, color.lightness), (70.0, 70.0));
                assert!((color.alpha - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_streak_geometry_and_gradient() {
        let particle = Particle::with_motion(0.5, 0.2).with_distance(40.0);
        let fw = Firework::with_particles(options("a", "b"), 200.0, vec![particle]);
        let mut fireworks = Fireworks::new(Rng::new(8));
        fireworks.push(fw);
        let mut surface = RecordingSurface::new(800, 600);

        fireworks.update(&mut surface, 0.0);

        assert!(surface.ops.contains(&DrawOp::Rotate(0.5)));
        let stroke = surface.ops.iter().find_map(|op| match op {
            DrawOp::Stroke {
                x1,
                x2,
                line_width,
                stops,
            } => Some((*x1, *x2, *line_width, stops.clone())),
            _ => None,
        });
        let Some((x1, x2, line_width, stops)) = stroke else {
            panic!("no stroke recorded");
        };
        // Length 0.2 * 250 = 50, centered on distance 40
        assert!((x1 - 15.0).abs() < 1e-9);
        assert!((x2 - 65.0).abs() < 1e-9);
        assert!((3.0..8.0).contains(&line_width));
        assert_eq!(line_width.fract(), 0.0);

        let alphas: Vec<f64> = stops.iter().map(|s| s.color.alpha).collect();
        let offsets: Vec<f64> = stops.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, [0.0, 0.5, 1.0]);
        assert_eq!(alphas[0], 0.0);
        assert_eq!(alphas[2], 0.0);
        assert!((alphas[1] - fade_alpha(&Particle::with_motion(0.5, 0.2).with_distance(40.0))).abs() < 1e-9);
    }

    #[test]
    fn test_no_context_skips_drawing_but_advances() {
        let mut fireworks = Fireworks::new(Rng::new(9));
        fireworks.spawn(options("a", "b"));
        fireworks.push(spent_firework(5));
        let mut surface = RecordingSurface::new(800, 600);
        surface.context = false;

        fireworks.update(&mut surface, 100.0);

        assert!(surface.ops.is_empty());
        assert_eq!(fireworks.len(), 1);
        let lead = fireworks.iter().next().and_then(Firework::lead).map(Particle::distance);
        assert!(lead.is_some_and(|d| d > 0.0));
    }

    #[test]
    fn test_everything_burns_out() {
        let mut fireworks = Fireworks::new(Rng::new(10));
        for i in 0..5 {
            fireworks.spawn(options(&format!("user{}", i), "gg"));
        }
        let mut surface = RecordingSurface::new(800, 600);
        for _ in 0..400 {
            fireworks.update(&mut surface, 16.0);
        }
        assert!(fireworks.is_empty());
        assert_eq!(surface.depth(), 0);
    }

    proptest! {
        #[test]
        fn len_matches_active_fireworks(
            seed in 1u64..u64::MAX,
            steps in proptest::collection::vec(0.0f64..500.0, 1..30),
        ) {
            let mut fireworks = Fireworks::new(Rng::new(seed));
            for i in 0..4 {
                fireworks.spawn(options(&i.to_string(), "m"));
            }
            let mut surface = RecordingSurface::new(320, 240);
            for elapsed in steps {
                fireworks.update(&mut surface, elapsed);
                prop_assert!(fireworks.iter().all(|f| !f.is_exhausted()));
            }
        }
    }
}
