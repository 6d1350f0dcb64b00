//! A single firework streak flying outward from the burst center.

use std::f64::consts::{PI, TAU};

use crate::util::Rng;

/// Range of a particle is `speed * RANGE_PER_SPEED`
pub const RANGE_PER_SPEED: f64 = 1000.0;
/// A particle is spent once it has covered this share of its range
pub const SPENT_RATIO: f64 = 0.9;

const MIN_SPEED: f64 = 0.1;
const MAX_SPEED: f64 = 0.3;

/// Cosine ease-out: 1 at the start of the flight, 0 at full range
#[inline]
pub fn easing(ratio: f64) -> f64 {
    ((PI * ratio).cos() + 1.0) / 2.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    distance: f64,
    direction: f64,
    speed: f64,
    max_distance: f64,
}

impl Particle {
    /// Random direction in [0, 2π) and speed in [0.1, 0.3)
    pub fn new(rng: &mut Rng) -> Self {
        let direction = rng.range_f64(0.0, TAU);
        let speed = rng.range_f64(MIN_SPEED, MAX_SPEED);
        Self::with_motion(direction, speed)
    }

    /// Particle at the burst center with a fixed heading and speed (px/ms)
    pub fn with_motion(direction: f64, speed: f64) -> Self {
        Self {
            distance: 0.0,
            direction,
            speed,
            max_distance: speed * RANGE_PER_SPEED,
        }
    }

    /// Start the particle part-way along its flight
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance.max(0.0);
        self
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[inline]
    pub fn direction(&self) -> f64 {
        self.direction
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[inline]
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Advance by `elapsed_ms`; the effective speed eases off towards full range
    pub fn update(&mut self, elapsed_ms: f64) {
        if self.max_distance <= 0.0 {
            return;
        }
        let coef = easing(self.distance / self.max_distance);
        self.distance += self.speed * coef * elapsed_ms.max(0.0);
    }

    /// Past 90% of its range; the owning firework drops it
    #[inline]
    pub fn is_spent(&self) -> bool {
        self.distance > self.max_distance * SPENT_RATIO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Rng;
    use proptest::prelude::*;

    #[test]
    fn test_max_distance_from_speed() {
        let p = Particle::with_motion(1.0, 0.2);
        assert_eq!(p.max_distance(), 200.0);
        assert_eq!(p.distance(), 0.0);
    }

    #[test]
    fn test_first_update_moves_at_full_speed() {
        let mut p = Particle::with_motion(0.0, 0.2);
        p.update(500.0);
        assert!((p.distance() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_easing_profile() {
        assert_eq!(easing(0.0), 1.0);
        assert!((easing(0.5) - 0.5).abs() < 1e-12);
        assert!(easing(1.0).abs() < 1e-12);
    }

    #[test]
    fn test_slows_down_near_range() {
        let mut near = Particle::with_motion(0.0, 0.2).with_distance(170.0);
        let mut fresh = Particle::with_motion(0.0, 0.2);
        near.update(10.0);
        fresh.update(10.0);
        assert!(near.distance() - 170.0 < fresh.distance());
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let mut p = Particle::with_motion(2.0, 0.15).with_distance(42.0);
        let before = p.clone();
        p.update(0.0);
        p.update(0.0);
        assert_eq!(p, before);
    }

    #[test]
    fn test_spent_threshold_is_strict() {
        let p = Particle::with_motion(0.0, 0.2);
        assert!(!p.clone().with_distance(180.0).is_spent());
        assert!(p.with_distance(180.1).is_spent());
    }

    #[test]
    fn test_random_ranges() {
        let mut rng = Rng::new(99);
        for _ in 0..500 {
            let p = Particle::new(&mut rng);
            assert!((0.0..TAU).contains(&p.direction()));
            assert!((MIN_SPEED..MAX_SPEED).contains(&p.speed()));
            assert_eq!(p.max_distance(), p.speed() * RANGE_PER_SPEED);
        }
    }

    proptest! {
        #[test]
        fn distance_never_decreases(
            speed in 0.1f64..0.3,
            steps in proptest::collection::vec(0.0f64..200.0, 1..60),
        ) {
            let mut p = Particle::with_motion(0.0, speed);
            let max_distance = p.max_distance();
            let mut last = p.distance();
            for elapsed in steps {
                p.update(elapsed);
                prop_assert!(p.distance() >= last);
                prop_assert_eq!(p.max_distance(), max_distance);
                last = p.distance();
            }
        }

        #[test]
        fn negative_elapsed_does_not_rewind(speed in 0.1f64..0.3, elapsed in -500.0f64..0.0) {
            let mut p = Particle::with_motion(0.0, speed).with_distance(10.0);
            p.update(elapsed);
            prop_assert_eq!(p.distance(), 10.0);
        }
    }
}
