//! Shared utilities

/// Simple deterministic RNG using xorshift64
/// Good for effects that need reproducible randomness without external dependencies
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) } // Ensure non-zero
    }

    /// Seed from the wall clock (used when no `--seed` is given)
    pub fn from_clock() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::new(nanos)
    }

    /// Derive an independent generator, so each consumer owns its own stream
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64() ^ 0x2545_F491_4F6C_DD1D)
    }

    /// Get the next random u64
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Get a random f64 in [0, 1)
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // 53 high bits -> exact double mantissa
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Get a random f64 in [min, max)
    #[inline]
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Get a random usize in [min, max)
    ///
    /// # Panics
    /// Panics in debug builds if `min >= max`
    #[inline]
    pub fn range_usize(&mut self, min: usize, max: usize) -> usize {
        debug_assert!(min < max, "range_usize: min ({}) must be < max ({})", min, max);
        if min >= max {
            return min;
        }
        min + (self.next_f64() * (max - min) as f64) as usize
    }
}

/// CSS-style HSL to RGB color conversion
/// h: 0-360, s: 0-1, l: 0-1
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h_prime = h / 60.0;
    let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
    let m = l - c / 2.0;

    let (r1, g1, b1) = match h_prime as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_rng_f64_range() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
            let r = rng.range_f64(0.1, 0.3);
            assert!((0.1..0.3).contains(&r));
            let n = rng.range_usize(50, 100);
            assert!((50..100).contains(&n));
        }
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
        assert_eq!(hsl_to_rgb(42.0, 0.0, 1.0), (255, 255, 255));
    }

    #[test]
    fn test_hsl_pastel() {
        // hsla(h, 70%, 70%) is the firework palette: bright but never saturated black/white
        let (r, g, b) = hsl_to_rgb(200.0, 0.7, 0.7);
        assert!(r > 100 && g > 150 && b > 200);
    }
}
