//! 2D drawing contract shared by everything that paints onto the overlay.
//!
//! Modeled after an immediate-mode canvas context: a current transform that can
//! be saved and restored, text fills and gradient strokes.

use std::fmt;

/// Color in CSS `hsla()` terms: hue in degrees, saturation and lightness in
/// percent. `alpha` is kept as given (it may leave [0, 1]); surfaces clamp it
/// when rasterizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

impl Hsla {
    pub const fn new(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        Self {
            hue,
            saturation,
            lightness,
            alpha,
        }
    }

    pub const fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    /// Alpha as a rasterizer sees it
    #[inline]
    pub fn clamped_alpha(&self) -> f64 {
        if self.alpha.is_nan() {
            0.0
        } else {
            self.alpha.clamp(0.0, 1.0)
        }
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({} {}% {}% / {})",
            self.hue, self.saturation, self.lightness, self.alpha
        )
    }
}

/// One stop of a linear gradient. `offset` runs from 0 (start) to 1 (end).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Hsla,
}

impl GradientStop {
    pub const fn new(offset: f64, color: Hsla) -> Self {
        Self { offset, color }
    }
}

/// Opacity of a gradient at `t`, linearly interpolated between stops
pub fn gradient_alpha_at(stops: &[GradientStop], t: f64) -> f64 {
    let Some(first) = stops.first() else {
        return 0.0;
    };
    if t <= first.offset {
        return first.color.clamped_alpha();
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= f64::EPSILON {
                return b.color.clamped_alpha();
            }
            let k = (t - a.offset) / span;
            let (alpha_a, alpha_b) = (a.color.clamped_alpha(), b.color.clamped_alpha());
            return alpha_a + (alpha_b - alpha_a) * k;
        }
    }
    stops[stops.len() - 1].color.clamped_alpha()
}

/// 2D affine transform, column-major like a canvas matrix `(a, b, c, d, e, f)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Append a translation (applied before the existing transform)
    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.e += self.a * tx + self.c * ty;
        self.f += self.b * tx + self.d * ty;
    }

    /// Append a rotation in radians (applied before the existing transform)
    pub fn rotate(&mut self, angle: f64) {
        let (sin, cos) = angle.sin_cos();
        let (a, b, c, d) = (self.a, self.b, self.c, self.d);
        self.a = a * cos + c * sin;
        self.b = b * cos + d * sin;
        self.c = c * cos - a * sin;
        self.d = d * cos - b * sin;
    }

    /// Map a point from local to device coordinates
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Anything the drawing service can hand to its subscribers
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Whether drawing calls will reach a real backing store.
    /// Callers skip their drawing for the frame when this is false.
    fn has_context(&self) -> bool {
        true
    }

    /// Erase the whole surface
    fn clear(&mut self);

    /// Push the current transform
    fn save(&mut self);

    /// Pop the last saved transform; no-op when nothing is saved
    fn restore(&mut self);

    fn translate(&mut self, dx: f64, dy: f64);

    fn rotate(&mut self, angle: f64);

    /// Advance width of `text` at the given font size
    fn measure_text(&self, text: &str, size: f64) -> f64;

    /// Fill `text` with its left end at `x` and its baseline at `y`
    fn fill_text(&mut self, text: &str, x: f64, y: f64, size: f64, color: Hsla);

    /// Stroke a straight segment with a linear gradient running from
    /// (x1, y1) to (x2, y2)
    fn stroke_gradient_line(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        line_width: f64,
        stops: &[GradientStop],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_translate_then_rotate() {
        let mut t = Transform::IDENTITY;
        t.translate(100.0, 50.0);
        t.rotate(std::f64::consts::FRAC_PI_2);
        // Local +x points down after a quarter turn
        assert!(close(t.apply(10.0, 0.0), (100.0, 60.0)));
        assert!(close(t.apply(0.0, 0.0), (100.0, 50.0)));
    }

    #[test]
    fn test_translate_after_rotate_moves_along_rotated_axis() {
        let mut t = Transform::IDENTITY;
        t.rotate(std::f64::consts::PI);
        t.translate(5.0, 0.0);
        assert!(close(t.apply(0.0, 0.0), (-5.0, 0.0)));
    }

    #[test]
    fn test_hsla_display() {
        let color = Hsla::new(120.0, 70.0, 70.0, 0.5);
        assert_eq!(color.to_string(), "hsla(120 70% 70% / 0.5)");
    }

    #[test]
    fn test_clamped_alpha() {
        assert_eq!(Hsla::new(0.0, 70.0, 70.0, 3.5).clamped_alpha(), 1.0);
        assert_eq!(Hsla::new(0.0, 70.0, 70.0, -0.2).clamped_alpha(), 0.0);
        assert_eq!(Hsla::new(0.0, 70.0, 70.0, f64::NAN).clamped_alpha(), 0.0);
    }

    #[test]
    fn test_gradient_alpha_peak_in_middle() {
        let base = Hsla::new(10.0, 70.0, 70.0, 0.0);
        let stops = [
            GradientStop::new(0.0, base),
            GradientStop::new(0.5, base.with_alpha(0.8)),
            GradientStop::new(1.0, base),
        ];
        assert_eq!(gradient_alpha_at(&stops, 0.0), 0.0);
        assert!((gradient_alpha_at(&stops, 0.25) - 0.4).abs() < 1e-9);
        assert!((gradient_alpha_at(&stops, 0.5) - 0.8).abs() < 1e-9);
        assert_eq!(gradient_alpha_at(&stops, 1.0), 0.0);
        assert_eq!(gradient_alpha_at(&[], 0.5), 0.0);
    }
}
