//! Software canvas: a `Surface` rasterized into a `PixelBuffer`.

use super::surface::{gradient_alpha_at, GradientStop, Hsla, Surface, Transform};
use crate::display::{draw_text_scaled_blend, scale_for_size, text_width_scaled, PixelBuffer};
use crate::util::hsl_to_rgb;

/// Rows of the 7-row glyph that sit above the baseline
const GLYPH_ASCENT: f64 = 7.0;

pub struct PixelCanvas {
    buffer: PixelBuffer,
    transform: Transform,
    saved: Vec<Transform>,
    background: (u8, u8, u8),
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32, background: (u8, u8, u8)) -> Self {
        Self {
            buffer: PixelBuffer::with_size(width, height),
            transform: Transform::IDENTITY,
            saved: Vec::new(),
            background,
        }
    }

    /// Match the canvas pixel size to its on-screen size. Like a canvas element,
    /// resizing drops the contents and resets the transform state.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.buffer.resize(width, height);
        self.transform = Transform::IDENTITY;
        self.saved.clear();
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Number of transforms currently saved
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    fn rgb(color: Hsla) -> (u8, u8, u8) {
        hsl_to_rgb(color.hue, color.saturation / 100.0, color.lightness / 100.0)
    }
}

impl Surface for PixelCanvas {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn has_context(&self) -> bool {
        self.buffer.width() > 0 && self.buffer.height() > 0
    }

    fn clear(&mut self) {
        let (r, g, b) = self.background;
        self.buffer.clear(r, g, b);
    }

    fn save(&mut self) {
        self.saved.push(self.transform);
    }

    fn restore(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform.translate(dx, dy);
    }

    fn rotate(&mut self, angle: f64) {
        self.transform.rotate(angle);
    }

    fn measure_text(&self, text: &str, size: f64) -> f64 {
        text_width_scaled(text, scale_for_size(size as f32)) as f64
    }

    /// Bitmap glyphs are placed at the transformed anchor point; rotation does
    /// not apply to text.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, size: f64, color: Hsla) {
        let alpha = color.clamped_alpha();
        if alpha <= 0.0 {
            return;
        }
        let scale = scale_for_size(size as f32);
        let (dx, dy) = self.transform.apply(x, y);
        let top = dy - GLYPH_ASCENT * scale as f64;
        let (r, g, b) = Self::rgb(color);
        draw_text_scaled_blend(
            &mut self.buffer,
            dx.round() as i32,
            top.round() as i32,
            text,
            r,
            g,
            b,
            (alpha * 255.0).round() as u8,
            scale,
        );
    }

    /// The gradient interpolates opacity between stops; the stroke color is
    /// taken from the most opaque stop.
    fn stroke_gradient_line(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        line_width: f64,
        stops: &[GradientStop],
    ) {
        let Some(peak) = stops
            .iter()
            .max_by(|a, b| a.color.clamped_alpha().total_cmp(&b.color.clamped_alpha()))
        else {
            return;
        };
        if peak.color.clamped_alpha() <= 0.0 {
            return;
        }

        let (r, g, b) = Self::rgb(peak.color);
        let (sx, sy) = self.transform.apply(x1, y1);
        let (ex, ey) = self.transform.apply(x2, y2);
        self.buffer.stroke_segment_gradient(
            sx as f32,
            sy as f32,
            ex as f32,
            ey as f32,
            line_width as f32,
            r,
            g,
            b,
            |t| gradient_alpha_at(stops, t as f64) as f32,
        );
    }
}
