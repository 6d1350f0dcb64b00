use tracing::warn;

// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Bytes needed for a `width` x `height` buffer; `None` when the size cannot be
/// addressed (pixel coordinates are `i32`) or allocated
fn byte_len(width: u32, height: u32) -> Option<usize> {
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return None;
    }
    (width as usize).checked_mul(height as usize)?.checked_mul(4)
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 pixel buffer for software rendering
/// Backing store of the overlay canvas
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a new pixel buffer with custom resolution
    pub fn with_size(width: u32, height: u32) -> Self {
        let mut buffer = Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
        };
        buffer.resize(width, height);
        buffer
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocate to a new size. Contents are discarded (like resizing a canvas element).
    /// A size too large to address leaves the buffer empty (0x0).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        let Some(len) = byte_len(width, height) else {
            warn!(width, height, "pixel buffer size out of range; buffer left empty");
            self.width = 0;
            self.height = 0;
            self.pixels = Vec::new();
            return;
        };
        self.width = width;
        self.height = height;
        self.pixels = vec![0; len];
    }

    /// Check if coordinates are within bounds
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Calculate byte offset for pixel at (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Clear to a solid color
    /// Optimized: uses u32 fill for maximum speed
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        // Create ABGR u32 pattern
        let pixel = u32::from_ne_bytes([255, b, g, r]);

        // Safety: pixels.len() is always divisible by 4 (width * height * 4).
        // We use write_unaligned to avoid assuming alignment of Vec<u8>.
        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;

        for i in 0..len {
            // Safety: i < len ensures we stay within bounds
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Set pixel with alpha blending
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            let alpha = a as u16;
            self.pixels[idx] = 255; // A - always opaque
            self.pixels[idx + 1] = blend_channel(b, self.pixels[idx + 1], alpha);
            self.pixels[idx + 2] = blend_channel(g, self.pixels[idx + 2], alpha);
            self.pixels[idx + 3] = blend_channel(r, self.pixels[idx + 3], alpha);
        }
    }

    /// Read a pixel from the buffer (bounds checked)
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<(u8, u8, u8)> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some((
                self.pixels[idx + 3], // R
                self.pixels[idx + 2], // G
                self.pixels[idx + 1], // B
            ))
        } else {
            None
        }
    }

    /// Fill an axis-aligned rectangle with alpha blending
    pub fn fill_rect_blend(&mut self, x: i32, y: i32, w: u32, h: u32, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w as i32).min(self.width as i32);
        let y1 = (y + h as i32).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, r, g, b, a);
            }
        }
    }

    /// Stroke a thick segment whose opacity varies along its length.
    ///
    /// `alpha_at(t)` is sampled with t = 0 at (x0, y0) and t = 1 at (x1, y1) and
    /// must return an opacity in [0, 1]. Pixels are covered when their center lies
    /// within `thickness / 2` of the segment (butt caps), which keeps the stroke
    /// correct at any rotation.
    pub fn stroke_segment_gradient(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        thickness: f32,
        r: u8,
        g: u8,
        b: u8,
        alpha_at: impl Fn(f32) -> f32,
    ) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let len_sq = dx * dx + dy * dy;
        if len_sq < 1e-6 || thickness <= 0.0 {
            return;
        }
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }

        let half = thickness / 2.0;
        let len = len_sq.sqrt();

        // Bounding box of the stroked quad, clipped to the buffer
        let min_x = ((x0.min(x1) - half).floor() as i32).max(0);
        let max_x = ((x0.max(x1) + half).ceil() as i32).min(self.width as i32 - 1);
        let min_y = ((y0.min(y1) - half).floor() as i32).max(0);
        let max_y = ((y0.max(y1) + half).ceil() as i32).min(self.height as i32 - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let cx = px as f32 + 0.5 - x0;
                let cy = py as f32 + 0.5 - y0;

                // Projection along the segment and perpendicular distance
                let t = (cx * dx + cy * dy) / len_sq;
                if !(0.0..=1.0).contains(&t) {
                    continue;
                }
                let perp = (cx * dy - cy * dx).abs() / len;
                if perp > half {
                    continue;
                }

                let alpha = alpha_at(t).clamp(0.0, 1.0);
                if alpha > 0.0 {
                    self.blend_pixel(px, py, r, g, b, (alpha * 255.0).round() as u8);
                }
            }
        }
    }

    /// Raw bytes for SDL texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}
