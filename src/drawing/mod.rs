mod canvas;
mod service;
mod surface;

pub use service::{Drawable, DrawingService, SharedDrawable};
pub use surface::{GradientStop, Hsla, Surface};
