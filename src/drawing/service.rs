//! Shared frame driver
//!
//! One `DrawingService` owns the overlay canvas and a set of subscribers. While
//! at least one subscriber is registered the service is running and every call
//! to [`DrawingService::frame`] clears the canvas and lets each subscriber draw.
//! When the last subscriber leaves, the loop stops: `frame` returns `false`
//! until someone subscribes again.
//!
//! Subscribers may subscribe or unsubscribe (themselves or others) from inside
//! `draw`. A subscriber that panics is not caught; the panic unwinds through
//! `frame`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use super::canvas::PixelCanvas;
use super::surface::Surface;
use crate::display::PixelBuffer;

/// Anything that wants a draw call every frame
pub trait Drawable {
    /// - surface: the shared canvas, already cleared for this frame
    /// - elapsed_ms: time since the previous frame (0 on the first frame after a start)
    fn draw(&mut self, surface: &mut dyn Surface, elapsed_ms: f64);
}

pub type SharedDrawable = Rc<RefCell<dyn Drawable>>;

/// Identity of a subscriber, independent of its vtable
#[inline]
fn same_drawable(a: &SharedDrawable, b: &SharedDrawable) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

pub struct DrawingService {
    subscribers: RefCell<Vec<SharedDrawable>>,
    running: Cell<bool>,
    last_frame: Cell<Option<Instant>>,
    viewport: Cell<(u32, u32)>,
    background: (u8, u8, u8),
    canvas: RefCell<Option<PixelCanvas>>,
}

impl DrawingService {
    /// Create a stopped service for a viewport of the given size.
    /// The canvas itself is only allocated on first use.
    pub fn new(width: u32, height: u32, background: (u8, u8, u8)) -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            running: Cell::new(false),
            last_frame: Cell::new(None),
            viewport: Cell::new((width, height)),
            background,
            canvas: RefCell::new(None),
        }
    }

    /// Make sure the canvas exists and return its pixel size
    pub fn acquire_surface(&self) -> (u32, u32) {
        let (width, height) = self.viewport.get();
        // Already borrowed means a frame is in progress, so the canvas exists
        if let Ok(mut slot) = self.canvas.try_borrow_mut() {
            if slot.is_none() {
                debug!(width, height, "creating overlay canvas");
                *slot = Some(PixelCanvas::new(width, height, self.background));
            }
        }
        (width, height)
    }

    /// Viewport resize handler: keeps the canvas pixel size equal to the window size
    pub fn resize(&self, width: u32, height: u32) {
        if self.viewport.get() == (width, height) {
            return;
        }
        debug!(width, height, "resizing overlay canvas");
        self.viewport.set((width, height));
        match self.canvas.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(canvas) = slot.as_mut() {
                    canvas.resize(width, height);
                }
            },
            Err(_) => warn!("resize requested during a frame; ignored"),
        }
    }

    /// Add a subscriber. Subscribing twice is a no-op. Starts the loop if stopped.
    pub fn subscribe(&self, drawable: SharedDrawable) {
        {
            let mut subscribers = self.subscribers.borrow_mut();
            if subscribers.iter().any(|s| same_drawable(s, &drawable)) {
                return;
            }
            subscribers.push(drawable);
            trace!(count = subscribers.len(), "drawable subscribed");
        }

        if !self.running.get() {
            self.start();
        }
    }

    /// Remove a subscriber. Stops the loop once no subscribers remain.
    pub fn unsubscribe(&self, drawable: &SharedDrawable) {
        let now_empty = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|s| !same_drawable(s, drawable));
            trace!(count = subscribers.len(), "drawable unsubscribed");
            subscribers.is_empty()
        };

        if now_empty {
            self.stop();
        }
    }

    pub fn is_subscribed(&self, drawable: &SharedDrawable) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|s| same_drawable(s, drawable))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// True while the frame loop should keep being scheduled
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    fn start(&self) {
        debug!("frame loop started");
        self.last_frame.set(None);
        self.running.set(true);
    }

    fn stop(&self) {
        if self.running.get() {
            debug!("frame loop stopped");
        }
        self.running.set(false);
        self.last_frame.set(None);
    }

    /// Run one animation tick at time `now`.
    ///
    /// Returns `false` without touching the canvas when the loop is stopped.
    pub fn frame(&self, now: Instant) -> bool {
        if !self.running.get() {
            return false;
        }

        let elapsed_ms = self.last_frame.replace(Some(now)).map_or(0.0, |previous| {
            now.saturating_duration_since(previous).as_secs_f64() * 1000.0
        });

        self.acquire_surface();
        let mut slot = self.canvas.borrow_mut();
        let Some(canvas) = slot.as_mut() else {
            return true;
        };
        canvas.clear();

        // Snapshot so subscribers can (un)subscribe from inside draw
        let snapshot: Vec<SharedDrawable> = self.subscribers.borrow().clone();
        for drawable in &snapshot {
            if !self.is_subscribed(drawable) {
                continue;
            }
            match drawable.try_borrow_mut() {
                Ok(mut target) => target.draw(canvas, elapsed_ms),
                Err(_) => warn!("drawable busy during frame; skipped"),
            }
        }

        true
    }

    /// Fill the canvas with the background colour, creating it if needed.
    /// Used to show an empty overlay while no frame loop is running.
    /// Returns false when a frame is in progress.
    pub fn clear_surface(&self) -> bool {
        self.acquire_surface();
        let Ok(mut slot) = self.canvas.try_borrow_mut() else {
            return false;
        };
        match slot.as_mut() {
            Some(canvas) => {
                canvas.clear();
                true
            },
            None => false,
        }
    }

    /// Read access to the rendered pixels (for presenting to the window)
    pub fn with_pixels<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        let slot = self.canvas.borrow();
        slot.as_ref().map(|canvas| f(canvas.pixels()))
    }
}
