//! "gg" module: every chat trigger bursts into a firework with the sender's
//! name and message, somewhere random on the overlay.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::{Module, ModuleContext, SharedModule};
use crate::drawing::{Drawable, DrawingService, SharedDrawable, Surface};
use crate::effects::fireworks::{FireworkOptions, Fireworks, Point};
use crate::util::Rng;

pub const ID: &str = "gg";

/// Payload of a gg trigger
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GgMessage {
    pub username: String,
    pub message: String,
}

pub struct GgModule {
    drawing: Rc<DrawingService>,
    fireworks: Fireworks,
    rng: Rng,
    // Handle used to (un)subscribe ourselves to the drawing service
    me: Weak<RefCell<GgModule>>,
}

impl GgModule {
    pub fn new(drawing: Rc<DrawingService>, mut rng: Rng) -> Rc<RefCell<Self>> {
        let fireworks = Fireworks::new(rng.fork());
        Rc::new_cyclic(|me| {
            RefCell::new(Self {
                drawing,
                fireworks,
                rng,
                me: me.clone(),
            })
        })
    }

    /// Registry factory
    pub fn create(context: &mut ModuleContext) -> SharedModule {
        Self::new(context.drawing.clone(), context.rng.fork())
    }

    pub fn fireworks(&self) -> &Fireworks {
        &self.fireworks
    }

    fn handle(&self) -> Option<SharedDrawable> {
        let me: SharedDrawable = self.me.upgrade()?;
        Some(me)
    }

    /// Launch a firework at a random point of the canvas and make sure we are drawn
    pub fn trigger(&mut self, username: String, message: String) {
        let (width, height) = self.drawing.acquire_surface();
        let origin = Point::new(
            (width as f64 * self.rng.next_f64()).ceil(),
            (height as f64 * self.rng.next_f64()).ceil(),
        );
        debug!(%username, x = origin.x, y = origin.y, "firework launched");

        self.fireworks.spawn(FireworkOptions {
            username,
            message,
            origin,
        });

        if let Some(handle) = self.handle() {
            self.drawing.subscribe(handle);
        }
    }
}

impl Module for GgModule {
    fn name(&self) -> &str {
        ID
    }

    fn on_message(&mut self, data: Value) {
        match serde_json::from_value::<GgMessage>(data) {
            Ok(GgMessage { username, message }) => self.trigger(username, message),
            Err(e) => debug!(error = %e, "ignoring malformed gg payload"),
        }
    }
}

impl Drawable for GgModule {
    fn draw(&mut self, surface: &mut dyn Surface, elapsed_ms: f64) {
        self.fireworks.update(surface, elapsed_ms);

        if self.fireworks.is_empty() {
            trace!("all fireworks burnt out");
            if let Some(handle) = self.handle() {
                self.drawing.unsubscribe(&handle);
            }
        }
    }
}
