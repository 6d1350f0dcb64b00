//! Overlay modules
//!
//! A module is a named receiver for push messages. Modules are built from a
//! static registry (identifier -> factory) and kept by the `ModuleManager`,
//! which routes each message to the module it names.

mod gg;

pub use gg::{GgModule, ID as GG};

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::drawing::DrawingService;
use crate::util::Rng;

/// Receiver for messages addressed to one module
pub trait Module {
    /// Identifier the module is registered under
    fn name(&self) -> &str;

    /// Handle the `data` part of an envelope. Payloads of the wrong shape are
    /// the module's to ignore; they must not panic.
    fn on_message(&mut self, data: Value);
}

pub type SharedModule = Rc<RefCell<dyn Module>>;

/// Services handed to module factories
pub struct ModuleContext {
    pub drawing: Rc<DrawingService>,
    pub rng: Rng,
}

impl ModuleContext {
    pub fn new(drawing: Rc<DrawingService>, rng: Rng) -> Self {
        Self { drawing, rng }
    }
}

pub type ModuleFactory = fn(&mut ModuleContext) -> SharedModule;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),
}

/// Identifier -> factory table, filled at startup
pub struct ModuleRegistry {
    factories: BTreeMap<&'static str, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every module shipped in this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(gg::ID, GgModule::create);
        registry
    }

    /// Add or replace a factory
    pub fn register(&mut self, id: &'static str, factory: ModuleFactory) {
        self.factories.insert(id, factory);
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn create(&self, id: &str, context: &mut ModuleContext) -> Result<SharedModule, ModuleError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| ModuleError::UnknownModule(id.to_string()))?;
        Ok(factory(context))
    }
}

/// Loaded modules and message routing
pub struct ModuleManager {
    registry: ModuleRegistry,
    context: ModuleContext,
    modules: HashMap<String, SharedModule>,
}

impl ModuleManager {
    pub fn new(registry: ModuleRegistry, context: ModuleContext) -> Self {
        Self {
            registry,
            context,
            modules: HashMap::new(),
        }
    }

    /// Instantiate the module registered under `id`. Loading an already loaded
    /// module keeps the existing instance.
    pub fn load(&mut self, id: &str) -> Result<(), ModuleError> {
        if self.modules.contains_key(id) {
            debug!(module = id, "module already loaded");
            return Ok(());
        }
        let module = self.registry.create(id, &mut self.context)?;
        self.modules.insert(id.to_string(), module);
        info!(module = id, "module loaded");
        Ok(())
    }

    /// Load each identifier in turn. Failures are logged and skipped.
    /// Returns how many modules are loaded afterwards.
    pub fn load_all<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        for id in ids {
            let id = id.as_ref().trim();
            if id.is_empty() {
                continue;
            }
            if let Err(e) = self.load(id) {
                warn!(error = %e, known = ?self.registry.ids().collect::<Vec<_>>(), "failed to load module");
            }
        }
        self.modules.len()
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SharedModule> {
        self.modules.get(id)
    }

    /// Hand `data` to the module named `id`. Returns false (and does nothing)
    /// when no such module is loaded.
    pub fn dispatch(&self, id: &str, data: Value) -> bool {
        let Some(module) = self.modules.get(id) else {
            trace!(module = id, "message for a module that is not loaded");
            return false;
        };
        match module.try_borrow_mut() {
            Ok(mut module) => {
                module.on_message(data);
                true
            },
            Err(_) => {
                warn!(module = id, "module busy; message dropped");
                false
            },
        }
    }
}
