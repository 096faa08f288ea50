//! Handler and hook registration.
//!
//! A [`Registry`] holds the handlers that turn objects into sections and
//! the hooks that post-process a finished module tree. It is built once
//! and handed to the module parser; handlers added later take priority
//! over earlier ones, so custom handlers can shadow the defaults.

use std::sync::Arc;

use crate::error::{DocError, Result};
use crate::handlers;
use crate::python::Object;
use crate::section::Section;

/// Converts one object into a section appended to `parent`.
///
/// Returning `Ok(false)` declines the object and lets older handlers try.
/// Returning `Ok(true)` means the object was documented.
pub trait Handler: Send + Sync {
    fn name(&self) -> &str {
        "custom"
    }

    fn handle(
        &self,
        registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool>;
}

/// Post-processes the finished section tree of a module.
pub trait ModuleHook: Send + Sync {
    fn run(&self, root: &mut Section);
}

struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Registry, &mut Section, &str, &Arc<Object>) -> Result<bool> + Send + Sync,
{
    fn handle(
        &self,
        registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool> {
        (self.0)(registry, parent, name, value)
    }
}

struct FnHook<F>(F);

impl<F> ModuleHook for FnHook<F>
where
    F: Fn(&mut Section) + Send + Sync,
{
    fn run(&self, root: &mut Section) {
        (self.0)(root)
    }
}

pub struct Registry {
    handlers: Vec<Box<dyn Handler>>,
    hooks: Vec<Box<dyn ModuleHook>>,
}

impl Registry {
    /// A registry with the default handlers and hooks.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        handlers::register_defaults(&mut registry);
        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn register<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn register_fn<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Registry, &mut Section, &str, &Arc<Object>) -> Result<bool> + Send + Sync + 'static,
    {
        self.register(FnHandler(handler))
    }

    pub fn register_hook<H: ModuleHook + 'static>(&mut self, hook: H) -> &mut Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn register_hook_fn<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Section) + Send + Sync + 'static,
    {
        self.register_hook(FnHook(hook))
    }

    /// Names of the registered handlers in dispatch order.
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().rev().map(|h| h.name()).collect()
    }

    /// Document `value` as `name` inside `parent`, trying the newest
    /// handler first.
    pub fn dispatch(&self, parent: &mut Section, name: &str, value: &Arc<Object>) -> Result<()> {
        for handler in self.handlers.iter().rev() {
            if handler.handle(self, parent, name, value)? {
                tracing::debug!("{} documented {}", handler.name(), name);
                return Ok(());
            }
        }

        let location = parent.fullname().unwrap_or_default();
        Err(DocError::Unhandled(if location.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", location, name)
        }))
    }

    /// Run every hook on a finished module tree, in registration order.
    pub fn run_hooks(&self, root: &mut Section) {
        for hook in &self.hooks {
            hook.run(root);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
