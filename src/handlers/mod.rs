//! Default handlers.
//!
//! Registered in this order, so dispatch tries them in reverse: enums,
//! classes, properties, functions and finally the data catch-all.

mod class;
mod data;
mod enumeration;
mod function;
mod property;

pub use class::ClassHandler;
pub use data::{DataHandler, OtherDataHook};
pub use enumeration::EnumHandler;
pub use function::FunctionHandler;
pub use property::PropertyHandler;

use crate::error::DocError;
use crate::registry::Registry;
use crate::section::Section;

pub fn register_defaults(registry: &mut Registry) {
    registry
        .register(DataHandler)
        .register(FunctionHandler)
        .register(PropertyHandler)
        .register(ClassHandler)
        .register(EnumHandler)
        .register_hook(OtherDataHook);
}

/// `NoDocstring` for `name` inside `parent`.
fn missing_docstring(parent: &Section, name: &str) -> DocError {
    match parent.fullname() {
        Some(location) => DocError::no_docstring([location.as_str(), name]),
        None => DocError::no_docstring([name]),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Arc;

    use crate::python::{Module, ModuleLoader, Object};
    use crate::registry::Registry;
    use crate::section::Section;

    /// Lower `source` as module `mod` and return it with its loader.
    pub fn load(source: &str) -> (ModuleLoader, Arc<Module>) {
        let mut loader = ModuleLoader::new(Vec::new());
        let module = loader
            .load_source("mod", source, Path::new("mod.py"), false)
            .unwrap();
        (loader, module)
    }

    pub fn module_section(module: &Arc<Module>) -> Section {
        let value = Arc::new(Object::Module(module.clone()));
        Section::for_object(None, "mod", value, "mod", "")
    }

    /// Dispatch one member of `source` with the default registry.
    pub fn document(source: &str, name: &str) -> crate::error::Result<Section> {
        let (mut loader, module) = load(source);
        let registry = Registry::new();
        let mut root = module_section(&module);
        let value = loader.getattr(&module, name)?.unwrap();
        registry.dispatch(&mut root, name, &value)?;
        registry.run_hooks(&mut root);
        Ok(root)
    }
}
