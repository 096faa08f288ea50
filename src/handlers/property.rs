use std::sync::Arc;

use super::missing_docstring;
use crate::error::Result;
use crate::python::{clean_doc, Object};
use crate::registry::{Handler, Registry};
use crate::section::Section;

/// Properties of classes. Properties anywhere else are left to the data
/// handler.
pub struct PropertyHandler;

impl Handler for PropertyHandler {
    fn name(&self) -> &str {
        "property"
    }

    fn handle(
        &self,
        _registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool> {
        let Object::Property(property) = &**value else {
            return Ok(false);
        };
        if !parent.value().is_some_and(|v| v.is_class()) {
            return Ok(false);
        }
        let doc = property
            .docstring
            .as_deref()
            .ok_or_else(|| missing_docstring(parent, name))?;

        let section = Section::for_object(
            parent.fullname(),
            name,
            value.clone(),
            format!("The {} property", name),
            clean_doc(doc),
        );
        parent.subs.push(section);
        Ok(true)
    }
}
