use std::sync::Arc;

use super::missing_docstring;
use crate::error::Result;
use crate::python::{clean_doc, Object};
use crate::registry::{Handler, Registry};
use crate::section::Section;

/// Functions and methods, titled with their signature.
pub struct FunctionHandler;

impl Handler for FunctionHandler {
    fn name(&self) -> &str {
        "function"
    }

    fn handle(
        &self,
        _registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool> {
        let Object::Function(function) = &**value else {
            return Ok(false);
        };
        let doc = function
            .docstring
            .as_deref()
            .ok_or_else(|| missing_docstring(parent, name))?;

        let section = Section::for_object(
            parent.fullname(),
            name,
            value.clone(),
            format!("{}{}", name, function.signature),
            clean_doc(doc),
        );
        parent.subs.push(section);
        Ok(true)
    }
}
