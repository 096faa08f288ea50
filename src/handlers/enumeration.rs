use std::sync::Arc;

use crate::error::Result;
use crate::python::{clean_doc, Object};
use crate::registry::{Handler, Registry};
use crate::section::Section;

/// Enum classes. An undocumented enum gets a generated member list
/// instead of an error.
pub struct EnumHandler;

impl Handler for EnumHandler {
    fn name(&self) -> &str {
        "enum"
    }

    fn handle(
        &self,
        _registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool> {
        let Some(class) = value.as_class().filter(|c| c.is_enum()) else {
            return Ok(false);
        };

        let content = match class.docstring.as_deref() {
            Some(doc) => clean_doc(doc),
            None => {
                let mut text = format!("{} contains these members:", name);
                for member in class.distinct_enum_members() {
                    text.push_str(&format!("\n- *{}*", member));
                }
                text
            }
        };

        let section = Section::for_object(
            parent.fullname(),
            name,
            value.clone(),
            format!("enum {}", name),
            content,
        );
        parent.subs.push(section);
        Ok(true)
    }
}
