use std::sync::Arc;

use crate::error::Result;
use crate::python::Object;
use crate::registry::{Handler, ModuleHook, Registry};
use crate::section::{DataSection, Section};

/// Catch-all: records `name = repr` in the parent's "Other data" section.
pub struct DataHandler;

impl Handler for DataHandler {
    fn name(&self) -> &str {
        "data"
    }

    fn handle(
        &self,
        _registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool> {
        parent
            .other_data
            .get_or_insert_with(DataSection::default)
            .push(name, value.repr());
        Ok(true)
    }
}

/// Moves each collected "Other data" section to the end of the section
/// that collected it.
pub struct OtherDataHook;

impl OtherDataHook {
    fn place(section: &mut Section) {
        for sub in &mut section.subs {
            Self::place(sub);
        }
        if let Some(data) = section.other_data.take() {
            if !data.is_empty() {
                section.subs.push(data.into_section());
            }
        }
    }
}

impl ModuleHook for OtherDataHook {
    fn run(&self, root: &mut Section) {
        Self::place(root);
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{document, load, module_section};
    use crate::registry::Registry;

    #[test]
    fn test_data_lines_in_insertion_order() {
        let source = "'''Mod.'''\nZ = 1\nA = 'two'\n";
        let (mut loader, module) = load(source);
        let registry = Registry::new();
        let mut root = module_section(&module);
        for name in ["Z", "A"] {
            let value = loader.getattr(&module, name).unwrap().unwrap();
            registry.dispatch(&mut root, name, &value).unwrap();
        }
        registry.run_hooks(&mut root);

        assert_eq!(root.subs.len(), 1);
        assert_eq!(root.subs[0].title.as_deref(), Some("Other data"));
        assert_eq!(root.subs[0].content.as_deref(), Some("```\nZ = 1\nA = 'two'\n```"));
    }

    #[test]
    fn test_data_section_placed_last() {
        let source = "'''Mod.'''\nLIMIT = 10\ndef f():\n    'Do f.'\n";
        let (mut loader, module) = load(source);
        let registry = Registry::new();
        let mut root = module_section(&module);
        for name in ["LIMIT", "f"] {
            let value = loader.getattr(&module, name).unwrap().unwrap();
            registry.dispatch(&mut root, name, &value).unwrap();
        }
        registry.run_hooks(&mut root);

        let titles: Vec<_> = root.subs.iter().map(|s| s.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["f()", "Other data"]);
    }

    #[test]
    fn test_class_data_stays_in_class() {
        let source = "class C:\n    '''A C.'''\n    limit = 3\n    def go(self):\n        'Go.'\n";
        let root = document(source, "C").unwrap();

        let class = &root.subs[0];
        let titles: Vec<_> = class.subs.iter().map(|s| s.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["go(self)", "Other data"]);
        assert_eq!(class.subs[1].content.as_deref(), Some("```\nlimit = 3\n```"));
        assert_eq!(root.subs.len(), 1);
    }
}
