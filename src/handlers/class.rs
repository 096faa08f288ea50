use std::sync::Arc;

use super::missing_docstring;
use crate::error::{DocError, Result};
use crate::python::{clean_doc, Class, FunctionKind, Object};
use crate::registry::{Handler, Registry};
use crate::section::Section;

const CONSTRUCTOR: &str = "__init__";

/// Classes other than enums. Members are documented recursively inside
/// the class section.
pub struct ClassHandler;

impl ClassHandler {
    /// `Name` or `Name(Base, other.Base)`.
    fn display_name(class: &Class, name: &str, location: Option<&str>) -> String {
        let bases: Vec<String> = class
            .bases
            .iter()
            .filter(|base| !base.is_builtin("object") && !base.name.starts_with('_'))
            .map(|base| {
                if base.module == "builtins" || Some(base.module.as_str()) == location {
                    base.name.clone()
                } else {
                    format!("{}.{}", base.module, base.name)
                }
            })
            .collect();

        if bases.is_empty() {
            name.to_string()
        } else {
            format!("{}({})", name, bases.join(", "))
        }
    }

    /// Methods, classmethods, staticmethods, properties, then everything else.
    fn sort_key(value: &Object) -> u8 {
        match value {
            Object::Function(f) => match f.kind {
                FunctionKind::Plain => 1,
                FunctionKind::ClassMethod => 2,
                FunctionKind::StaticMethod => 3,
            },
            Object::Property(_) => 4,
            _ => 5,
        }
    }

    fn member_names(class: &Class) -> Vec<String> {
        if let Some(names) = &class.doc_all {
            return names.clone();
        }
        let mut members: Vec<&(String, Arc<Object>)> = class
            .members
            .iter()
            .filter(|(name, _)| name == CONSTRUCTOR || !name.starts_with('_'))
            .collect();
        members.sort_by(|(a, av), (b, bv)| {
            (Self::sort_key(av), a).cmp(&(Self::sort_key(bv), b))
        });
        members.into_iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Handler for ClassHandler {
    fn name(&self) -> &str {
        "class"
    }

    fn handle(
        &self,
        registry: &Registry,
        parent: &mut Section,
        name: &str,
        value: &Arc<Object>,
    ) -> Result<bool> {
        let Object::Class(class) = &**value else {
            return Ok(false);
        };
        if class.is_enum() {
            return Ok(false);
        }
        let doc = class
            .docstring
            .as_deref()
            .ok_or_else(|| missing_docstring(parent, name))?;

        let location = parent.fullname();
        let title = format!(
            "class {}",
            Self::display_name(class, name, location.as_deref())
        );
        let mut section = Section::for_object(location, name, value.clone(), title, clean_doc(doc));
        let fullname = section.fullname().unwrap_or_default();

        for member in Self::member_names(class) {
            let member_value = class.member(&member).ok_or_else(|| DocError::MissingMember {
                module: fullname.clone(),
                name: member.clone(),
            })?;
            match registry.dispatch(&mut section, &member, member_value) {
                Err(DocError::NoDocstring(_)) if member == CONSTRUCTOR => {
                    tracing::debug!("{}.{} is undocumented, skipping", fullname, member);
                }
                result => result?,
            }
        }

        parent.subs.push(section);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::document;
    use crate::python::BaseRef;

    fn titles(section: &Section) -> Vec<String> {
        section.subs.iter().map(|s| s.title.clone().unwrap()).collect()
    }

    #[test]
    fn test_class_heading_and_doc() {
        let source = "class Greeter:\n    \"\"\"Says hello.\n\n    Politely.\n    \"\"\"\n";
        let root = document(source, "Greeter").unwrap();

        let md = root.subs[0].to_markdown().unwrap();
        assert_eq!(md, "# class Greeter\n\nSays hello.\n\nPolitely.\n\n");
    }

    #[test]
    fn test_member_order() {
        let source = r#"
class Tool:
    """A tool."""

    zeta = 1

    @property
    def weight(self):
        """Weight."""

    @staticmethod
    def make():
        """Make."""

    @classmethod
    def build(cls):
        """Build."""

    def use(self):
        """Use."""

    def apply(self):
        """Apply."""

    def _hidden(self):
        pass
"#;
        let root = document(source, "Tool").unwrap();
        assert_eq!(
            titles(&root.subs[0]),
            vec!["apply(self)", "use(self)", "build(cls)", "make()", "The weight property", "Other data"]
        );
    }

    #[test]
    fn test_undocumented_constructor_is_skipped() {
        let source = "class P:\n    'A P.'\n    def __init__(self, x):\n        self.x = x\n    def run(self):\n        'Run.'\n";
        let root = document(source, "P").unwrap();
        assert_eq!(titles(&root.subs[0]), vec!["run(self)"]);
    }

    #[test]
    fn test_documented_constructor_is_kept() {
        let source = "class P:\n    'A P.'\n    def __init__(self, x):\n        'Make a P.'\n";
        let root = document(source, "P").unwrap();
        assert_eq!(titles(&root.subs[0]), vec!["__init__(self, x)"]);
    }

    #[test]
    fn test_undocumented_method_fails_with_path() {
        let source = "class P:\n    'A P.'\n    def __init__(self):\n        pass\n    def run(self):\n        pass\n";
        let err = document(source, "P").unwrap_err();
        assert!(matches!(err, DocError::NoDocstring(path) if path == "mod.P.run"));
    }

    #[test]
    fn test_undocumented_class() {
        let err = document("class Q:\n    pass\n", "Q").unwrap_err();
        assert!(matches!(err, DocError::NoDocstring(path) if path == "mod.Q"));
    }

    #[test]
    fn test_doc_all_order_is_used() {
        let source = "class C:\n    'C.'\n    __doc_all__ = ['b', '_secret']\n    def a(self):\n        pass\n    def b(self):\n        'B.'\n    def _secret(self):\n        'Secret.'\n";
        let root = document(source, "C").unwrap();
        assert_eq!(titles(&root.subs[0]), vec!["b(self)", "_secret(self)"]);
    }

    #[test]
    fn test_doc_all_unknown_member() {
        let source = "class C:\n    'C.'\n    __doc_all__ = ['nope']\n";
        let err = document(source, "C").unwrap_err();
        assert!(matches!(err, DocError::MissingMember { module, name } if module == "mod.C" && name == "nope"));
    }

    #[test]
    fn test_nested_class() {
        let source = "class Outer:\n    'Outer.'\n    class Inner:\n        'Inner.'\n        def f(self):\n            'F.'\n";
        let root = document(source, "Outer").unwrap();
        let inner = &root.subs[0].subs[0];
        assert_eq!(inner.title.as_deref(), Some("class Inner"));
        assert_eq!(inner.subs[0].fullname().as_deref(), Some("mod.Outer.Inner.f"));
    }

    #[test]
    fn test_display_name_bases() {
        let class = Class {
            name: "Child".to_string(),
            module: "pkg.mod".to_string(),
            docstring: Some("Child.".to_string()),
            bases: vec![
                BaseRef::new("builtins", "object"),
                BaseRef::new("pkg.mod", "_Mixin"),
                BaseRef::new("pkg.mod", "Parent"),
                BaseRef::new("builtins", "dict"),
                BaseRef::new("other", "Thing"),
            ],
            kind: crate::python::ClassKind::Regular,
            members: Vec::new(),
            doc_all: None,
            enum_members: Vec::new(),
        };
        assert_eq!(
            ClassHandler::display_name(&class, "Child", Some("pkg.mod")),
            "Child(Parent, dict, other.Thing)"
        );
        assert_eq!(
            ClassHandler::display_name(&class, "Child", Some("elsewhere")),
            "Child(pkg.mod.Parent, dict, other.Thing)"
        );
    }

    #[test]
    fn test_class_title_with_local_base() {
        let source = "class Base:\n    'Base.'\nclass Derived(Base):\n    'Derived.'\n";
        let root = document(source, "Derived").unwrap();
        assert_eq!(root.subs[0].title.as_deref(), Some("class Derived(Base)"));
    }
}
