//! Object model produced by the Python front end.
//!
//! Every documentable thing found in a source file is lowered into one of
//! the [`Object`] variants. Handlers match on these variants the same way
//! the Python tool matched on runtime types.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Object {
    Module(Arc<Module>),
    Class(Class),
    Function(Function),
    Property(Property),
    Data(Data),
}

impl Object {
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Object::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Object::Class(_))
    }

    /// Text used for `name = <repr>` lines in data sections.
    pub fn repr(&self) -> String {
        match self {
            Object::Module(m) => format!("<module '{}'>", m.name),
            Object::Class(c) => format!("<class '{}.{}'>", c.module, c.name),
            Object::Function(f) => match f.kind {
                FunctionKind::Plain => format!("<function {}>", f.name),
                FunctionKind::ClassMethod => format!("<classmethod {}>", f.name),
                FunctionKind::StaticMethod => format!("<staticmethod {}>", f.name),
            },
            Object::Property(p) => format!("<property {}>", p.name),
            Object::Data(d) => d.repr.clone(),
        }
    }
}

/// A loaded module or package.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub is_package: bool,
    pub docstring: Option<String>,
    /// Contents of `__all__`, if the module declares one.
    pub all: Option<Vec<String>>,
    /// Top-level bindings in first-assignment order.
    pub members: Vec<(String, Binding)>,
    /// Modules pulled in with `from module import *`.
    pub star_imports: Vec<String>,
}

impl Module {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    /// The directory holding this package's submodules.
    pub fn package_dir(&self) -> Option<PathBuf> {
        if self.is_package {
            self.path.parent().map(|p| p.to_path_buf())
        } else {
            None
        }
    }
}

/// What a module-level name is bound to. Imports stay unresolved until
/// the loader is asked for the member.
#[derive(Debug, Clone)]
pub enum Binding {
    Value(Arc<Object>),
    /// `import a.b` or `import a.b as c`
    Module(String),
    /// `from module import name`
    Import { module: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Regular,
    Exception,
    Enum,
}

/// A base class as written in a class statement, resolved to the module
/// that defines it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    pub module: String,
    pub name: String,
}

impl BaseRef {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.module == "builtins" && self.name == name
    }
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    /// Source text of the value, used to detect aliases.
    pub value: String,
    /// Set for `ALIAS = MEMBER`, naming the earlier member.
    pub alias_of: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    /// Dotted name of the defining module.
    pub module: String,
    pub docstring: Option<String>,
    pub bases: Vec<BaseRef>,
    pub kind: ClassKind,
    /// Direct members in class body order.
    pub members: Vec<(String, Arc<Object>)>,
    /// Explicit member list from `__doc_all__`.
    pub doc_all: Option<Vec<String>>,
    pub enum_members: Vec<EnumMember>,
}

impl Class {
    pub fn member(&self, name: &str) -> Option<&Arc<Object>> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    pub fn is_exception(&self) -> bool {
        self.kind == ClassKind::Exception
    }

    /// Enum members without aliases. A member assigned another member, or
    /// whose value repeats an earlier member's value, is an alias.
    pub fn distinct_enum_members(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.enum_members
            .iter()
            .filter(|member| {
                member.alias_of.is_none()
                    && (member.value.ends_with("auto()") || seen.insert(member.value.as_str()))
            })
            .map(|member| member.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    ClassMethod,
    StaticMethod,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    /// Parameter list and return annotation, e.g. `(a, b=1) -> int`.
    pub signature: String,
    pub docstring: Option<String>,
    pub kind: FunctionKind,
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub docstring: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Data {
    pub repr: String,
}

impl Data {
    pub fn new(repr: impl Into<String>) -> Arc<Object> {
        Arc::new(Object::Data(Data { repr: repr.into() }))
    }
}
