//! Python front end: parses source files with tree-sitter and lowers them
//! into the object model the handlers document.

pub mod literal;
pub mod loader;
pub mod lower;
pub mod object;
pub mod parser;

pub use literal::{clean_doc, is_identifier};
pub use loader::{ModuleLoader, ModuleLocation};
pub use object::{
    BaseRef, Binding, Class, ClassKind, Data, EnumMember, Function, FunctionKind, Module, Object,
    Property,
};
pub use parser::{ParsedFile, PythonParser};
