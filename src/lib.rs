pub mod config;
pub mod error;
pub mod handlers;
pub mod output;
pub mod parse;
pub mod python;
pub mod registry;
pub mod section;

pub use config::Config;
pub use error::{DocError, Result};
pub use output::{output_path, DocRun, RunReport};
pub use parse::{clean_summary, ModuleDoc, ModuleParser};
pub use python::{ModuleLoader, Object};
pub use registry::{Handler, ModuleHook, Registry};
pub use section::{DataSection, ObjectInfo, Section};
