//! Module parsing: one Python module in, one section tree out.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{DocError, Result};
use crate::python::{clean_doc, Module, ModuleLoader, Object};
use crate::registry::Registry;
use crate::section::Section;

/// The documentation tree of a module and what the driver needs to
/// place it.
#[derive(Debug)]
pub struct ModuleDoc {
    pub section: Section,
    /// Dotted names of public submodules, left for the caller to document.
    pub submodules: Vec<String>,
    pub is_package: bool,
    pub path: PathBuf,
}

pub struct ModuleParser {
    loader: ModuleLoader,
    registry: Arc<Registry>,
}

impl ModuleParser {
    pub fn new(loader: ModuleLoader, registry: Arc<Registry>) -> Self {
        Self { loader, registry }
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Build the section tree of module `name`. Submodules of a package
    /// are not documented, their names are returned instead.
    pub fn parse_module(&mut self, name: &str) -> Result<ModuleDoc> {
        let module = self.loader.load(name)?;
        let doc = module
            .docstring
            .as_deref()
            .ok_or_else(|| DocError::no_docstring([name]))?;

        let members = self.member_names(&module)?;

        let doc = clean_doc(doc);
        let (summary, description) = doc.split_once('\n').unwrap_or((doc.as_str(), ""));
        let title = if summary.is_empty() {
            name.to_string()
        } else {
            format!("{} - {}", name, clean_summary(summary))
        };
        let value = Arc::new(Object::Module(module.clone()));
        let mut root = Section::for_object(None, name, value, title, description);

        let mut submodules = Vec::new();
        for member in members {
            if module.is_package {
                let submodule = format!("{}.{}", name, member);
                if self.loader.find(&submodule).is_some() {
                    tracing::debug!("{} is a submodule", submodule);
                    submodules.push(submodule);
                    continue;
                }
            }
            let value = self
                .loader
                .getattr(&module, &member)?
                .ok_or_else(|| DocError::MissingMember {
                    module: name.to_string(),
                    name: member.clone(),
                })?;
            self.registry.dispatch(&mut root, &member, &value)?;
        }

        self.registry.run_hooks(&mut root);

        Ok(ModuleDoc {
            section: root,
            submodules,
            is_package: module.is_package,
            path: module.path.clone(),
        })
    }

    /// `__all__` as written, or every public name sorted by kind.
    fn member_names(&mut self, module: &Module) -> Result<Vec<String>> {
        if let Some(all) = &module.all {
            return Ok(all.clone());
        }

        let mut names = self.loader.public_names(module)?;
        if module.is_package {
            for submodule in self.loader.submodule_names(module) {
                if !names.contains(&submodule) {
                    names.push(submodule);
                }
            }
        }

        let mut keyed = Vec::with_capacity(names.len());
        for name in names {
            let bucket = match self.loader.getattr(module, &name)? {
                Some(value) => sort_bucket(&value),
                None => 4,
            };
            keyed.push((bucket, name));
        }
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }
}

/// Classes, functions, exceptions, then everything else.
fn sort_bucket(value: &Object) -> u8 {
    match value {
        Object::Class(class) if class.is_exception() => 3,
        Object::Class(_) => 1,
        Object::Function(_) => 2,
        _ => 4,
    }
}

/// Turn a docstring's first line into a title fragment: a Capitalized
/// first word is lowercased and trailing `.?!` are dropped.
pub fn clean_summary(line: &str) -> String {
    let (first, rest) = match line.split_once(' ') {
        Some((first, rest)) => (first, Some(rest)),
        None => (line, None),
    };

    let mut chars = first.chars();
    let capitalized = match chars.next() {
        Some(c) if c.is_uppercase() => {
            let tail = chars.as_str();
            tail.chars().any(char::is_lowercase) && !tail.chars().any(char::is_uppercase)
        }
        _ => false,
    };

    let mut summary = if capitalized {
        first.to_lowercase()
    } else {
        first.to_string()
    };
    if let Some(rest) = rest {
        summary.push(' ');
        summary.push_str(rest);
    }
    summary
        .trim_end_matches(|c| matches!(c, '.' | '?' | '!'))
        .to_string()
}
