use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::literal::is_identifier;
use super::lower::Lowerer;
use super::object::{Binding, Data, Module, Object};
use super::parser::PythonParser;
use crate::error::{DocError, Result};

/// Where a module's source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLocation {
    pub path: PathBuf,
    pub is_package: bool,
}

/// Finds Python modules on a list of search roots and lowers them into
/// the object model. Loaded modules are cached by dotted name.
pub struct ModuleLoader {
    roots: Vec<PathBuf>,
    parser: PythonParser,
    cache: HashMap<String, Arc<Module>>,
    resolving: Vec<(String, String)>,
}

impl ModuleLoader {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            parser: PythonParser::new(),
            cache: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    /// Locate a module by dotted name. The first root that has it wins.
    pub fn find(&self, name: &str) -> Option<ModuleLocation> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.iter().any(|p| !is_identifier(p)) {
            return None;
        }

        self.roots.iter().find_map(|root| {
            let dir = parts.iter().fold(root.clone(), |path, part| path.join(part));
            let init = dir.join("__init__.py");
            if init.is_file() {
                return Some(ModuleLocation {
                    path: init,
                    is_package: true,
                });
            }
            let file = dir.with_file_name(format!("{}.py", parts[parts.len() - 1]));
            file.is_file().then_some(ModuleLocation {
                path: file,
                is_package: false,
            })
        })
    }

    /// Load a module, parsing it on first use.
    pub fn load(&mut self, name: &str) -> Result<Arc<Module>> {
        if let Some(module) = self.cache.get(name) {
            return Ok(module.clone());
        }
        let location = self
            .find(name)
            .ok_or_else(|| DocError::ModuleNotFound(name.to_string()))?;

        tracing::debug!("loading {} from {}", name, location.path.display());
        let source = std::fs::read_to_string(&location.path)?;
        self.load_source(name, &source, &location.path, location.is_package)
    }

    /// Lower already-read source as module `name` and cache it.
    pub fn load_source(
        &mut self,
        name: &str,
        source: &str,
        path: &Path,
        is_package: bool,
    ) -> Result<Arc<Module>> {
        let parsed = self.parser.parse_source(source)?;
        if parsed.root_node().has_error() {
            tracing::warn!("{} has syntax errors, documenting what parsed", path.display());
        }
        let module = Arc::new(Lowerer::new(&parsed, name, is_package).lower(path));
        self.cache.insert(name.to_string(), module.clone());
        Ok(module)
    }

    /// Look up `name` on `module` the way attribute access would, following
    /// imports. Returns `None` if the module has no such attribute.
    pub fn getattr(&mut self, module: &Module, name: &str) -> Result<Option<Arc<Object>>> {
        match module.binding(name) {
            Some(Binding::Value(value)) => Ok(Some(value.clone())),
            Some(Binding::Module(target)) => self.module_object(target).map(Some),
            Some(Binding::Import {
                module: source,
                name: original,
            }) => self.resolve_import(source, original),
            None => {
                let key = (module.name.clone(), format!("*{}", name));
                if module.star_imports.is_empty() || self.resolving.contains(&key) {
                    return Ok(None);
                }
                self.resolving.push(key);
                let result = self.getattr_from_stars(module, name);
                self.resolving.pop();
                result
            }
        }
    }

    fn getattr_from_stars(&mut self, module: &Module, name: &str) -> Result<Option<Arc<Object>>> {
        for star in &module.star_imports {
            if self.find(star).is_none() {
                continue;
            }
            let source = self.load(star)?;
            if self.exported_names(&source)?.iter().any(|n| n == name) {
                if let Some(value) = self.getattr(&source, name)? {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    fn module_object(&mut self, name: &str) -> Result<Arc<Object>> {
        if self.find(name).is_none() {
            return Ok(Data::new(format!("<module '{}'>", name)));
        }
        let module = self.load(name)?;
        Ok(Arc::new(Object::Module(module)))
    }

    /// Resolve `from source import original`: an attribute of `source`, or
    /// failing that its submodule. `None` means the lookup ran into an
    /// import cycle.
    fn resolve_import(&mut self, source: &str, original: &str) -> Result<Option<Arc<Object>>> {
        let key = (source.to_string(), original.to_string());
        if self.resolving.contains(&key) {
            return Ok(None);
        }
        if self.find(source).is_none() {
            return Ok(Some(Data::new(format!("<{}.{}>", source, original))));
        }

        self.resolving.push(key);
        let result = self.resolve_import_inner(source, original);
        self.resolving.pop();
        result.map(Some)
    }

    fn resolve_import_inner(&mut self, source: &str, original: &str) -> Result<Arc<Object>> {
        let module = self.load(source)?;
        if let Some(value) = self.getattr(&module, original)? {
            return Ok(value);
        }
        let submodule = format!("{}.{}", source, original);
        if self.find(&submodule).is_some() {
            return self.module_object(&submodule);
        }
        tracing::warn!("cannot resolve 'from {} import {}'", source, original);
        Ok(Data::new(format!("<{}>", submodule)))
    }

    /// Names `from module import *` would bring in.
    fn exported_names(&mut self, module: &Module) -> Result<Vec<String>> {
        match &module.all {
            Some(all) => Ok(all.clone()),
            None => self.public_names(module),
        }
    }

    /// Non-private attribute names of a module, including those pulled in
    /// through star imports. Submodules are not included.
    pub fn public_names(&mut self, module: &Module) -> Result<Vec<String>> {
        let mut names: Vec<String> = module
            .members
            .iter()
            .map(|(n, _)| n.clone())
            .filter(|n| !n.starts_with('_'))
            .collect();

        let key = (module.name.clone(), "*".to_string());
        if module.star_imports.is_empty() || self.resolving.contains(&key) {
            return Ok(names);
        }

        self.resolving.push(key);
        let result = self.star_names(module, &mut names);
        self.resolving.pop();
        result.map(|_| names)
    }

    fn star_names(&mut self, module: &Module, names: &mut Vec<String>) -> Result<()> {
        for star in &module.star_imports {
            if self.find(star).is_none() {
                tracing::debug!("star import of unknown module {}", star);
                continue;
            }
            let source = self.load(star)?;
            for name in self.exported_names(&source)? {
                if !name.starts_with('_') && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(())
    }

    /// Public submodules that live in a package's directory: `*.py` files
    /// and subpackages with an `__init__.py`.
    pub fn submodule_names(&self, module: &Module) -> Vec<String> {
        let Some(dir) = module.package_dir() else {
            return Vec::new();
        };

        let mut names: Vec<String> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let name = if path.is_dir() {
                    path.join("__init__.py")
                        .is_file()
                        .then(|| path.file_name()?.to_str().map(str::to_string))
                        .flatten()
                } else if path.extension().is_some_and(|e| e == "py") {
                    path.file_stem()?.to_str().map(str::to_string)
                } else {
                    None
                };
                name.filter(|n| is_identifier(n) && !n.starts_with('_'))
            })
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn create_loader(dir: &TempDir) -> ModuleLoader {
        ModuleLoader::new(vec![dir.path().to_path_buf()])
    }

    #[test]
    fn test_find_module_and_package() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "solo.py", "'''Solo.'''");
        create_file(temp_dir.path(), "pkg/__init__.py", "'''Pkg.'''");
        create_file(temp_dir.path(), "pkg/inner.py", "'''Inner.'''");

        let loader = create_loader(&temp_dir);

        let solo = loader.find("solo").unwrap();
        assert!(!solo.is_package);
        assert!(solo.path.ends_with("solo.py"));

        let pkg = loader.find("pkg").unwrap();
        assert!(pkg.is_package);
        assert!(pkg.path.ends_with("pkg/__init__.py"));

        assert!(loader.find("pkg.inner").is_some());
        assert!(loader.find("pkg.missing").is_none());
        assert!(loader.find("pkg..inner").is_none());
        assert!(loader.find("").is_none());
    }

    #[test]
    fn test_load_caches() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "solo.py", "'''Solo.'''");

        let mut loader = create_loader(&temp_dir);
        let first = loader.load("solo").unwrap();
        let second = loader.load("solo").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.docstring.as_deref(), Some("Solo."));
    }

    #[test]
    fn test_load_missing_module() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = create_loader(&temp_dir);
        assert!(matches!(
            loader.load("nothing.here"),
            Err(DocError::ModuleNotFound(name)) if name == "nothing.here"
        ));
    }

    #[test]
    fn test_getattr_follows_imports() {
        let temp_dir = TempDir::new().unwrap();
        create_file(
            temp_dir.path(),
            "pkg/__init__.py",
            "'''Pkg.'''\nfrom .core import Engine\nfrom . import util\nimport os\n",
        );
        create_file(temp_dir.path(), "pkg/core.py", "class Engine:\n    '''Runs.'''\n");
        create_file(temp_dir.path(), "pkg/util.py", "'''Utilities.'''\n");

        let mut loader = create_loader(&temp_dir);
        let pkg = loader.load("pkg").unwrap();

        let engine = loader.getattr(&pkg, "Engine").unwrap().unwrap();
        let class = engine.as_class().unwrap();
        assert_eq!(class.module, "pkg.core");

        let util = loader.getattr(&pkg, "util").unwrap().unwrap();
        assert!(matches!(&*util, Object::Module(m) if m.name == "pkg.util"));

        let os = loader.getattr(&pkg, "os").unwrap().unwrap();
        assert_eq!(os.repr(), "<module 'os'>");

        assert!(loader.getattr(&pkg, "missing").unwrap().is_none());
    }

    #[test]
    fn test_star_imports() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "'''Pkg.'''\nfrom .parts import *\n");
        create_file(
            temp_dir.path(),
            "pkg/parts.py",
            "__all__ = ['gear']\ndef gear():\n    '''Turn.'''\ndef spring():\n    '''Bounce.'''\n",
        );

        let mut loader = create_loader(&temp_dir);
        let pkg = loader.load("pkg").unwrap();

        assert_eq!(loader.public_names(&pkg).unwrap(), vec!["gear".to_string()]);
        assert!(loader.getattr(&pkg, "gear").unwrap().is_some());
        assert!(loader.getattr(&pkg, "spring").unwrap().is_none());
    }

    #[test]
    fn test_cyclic_imports_terminate() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.py", "from b import x\n");
        create_file(temp_dir.path(), "b.py", "from a import x\n");

        let mut loader = create_loader(&temp_dir);
        let a = loader.load("a").unwrap();
        let x = loader.getattr(&a, "x").unwrap().unwrap();
        assert!(matches!(&*x, Object::Data(_)));
    }

    #[test]
    fn test_cyclic_star_imports_terminate() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.py", "from b import *\nA = 1\n");
        create_file(temp_dir.path(), "b.py", "from a import *\nB = 2\n");

        let mut loader = create_loader(&temp_dir);
        let a = loader.load("a").unwrap();
        let names = loader.public_names(&a).unwrap();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_submodule_names() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "'''Pkg.'''");
        create_file(temp_dir.path(), "pkg/zeta.py", "");
        create_file(temp_dir.path(), "pkg/alpha.py", "");
        create_file(temp_dir.path(), "pkg/_private.py", "");
        create_file(temp_dir.path(), "pkg/not-valid.py", "");
        create_file(temp_dir.path(), "pkg/notes.txt", "");
        create_file(temp_dir.path(), "pkg/nested/__init__.py", "");
        create_file(temp_dir.path(), "pkg/data/readme.txt", "");

        let mut loader = create_loader(&temp_dir);
        let pkg = loader.load("pkg").unwrap();
        assert_eq!(loader.submodule_names(&pkg), vec!["alpha", "nested", "zeta"]);
    }

    #[test]
    fn test_submodule_names_of_plain_module() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "solo.py", "");
        let mut loader = create_loader(&temp_dir);
        let solo = loader.load("solo").unwrap();
        assert!(loader.submodule_names(&solo).is_empty());
    }
}
