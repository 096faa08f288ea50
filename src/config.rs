//! Optional `pydoc-md.toml` settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DocError, Result};

pub const CONFIG_FILE: &str = "pydoc-md.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory the Markdown files are written to.
    pub output_dir: PathBuf,
    /// Roots searched for Python modules, first match wins.
    pub search_paths: Vec<PathBuf>,
    /// Document submodules of packages recursively.
    pub submodules: bool,
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: Path::new("docs").join("reference"),
            search_paths: vec![PathBuf::from(".")],
            submodules: true,
            quiet: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| DocError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `pydoc-md.toml` from `dir` if it exists, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!("using config {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Search paths relative to `base`, for configs read from elsewhere.
    pub fn resolved_search_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.search_paths.iter().map(|p| base.join(p)).collect()
    }
}
