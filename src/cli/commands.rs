use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use pydoc_md::{Config, DocRun, ModuleLoader, ModuleParser, Registry};

const TABLE_WIDTH: usize = 70;

#[derive(Parser)]
#[command(name = "pydoc-md")]
#[command(about = "Generate Markdown documentation from Python docstrings")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Document a package and all of its submodules into docs/reference
    pydoc-md mypackage

    # Only the top level module, into a custom directory
    pydoc-md mypackage --no-submodules -o site/api

    # Look for modules under src/ instead of the current directory
    pydoc-md mypackage -p src
"#)]
pub struct Cli {
    /// Name of the module that will be documented
    #[arg(value_parser = parse_module_name)]
    pub module: String,

    /// Produce less output
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't document submodules recursively
    #[arg(long)]
    pub no_submodules: bool,

    /// Write output files here [default: docs/reference]
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Directory to search for modules, may be repeated [default: .]
    #[arg(short = 'p', long = "path")]
    pub search_paths: Vec<PathBuf>,

    /// Settings file [default: ./pydoc-md.toml if it exists]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Dotted names with an empty component would turn into absolute or
/// parent-relative output paths.
fn parse_module_name(name: &str) -> Result<String, String> {
    if name.split('.').all(|part| !part.is_empty()) {
        Ok(name.to_string())
    } else {
        Err(format!("invalid module name {:?}", name))
    }
}

impl Cli {
    /// Config file values with command line flags applied on top.
    pub fn settings(&self, cwd: &Path) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => Config::discover(cwd)?,
        };

        if self.quiet {
            config.quiet = true;
        }
        if self.no_submodules {
            config.submodules = false;
        }
        if let Some(outdir) = &self.outdir {
            config.output_dir = outdir.clone();
        }
        if !self.search_paths.is_empty() {
            config.search_paths = self.search_paths.clone();
        }
        Ok(config)
    }

    /// Directory that relative search paths are resolved against. Paths
    /// read from a `--config` file are relative to that file, paths given
    /// with `-p` to `cwd`.
    pub fn search_base(&self, cwd: &Path) -> PathBuf {
        match &self.config {
            Some(path) if self.search_paths.is_empty() => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
                _ => cwd.to_path_buf(),
            },
            _ => cwd.to_path_buf(),
        }
    }
}

pub fn document(cli: &Cli) -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    let config = cli.settings(&cwd)?;

    let loader = ModuleLoader::new(config.resolved_search_paths(&cli.search_base(&cwd)));
    let parser = ModuleParser::new(loader, Arc::new(Registry::new()));
    let mut run = DocRun::new(parser, &config.output_dir).recursive(config.submodules);

    if !config.quiet {
        println!("Writing documentation...");
    }
    let report = run
        .run_with(&cli.module, |source, destination| {
            if !config.quiet {
                println!(
                    "  {} -> {}",
                    nice_path(source, &cwd).display(),
                    destination.display()
                );
            }
        })
        .with_context(|| format!("failed to document {}", cli.module))?;

    if !config.quiet {
        println!();
        if report.documented == 1 {
            println!("1 module was documented.");
        } else {
            println!("{} modules were documented.", report.documented);
        }
        if !report.undocumented.is_empty() {
            if report.undocumented.len() == 1 {
                println!("This submodule was NOT documented:");
            } else {
                println!("These submodules were NOT documented:");
            }
            for line in table(&report.undocumented) {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

/// `path` relative to `cwd` when it is inside it, unchanged otherwise.
fn nice_path<'a>(path: &'a Path, cwd: &Path) -> &'a Path {
    path.strip_prefix(cwd).unwrap_or(path)
}

/// Sorted names wrapped into lines of at most `TABLE_WIDTH` characters.
/// A name longer than that gets a line of its own.
fn table(names: &[String]) -> Vec<String> {
    let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut lines = Vec::new();
    let mut line = String::new();
    for name in sorted {
        if !line.is_empty() && line.len() + 1 + name.len() > TABLE_WIDTH {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(name);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_module_name_validation() {
        assert!(parse_module_name("pkg.sub").is_ok());
        assert!(parse_module_name(".pkg").is_err());
        assert!(parse_module_name("pkg.").is_err());
        assert!(parse_module_name("a..b").is_err());
        assert!(parse_module_name("").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("pydoc-md.toml"),
            "output_dir = \"from/config\"\nsubmodules = true\n",
        )
        .unwrap();

        let cli = Cli::parse_from(["pydoc-md", "pkg", "--no-submodules", "-p", "src", "-p", "lib"]);
        let config = cli.settings(temp_dir.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("from/config"));
        assert!(!config.submodules);
        assert_eq!(config.search_paths, vec![PathBuf::from("src"), PathBuf::from("lib")]);

        let cli = Cli::parse_from(["pydoc-md", "pkg", "-o", "out", "-q"]);
        let config = cli.settings(temp_dir.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.quiet);
        assert!(config.submodules);
    }

    #[test]
    fn test_config_search_paths_relative_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("conf");
        std::fs::create_dir_all(&config_dir).unwrap();
        let config_path = config_dir.join("pydoc-md.toml");
        std::fs::write(&config_path, "search_paths = [\"src\"]\n").unwrap();

        let cli = Cli::parse_from(["pydoc-md", "pkg", "--config", config_path.to_str().unwrap()]);
        let config = cli.settings(temp_dir.path()).unwrap();
        assert_eq!(
            config.resolved_search_paths(&cli.search_base(temp_dir.path())),
            vec![config_dir.join("src")]
        );

        let cli = Cli::parse_from(["pydoc-md", "pkg", "--config", "conf/pydoc-md.toml"]);
        assert_eq!(cli.search_base(temp_dir.path()), config_dir);

        let cli = Cli::parse_from([
            "pydoc-md",
            "pkg",
            "--config",
            config_path.to_str().unwrap(),
            "-p",
            "lib",
        ]);
        let config = cli.settings(temp_dir.path()).unwrap();
        assert_eq!(
            config.resolved_search_paths(&cli.search_base(temp_dir.path())),
            vec![temp_dir.path().join("lib")]
        );
    }

    #[test]
    fn test_invalid_module_rejected_by_parser() {
        assert!(Cli::try_parse_from(["pydoc-md", "pkg..x"]).is_err());
    }

    #[test]
    fn test_table_wraps_sorted_names() {
        let names: Vec<String> = (0..12).rev().map(|i| format!("package.module{:02}", i)).collect();
        let lines = table(&names);

        assert!(lines.iter().all(|l| l.len() <= TABLE_WIDTH));
        assert!(lines[0].starts_with("package.module00 package.module01"));
        assert_eq!(lines.join(" ").split(' ').count(), 12);
    }

    #[test]
    fn test_nice_path() {
        let cwd = Path::new("/work/project");
        assert_eq!(nice_path(Path::new("/work/project/pkg/a.py"), cwd), Path::new("pkg/a.py"));
        assert_eq!(nice_path(Path::new("/elsewhere/b.py"), cwd), Path::new("/elsewhere/b.py"));
    }
}
