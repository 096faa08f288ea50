//! Writing documentation trees to Markdown files.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{DocError, Result};
use crate::parse::ModuleParser;

/// Where the Markdown for `module` goes when documenting from `root`.
///
/// `root` itself becomes `outdir/README.md`. Below it, a package
/// `root.a.b` becomes `outdir/a/b/README.md` and a plain module
/// `root.a.b` becomes `outdir/a/b.md`.
///
/// The whole dotted `root` is stripped, not only its first component:
/// documenting `a.b` writes `a.b.c` to `outdir/c.md`. A module outside
/// `root` loses its first component.
pub fn output_path(outdir: &Path, root: &str, module: &str, is_package: bool) -> PathBuf {
    if module == root {
        return outdir.join("README.md");
    }
    let relative = module
        .strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('.'))
        .or_else(|| module.split_once('.').map(|(_, rest)| rest))
        .unwrap_or(module);

    let mut path = outdir.to_path_buf();
    path.extend(relative.split('.'));
    if is_package {
        path.push("README.md");
    } else {
        path.set_extension("md");
    }
    path
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub documented: usize,
    pub written: Vec<PathBuf>,
    /// Submodules found but not documented because recursion was off.
    pub undocumented: Vec<String>,
}

/// Documents a module and, unless told otherwise, all of its submodules.
pub struct DocRun {
    parser: ModuleParser,
    outdir: PathBuf,
    recursive: bool,
}

impl DocRun {
    pub fn new(parser: ModuleParser, outdir: impl Into<PathBuf>) -> Self {
        Self {
            parser,
            outdir: outdir.into(),
            recursive: true,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn run(&mut self, root: &str) -> Result<RunReport> {
        self.run_with(root, |_, _| {})
    }

    /// Like [`DocRun::run`], calling `on_module(source, destination)`
    /// before each module is parsed.
    pub fn run_with<F>(&mut self, root: &str, mut on_module: F) -> Result<RunReport>
    where
        F: FnMut(&Path, &Path),
    {
        let mut report = RunReport::default();
        let mut queue = VecDeque::from([root.to_string()]);

        while let Some(name) = queue.pop_front() {
            let location = self
                .parser
                .loader()
                .find(&name)
                .ok_or_else(|| DocError::ModuleNotFound(name.clone()))?;
            let destination = output_path(&self.outdir, root, &name, location.is_package);
            on_module(&location.path, &destination);

            let doc = self.parser.parse_module(&name)?;
            if self.recursive {
                queue.extend(doc.submodules);
            } else {
                report.undocumented.extend(doc.submodules);
            }

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            {
                let mut out = BufWriter::new(File::create(&destination)?);
                doc.section.dump(&mut out)?;
                out.flush()?;
            }
            tracing::debug!("wrote {}", destination.display());

            report.documented += 1;
            report.written.push(destination);
        }

        Ok(report)
    }
}
