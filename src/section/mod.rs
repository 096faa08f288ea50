//! The Markdown document tree.
//!
//! A [`Section`] has a title, content and nested sub-sections. Sections
//! that document a Python object also carry an [`ObjectInfo`] telling where
//! the object lives and what it is.

mod data;

pub use data::{DataSection, OTHER_DATA_TITLE};

use std::io::Write;
use std::sync::Arc;

use crate::error::{DocError, Result};
use crate::python::Object;

/// Where a documented object lives and the object itself.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Dotted path of the containing namespace, `None` for the top-level module.
    pub location: Option<String>,
    /// Name of the object inside `location`.
    pub name: String,
    pub value: Arc<Object>,
}

impl ObjectInfo {
    pub fn fullname(&self) -> String {
        match &self.location {
            Some(location) => format!("{}.{}", location, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Section {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subs: Vec<Section>,
    pub object: Option<ObjectInfo>,
    /// Values collected by the data handler, placed as the last sub by the
    /// other-data hook.
    pub other_data: Option<DataSection>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A section documenting `value`, found as `name` inside `location`.
    pub fn for_object(
        location: Option<String>,
        name: impl Into<String>,
        value: Arc<Object>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            object: Some(ObjectInfo {
                location,
                name: name.into(),
                value,
            }),
            ..Self::with_text(title, content)
        }
    }

    /// `location.name` of the documented object.
    pub fn fullname(&self) -> Option<String> {
        self.object.as_ref().map(ObjectInfo::fullname)
    }

    pub fn value(&self) -> Option<&Arc<Object>> {
        self.object.as_ref().map(|o| &o.value)
    }

    /// Iterate over all sub-sections depth first, not including `self`.
    pub fn walk_subs(&self) -> WalkSubs<'_> {
        WalkSubs {
            stack: vec![self.subs.iter()],
        }
    }

    /// Write this section and its subs as Markdown, starting at `#`.
    pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
        self.dump_at(out, 1)
    }

    pub fn dump_at<W: Write>(&self, out: &mut W, level: usize) -> Result<()> {
        let title = self
            .title
            .as_deref()
            .ok_or_else(|| DocError::Incomplete(format!("title of {} wasn't set", self.describe())))?;
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| DocError::Incomplete(format!("content of {} wasn't set", self.describe())))?;

        write!(out, "{} {}\n\n", "#".repeat(level), title)?;
        write!(out, "{}\n\n", content.trim_matches('\n'))?;
        for sub in &self.subs {
            sub.dump_at(out, level + 1)?;
        }
        Ok(())
    }

    /// Render to a string, mostly for tests and previews.
    pub fn to_markdown(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.dump(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn describe(&self) -> String {
        let subs = match self.subs.len() {
            1 => "1 subsection".to_string(),
            n => format!("{} subsections", n),
        };
        match (&self.title, self.fullname()) {
            (Some(title), _) => format!("section {:?}, {}", title, subs),
            (None, Some(fullname)) => format!("section for {}, {}", fullname, subs),
            (None, None) => format!("untitled section, {}", subs),
        }
    }
}

/// Depth-first pre-order iterator returned by [`Section::walk_subs`].
pub struct WalkSubs<'a> {
    stack: Vec<std::slice::Iter<'a, Section>>,
}

impl<'a> Iterator for WalkSubs<'a> {
    type Item = &'a Section;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(section) => {
                    self.stack.push(section.subs.iter());
                    return Some(section);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
