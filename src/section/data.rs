use super::Section;

pub const OTHER_DATA_TITLE: &str = "Other data";

/// Aggregate of plain values found in one namespace, rendered as a single
/// "Other data" section.
#[derive(Debug, Clone, Default)]
pub struct DataSection {
    pub entries: Vec<(String, String)>,
}

impl DataSection {
    pub fn push(&mut self, name: impl Into<String>, repr: impl Into<String>) {
        self.entries.push((name.into(), repr.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn content(&self) -> String {
        let mut lines = vec!["```".to_string()];
        lines.extend(
            self.entries
                .iter()
                .map(|(name, repr)| format!("{} = {}", name, repr)),
        );
        lines.push("```".to_string());
        lines.join("\n")
    }

    pub fn into_section(self) -> Section {
        Section::with_text(OTHER_DATA_TITLE, self.content())
    }
}
