//! Pattern documents: markdown split into named sections.
//!
//! A section starts at a top-level heading line (`# ` followed by the name)
//! and runs until the next one. Deeper headings (`## ...`) are body text.
//! Lines before the first heading are discarded.

use std::path::Path;

use patternrun_core::error::{Error, Result};

pub const IDENTITY_AND_PURPOSE: &str = "IDENTITY and PURPOSE";
pub const STEPS: &str = "STEPS";
pub const OUTPUT_INSTRUCTIONS: &str = "OUTPUT INSTRUCTIONS";

/// One `# Heading` and the text beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,

    /// Every line of the section, each with its own line ending
    pub body: String,

    /// Line ending of the heading line itself
    heading_break: &'static str,
}

/// A parsed pattern document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    sections: Vec<Section>,
}

impl Pattern {
    /// Split raw document text into sections.
    ///
    /// A repeated heading starts its section over: the later body replaces
    /// the earlier one, keeping the position of the first occurrence.
    /// Body lines keep their own line endings, `\r\n` included.
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<usize> = None;

        for line in text.split_inclusive('\n') {
            if let Some(heading) = line.strip_prefix("# ") {
                let name = heading.trim();
                let heading_break = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
                let index = match sections.iter().position(|s| s.name == name) {
                    Some(index) => {
                        sections[index].body.clear();
                        sections[index].heading_break = heading_break;
                        index
                    }
                    None => {
                        sections.push(Section {
                            name: name.to_string(),
                            body: String::new(),
                            heading_break,
                        });
                        sections.len() - 1
                    }
                };
                current = Some(index);
            } else if let Some(index) = current {
                let body = &mut sections[index].body;
                body.push_str(line);
                if !line.ends_with('\n') {
                    body.push('\n');
                }
            }
        }

        Self { sections }
    }

    /// Read and parse a pattern file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::PatternNotFound {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self::parse(&text))
    }

    /// Body of the named section, if present.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.body.as_str())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn identity(&self) -> Result<&str> {
        self.required(IDENTITY_AND_PURPOSE)
    }

    pub fn steps(&self) -> Result<&str> {
        self.required(STEPS)
    }

    pub fn output_instructions(&self) -> Option<&str> {
        self.section(OUTPUT_INSTRUCTIONS)
    }

    /// Render back to document text, one `# name` line per section.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("# {}{}{}", s.name, s.heading_break, s.body))
            .collect()
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.section(name).ok_or_else(|| Error::MissingRequiredSection {
            section: name.to_string(),
        })
    }
}
