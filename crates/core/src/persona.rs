//! Persona — who the oracle is asked to be, and how autonomously to act.
//!
//! A persona is the fixed head of every prompt a loop renders. Extra
//! operator-supplied context can be layered on from a markdown file; missing
//! or unreadable files are skipped with a warning.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Agent name, also used in the memory section heading.
    pub name: String,

    /// Opening description of the role.
    pub description: String,

    /// Behavioral instructions, rendered one per line.
    #[serde(default)]
    pub guidelines: Vec<String>,

    /// Extra context appended after the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<String>,
}

impl Persona {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            guidelines: Vec::new(),
            extra_context: None,
        }
    }

    pub fn guideline(mut self, line: impl Into<String>) -> Self {
        self.guidelines.push(line.into());
        self
    }

    /// Append the contents of a context file, if it can be read.
    pub fn with_context_file(mut self, path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) if !content.trim().is_empty() => {
                debug!(path = %path.display(), bytes = content.len(), "Loaded persona context file");
                self.extra_context = Some(content.trim().to_string());
            }
            Ok(_) => debug!(path = %path.display(), "Persona context file is empty, skipping"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not read persona context file"),
        }
        self
    }
}
