//! Content-maintenance capabilities for Curator.
//!
//! Three action catalogs, one per agent:
//!
//! - **main** — analytics triage (`get_top_bounce_urls`), post lookup and
//!   delegation to the specialized agents
//! - **post** — details, rewrite, categories and quality analysis of blog posts
//! - **tutorial** — the same for tutorials, plus structure and prerequisite checks
//!
//! Actions reach content and analytics only through the [`ContentStore`] and
//! [`Analytics`] traits. [`SnapshotStore`] implements both over a JSON file.

pub mod agents;
pub mod content;
pub mod editorial;
pub mod personas;
pub mod post;
pub mod site;
pub mod snapshot;
pub mod tutorial;

pub use agents::{AgentDeps, AgentSet, MAIN_SCOPE, POST_SCOPE, TUTORIAL_SCOPE};
pub use content::{Analytics, ContentItem, ContentKind, ContentStore};
pub use snapshot::{Snapshot, SnapshotStore};

use curator_core::action::Args;
use curator_core::error::ActionError;

/// A required string argument.
pub(crate) fn arg_str<'a>(args: &'a Args, key: &str, action: &str) -> Result<&'a str, ActionError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ActionError::InvalidArguments(format!("{action}: '{key}' must be a string")))
}

/// A required integer argument.
pub(crate) fn arg_i64(args: &Args, key: &str, action: &str) -> Result<i64, ActionError> {
    args.get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ActionError::InvalidArguments(format!("{action}: '{key}' must be an integer")))
}
