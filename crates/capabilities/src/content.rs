//! Collaborator traits for content and analytics.
//!
//! Capabilities only see these traits; the concrete backing store is
//! chosen by the binary.

use async_trait::async_trait;
use curator_core::error::ActionError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Tutorial,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Tutorial => "tutorial",
        }
    }

    /// Capitalized label used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Tutorial => "Tutorial",
        }
    }
}

/// A piece of publishable content.
///
/// `slug`, `title` and `body` are either plain strings or per-language
/// objects such as `{"en": "...", "it": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(default)]
    pub slug: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub status: String,
    /// View counter
    #[serde(default)]
    pub counter: u64,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ContentItem {
    /// True if `slug` equals the item's slug or any of its per-language slugs.
    pub fn has_slug(&self, slug: &str) -> bool {
        match &self.slug {
            Value::String(s) => s == slug,
            Value::Object(map) => map.values().any(|v| v.as_str() == Some(slug)),
            _ => false,
        }
    }
}

/// Read/write access to posts and tutorials.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find(&self, kind: ContentKind, slug: &str) -> Result<Option<ContentItem>, ActionError>;

    /// Replace the body. Returns the updated item, or `None` if nothing matched.
    async fn update_body(&self, kind: ContentKind, slug: &str, body: Value) -> Result<Option<ContentItem>, ActionError>;

    /// Category names for an item, `None` if the item does not exist.
    async fn categories(&self, kind: ContentKind, slug: &str) -> Result<Option<Vec<String>>, ActionError>;
}

/// Page-level analytics for a site.
#[async_trait]
pub trait Analytics: Send + Sync {
    /// Raw rows for the pages with the worst bounce rate. Rows are
    /// loosely shaped and may arrive as a list or wrapped in an object.
    async fn worst_bounce_urls(&self, site_id: i64, period: &str, date: &str, limit: usize) -> Result<Value, ActionError>;
}

/// The structured result returned when a slug matches nothing.
pub fn not_found(kind: ContentKind, slug: &str) -> Value {
    json!({ "error": format!("{} with slug '{}' not found", kind.label(), slug) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_matching() {
        let mut item = ContentItem {
            id: 1,
            slug: json!("intro"),
            title: json!("Intro"),
            body: Value::Null,
            status: "published".into(),
            counter: 0,
            categories: vec![],
        };
        assert!(item.has_slug("intro"));
        assert!(!item.has_slug("Intro"));

        item.slug = json!({"en": "getting-started", "it": "per-iniziare"});
        assert!(item.has_slug("per-iniziare"));
        assert!(!item.has_slug("intro"));
    }

    #[test]
    fn not_found_message() {
        assert_eq!(
            not_found(ContentKind::Tutorial, "x"),
            json!({"error": "Tutorial with slug 'x' not found"})
        );
    }

    #[test]
    fn item_defaults_when_sparse() {
        let item: ContentItem = serde_json::from_value(json!({"id": 9})).unwrap();
        assert_eq!(item.slug, Value::Null);
        assert!(item.categories.is_empty());
    }
}
