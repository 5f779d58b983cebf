//! JSON snapshot backend — posts, tutorials and analytics rows in one file.
//!
//! ```json
//! {
//!   "posts": [{"id": 1, "slug": "intro", "title": "Intro", "body": {"en": "..."}, "status": "published"}],
//!   "tutorials": [{"id": 7, "slug": {"en": "setup"}, "body": {"en": "<h1>Setup</h1>"}}],
//!   "analytics": {"1": [{"label": "/blog/intro", "bounce_rate": "71%", "nb_visits": 40}]}
//! }
//! ```
//!
//! Analytics rows are stored worst-first, as an analytics API would return
//! them. Body updates are written back to the file.

use async_trait::async_trait;
use curator_core::error::ActionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::content::{Analytics, ContentItem, ContentKind, ContentStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub posts: Vec<ContentItem>,
    #[serde(default)]
    pub tutorials: Vec<ContentItem>,
    /// Raw analytics rows keyed by site id.
    #[serde(default)]
    pub analytics: BTreeMap<String, Value>,
}

impl Snapshot {
    fn items(&self, kind: ContentKind) -> &[ContentItem] {
        match kind {
            ContentKind::Post => &self.posts,
            ContentKind::Tutorial => &self.tutorials,
        }
    }

    fn items_mut(&mut self, kind: ContentKind) -> &mut Vec<ContentItem> {
        match kind {
            ContentKind::Post => &mut self.posts,
            ContentKind::Tutorial => &mut self.tutorials,
        }
    }

    fn position(&self, kind: ContentKind, slug: &str) -> Option<usize> {
        let items = self.items(kind);
        if let Some(idx) = items.iter().position(|item| item.has_slug(slug)) {
            return Some(idx);
        }
        if kind == ContentKind::Tutorial {
            return None;
        }

        // Posts from older imports carry the slug inside their JSON fields,
        // or only in their text.
        for field in [Field::Body, Field::Title] {
            if let Some(idx) = items.iter().position(|item| field.get(item).get("slug").and_then(Value::as_str) == Some(slug)) {
                debug!(slug, field = field.name(), "Post found via JSON field");
                return Some(idx);
            }
        }
        let needle = slug.to_lowercase();
        for field in [Field::Title, Field::Body] {
            if let Some(idx) = items.iter().position(|item| text_of(field.get(item)).to_lowercase().contains(&needle)) {
                debug!(slug, field = field.name(), "Post found via text search");
                return Some(idx);
            }
        }
        None
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Body,
}

impl Field {
    fn get(self, item: &ContentItem) -> &Value {
        match self {
            Self::Title => &item.title,
            Self::Body => &item.body,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// File-backed [`ContentStore`] and [`Analytics`].
pub struct SnapshotStore {
    path: Option<PathBuf>,
    data: RwLock<Snapshot>,
}

impl SnapshotStore {
    /// Load from `path`. A missing file yields an empty store that will be
    /// created on the first write.
    pub async fn open(path: &Path) -> Result<Self, ActionError> {
        let snapshot = match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| ActionError::Backend(format!("invalid snapshot {}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No content snapshot at {}, starting empty", path.display());
                Snapshot::default()
            }
            Err(e) => return Err(ActionError::Backend(format!("reading {}: {e}", path.display()))),
        };

        info!(
            path = %path.display(),
            posts = snapshot.posts.len(),
            tutorials = snapshot.tutorials.len(),
            "Content snapshot loaded"
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            data: RwLock::new(snapshot),
        })
    }

    /// An in-memory store that never touches disk.
    pub fn in_memory(snapshot: Snapshot) -> Self {
        Self {
            path: None,
            data: RwLock::new(snapshot),
        }
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), ActionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ActionError::Backend(format!("serializing snapshot: {e}")))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ActionError::Backend(format!("creating {}: {e}", parent.display())))?;
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| ActionError::Backend(format!("writing {}: {e}", path.display())))
    }
}

#[async_trait]
impl ContentStore for SnapshotStore {
    async fn find(&self, kind: ContentKind, slug: &str) -> Result<Option<ContentItem>, ActionError> {
        let data = self.data.read().await;
        let found = data.position(kind, slug).map(|idx| data.items(kind)[idx].clone());
        if found.is_none() {
            warn!(kind = kind.as_str(), slug, "Content not found");
        }
        Ok(found)
    }

    async fn update_body(&self, kind: ContentKind, slug: &str, body: Value) -> Result<Option<ContentItem>, ActionError> {
        let mut data = self.data.write().await;
        let Some(idx) = data.position(kind, slug) else {
            return Ok(None);
        };
        data.items_mut(kind)[idx].body = body;
        let updated = data.items(kind)[idx].clone();
        self.persist(&data).await?;
        info!(kind = kind.as_str(), slug, id = updated.id, "Content body updated");
        Ok(Some(updated))
    }

    async fn categories(&self, kind: ContentKind, slug: &str) -> Result<Option<Vec<String>>, ActionError> {
        let data = self.data.read().await;
        Ok(data.position(kind, slug).map(|idx| data.items(kind)[idx].categories.clone()))
    }
}

#[async_trait]
impl Analytics for SnapshotStore {
    async fn worst_bounce_urls(&self, site_id: i64, period: &str, date: &str, limit: usize) -> Result<Value, ActionError> {
        debug!(site_id, period, date, limit, "Reading analytics rows from snapshot");
        let data = self.data.read().await;
        let rows = match data.analytics.get(&site_id.to_string()) {
            Some(Value::Array(rows)) => Value::Array(rows.iter().take(limit).cloned().collect()),
            Some(other) => other.clone(),
            None => Value::Array(Vec::new()),
        };
        Ok(rows)
    }
}
