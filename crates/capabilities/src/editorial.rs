//! Actions shared by the post and tutorial agents: read, rewrite, categorize.
//!
//! Each is parameterized by [`ContentKind`] so names and messages follow the
//! kind (`get_post_details` vs `get_tutorial_details`).

use async_trait::async_trait;
use curator_core::action::{ActionSpec, Args, Capability, ParamSpec, ParamType};
use curator_core::error::ActionError;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::content::{ContentKind, ContentStore, not_found};
use crate::{arg_str, tutorial};

fn slug_param(kind: ContentKind) -> ParamSpec {
    ParamSpec::required("slug", ParamType::String, format!("The {} slug", kind.as_str()))
}

pub struct DetailsAction {
    kind: ContentKind,
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl DetailsAction {
    pub fn new(kind: ContentKind, store: Arc<dyn ContentStore>) -> Self {
        let noun = kind.as_str();
        let spec = ActionSpec::new(
            format!("get_{noun}_details"),
            format!("Get detailed information about a {noun} by slug"),
        )
        .param(slug_param(kind))
        .returns(format!("Object with {noun} details including title, body and status"));
        Self { kind, spec, store }
    }
}

#[async_trait]
impl Capability for DetailsAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        let Some(item) = self.store.find(self.kind, slug).await? else {
            return Ok(not_found(self.kind, slug));
        };

        Ok(match self.kind {
            ContentKind::Post => json!({
                "id": item.id,
                "title": item.title,
                "body": item.body,
                "status": item.status,
                "counter": item.counter,
            }),
            // Tutorial bodies are stored as HTML; the oracle reads Markdown.
            ContentKind::Tutorial => json!({
                "id": item.id,
                "title": item.title,
                "body": tutorial::body_to_markdown(&item.body),
                "status": item.status,
            }),
        })
    }
}

pub struct UpdateContentAction {
    kind: ContentKind,
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl UpdateContentAction {
    pub fn new(kind: ContentKind, store: Arc<dyn ContentStore>) -> Self {
        let noun = kind.as_str();
        let spec = ActionSpec::new(format!("update_{noun}_content"), format!("Update the content (body) of a {noun}"))
            .param(slug_param(kind))
            .param(ParamSpec::required(
                "new_content",
                ParamType::Mapping,
                "New content as a JSON object keyed by language, e.g. {\"en\": \"...\", \"it\": \"...\"}",
            ))
            .returns(format!("Object with success status and the updated {noun} id"));
        Self { kind, spec, store }
    }
}

#[async_trait]
impl Capability for UpdateContentAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        let body = args
            .get("new_content")
            .cloned()
            .ok_or_else(|| ActionError::InvalidArguments(format!("{}: missing 'new_content'", self.spec.name)))?;

        let Some(item) = self.store.update_body(self.kind, slug, body).await? else {
            return Ok(not_found(self.kind, slug));
        };

        info!(kind = self.kind.as_str(), slug, "Content updated by agent");
        let mut result = json!({
            "success": true,
            "message": format!("{} '{}' updated successfully", self.kind.label(), slug),
        });
        result[format!("{}_id", self.kind.as_str())] = json!(item.id);
        Ok(result)
    }
}

pub struct CategoriesAction {
    kind: ContentKind,
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl CategoriesAction {
    pub fn new(kind: ContentKind, store: Arc<dyn ContentStore>) -> Self {
        let noun = kind.as_str();
        let spec = ActionSpec::new(
            format!("get_{noun}_categories"),
            format!("Get all categories associated with a {noun}"),
        )
        .param(slug_param(kind))
        .returns("List of category names");
        Self { kind, spec, store }
    }
}

#[async_trait]
impl Capability for CategoriesAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        Ok(match self.store.categories(self.kind, slug).await? {
            Some(names) => json!(names),
            None => not_found(self.kind, slug),
        })
    }
}
