//! Blog post quality analysis.

use async_trait::async_trait;
use curator_core::action::{ActionSpec, Args, Capability, ParamSpec, ParamType};
use curator_core::decision::truthy;
use curator_core::error::ActionError;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::arg_str;
use crate::content::{ContentKind, ContentStore, not_found};

pub struct PostQualityAction {
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl PostQualityAction {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        let spec = ActionSpec::new("analyze_post_quality", "Analyze the quality of a blog post's content")
            .param(ParamSpec::required("slug", ParamType::String, "The post slug"))
            .returns("Object with quality metrics (languages, word counts, status, views)");
        Self { spec, store }
    }
}

#[async_trait]
impl Capability for PostQualityAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        let Some(post) = self.store.find(ContentKind::Post, slug).await? else {
            return Ok(not_found(ContentKind::Post, slug));
        };

        let mut analysis = json!({
            "slug": slug,
            "has_title": truthy(&post.title),
            "has_body": truthy(&post.body),
            "status": post.status,
            "view_count": post.counter,
        });

        match &post.body {
            Value::Object(langs) if !langs.is_empty() => {
                analysis["languages"] = json!(langs.keys().collect::<Vec<_>>());
                let counts: Map<String, Value> = langs
                    .iter()
                    .filter_map(|(lang, text)| text.as_str().map(|t| (lang.clone(), json!(word_count(t)))))
                    .collect();
                analysis["word_counts"] = Value::Object(counts);
            }
            Value::String(text) if !text.is_empty() => {
                analysis["word_count"] = json!(word_count(text));
            }
            _ => {}
        }

        Ok(analysis)
    }
}

pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
