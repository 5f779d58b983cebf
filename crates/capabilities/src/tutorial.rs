//! Tutorial structure and prerequisite checks, plus HTML → Markdown for bodies.

use async_trait::async_trait;
use curator_core::action::{ActionSpec, Args, Capability, ParamSpec, ParamType};
use curator_core::decision::truthy;
use curator_core::error::ActionError;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::arg_str;
use crate::content::{ContentKind, ContentStore, not_found};
use crate::post::word_count;

const PREREQUISITE_KEYWORDS: &[&str] = &["prerequisite", "prerequisites", "before you start", "requirements"];
const SETUP_KEYWORDS: &[&str] = &["setup", "installation", "install", "getting started"];
const REQUIREMENT_KEYWORDS: &[&str] = &["require", "need", "must have"];

/// Rendering width handed to the HTML renderer. Wrapped lines are
/// re-joined afterwards, so this only affects tables and preformatted text.
const MARKDOWN_WIDTH: usize = 100;

pub struct TutorialStructureAction {
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl TutorialStructureAction {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        let spec = ActionSpec::new("analyze_tutorial_structure", "Analyze the structure and completeness of a tutorial")
            .param(ParamSpec::required("slug", ParamType::String, "The tutorial slug"))
            .returns("Object with structure metrics (words, headings, code blocks, lists, links, images)");
        Self { spec, store }
    }
}

#[async_trait]
impl Capability for TutorialStructureAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        let Some(tutorial) = self.store.find(ContentKind::Tutorial, slug).await? else {
            return Ok(not_found(ContentKind::Tutorial, slug));
        };

        let mut analysis = json!({
            "slug": slug,
            "has_title": truthy(&tutorial.title),
            "has_body": truthy(&tutorial.body),
            "status": tutorial.status,
        });

        match &tutorial.body {
            Value::Object(langs) if !langs.is_empty() => {
                analysis["languages"] = json!(langs.keys().collect::<Vec<_>>());
                let by_language: Map<String, Value> = langs
                    .iter()
                    .filter_map(|(lang, text)| text.as_str().map(|t| (lang.clone(), structure_of(t))))
                    .collect();
                analysis["structure_by_language"] = Value::Object(by_language);
            }
            Value::String(text) if !text.is_empty() => {
                analysis["structure"] = structure_of(text);
            }
            _ => {}
        }

        Ok(analysis)
    }
}

pub struct PrerequisitesAction {
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl PrerequisitesAction {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        let spec = ActionSpec::new(
            "check_tutorial_prerequisites",
            "Check whether a tutorial has prerequisites and setup instructions",
        )
        .param(ParamSpec::required("slug", ParamType::String, "The tutorial slug"))
        .returns("Object with has_prerequisites, has_setup and has_requirements flags");
        Self { spec, store }
    }
}

#[async_trait]
impl Capability for PrerequisitesAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        let Some(tutorial) = self.store.find(ContentKind::Tutorial, slug).await? else {
            return Ok(not_found(ContentKind::Tutorial, slug));
        };

        let text = primary_text(&tutorial.body).to_lowercase();
        let mentions = |keywords: &[&str]| !text.is_empty() && keywords.iter().any(|k| text.contains(k));

        Ok(json!({
            "slug": slug,
            "has_prerequisites": mentions(PREREQUISITE_KEYWORDS),
            "has_setup": mentions(SETUP_KEYWORDS),
            "has_requirements": mentions(REQUIREMENT_KEYWORDS),
        }))
    }
}

/// The English body if present and non-empty, else the first language.
fn primary_text(body: &Value) -> &str {
    match body {
        Value::String(s) => s.as_str(),
        Value::Object(langs) => langs
            .get("en")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| langs.values().next().and_then(Value::as_str))
            .unwrap_or_default(),
        _ => "",
    }
}

fn structure_of(content: &str) -> Value {
    json!({
        "word_count": word_count(content),
        "char_count": content.chars().count(),
        "has_code_blocks": content.contains("```"),
        "heading_count": content.matches("# ").count(),
        "list_count": content.matches("- ").count() + content.matches("* ").count(),
        "link_count": content.matches('[').count(),
        "image_count": content.matches("![").count(),
    })
}

/// Convert a tutorial body (string or per-language object) from HTML to Markdown.
/// Non-string language entries are left untouched.
pub fn body_to_markdown(body: &Value) -> Value {
    match body {
        Value::String(html) => Value::String(html_to_markdown(html)),
        Value::Object(langs) => Value::Object(
            langs
                .iter()
                .map(|(lang, content)| {
                    let converted = match content {
                        Value::String(html) => Value::String(html_to_markdown(html)),
                        other => other.clone(),
                    };
                    (lang.clone(), converted)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// NFC-normalize, render to Markdown, then join wrapped lines while keeping
/// paragraph breaks.
pub fn html_to_markdown(html: &str) -> String {
    let normalized: String = html.nfc().collect();
    let rendered = match html2text::from_read(normalized.as_bytes(), MARKDOWN_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "HTML conversion failed, keeping source text");
            normalized
        }
    };
    rendered
        .split("\n\n")
        .map(|paragraph| paragraph.replace('\n', " "))
        .collect::<Vec<_>>()
        .join("\n\n")
}
