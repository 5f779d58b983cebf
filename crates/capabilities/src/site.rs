//! Site-level actions for the main agent — analytics triage and post lookup.

use async_trait::async_trait;
use curator_core::action::{ActionSpec, Args, Capability, ParamSpec, ParamType};
use curator_core::error::ActionError;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info};

use crate::content::{Analytics, ContentKind, ContentStore, not_found};
use crate::{arg_i64, arg_str};

/// Page path patterns worth triaging, with the content type they denote.
/// `/blog/<slug>` (not `/blog/category/..`), `/tutorial/<slug>` and
/// `/tutorial/<parent>/<slug>`.
static PAGE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)^blog/(?P<slug>[^/]+)$", "blog"),
        (r"(?i)^tutorial/(?:[^/]+/)?(?P<slug>[^/]+)$", "tutorial"),
    ]
    .into_iter()
    .filter_map(|(pattern, kind)| Regex::new(pattern).ok().map(|re| (re, kind)))
    .collect()
});

pub struct TopBounceUrlsAction {
    spec: ActionSpec,
    analytics: Arc<dyn Analytics>,
}

impl TopBounceUrlsAction {
    pub fn new(analytics: Arc<dyn Analytics>) -> Self {
        let spec = ActionSpec::new("get_top_bounce_urls", "Get top URLs by bounce rate from site analytics")
            .param(ParamSpec::required("site_id", ParamType::Integer, "Analytics site ID"))
            .param(ParamSpec::optional(
                "period",
                ParamType::String,
                json!("day"),
                "Time period: 'day', 'week', 'month', 'year'",
            ))
            .param(ParamSpec::optional(
                "date",
                ParamType::String,
                json!("today"),
                "Date or range: 'today', 'yesterday', 'YYYY-MM-DD'",
            ))
            .param(ParamSpec::optional("limit", ParamType::Integer, json!(5), "Number of results to return"))
            .returns("List of objects with 'url', 'bounce_rate', 'type' and 'slug' keys");
        Self { spec, analytics }
    }
}

#[async_trait]
impl Capability for TopBounceUrlsAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let site_id = arg_i64(&args, "site_id", &self.spec.name)?;
        let period = arg_str(&args, "period", &self.spec.name)?;
        let date = arg_str(&args, "date", &self.spec.name)?;
        let limit = usize::try_from(arg_i64(&args, "limit", &self.spec.name)?).unwrap_or(0);

        // Ask for extra rows so filtering still leaves enough.
        let raw = self
            .analytics
            .worst_bounce_urls(site_id, period, date, limit * 2)
            .await
            .inspect_err(|e| error!(site_id, error = %e, "Analytics request failed"))?;

        let mut pages: Vec<Map<String, Value>> = normalize_rows(raw).into_iter().filter_map(process_page).collect();
        pages.sort_by(|a, b| {
            let (a, b) = (a["bounce_rate"].as_f64(), b["bounce_rate"].as_f64());
            b.partial_cmp(&a).unwrap_or(Ordering::Equal)
        });
        pages.truncate(limit);

        info!(site_id, found = pages.len(), "Top bounce pages collected");
        Ok(Value::Array(pages.into_iter().map(Value::Object).collect()))
    }
}

pub struct PostBySlugAction {
    spec: ActionSpec,
    store: Arc<dyn ContentStore>,
}

impl PostBySlugAction {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        let spec = ActionSpec::new("get_post_by_slug", "Find a blog post by slug using several search strategies")
            .param(ParamSpec::required("slug", ParamType::String, "The post slug to search for"))
            .returns("Post summary, or an error if not found");
        Self { spec, store }
    }
}

#[async_trait]
impl Capability for PostBySlugAction {
    fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    async fn invoke(&self, args: Args) -> Result<Value, ActionError> {
        let slug = arg_str(&args, "slug", &self.spec.name)?;
        Ok(match self.store.find(ContentKind::Post, slug).await? {
            Some(post) => json!({
                "id": post.id,
                "slug": post.slug,
                "title": post.title,
                "status": post.status,
                "counter": post.counter,
            }),
            None => not_found(ContentKind::Post, slug),
        })
    }
}

/// Flatten a loosely-shaped analytics response into rows matching
/// [`PAGE_PATTERNS`], annotated with `type` and `slug`.
pub fn normalize_rows(raw: Value) -> Vec<Map<String, Value>> {
    let rows = match raw {
        Value::Object(mut map) => match map.remove("result") {
            Some(Value::Array(rows)) => rows,
            Some(other) => vec![other],
            None => map.into_iter().map(|(_, v)| v).collect(),
        },
        Value::Array(rows) => rows,
        other => vec![other],
    };

    let mut out = Vec::new();
    for row in rows {
        let Value::Object(mut page) = row else {
            debug!("Skipping non-object analytics row");
            continue;
        };
        let Some(path) = page_path(&page) else {
            continue;
        };
        let Some((kind, slug)) = classify_path(&path) else {
            debug!(%path, "Page did not match any pattern");
            continue;
        };
        page.insert("type".into(), json!(kind));
        page.insert("slug".into(), json!(slug));
        out.push(page);
    }
    out
}

/// Extract a clean, relative path from the first of `url`, `label`, `pageUrl`.
fn page_path(page: &Map<String, Value>) -> Option<String> {
    let raw = ["url", "label", "pageUrl"]
        .iter()
        .filter_map(|key| page.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())?;

    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
    };
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path.as_str() };
    Some(path.trim_start_matches('/').to_string())
}

fn classify_path(path: &str) -> Option<(&'static str, String)> {
    PAGE_PATTERNS
        .iter()
        .find_map(|(re, kind)| re.captures(path).map(|caps| (*kind, caps["slug"].to_string())))
}

/// Attach `url` and a numeric `bounce_rate`. Rows without either are dropped.
fn process_page(mut page: Map<String, Value>) -> Option<Map<String, Value>> {
    let url = ["label", "url"]
        .iter()
        .filter_map(|key| page.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())?
        .to_string();
    let bounce = bounce_rate(&page)?;
    page.insert("url".into(), json!(url));
    page.insert("bounce_rate".into(), json!(bounce));
    Some(page)
}

/// Bounce rate as a percentage. Accepts `bounce_rate`/`bounceRate` as
/// numbers or text like `"71%"`, else derives it from `bounce_count` and
/// `nb_visits`. Fractions in `[0, 1]` are scaled to percent.
pub fn bounce_rate(page: &Map<String, Value>) -> Option<f64> {
    let direct = ["bounce_rate", "bounceRate"]
        .iter()
        .filter_map(|key| page.get(*key))
        .find(|v| !v.is_null())
        .and_then(as_number);

    let rate = match direct {
        Some(rate) => rate,
        None => {
            let bounces = page.get("bounce_count").and_then(as_number)?;
            let visits = page.get("nb_visits").and_then(as_number)?;
            if visits <= 0.0 {
                return None;
            }
            bounces * 100.0 / visits
        }
    };

    Some(if (0.0..=1.0).contains(&rate) { rate * 100.0 } else { rate })
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|f| f.is_finite())
}
