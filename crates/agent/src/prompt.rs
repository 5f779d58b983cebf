//! Prompt rendering — folds persona, catalog, state and memory into oracle input.
//!
//! Output is a pure function of the inputs. JSON blocks are pretty-printed
//! with insertion-ordered keys, so identical inputs always render identical
//! text.

use curator_core::memory::MemoryRecord;
use curator_core::persona::Persona;
use serde_json::Value;

const PENDING_MARKER: &str = "⏳ Result: pending";
const ERROR_MARKER: &str = "❌ Result: ERROR -";
const SUCCESS_MARKER: &str = "✓ Result:";

const RESPONSE_INSTRUCTIONS: &str = r#"Decide which action to call next and with which arguments.
Answer ONLY with a single JSON object in exactly this format:
{
  "action": "action_name",
  "args": {"param": "value"},
  "reason": "why you chose this action",
  "stop": false
}
When the task is complete, set "stop": true to return control."#;

/// Render the full oracle prompt.
pub fn render(
    persona: &Persona,
    catalog: &Value,
    state: &Value,
    memory: &[MemoryRecord],
    context: &Value,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("You are {}. {}\n", persona.name, persona.description));
    if let Some(extra) = &persona.extra_context {
        out.push('\n');
        out.push_str(extra);
        out.push('\n');
    }

    if !is_empty_context(context) {
        out.push_str("\nContext:\n");
        out.push_str(&pretty(context));
        out.push('\n');
    }

    out.push_str("\nAvailable actions:\n");
    out.push_str(&pretty(catalog));
    out.push('\n');

    out.push_str("\nCurrent state:\n");
    out.push_str(&pretty(state));
    out.push('\n');

    out.push_str(&render_memory_section(&persona.name, memory));

    if !persona.guidelines.is_empty() {
        out.push_str("\nGuidelines:\n");
        for line in &persona.guidelines {
            out.push_str(&format!("- {line}\n"));
        }
    }

    out.push('\n');
    out.push_str(RESPONSE_INSTRUCTIONS);
    out.push('\n');
    out
}

/// Render the memory section, or an empty string when there is no memory.
pub fn render_memory_section(agent_name: &str, memory: &[MemoryRecord]) -> String {
    if memory.is_empty() {
        return String::new();
    }

    let mut out = format!("\nActions already executed by {agent_name}:\n");
    for (idx, record) in memory.iter().enumerate() {
        let decision = &record.decision;
        out.push_str(&format!("\n{}. Action: {}\n", idx + 1, or_na(&decision.action)));
        out.push_str(&format!("   Args: {}\n", indent(&pretty(&Value::Object(decision.args.clone())))));
        out.push_str(&format!("   Reason: {}\n", or_na(&decision.reason)));
        out.push_str(&format!("   {}\n", outcome_line(record.result.as_ref())));
    }
    out.push_str("\nBased on these actions and their results, decide what to do now.\n");
    out
}

fn outcome_line(result: Option<&Value>) -> String {
    let Some(result) = result else {
        return PENDING_MARKER.to_string();
    };

    match result.get("error") {
        Some(err) if curator_core::decision::truthy(err) => {
            let message = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{ERROR_MARKER} {message}")
        }
        _ => format!("{SUCCESS_MARKER} {}", indent(&pretty(result))),
    }
}

fn is_empty_context(context: &Value) -> bool {
    match context {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn or_na(s: &str) -> &str {
    if s.is_empty() { "N/A" } else { s }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Indent continuation lines so multi-line JSON stays under its label.
fn indent(text: &str) -> String {
    text.replace('\n', "\n   ")
}
