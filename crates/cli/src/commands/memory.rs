//! `memory` command — inspect or clear a decision memory scope.

use curator_config::AppConfig;
use curator_core::memory::MemoryRecord;

use super::open_memory;

pub async fn list(config: &AppConfig, scope: &str) -> anyhow::Result<()> {
    let memory = open_memory(config).await?;
    let records = memory.list(scope).await?;

    if records.is_empty() {
        println!("📭 No records in scope '{scope}'");
        return Ok(());
    }

    println!("🧠 {} record(s) in scope '{scope}' ({})", records.len(), memory.name());
    for (i, record) in records.iter().enumerate() {
        println!("{:>4}. {}", i + 1, describe(record));
    }
    Ok(())
}

pub async fn clear(config: &AppConfig, scope: &str) -> anyhow::Result<()> {
    let memory = open_memory(config).await?;
    let removed = memory.clear(scope).await?;
    println!("🗑️  Cleared {removed} record(s) from scope '{scope}'");
    Ok(())
}

fn describe(record: &MemoryRecord) -> String {
    let marker = match &record.result {
        None => "⏳",
        Some(result) if result.get("error").is_some() => "❌",
        Some(_) => "✅",
    };
    let mut line = format!(
        "{marker} [{}] {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.decision.action
    );
    if !record.decision.reason.is_empty() {
        line.push_str(&format!(" — {}", record.decision.reason));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_core::action::Args;
    use curator_core::decision::Decision;
    use serde_json::json;

    #[test]
    fn markers_follow_result() {
        let decision = Decision::new("get_post_details", Args::new(), "inspect");
        let mut record = MemoryRecord::new("post_agent", decision);
        assert!(describe(&record).starts_with("⏳"));

        record.result = Some(json!({"error": "method not found"}));
        assert!(describe(&record).starts_with("❌"));

        record.result = Some(json!({"title": "Intro"}));
        let line = describe(&record);
        assert!(line.starts_with("✅"));
        assert!(line.contains("get_post_details — inspect"));
    }
}
