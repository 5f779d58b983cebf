//! `config` command — write or show configuration.

use anyhow::Context;
use curator_config::AppConfig;
use std::path::Path;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!("⚠️  Config already exists at {}", path.display());
        println!("   Use --force to overwrite.");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Config written to {}", path.display());
    Ok(())
}

pub fn show(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
    println!("{rendered}");
    Ok(())
}
