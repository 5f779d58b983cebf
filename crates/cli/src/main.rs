//! Curator CLI — the main entry point.
//!
//! Commands:
//! - `run`       — Run the main agent over the configured sites
//! - `post`      — Run the post agent on one blog post
//! - `tutorial`  — Run the tutorial agent on one tutorial
//! - `memory`    — Inspect or clear a decision memory scope
//! - `config`    — Write or show configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use curator_capabilities::agents::DEFAULT_TASK;
use curator_config::AppConfig;

#[derive(Parser)]
#[command(
    name = "curator",
    about = "Curator — LLM-driven content maintenance agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.curator/config.toml)
    #[arg(short, long, global = true, env = "CURATOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the main agent until it stops
    Run {
        /// Clear the main scope before starting
        #[arg(long)]
        clear_memory: bool,
    },

    /// Run the post agent on a single blog post
    Post {
        slug: String,

        /// Task label handed to the agent
        #[arg(short, long, default_value = DEFAULT_TASK)]
        task: String,

        #[arg(long)]
        clear_memory: bool,
    },

    /// Run the tutorial agent on a single tutorial
    Tutorial {
        slug: String,

        #[arg(short, long, default_value = DEFAULT_TASK)]
        task: String,

        #[arg(long)]
        clear_memory: bool,
    },

    /// Inspect decision memory
    Memory {
        #[command(subcommand)]
        action: MemoryCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// List the records of a scope, oldest first
    List { scope: String },

    /// Delete every record of a scope
    Clear { scope: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(commands::default_config_path);

    // `config init` must work even when the existing file is broken.
    let config = match &cli.command {
        Commands::Config {
            action: ConfigCommand::Init { .. },
        } => AppConfig::default(),
        _ => commands::load_config(&config_path)?,
    };
    init_tracing(cli.verbose, &config.logging.format);

    match cli.command {
        Commands::Run { clear_memory } => commands::run::main_agent(&config, clear_memory).await?,
        Commands::Post { slug, task, clear_memory } => {
            commands::run::post_agent(&config, &slug, &task, clear_memory).await?
        }
        Commands::Tutorial { slug, task, clear_memory } => {
            commands::run::tutorial_agent(&config, &slug, &task, clear_memory).await?
        }
        Commands::Memory { action } => match action {
            MemoryCommand::List { scope } => commands::memory::list(&config, &scope).await?,
            MemoryCommand::Clear { scope } => commands::memory::clear(&config, &scope).await?,
        },
        Commands::Config { action } => match action {
            ConfigCommand::Init { force } => commands::config_cmd::init(&config_path, force)?,
            ConfigCommand::Show => commands::config_cmd::show(&config)?,
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool, format: &str) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delegate_commands() {
        let cli = Cli::try_parse_from(["curator", "post", "intro", "--clear-memory"]).unwrap();
        match cli.command {
            Commands::Post { slug, task, clear_memory } => {
                assert_eq!(slug, "intro");
                assert_eq!(task, DEFAULT_TASK);
                assert!(clear_memory);
            }
            _ => panic!("expected post"),
        }

        let cli = Cli::try_parse_from(["curator", "tutorial", "setup", "--task", "review"]).unwrap();
        assert!(matches!(cli.command, Commands::Tutorial { task, .. } if task == "review"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["curator", "memory", "list", "main", "-v", "--config", "/tmp/c.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Memory { action: MemoryCommand::List { scope } } if scope == "main"));
    }

    #[test]
    fn slug_is_required() {
        assert!(Cli::try_parse_from(["curator", "post"]).is_err());
    }
}
