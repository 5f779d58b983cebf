//! `run`, `post` and `tutorial` commands.

use curator_agent::{DispatchLoop, LoopOutcome, LoopPhase};
use curator_capabilities::agents::delegate_context;
use curator_config::AppConfig;

use super::build_agents;

pub async fn main_agent(config: &AppConfig, clear_memory: bool) -> anyhow::Result<()> {
    let agents = build_agents(config).await?;
    let main = agents.main_loop()?.with_clear_memory(clear_memory);

    println!("🧭 Curator main agent");
    println!("   Sites: {:?}", config.content.site_ids);
    println!("   Oracle: {} ({})", config.oracle.model, config.oracle.api_url);
    println!();

    drive(main).await
}

pub async fn post_agent(config: &AppConfig, slug: &str, task: &str, clear_memory: bool) -> anyhow::Result<()> {
    let agents = build_agents(config).await?;
    let post = agents.post_loop(delegate_context(slug, task)).with_clear_memory(clear_memory);

    println!("📝 Post agent on '{slug}' (task: {task})");
    println!();

    drive(post).await
}

pub async fn tutorial_agent(config: &AppConfig, slug: &str, task: &str, clear_memory: bool) -> anyhow::Result<()> {
    let agents = build_agents(config).await?;
    let tutorial = agents.tutorial_loop(delegate_context(slug, task)).with_clear_memory(clear_memory);

    println!("📚 Tutorial agent on '{slug}' (task: {task})");
    println!();

    drive(tutorial).await
}

async fn drive(dispatch: DispatchLoop) -> anyhow::Result<()> {
    let outcome = dispatch.run().await?;
    report(&outcome);

    match outcome.failure {
        Some(failure) if outcome.phase == LoopPhase::Failed => {
            anyhow::bail!("{} loop failed: {}", outcome.scope, failure.error)
        }
        _ => Ok(()),
    }
}

fn report(outcome: &LoopOutcome) {
    match outcome.phase {
        LoopPhase::Stopped => {
            println!("✅ {} stopped after {} action(s)", outcome.scope, outcome.iterations);
            if !outcome.state.is_null() {
                println!("   Last result: {}", outcome.state);
            }
        }
        _ => {
            println!("❌ {} failed after {} action(s)", outcome.scope, outcome.iterations);
            if let Some(failure) = &outcome.failure {
                println!("   Error: {}", failure.error);
                match &failure.raw_response {
                    Some(raw) => println!("   Raw oracle response:\n{raw}"),
                    None => println!("   No raw oracle response available"),
                }
            }
        }
    }
}
