//! Concierge CLI: answer one travel question and exit

use anyhow::Context;
use clap::Parser;
use concierge::prelude::*;
use concierge::telemetry::init_tracing;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const PREVIEW_CHARS: usize = 500;

#[derive(Parser, Debug)]
#[command(name = "concierge", version, about = "Ask the weather and attractions specialists a travel question")]
struct Cli {
    /// Question to answer; read from stdin when omitted
    prompt: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = OrchestratorConfig::from_env().context("invalid CONCIERGE_* configuration")?;
    init_tracing(config.log_format)?;

    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None => read_prompt()?,
    };
    if prompt.trim().is_empty() {
        eprintln!("No input provided.");
        return Ok(());
    }

    let client: Arc<dyn LlmClient> =
        Arc::new(OpenRouterClient::from_env().context("execution engine is not configured")?);
    tracing::info!(
        client = client.client_type(),
        endpoint = client.endpoint(),
        "execution engine ready"
    );
    let registry = SpecialistRegistry::from_env(client.clone(), &config.specialist_settings())?;
    let orchestrator = Orchestrator::from_config(client, &config, registry)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling request");
            on_interrupt.cancel();
        }
    });

    let result = orchestrator.handle_request_with_cancel(&prompt, &cancel).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn read_prompt() -> anyhow::Result<String> {
    print!("Enter your question or task: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_result(result: &RequestResult) {
    let rule = "=".repeat(60);
    println!("\n{rule}\nFINAL RESULT\n{rule}");
    println!("{}", result.final_answer);

    let agents: Vec<&str> = result.agents_used.iter().map(AgentName::as_str).collect();
    let agents = if agents.is_empty() { "none".to_string() } else { agents.join(", ") };
    println!("\nAgents used: {agents}");

    if result.per_agent_responses.is_empty() {
        return;
    }
    println!("\nIndividual agent responses:");
    for (agent, text) in &result.per_agent_responses {
        println!("\n{} AGENT:\n{}", agent.as_str().to_uppercase(), preview(text));
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
