mod cli;
mod terminal;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use ravn_config::Config;
use ravn_core::{Agent, Terminal};
use ravn_model::ModelProvider;
use ravn_tools::ToolRegistry;
use terminal::StdioTerminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Some(cmd) = &cli.command {
        match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
            Commands::ShowConfig => {
                let config = load_config(&cli)?;
                println!("{}", toml::to_string_pretty(&config).context("serialising configuration")?);
                return Ok(());
            }
            Commands::Tools => {
                let config = load_config(&cli)?;
                let registry = ravn_tools::registry_from_config(&config.tools)?;
                println!("{}", tools_listing(&registry)?);
                return Ok(());
            }
        }
    }

    let config = load_config(&cli)?;
    run_interactive(&cli, config).await
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = ravn_config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

fn tools_listing(registry: &ToolRegistry) -> anyhow::Result<String> {
    let tools: Vec<_> = registry
        .schemas()
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "description": s.description,
                "signature": s.signature(),
                "parameters": s.to_json_schema(),
            })
        })
        .collect();
    let listing = json!({
        "tools": tools,
        "output_constraint": registry.output_constraint(),
    });
    serde_json::to_string_pretty(&listing).context("serialising tool listing")
}

async fn run_interactive(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let tools = Arc::new(ravn_tools::registry_from_config(&config.tools).context("building tool registry")?);
    let model: Arc<dyn ModelProvider> = Arc::from(ravn_model::from_config(&config.model)?);

    if cli.check_backend {
        model
            .health_check()
            .await
            .with_context(|| format!("backend check failed ({} / {})", model.name(), model.model_name()))?;
        debug!("backend reachable");
    }

    let mut agent = Agent::new(model.clone(), tools.clone(), &config.agent);
    let mut terminal = StdioTerminal::new("You: ");
    terminal
        .print(&format!(
            "\n=== ravn agent loop: {} via {} (tools: {}) ===\nType 'exit' to end the conversation.\n",
            model.model_name(),
            model.name(),
            tools.names().join(", ")
        ))
        .await?;

    tokio::select! {
        res = agent.run(&mut terminal) => res,
        _ = tokio::signal::ctrl_c() => {
            println!("\n\nExiting. Goodbye!");
            Ok(())
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
