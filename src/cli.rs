// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use ravn_config::{CallFormat, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ravn",
    about = "A terminal agent loop that turns requests into validated tool calls",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Model name forwarded to the backend
    #[arg(long, short = 'M', env = "RAVN_MODEL")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible server, e.g. http://localhost:8080/v1
    #[arg(long, env = "RAVN_BASE_URL")]
    pub base_url: Option<String>,

    /// Backend provider: "openai" or "mock"
    #[arg(long)]
    pub provider: Option<String>,

    /// How the model is asked to encode tool calls
    #[arg(long, value_enum)]
    pub format: Option<CallFormat>,

    /// Send the tool schema to the backend as an output constraint
    #[arg(long)]
    pub structured: bool,

    /// Enable a built-in tool (bash, get_weather).  May be repeated; replaces
    /// the configured list.
    #[arg(long = "tool", value_name = "NAME")]
    pub tools: Vec<String>,

    /// Shell command timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Probe the backend before starting; exit non-zero if it is unreachable
    #[arg(long)]
    pub check_backend: bool,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the effective configuration and exit
    ShowConfig,
    /// Print the enabled tool schemas and the derived output constraint as JSON
    Tools,
}

impl Cli {
    /// Fold command-line flags over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(m) = &self.model {
            config.model.name = m.clone();
        }
        if let Some(u) = &self.base_url {
            config.model.base_url = Some(u.clone());
        }
        if let Some(p) = &self.provider {
            config.model.provider = p.clone();
        }
        if let Some(f) = self.format {
            config.agent.call_format = f;
        }
        if self.structured {
            config.agent.structured_output = true;
        }
        if !self.tools.is_empty() {
            config.tools.enabled = self.tools.clone();
        }
        if let Some(t) = self.timeout {
            config.tools.timeout_secs = t;
        }
    }
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ravn", &mut std::io::stdout());
}
