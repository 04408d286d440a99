mod types;
mod provider;
mod openai_compat;
mod mock;

pub use types::*;
pub use provider::ModelProvider;
pub use openai_compat::{OpenAICompatProvider, DEFAULT_BASE_URL};
pub use mock::{MockProvider, MockReply, ScriptedMockProvider};

use std::time::Duration;

use anyhow::bail;
use ravn_config::ModelConfig;

/// Construct a boxed [`ModelProvider`] from configuration.
///
/// Provider selection:
/// - `"openai"` → [`OpenAICompatProvider`] (hosted OpenAI, vLLM, llama.cpp, …)
/// - `"mock"` → [`MockProvider`] (echo-back, no network)
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ModelProvider>> {
    match cfg.provider.as_str() {
        "openai" => Ok(Box::new(OpenAICompatProvider::new(
            cfg.name.clone(),
            resolve_api_key(cfg),
            cfg.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            cfg.max_tokens,
            cfg.temperature,
            Duration::from_secs(cfg.timeout_secs.max(1)),
            cfg.driver_options.clone(),
        )?
        .with_tool_role(&cfg.tool_role)?)),
        "mock" => Ok(Box::new(MockProvider)),
        other => bail!("unknown model provider: {other}"),
    }
}

fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    None
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
