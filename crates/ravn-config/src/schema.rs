// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model_name() -> String {
    "Llama-3.2-3B-Instruct-Q8_0.gguf".into()
}
fn default_max_tokens() -> Option<u32> {
    Some(5000)
}
fn default_request_timeout_secs() -> u64 {
    120
}

fn default_tool_role() -> String {
    "user".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier: "openai" (any OpenAI-compatible server) | "mock"
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model name forwarded to the provider API
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Environment variable that holds the API key (read at runtime)
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL ending before `/chat/completions`.  Defaults to a local
    /// vLLM / llama.cpp server.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0); omitted from the request when unset
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Wall-clock limit for one inference round trip
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    /// Free-form provider-specific options merged verbatim into the request
    /// body, e.g. `{ top_p = 0.9 }` or llama.cpp's `parse_tool_calls`.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub driver_options: serde_json::Value,
    /// Role under which tool results are sent.  `user` works everywhere;
    /// `ipython` suits Llama 3 chat templates.  The native `tool` role needs
    /// a `tool_call_id` the text protocol never has, so it is not accepted.
    #[serde(default = "default_tool_role")]
    pub tool_role: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model_name(),
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_request_timeout_secs(),
            driver_options: serde_json::Value::Null,
            tool_role: default_tool_role(),
        }
    }
}

/// How the model is asked to encode its tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CallFormat {
    /// `[name(param=value, ...), ...]`
    #[default]
    Bracketed,
    /// `{"function": "name", "param": value, ...}`
    Json,
}

impl std::fmt::Display for CallFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallFormat::Bracketed => write!(f, "bracketed"),
            CallFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Encoding the system prompt asks for and the parser expects first
    #[serde(default)]
    pub call_format: CallFormat,
    /// Send the registry-derived JSON schema to the backend as an
    /// output-shape constraint.  Only meaningful with `call_format = "json"`.
    #[serde(default)]
    pub structured_output: bool,
    /// System prompt override; leave None to derive it from the tool registry
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Tool used for JSON objects that carry no `function`/`name` field.
    /// When unset and exactly one tool is enabled, that tool is used.
    #[serde(default)]
    pub default_tool: Option<String>,
}

fn default_enabled_tools() -> Vec<String> {
    vec!["bash".into()]
}
fn default_tool_timeout_secs() -> u64 {
    10
}
fn default_shell() -> String {
    "bash".into()
}
fn default_deny_patterns() -> Vec<String> {
    vec!["rm -rf /*".into(), "dd if=*".into()]
}
fn default_weather_base_url() -> String {
    "https://wttr.in".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Built-in tools to register, by name ("bash", "get_weather")
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,
    /// Timeout in seconds for a single shell command
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
    /// Shell binary invoked as `<shell> -c <command>`
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Refuse shell commands matching these glob patterns
    #[serde(default = "default_deny_patterns")]
    pub deny_patterns: Vec<String>,
    /// Base URL of the wttr.in-compatible weather service
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tools(),
            timeout_secs: default_tool_timeout_secs(),
            shell: default_shell(),
            deny_patterns: default_deny_patterns(),
            weather_base_url: default_weather_base_url(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
