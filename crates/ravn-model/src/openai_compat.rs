// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Driver for OpenAI-compatible `/chat/completions` servers.
//!
//! Hosted OpenAI, vLLM, llama.cpp and LM Studio all speak this wire format.
//! Requests are non-streaming: one POST, one JSON body back.  When the
//! request carries an output schema it is forwarded as `guided_json`, the
//! field vLLM uses for grammar-constrained decoding.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{CompletionRequest, Role, Turn};

/// Default endpoint: a local vLLM / llama.cpp server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

const DEFAULT_TOOL_ROLE: &str = "user";

/// Prefix that marks a tool result sent under the `user` role.
const TOOL_RESULT_PREFIX: &str = "Tool result:\n";

/// OpenAI-compatible chat completion provider.
pub struct OpenAICompatProvider {
    /// Model id forwarded to the API.
    model: String,
    /// API key (pre-resolved from config or env).  `None` → no auth header,
    /// which is what local servers expect.
    api_key: Option<String>,
    /// Full chat completions URL, e.g. `http://localhost:8080/v1/chat/completions`.
    chat_url: String,
    models_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
    client: reqwest::Client,
    /// Extra key-value pairs merged verbatim into the request body.
    extra_body: Value,
    /// Wire role for `Role::Tool` turns.
    tool_role: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAICompatProvider {
    /// Construct a provider.
    ///
    /// `base_url` ends **before** `/chat/completions`, e.g.
    /// `http://localhost:8080/v1`.  `timeout` bounds the whole HTTP round
    /// trip including reading the body.
    pub fn new(
        model: String,
        api_key: Option<String>,
        base_url: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout: Duration,
        extra_body: Value,
    ) -> anyhow::Result<Self> {
        let base = base_url.trim_end_matches('/');
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ravn/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            model,
            api_key,
            chat_url: format!("{base}/chat/completions"),
            models_url: format!("{base}/models"),
            max_tokens: max_tokens.unwrap_or(4096),
            temperature,
            client,
            extra_body,
            tool_role: DEFAULT_TOOL_ROLE.into(),
        })
    }

    /// Send tool results under `role` instead of `user`.
    ///
    /// OpenAI's own `tool` role is refused: it must answer an assistant
    /// `tool_calls` entry by id, and calls here travel as plain text.
    pub fn with_tool_role(mut self, role: &str) -> anyhow::Result<Self> {
        match role {
            "" => bail!("tool_role must not be empty"),
            "tool" => bail!("tool_role `tool` requires native tool calling; use `user` or `ipython`"),
            _ => self.tool_role = role.to_string(),
        }
        Ok(self)
    }

    /// Build the JSON request body for `req`.
    pub(crate) fn request_body(&self, req: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": build_openai_messages(&req.turns, &self.tool_role),
            "stream": false,
            "max_tokens": req.max_tokens.unwrap_or(self.max_tokens),
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(schema) = &req.output_schema {
            body["guided_json"] = schema.clone();
        }

        // Keys from the user-supplied driver options override anything set
        // above, so provider quirks can be handled from config alone.
        if let Some(map) = self.extra_body.as_object() {
            for (k, v) in map {
                body[k] = v.clone();
            }
        }
        body
    }
}

#[async_trait]
impl crate::ModelProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        let body = self.request_body(&req);

        debug!(
            model = %self.model,
            message_count = req.turns.len(),
            constrained = req.output_schema.is_some(),
            "sending completion request"
        );
        tracing::trace!(request_body = ?body, "full completion request");

        let mut http_req = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = &self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let resp = http_req
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.chat_url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("backend error {status}: {text}");
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("malformed completion response")?;
        extract_text(parsed)
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        let mut req = self.client.get(&self.models_url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("backend unreachable at {}", self.models_url))?;
        if !resp.status().is_success() {
            bail!("backend health check failed: {}", resp.status());
        }
        Ok(())
    }
}

fn extract_text(resp: ChatResponse) -> anyhow::Result<String> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .context("malformed completion response: no choices")?;
    Ok(choice.message.content.unwrap_or_default())
}

/// Convert turns to the OpenAI `messages` array.
///
/// Tool turns go out under `tool_role`; as `user` they get a prefix so the
/// model can tell them from typed input.
pub(crate) fn build_openai_messages(turns: &[Turn], tool_role: &str) -> Vec<Value> {
    turns
        .iter()
        .map(|t| match t.role {
            Role::Tool if tool_role == "user" => {
                json!({ "role": tool_role, "content": format!("{TOOL_RESULT_PREFIX}{}", t.content) })
            }
            Role::Tool => json!({ "role": tool_role, "content": t.content }),
            _ => json!({ "role": t.role.to_string(), "content": t.content }),
        })
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
