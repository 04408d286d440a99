use serde::{Deserialize, Serialize};

// ─── Turn types ──────────────────────────────────────────────────────────────

/// A single role-tagged message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: text.into() }
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self { role: Role::Tool, content: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// Request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub turns: Vec<Turn>,
    /// JSON Schema the backend should coerce generation into.  Providers that
    /// cannot enforce it may ignore it; the parser validates regardless.
    pub output_schema: Option<serde_json::Value>,
    /// Per-request cap on generated tokens.  `None` uses the provider default.
    pub max_tokens: Option<u32>,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
