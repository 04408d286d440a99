// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::{CompletionRequest, Role};

/// Deterministic mock provider for offline runs.  Echoes the last user
/// message back as the assistant response.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl crate::ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        let reply = req
            .turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("[no input]");
        Ok(format!("MOCK: {reply}"))
    }
}

/// One scripted backend reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Simulates a backend failure (connection refused, 5xx, …).
    Error(String),
}

/// A pre-scripted mock provider.  Each call to `complete` pops the next
/// reply from the front of the queue.  This lets tests specify exact model
/// outputs – including malformed ones and backend failures – without network
/// access.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<VecDeque<MockReply>>>,
    /// The last `CompletionRequest` seen by this provider.
    /// Written on each `complete()` call so tests can inspect what was sent.
    pub last_request: Arc<Mutex<Option<CompletionRequest>>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedMockProvider {
    pub fn new(scripts: Vec<MockReply>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            last_request: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Convenience: provider that returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Text(reply.into())])
    }

    /// Convenience: one text reply per call, in order.
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| MockReply::Text(r.into())).collect())
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(req);
        }
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        let next = self
            .scripts
            .lock()
            .map_err(|_| anyhow!("mock script lock poisoned"))?
            .pop_front();
        match next {
            Some(MockReply::Text(t)) => Ok(t),
            Some(MockReply::Error(e)) => Err(anyhow!(e)),
            // Default fallback when all scripts are consumed
            None => Ok("[no more scripts]".into()),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
