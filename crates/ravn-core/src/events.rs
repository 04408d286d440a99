// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ravn_tools::{ExecutionResult, ToolCallRequest};

/// Events emitted by the agent during a single turn.
/// Front-ends subscribe to these to drive their output.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Raw text returned by the backend
    ModelReply(String),
    /// The backend call failed; the message was recorded as an assistant turn
    BackendError(String),
    /// The reply held no usable tool call; it was recorded verbatim
    ParseFailed { raw: String, error: String },
    /// A parsed call is about to be validated and run
    ToolCallStarted(ToolCallRequest),
    /// A call finished (or was rejected before running)
    ToolCallFinished { name: String, result: ExecutionResult },
    /// Human-readable outcome of all calls in the turn
    Summary(String),
    /// The agent is back to awaiting input
    TurnComplete,
}
