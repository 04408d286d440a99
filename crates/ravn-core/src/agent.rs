// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use anyhow::bail;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ravn_config::AgentConfig;
use ravn_model::{CompletionRequest, ModelProvider, Turn};
use ravn_tools::{ExecutionResult, ExitStatus, ToolRegistry};

use crate::{
    conversation::ConversationState,
    events::AgentEvent,
    io::{format_event, Terminal},
    parser::ToolCallParser,
    prompts::{system_prompt, PROMPT_VERSION},
};

/// Words that end the session when typed on their own (case-insensitive).
pub const EXIT_TOKENS: &[&str] = &["exit", "quit"];

/// Phase of the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingInput,
    Generating,
    ParsingCall,
    Dispatching,
    Closed,
}

pub fn is_exit_token(line: &str) -> bool {
    let line = line.trim();
    EXIT_TOKENS.iter().any(|t| line.eq_ignore_ascii_case(t))
}

/// The core agent.  Owns the conversation and drives the
/// model → parse → dispatch cycle one user line at a time.
pub struct Agent {
    conversation: ConversationState,
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    parser: ToolCallParser,
    /// Sent with every request when structured output is enabled.
    output_constraint: Option<Value>,
    state: AgentState,
}

impl Agent {
    /// Construct an agent.
    ///
    /// The system prompt is fixed here: the configured override verbatim, or
    /// one generated from `tools`.  With a single registered tool and no
    /// explicit `default_tool`, name-less JSON replies map to that tool.
    pub fn new(model: Arc<dyn ModelProvider>, tools: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        let default_tool = config.default_tool.clone().or_else(|| match tools.names().as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        });
        let prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| system_prompt(&tools, config.call_format, default_tool.is_some()));
        let output_constraint = if config.structured_output {
            tools.output_constraint()
        } else {
            None
        };
        let conversation = ConversationState::new(prompt);
        info!(
            session = %conversation.id(),
            model = %model.model_name(),
            tools = ?tools.names(),
            call_format = %config.call_format,
            structured = output_constraint.is_some(),
            prompt_version = PROMPT_VERSION,
            "agent ready"
        );
        Self {
            conversation,
            model,
            tools,
            parser: ToolCallParser::new(default_tool),
            output_constraint,
            state: AgentState::AwaitingInput,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn output_constraint(&self) -> Option<&Value> {
        self.output_constraint.as_ref()
    }

    /// Run one full turn for `user_input`, publishing progress on `tx`.
    ///
    /// Backend, parse and validation failures are recorded in the
    /// conversation and reported as events; they do not end the turn with
    /// an error.  The caller drops the receiver when it is no longer
    /// interested.
    pub async fn submit(&mut self, user_input: &str, tx: mpsc::Sender<AgentEvent>) -> anyhow::Result<()> {
        if self.state == AgentState::Closed {
            bail!("agent session is closed");
        }

        self.conversation.append(Turn::user(user_input));
        self.state = AgentState::Generating;

        let request = CompletionRequest {
            turns: self.conversation.snapshot(),
            output_schema: self.output_constraint.clone(),
            max_tokens: None,
        };
        debug!(session = %self.conversation.id(), turns = request.turns.len(), "requesting completion");

        let reply = match self.model.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(session = %self.conversation.id(), error = %e, "backend call failed");
                let msg = format!("Backend error: {e:#}");
                self.conversation.append(Turn::assistant(msg.clone()));
                let _ = tx.send(AgentEvent::BackendError(msg)).await;
                return self.finish_turn(&tx).await;
            }
        };
        let _ = tx.send(AgentEvent::ModelReply(reply.clone())).await;

        self.state = AgentState::ParsingCall;
        let calls = match self.parser.parse(&reply) {
            Ok(calls) => calls,
            Err(e) => {
                debug!(session = %self.conversation.id(), error = %e, "no tool call in reply");
                self.conversation.append(Turn::assistant(reply.clone()));
                let _ = tx
                    .send(AgentEvent::ParseFailed { raw: reply, error: e.to_string() })
                    .await;
                return self.finish_turn(&tx).await;
            }
        };
        self.conversation.append(Turn::assistant(reply));

        self.state = AgentState::Dispatching;
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            let _ = tx.send(AgentEvent::ToolCallStarted(call.clone())).await;
            let result = match self.tools.validate(&call.name, &call.arguments) {
                Ok(validated) => self.tools.dispatch(&validated).await,
                Err(e) => {
                    warn!(session = %self.conversation.id(), tool = %call.name, error = %e, "tool call rejected");
                    ExecutionResult::rejected(e)
                }
            };
            debug!(tool = %call.name, status = %result.exit_status, "tool call finished");
            self.conversation.append(Turn::tool(result.render()));
            outcomes.push((call.name.clone(), result.exit_status));
            let _ = tx
                .send(AgentEvent::ToolCallFinished { name: call.name, result })
                .await;
        }

        let summary = summarize(&outcomes);
        self.conversation.append(Turn::assistant(summary.clone()));
        let _ = tx.send(AgentEvent::Summary(summary)).await;
        self.finish_turn(&tx).await
    }

    async fn finish_turn(&mut self, tx: &mpsc::Sender<AgentEvent>) -> anyhow::Result<()> {
        self.state = AgentState::AwaitingInput;
        let _ = tx.send(AgentEvent::TurnComplete).await;
        Ok(())
    }

    /// Read lines from `terminal` until an exit token or end of input.
    ///
    /// Events of each turn are rendered while the turn runs.
    pub async fn run<T: Terminal + ?Sized>(&mut self, terminal: &mut T) -> anyhow::Result<()> {
        while self.state != AgentState::Closed {
            let Some(line) = terminal.read_line().await? else {
                debug!(session = %self.conversation.id(), "end of input");
                self.state = AgentState::Closed;
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if is_exit_token(input) {
                terminal.print("Exiting agent loop. Goodbye!").await?;
                self.state = AgentState::Closed;
                break;
            }

            let (tx, mut rx) = mpsc::channel(64);
            let render = async {
                while let Some(event) = rx.recv().await {
                    if let Some(text) = format_event(&event) {
                        terminal.print(&text).await?;
                    }
                }
                anyhow::Ok(())
            };
            let (turn, rendered) = tokio::join!(self.submit(input, tx), render);
            turn?;
            rendered?;
        }
        Ok(())
    }
}

fn summarize(outcomes: &[(String, ExitStatus)]) -> String {
    let parts: Vec<String> = outcomes
        .iter()
        .map(|(name, status)| match status {
            ExitStatus::Code(c) => format!("{name} exited with code {c}"),
            other => format!("{name}: {other}"),
        })
        .collect();
    let noun = if outcomes.len() == 1 { "call" } else { "calls" };
    format!("Ran {} tool {noun}: {}.", outcomes.len(), parts.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_tokens_ignore_case_and_whitespace() {
        assert!(is_exit_token("exit"));
        assert!(is_exit_token("  QUIT \n"));
        assert!(is_exit_token("Exit"));
        assert!(!is_exit_token("exit now"));
        assert!(!is_exit_token("e x i t"));
    }

    #[test]
    fn summary_lists_each_call() {
        let s = summarize(&[("bash".into(), ExitStatus::Code(0))]);
        assert_eq!(s, "Ran 1 tool call: bash exited with code 0.");
        let s = summarize(&[
            ("bash".into(), ExitStatus::Timeout),
            ("get_weather".into(), ExitStatus::Rejected),
        ]);
        assert_eq!(s, "Ran 2 tool calls: bash: timeout; get_weather: rejected.");
    }
}
