use std::collections::VecDeque;

use async_trait::async_trait;
use ravn_tools::ExitStatus;

use crate::AgentEvent;

/// Line-oriented user interface the agent loop talks to.
#[async_trait]
pub trait Terminal: Send {
    /// Next line of user input without its line terminator; `None` at end of input.
    async fn read_line(&mut self) -> anyhow::Result<Option<String>>;

    async fn print(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Terminal fed from a fixed list of input lines that records everything
/// printed.  Used by tests and non-interactive runs.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    input: VecDeque<String>,
    output: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// All printed text joined with newlines.
    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    async fn print(&mut self, text: &str) -> anyhow::Result<()> {
        self.output.push(text.to_string());
        Ok(())
    }
}

/// Text shown to the user for `event`, if any.
pub fn format_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::ModelReply(text) => Some(format!("Agent: {text}")),
        AgentEvent::BackendError(msg) => Some(msg.clone()),
        AgentEvent::ParseFailed { .. } => None,
        AgentEvent::ToolCallStarted(call) => Some(format!(
            "Running {}: {}",
            call.name,
            serde_json::Value::Object(call.arguments.clone())
        )),
        AgentEvent::ToolCallFinished { name, result } => {
            let label = match result.exit_status {
                ExitStatus::Rejected => format!("{name} rejected"),
                ExitStatus::Denied => format!("{name} denied"),
                _ => format!("{name} output"),
            };
            Some(format!("{label}:\n{}", result.render()))
        }
        AgentEvent::Summary(text) => Some(text.clone()),
        AgentEvent::TurnComplete => None,
    }
}

#[cfg(test)]
mod tests {
    use ravn_tools::{ExecutionResult, ToolCallRequest};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn scripted_terminal_replays_then_ends() {
        let mut t = ScriptedTerminal::new(["one", "two"]);
        assert_eq!(t.read_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(t.read_line().await.unwrap().as_deref(), Some("two"));
        assert!(t.read_line().await.unwrap().is_none());
        t.print("hi").await.unwrap();
        assert_eq!(t.output(), ["hi".to_string()]);
    }

    #[test]
    fn model_reply_is_prefixed() {
        let text = format_event(&AgentEvent::ModelReply("[bash(command=\"ls\")]".into())).unwrap();
        assert_eq!(text, "Agent: [bash(command=\"ls\")]");
    }

    #[test]
    fn tool_start_shows_arguments() {
        let call = ToolCallRequest::new("bash", json!({"command": "ls"}).as_object().cloned().unwrap());
        let text = format_event(&AgentEvent::ToolCallStarted(call)).unwrap();
        assert_eq!(text, r#"Running bash: {"command":"ls"}"#);
    }

    #[test]
    fn rejected_result_is_labelled() {
        let ev = AgentEvent::ToolCallFinished {
            name: "bash".into(),
            result: ExecutionResult::rejected("missing required parameter `command`"),
        };
        let text = format_event(&ev).unwrap();
        assert!(text.starts_with("bash rejected:"));
        assert!(text.ends_with("EXIT CODE: rejected"));
    }

    #[test]
    fn silent_events() {
        assert!(format_event(&AgentEvent::TurnComplete).is_none());
        let ev = AgentEvent::ParseFailed { raw: "x".into(), error: "y".into() };
        assert!(format_event(&ev).is_none());
    }
}
