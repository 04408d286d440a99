use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::schema::ToolSchema;

/// Hard byte ceiling for each of stdout / stderr when rendered into a turn.
/// 20 KB ≈ 5,000 tokens.
const OUTPUT_LIMIT_BYTES: usize = 20_000;

/// Number of lines to keep from the head of oversized output.
const HEAD_LINES: usize = 100;

/// Number of lines to keep from the tail of oversized output.
const TAIL_LINES: usize = 100;

/// Named arguments of a tool call.
pub type Arguments = Map<String, Value>;

/// A tool invocation as extracted from model output, not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Arguments,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// A call that passed validation: arguments coerced to their declared types
/// and defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCall {
    pub name: String,
    pub arguments: Arguments,
}

impl ValidatedCall {
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Outcome classification of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Process exit code; negated signal number when killed by a signal.
    Code(i32),
    Timeout,
    LaunchError,
    /// Refused by the command policy before anything was spawned.
    Denied,
    /// Failed validation; never executed.
    Rejected,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(c) => write!(f, "{c}"),
            ExitStatus::Timeout => write!(f, "timeout"),
            ExitStatus::LaunchError => write!(f, "launch_error"),
            ExitStatus::Denied => write!(f, "denied"),
            ExitStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Captured result of running a tool.  Always produced, even on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: ExitStatus,
}

impl ExecutionResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_status: ExitStatus) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status,
        }
    }

    pub fn launch_error(msg: impl Into<String>) -> Self {
        Self::new("", msg, ExitStatus::LaunchError)
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self::new("", msg, ExitStatus::Denied)
    }

    pub fn rejected(err: impl fmt::Display) -> Self {
        Self::new("", err.to_string(), ExitStatus::Rejected)
    }

    /// Text placed in the `tool` turn.  Oversized streams keep their head
    /// and tail around an omission marker.
    pub fn render(&self) -> String {
        format!(
            "STDOUT:\n{}\nSTDERR:\n{}\nEXIT CODE: {}",
            head_tail_truncate(&self.stdout),
            head_tail_truncate(&self.stderr),
            self.exit_status
        )
    }
}

/// Trait that every built-in tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> &ToolSchema;

    fn name(&self) -> &str {
        &self.schema().name
    }

    /// Run an already-validated call.  Failures are reported through the
    /// returned [`ExecutionResult`], never as an error.
    async fn execute(&self, call: &ValidatedCall) -> ExecutionResult;
}

/// Truncate `s` to fit within `OUTPUT_LIMIT_BYTES`.
///
/// When truncation is needed the first `HEAD_LINES` and last `TAIL_LINES` are
/// kept verbatim, with an omission marker in the middle showing how many lines
/// and bytes were dropped.
pub fn head_tail_truncate(s: &str) -> String {
    if s.len() <= OUTPUT_LIMIT_BYTES {
        return s.to_string();
    }

    let lines: Vec<&str> = s.lines().collect();
    let total = lines.len();

    if total <= HEAD_LINES + TAIL_LINES {
        // Few but very long lines: fall back to a byte window at each end.
        let head_end = floor_char_boundary(s, OUTPUT_LIMIT_BYTES / 2);
        let tail_start = ceil_char_boundary(s, s.len() - OUTPUT_LIMIT_BYTES / 2);
        let omitted_bytes = tail_start - head_end;
        return format!(
            "{}\n...[{} bytes omitted]...\n{}",
            &s[..head_end],
            omitted_bytes,
            &s[tail_start..]
        );
    }

    let mut head = lines[..HEAD_LINES].join("\n");
    let mut tail = lines[total - TAIL_LINES..].join("\n");
    // Long lines can still blow the budget; clip each end to half of it.
    if head.len() > OUTPUT_LIMIT_BYTES / 2 {
        head.truncate(floor_char_boundary(&head, OUTPUT_LIMIT_BYTES / 2));
    }
    if tail.len() > OUTPUT_LIMIT_BYTES / 2 {
        tail = tail[ceil_char_boundary(&tail, tail.len() - OUTPUT_LIMIT_BYTES / 2)..].to_string();
    }
    let omitted_lines = total - HEAD_LINES - TAIL_LINES;
    let omitted_bytes = s.len().saturating_sub(head.len() + tail.len());

    format!(
        "{}\n...[{} lines / ~{} bytes omitted]...\n{}",
        head, omitted_lines, omitted_bytes, tail
    )
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_uses_three_labelled_sections() {
        let r = ExecutionResult::new("hello world\n", "", ExitStatus::Code(0));
        assert_eq!(r.render(), "STDOUT:\nhello world\n\nSTDERR:\n\nEXIT CODE: 0");
    }

    #[test]
    fn sentinel_statuses_render_by_name() {
        assert!(ExecutionResult::new("", "", ExitStatus::Timeout)
            .render()
            .ends_with("EXIT CODE: timeout"));
        assert!(ExecutionResult::launch_error("no shell")
            .render()
            .ends_with("EXIT CODE: launch_error"));
        assert_eq!(ExitStatus::Denied.to_string(), "denied");
        assert_eq!(ExitStatus::Code(-9).to_string(), "-9");
    }

    #[test]
    fn rejected_carries_error_in_stderr() {
        let r = ExecutionResult::rejected("missing required parameter `command`");
        assert_eq!(r.exit_status, ExitStatus::Rejected);
        assert!(r.stdout.is_empty());
        assert!(r.stderr.contains("command"));
    }

    #[test]
    fn only_zero_code_is_success() {
        assert!(ExitStatus::Code(0).success());
        assert!(!ExitStatus::Code(1).success());
        assert!(!ExitStatus::Timeout.success());
    }

    // ── Head+tail truncation ──────────────────────────────────────────────────

    #[test]
    fn short_output_passes_through_unchanged() {
        let s = "hello\nworld\n";
        assert_eq!(head_tail_truncate(s), s);
    }

    #[test]
    fn head_and_tail_are_both_preserved() {
        let mut lines: Vec<String> = vec!["BUILD START".to_string()];
        for i in 0..800 {
            lines.push(format!("middle line {i} padding padding padding padding padding"));
        }
        lines.push("BUILD ERROR".to_string());
        let content = lines.join("\n");

        let result = head_tail_truncate(&content);
        assert!(result.contains("BUILD START"));
        assert!(result.contains("BUILD ERROR"));
        assert!(result.contains("lines /"));
        assert!(result.len() < content.len());
    }

    #[test]
    fn many_long_lines_stay_within_byte_limit() {
        let line = "x".repeat(10_000);
        let content = vec![line.as_str(); 300].join("\n");
        let result = head_tail_truncate(&content);
        assert!(result.len() <= OUTPUT_LIMIT_BYTES + 100, "rendered {} bytes", result.len());
        assert!(result.contains("lines /"));
    }

    #[test]
    fn many_long_multibyte_lines_stay_on_char_boundaries() {
        let line = "é".repeat(3_001);
        let content = vec![line.as_str(); 250].join("\n");
        let result = head_tail_truncate(&content);
        assert!(result.len() <= OUTPUT_LIMIT_BYTES + 100);
        assert!(result.starts_with('é') && result.ends_with('é'));
    }

    #[test]
    fn long_multibyte_lines_do_not_split_characters() {
        let content = "é".repeat(OUTPUT_LIMIT_BYTES);
        let result = head_tail_truncate(&content);
        assert!(result.contains("bytes omitted"));
        assert!(result.len() < content.len());
    }
}
