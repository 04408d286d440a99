// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use regex::Regex;
use ravn_config::ToolsConfig;
use tracing::warn;

/// Refuses shell commands that match configured deny patterns.
#[derive(Debug, Default)]
pub struct CommandPolicy {
    deny_patterns: Vec<(String, Regex)>,
}

impl CommandPolicy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let deny_patterns = patterns
            .iter()
            .filter_map(|p| {
                let p = p.as_ref();
                match glob_to_regex(p) {
                    Some(re) => Some((p.to_string(), re)),
                    None => {
                        warn!(pattern = %p, "ignoring invalid deny pattern");
                        None
                    }
                }
            })
            .collect();
        Self { deny_patterns }
    }

    pub fn from_config(cfg: &ToolsConfig) -> Self {
        Self::new(&cfg.deny_patterns)
    }

    /// The first deny pattern matching `command`, if any.
    pub fn denied_by(&self, command: &str) -> Option<&str> {
        let command = command.trim();
        self.deny_patterns
            .iter()
            .find(|(_, re)| re.is_match(command))
            .map(|(p, _)| p.as_str())
    }
}

/// Convert a simple shell glob pattern to a [`Regex`].
/// Only `*` (match anything) and `?` (match one char) are supported.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
