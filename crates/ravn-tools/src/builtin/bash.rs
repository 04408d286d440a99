// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use async_trait::async_trait;
use ravn_config::ToolsConfig;
use tracing::{debug, warn};

use crate::executor::CommandExecutor;
use crate::policy::CommandPolicy;
use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::{ExecutionResult, Tool, ValidatedCall};

/// Built-in tool that runs one shell command through [`CommandExecutor`].
pub struct BashTool {
    schema: ToolSchema,
    executor: CommandExecutor,
    timeout: Duration,
    policy: CommandPolicy,
}

impl BashTool {
    pub const NAME: &'static str = "bash";

    pub fn new(executor: CommandExecutor, timeout: Duration, policy: CommandPolicy) -> Self {
        let schema = ToolSchema::new(
            Self::NAME,
            "Execute a bash command on the local machine and return its stdout, stderr \
             and exit code. Each call runs in a fresh shell; no state carries over. \
             Prefer non-interactive commands.",
        )
        .param(ParamSpec::required(
            "command",
            ParamKind::String,
            "The complete bash command to run.",
        ));
        Self {
            schema,
            executor,
            timeout,
            policy,
        }
    }

    pub fn from_config(cfg: &ToolsConfig) -> Self {
        Self::new(
            CommandExecutor::new(cfg.shell.clone()),
            Duration::from_secs(cfg.timeout_secs),
            CommandPolicy::from_config(cfg),
        )
    }
}

#[async_trait]
impl Tool for BashTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, call: &ValidatedCall) -> ExecutionResult {
        let Some(command) = call.str_arg("command") else {
            return ExecutionResult::rejected("missing required parameter `command` for tool `bash`");
        };
        if let Some(pattern) = self.policy.denied_by(command) {
            warn!(cmd = %command, pattern, "command denied by policy");
            return ExecutionResult::denied(format!("command refused: matches deny pattern `{pattern}`"));
        }
        debug!(cmd = %command, "executing bash tool");
        self.executor.execute(command, self.timeout).await
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
