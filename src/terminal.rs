use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

use ravn_core::Terminal;

/// Line-based terminal over the process's stdin / stdout.
pub struct StdioTerminal {
    lines: Lines<BufReader<Stdin>>,
    stdout: Stdout,
    prompt: String,
}

impl StdioTerminal {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            stdout: tokio::io::stdout(),
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
impl Terminal for StdioTerminal {
    async fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        self.stdout.write_all(self.prompt.as_bytes()).await?;
        self.stdout.flush().await?;
        self.lines.next_line().await.context("reading from stdin")
    }

    async fn print(&mut self, text: &str) -> anyhow::Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.write_all(b"\n").await?;
        self.stdout.flush().await?;
        Ok(())
    }
}
