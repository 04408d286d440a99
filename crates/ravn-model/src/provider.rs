use async_trait::async_trait;

use crate::CompletionRequest;

/// An inference backend: takes the full history and returns one text reply.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send a completion request and wait for the final text.
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String>;

    /// Cheap reachability probe used before entering the interactive loop.
    ///
    /// The default implementation assumes the backend is available.
    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
