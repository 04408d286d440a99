mod error;
mod executor;
mod policy;
mod registry;
mod schema;
mod tool;
mod builtin;

pub use error::{RegistryError, ValidationError};
pub use executor::CommandExecutor;
pub use policy::CommandPolicy;
pub use registry::ToolRegistry;
pub use schema::{ParamKind, ParamSpec, ToolSchema};
pub use tool::{
    head_tail_truncate, Arguments, ExecutionResult, ExitStatus, Tool, ToolCallRequest, ValidatedCall,
};
pub use builtin::{bash::BashTool, weather::WeatherTool};

use anyhow::bail;
use ravn_config::ToolsConfig;

/// Names accepted in `[tools].enabled`.
pub const BUILTIN_TOOLS: &[&str] = &[BashTool::NAME, WeatherTool::NAME];

/// Build the registry for the tools enabled in `cfg`, in the listed order.
///
/// Unknown names, duplicate entries and a zero timeout are startup errors.
pub fn registry_from_config(cfg: &ToolsConfig) -> anyhow::Result<ToolRegistry> {
    if cfg.timeout_secs == 0 {
        bail!("[tools].timeout_secs must be at least 1 second");
    }
    let mut registry = ToolRegistry::new();
    for name in &cfg.enabled {
        match name.as_str() {
            BashTool::NAME => registry.register(BashTool::from_config(cfg))?,
            WeatherTool::NAME => registry.register(WeatherTool::from_config(cfg)?)?,
            other => bail!(
                "unknown tool `{other}` in [tools].enabled (available: {})",
                BUILTIN_TOOLS.join(", ")
            ),
        }
    }
    if registry.is_empty() {
        bail!("no tools enabled");
    }
    tracing::debug!(tools = ?registry.names(), "tool registry ready");
    Ok(registry)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
