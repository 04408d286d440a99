use thiserror::Error;

/// Why a parsed tool call was refused before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown tool `{name}`")]
    UnknownTool { name: String },

    #[error("unexpected parameter `{parameter}` for tool `{tool}`")]
    UnexpectedParameter { tool: String, parameter: String },

    #[error("missing required parameter `{parameter}` for tool `{tool}`")]
    MissingParameter { tool: String, parameter: String },

    #[error("parameter `{parameter}` of tool `{tool}` expects {expected}, got {found}")]
    TypeMismatch {
        tool: String,
        parameter: String,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
}
