// reviewer-core/src/errors.rs
use crate::providers::ProviderError;
use thiserror::Error;

/// Errors a tool call can surface to the caller.
///
/// These are *validation* and *collaborator* failures. A command that ran and
/// exited nonzero is not a `ToolError` (it is a formatted report), and neither
/// is a safety rejection (it is a successful response with remediation text).
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument was absent.
    #[error("Missing required argument '{field}'")]
    MissingField { field: String },

    /// An argument was present but ill-typed or outside its allowed values.
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    /// The requested mood has no playlist in the catalog.
    #[error("Unknown mood '{mood}' (argument 'mood'). Available moods: {}", available.join(", "))]
    UnknownMood { mood: String, available: Vec<String> },

    /// The tool depends on OS automation this platform does not have.
    #[error("{0}")]
    UnsupportedPlatform(String),

    /// The language-model provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration was missing or invalid for this call.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// The memory store rejected the operation.
    #[error("Memory Error: {0}")]
    Memory(String),
}

impl ToolError {
    pub fn missing(field: impl Into<String>) -> Self {
        ToolError::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ToolError::Config(msg.into())
    }
}
