// reviewer-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod exec;
pub mod format;
pub mod memory;
pub mod playlists;
pub mod providers;
pub mod safety;
pub mod tools;
pub mod utils;

pub use config::{ProjectConfig, CONFIG_FILENAME};
pub use context::{Platform, ToolContext};
pub use dispatch::{tool_definitions, ToolDefinition, ToolDispatcher, ToolResponse};
pub use errors::ToolError;
pub use exec::{ExecutionOutcome, ProcessRunner, RunOptions, ShellRunner};
pub use providers::{ChatProvider, ProviderError};

pub use async_trait::async_trait;
