// reviewer-core/src/providers/mod.rs

//! Language-model backends used by the prompt tools.

use crate::config::{ProjectConfig, ProviderKind};
use crate::errors::ToolError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// A failed round trip to a provider, named after the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider} API call failed: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Single-turn chat: one system prompt, one user prompt, one text reply.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;
}

/// Builds the provider selected by `config.ai_provider`.
///
/// OpenAI needs an API key; its absence is a configuration error.
pub fn create_provider(
    config: &ProjectConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn ChatProvider>, ToolError> {
    let client = Client::new();
    match config.ai_provider {
        ProviderKind::OpenAi => {
            let api_key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ToolError::config("OpenAI provider requires an API key (set OPENAI_API_KEY)"))?;
            debug!(model = %config.openai_model, "Creating OpenAI provider");
            Ok(Arc::new(OpenAiProvider::new(
                client,
                api_key,
                config.openai_model.clone(),
            )))
        }
        ProviderKind::Ollama => {
            debug!(model = %config.ollama_model, base_url = %config.ollama_base_url, "Creating Ollama provider");
            Ok(Arc::new(OllamaProvider::new(
                client,
                &config.ollama_base_url,
                config.ollama_model.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_for(kind: ProviderKind) -> ProjectConfig {
        let mut config = ProjectConfig::defaults(&no_env);
        config.ai_provider = kind;
        config
    }

    #[test]
    fn test_openai_requires_key() {
        let config = config_for(ProviderKind::OpenAi);
        let err = create_provider(&config, None).err().unwrap();
        assert!(matches!(err, ToolError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = create_provider(&config, Some("  ".to_string())).err().unwrap();
        assert!(matches!(err, ToolError::Config(_)));
    }

    #[test]
    fn test_provider_selection() {
        let openai = create_provider(&config_for(ProviderKind::OpenAi), Some("sk-test".to_string())).unwrap();
        assert_eq!(openai.name(), "OpenAI");

        let ollama = create_provider(&config_for(ProviderKind::Ollama), None).unwrap();
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("OpenAI", "429 Too Many Requests");
        assert_eq!(err.to_string(), "OpenAI API call failed: 429 Too Many Requests");
    }
}
