// reviewer-core/src/providers/ollama.rs
use super::{ChatProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Clone)]
pub struct OllamaProvider {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(http_client: Client, base_url: &str, model: String) -> Self {
        debug!("Creating new Ollama provider with model: {}", model);
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn build_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            // Always disable streaming; the tools return one reply.
            "stream": false,
        })
    }

    fn parse_response(&self, response_body: &str) -> Result<String, ProviderError> {
        let raw: Value = serde_json::from_str(response_body).map_err(|e| {
            ProviderError::new(self.name(), format!("Failed to parse response: {}", e))
        })?;
        raw["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new(self.name(), "Missing content in Ollama response"))
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let endpoint = self.endpoint();
        debug!("Using Ollama endpoint: {}", endpoint);

        let response = self
            .http_client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&self.build_payload(system_prompt, user_prompt))
            .send()
            .await
            .map_err(|e| ProviderError::new(self.name(), e.to_string()))?;

        let status = response.status();
        debug!("Received response from Ollama API, status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                self.name(),
                format!("Ollama API error: {} {}", status, body).trim_end().to_string(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::new(self.name(), format!("Failed to read response: {}", e)))?;
        self.parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let p = OllamaProvider::new(Client::new(), "http://localhost:11434/", "llama2".to_string());
        assert_eq!(p.endpoint(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_payload_disables_streaming() {
        let p = OllamaProvider::new(Client::new(), "http://localhost:11434", "llama2".to_string());
        let payload = p.build_payload("sys", "user");
        assert_eq!(payload["stream"], json!(false));
        assert_eq!(payload["model"], "llama2");
        assert_eq!(payload["messages"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat")
                    .json_body_partial(r#"{"model": "llama2", "stream": false}"#);
                then.status(200).json_body(json!({
                    "model": "llama2",
                    "created_at": "2024-01-01T00:00:00Z",
                    "message": {"role": "assistant", "content": "Looks good"},
                    "done": true
                }));
            })
            .await;

        let p = OllamaProvider::new(Client::new(), &server.base_url(), "llama2".to_string());
        let reply = p.chat("system", "review this").await;
        mock.assert_async().await;
        assert_eq!(reply.unwrap(), "Looks good");
    }

    #[tokio::test]
    async fn test_chat_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat");
                then.status(500);
            })
            .await;

        let p = OllamaProvider::new(Client::new(), &server.base_url(), "llama2".to_string());
        let err = p.chat("system", "user").await.unwrap_err();
        assert!(err.to_string().starts_with("Ollama API call failed: Ollama API error: 500"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is not an Ollama server.
        let p = OllamaProvider::new(Client::new(), "http://127.0.0.1:9", "llama2".to_string());
        let err = p.chat("system", "user").await.unwrap_err();
        assert_eq!(err.provider, "Ollama");
    }
}
