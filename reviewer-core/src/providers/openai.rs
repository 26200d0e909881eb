// reviewer-core/src/providers/openai.rs
use super::{ChatProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f64 = 0.7;
const EMPTY_REPLY: &str = "No response generated";

pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(http_client: Client, api_key: String, model: String) -> Self {
        Self {
            http_client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        // o3 models reject max_tokens and any non-default temperature.
        if self.model.starts_with("o3") {
            payload["max_completion_tokens"] = json!(MAX_TOKENS);
        } else {
            payload["max_tokens"] = json!(MAX_TOKENS);
            payload["temperature"] = json!(TEMPERATURE);
        }
        payload
    }

    fn parse_response(&self, response_body: &str) -> Result<String, ProviderError> {
        let raw: Value = serde_json::from_str(response_body).map_err(|e| {
            ProviderError::new(self.name(), format!("Failed to parse response: {}", e))
        })?;
        let content = raw
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or(EMPTY_REPLY);
        Ok(content.to_string())
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let endpoint = self.endpoint();
        let payload = self.build_payload(system_prompt, user_prompt);
        debug!(endpoint = %endpoint, model = %self.model, "Sending request to OpenAI API");

        let response = self
            .http_client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::new(self.name(), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::new(self.name(), format!("Failed to read response: {}", e)))?;
        debug!(status = %status, "Received response from OpenAI API");

        if !status.is_success() {
            return Err(ProviderError::new(
                self.name(),
                format!("API error: {} - {}", status, body),
            ));
        }
        self.parse_response(&body)
    }
}
