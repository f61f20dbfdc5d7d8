use serde_json::{json, Value};
use std::collections::HashMap;

use super::{ChatBackend, ChatError, ChatMessage};

/// Chat-completion client holding the server-side API key.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ChatError> {
        let api_key = settings
            .get("openai_api_key")
            .cloned()
            .unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(ChatError::NotConfigured("OpenAI API key".into()));
        }

        let model = settings
            .get("openai_model")
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "gpt-3.5-turbo".to_string());

        let base_url = settings
            .get("openai_base_url")
            .cloned()
            .unwrap_or_default();
        let base_url = if base_url.is_empty() {
            "https://api.openai.com/v1".to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };

        Ok(OpenAiClient {
            api_key: api_key.trim().to_string(),
            model,
            base_url,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ChatBackend for OpenAiClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ChatError::Network(format!("HTTP client error: {}", e)))?;

        let resp = client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| ChatError::Network(format!("OpenAI request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            log::warn!("[chat] OpenAI returned {}", status);
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                message: format!("OpenAI API error: {}", text),
            });
        }

        resp.json()
            .map_err(|e| ChatError::Network(format!("OpenAI JSON parse error: {}", e)))
    }
}
