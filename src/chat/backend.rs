use serde_json::{json, Value};

use super::{ChatError, ChatMessage};

/// Anything that turns a message list into a chat-completion response.
pub trait ChatBackend: Send + Sync {
    /// Raw completion JSON (`{choices: [{message: {content}}], ...}`).
    fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError>;
}

impl<B: ChatBackend + ?Sized> ChatBackend for std::sync::Arc<B> {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError> {
        (**self).complete(messages)
    }
}

/// Assistant text of a completion response.
pub fn reply_text(completion: &Value) -> Result<String, ChatError> {
    completion
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or(ChatError::EmptyReply)
}

/// Posts to a running site's `/api/callopenai` endpoint.
#[derive(Debug, Clone)]
pub struct ProxyChatBackend {
    endpoint: String,
}

impl ProxyChatBackend {
    pub fn new(site_url: &str) -> Self {
        ProxyChatBackend {
            endpoint: format!("{}/api/callopenai", site_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatBackend for ProxyChatBackend {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ChatError::Network(format!("HTTP client error: {}", e)))?;

        let resp = client
            .post(&self.endpoint)
            .json(&json!({ "messages": messages }))
            .send()
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().unwrap_or_default();
            return Err(ChatError::Upstream { status, message: text });
        }

        resp.json()
            .map_err(|e| ChatError::Network(format!("JSON parse error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_reads_first_choice() {
        let v = json!({"choices": [{"message": {"role": "assistant", "content": " Salut "}}]});
        assert_eq!(reply_text(&v).unwrap(), "Salut");
    }

    #[test]
    fn blank_or_missing_reply_is_empty() {
        assert_eq!(reply_text(&json!({})), Err(ChatError::EmptyReply));
        let v = json!({"choices": [{"message": {"content": "  "}}]});
        assert_eq!(reply_text(&v), Err(ChatError::EmptyReply));
    }

    #[test]
    fn proxy_endpoint_joins_site_url() {
        assert_eq!(
            ProxyChatBackend::new("https://example.com/").endpoint(),
            "https://example.com/api/callopenai"
        );
    }
}
