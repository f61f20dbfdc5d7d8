use serde_json::Value;

use super::{ContentSource, GatewayError, ProxyRequest};

/// Talks to a running site's `/api/contentful` endpoint instead of the CMS
/// itself, so no credentials are needed on this side.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    endpoint: String,
}

impl ProxyClient {
    pub fn new(site_url: &str) -> Self {
        ProxyClient {
            endpoint: format!("{}/api/contentful", site_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ContentSource for ProxyClient {
    fn call(&self, req: &ProxyRequest) -> Result<Value, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::new(500, format!("HTTP client error: {}", e)))?;

        let resp = client
            .post(&self.endpoint)
            .json(req)
            .send()
            .map_err(|e| GatewayError::new(500, format!("Proxy request failed: {}", e)))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            // The proxy answers errors as {error, message}
            let message = resp
                .json::<Value>()
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(|m| m.to_string())
                })
                .unwrap_or_else(|| format!("Proxy returned {}", status));
            return Err(GatewayError::new(status, message));
        }

        resp.json()
            .map_err(|e| GatewayError::new(500, format!("Proxy JSON parse error: {}", e)))
    }
}
