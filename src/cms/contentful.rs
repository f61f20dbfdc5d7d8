use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ContentSource, Endpoint, GatewayError, ProxyRequest};

/// Direct client for the content delivery API. Holds the space credentials,
/// so it only ever runs server-side.
#[derive(Debug, Clone)]
pub struct ContentfulClient {
    base_url: String,
    space_id: String,
    environment: String,
    access_token: String,
}

impl ContentfulClient {
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, GatewayError> {
        let get = |key: &str| {
            settings
                .get(key)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let space_id = get("contentful_space_id");
        let access_token = get("contentful_access_token");
        if space_id.is_empty() || access_token.is_empty() {
            return Err(GatewayError::new(500, "Contentful credentials not configured"));
        }
        let environment = match get("contentful_environment") {
            e if e.is_empty() => "master".to_string(),
            e => e,
        };
        let base_url = match get("contentful_base_url") {
            b if b.is_empty() => "https://cdn.contentful.com".to_string(),
            b => b.trim_end_matches('/').to_string(),
        };
        Ok(ContentfulClient {
            base_url,
            space_id,
            environment,
            access_token,
        })
    }

    /// Full upstream URL for a request, access token included.
    pub fn url_for(&self, req: &ProxyRequest) -> Result<url::Url, GatewayError> {
        let resource: Vec<&str> = match (req.endpoint, req.id.as_deref()) {
            (Endpoint::Entries, _) => vec!["entries"],
            (Endpoint::Assets, _) => vec!["assets"],
            (Endpoint::Entry, Some(id)) => vec!["entries", id],
            (Endpoint::Asset, Some(id)) => vec!["assets", id],
            (endpoint, None) => {
                return Err(GatewayError::new(
                    400,
                    format!("Endpoint '{}' requires an id", endpoint.name()),
                ))
            }
        };

        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| GatewayError::new(500, format!("Invalid Contentful base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::new(500, "Invalid Contentful base URL"))?
            .pop_if_empty()
            .extend(["spaces", self.space_id.as_str(), "environments", self.environment.as_str()])
            .extend(resource);
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("access_token", &self.access_token);
            for (k, v) in &req.query_params {
                q.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

impl ContentSource for ContentfulClient {
    fn call(&self, req: &ProxyRequest) -> Result<Value, GatewayError> {
        let url = self.url_for(req)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::new(500, format!("HTTP client error: {}", e)))?;

        let resp = client
            .get(url)
            .send()
            .map_err(|e| GatewayError::new(500, format!("Contentful request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().unwrap_or_default();
            log::warn!("[cms] Contentful returned {} for {}", status, req.endpoint.name());
            return Err(GatewayError::new(
                status,
                format!("Contentful returned {}: {}", status, text),
            ));
        }

        resp.json()
            .map_err(|e| GatewayError::new(500, format!("Contentful JSON parse error: {}", e)))
    }
}

/// Answers every request with a 500 when no credentials are configured.
pub struct Unconfigured(pub String);

impl ContentSource for Unconfigured {
    fn call(&self, _req: &ProxyRequest) -> Result<Value, GatewayError> {
        Err(GatewayError::new(500, self.0.clone()))
    }
}

/// Upstream client from settings, or a stand-in that reports why it is
/// missing.
pub fn source_from_settings(settings: &HashMap<String, String>) -> Arc<dyn ContentSource> {
    match ContentfulClient::from_settings(settings) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            log::warn!("[cms] {}", e.message);
            Arc::new(Unconfigured(e.message))
        }
    }
}
