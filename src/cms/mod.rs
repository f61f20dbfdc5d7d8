pub mod contentful;
pub mod gateway;
pub mod proxy;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use gateway::CmsGateway;

// ── Types ─────────────────────────────────────────────

/// The four delivery-API resources the proxy understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Entries,
    Entry,
    Assets,
    Asset,
}

impl Endpoint {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "entries" => Some(Self::Entries),
            "entry" => Some(Self::Entry),
            "assets" => Some(Self::Assets),
            "asset" => Some(Self::Asset),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::Entry => "entry",
            Self::Assets => "assets",
            Self::Asset => "asset",
        }
    }

    pub fn needs_id(&self) -> bool {
        matches!(self, Self::Entry | Self::Asset)
    }
}

/// One call through the content proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRequest {
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "queryParams", skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
}

impl ProxyRequest {
    pub fn entries(content_type: &str, include: u8) -> Self {
        let mut query_params = BTreeMap::new();
        query_params.insert("content_type".to_string(), content_type.to_string());
        query_params.insert("include".to_string(), include.to_string());
        ProxyRequest {
            endpoint: Endpoint::Entries,
            id: None,
            query_params,
        }
    }

    pub fn entry(id: &str, include: u8) -> Self {
        let mut query_params = BTreeMap::new();
        query_params.insert("include".to_string(), include.to_string());
        ProxyRequest {
            endpoint: Endpoint::Entry,
            id: Some(id.to_string()),
            query_params,
        }
    }

    /// Entries query narrowed to one id, so linked assets come back in
    /// `includes`.
    pub fn entries_by_id(id: &str, include: u8) -> Self {
        let mut query_params = BTreeMap::new();
        query_params.insert("sys.id".to_string(), id.to_string());
        query_params.insert("include".to_string(), include.to_string());
        ProxyRequest {
            endpoint: Endpoint::Entries,
            id: None,
            query_params,
        }
    }

    pub fn asset(id: &str) -> Self {
        ProxyRequest {
            endpoint: Endpoint::Asset,
            id: Some(id.to_string()),
            query_params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.query_params.insert(key.to_string(), value.to_string());
        self
    }

    /// Validate a raw proxy body (`{endpoint, id?, queryParams?}`).
    /// Errors are 400-class messages.
    pub fn from_body(body: &Value) -> Result<Self, String> {
        let endpoint_raw = body
            .get("endpoint")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "Missing endpoint".to_string())?;
        let endpoint = Endpoint::from_str(endpoint_raw)
            .ok_or_else(|| format!("Unknown endpoint '{}'", endpoint_raw))?;

        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if endpoint.needs_id() && id.is_none() {
            return Err(format!("Endpoint '{}' requires an id", endpoint.name()));
        }

        let mut query_params = BTreeMap::new();
        if let Some(Value::Object(map)) = body.get("queryParams") {
            for (k, v) in map {
                let value = match v {
                    Value::String(s) => s.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                query_params.insert(k.clone(), value);
            }
        }

        Ok(ProxyRequest {
            endpoint,
            id,
            query_params,
        })
    }
}

/// Transport failure or non-2xx answer from the content service.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayError {
    pub status: u16,
    pub message: String,
}

impl GatewayError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        GatewayError {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(404, format!("{} not found", what))
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CMS error {}: {}", self.status, self.message)
    }
}

impl std::error::Error for GatewayError {}

// ── Source trait ──────────────────────────────────────

/// Anything that answers proxy requests with raw CMS JSON: the upstream
/// delivery API, the site's own proxy endpoint, or a fixture in tests.
pub trait ContentSource: Send + Sync {
    fn call(&self, req: &ProxyRequest) -> Result<Value, GatewayError>;
}

impl<S: ContentSource + ?Sized> ContentSource for std::sync::Arc<S> {
    fn call(&self, req: &ProxyRequest) -> Result<Value, GatewayError> {
        (**self).call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_requires_known_endpoint() {
        assert_eq!(
            ProxyRequest::from_body(&json!({})).unwrap_err(),
            "Missing endpoint"
        );
        assert!(ProxyRequest::from_body(&json!({"endpoint": "spaces"}))
            .unwrap_err()
            .contains("Unknown endpoint"));
    }

    #[test]
    fn entry_and_asset_require_id() {
        assert!(ProxyRequest::from_body(&json!({"endpoint": "entry"})).is_err());
        assert!(ProxyRequest::from_body(&json!({"endpoint": "asset", "id": "  "})).is_err());
        let req = ProxyRequest::from_body(&json!({"endpoint": "asset", "id": "a1"})).unwrap();
        assert_eq!(req.id.as_deref(), Some("a1"));
    }

    #[test]
    fn query_params_are_stringified() {
        let req = ProxyRequest::from_body(&json!({
            "endpoint": "entries",
            "queryParams": {"content_type": "skill", "include": 2, "skip": null}
        }))
        .unwrap();
        assert_eq!(req.endpoint, Endpoint::Entries);
        assert_eq!(req.query_params.get("include").map(String::as_str), Some("2"));
        assert!(!req.query_params.contains_key("skip"));
    }

    #[test]
    fn serialises_in_proxy_shape() {
        let body = serde_json::to_value(ProxyRequest::entries("skill", 2)).unwrap();
        assert_eq!(body["endpoint"], "entries");
        assert_eq!(body["queryParams"]["content_type"], "skill");
        assert!(body.get("id").is_none());
    }
}
