use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A CMS media asset resolved to something an `<img>` can point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Asset {
    /// Build from a raw CMS asset (`{sys: {id}, fields: {title, file: {url}}}`).
    /// Returns `None` when the asset carries no file URL.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("sys")?.get("id")?.as_str()?.to_string();
        let fields = value.get("fields")?;
        let raw_url = fields.get("file")?.get("url")?.as_str()?;
        if raw_url.is_empty() {
            return None;
        }
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };
        Some(Asset {
            id,
            url: absolute_url(raw_url),
            title: text("title"),
            description: text("description"),
        })
    }
}

/// CMS file URLs are protocol-relative (`//images.ctfassets.net/...`).
pub fn absolute_url(raw: &str) -> String {
    if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw.to_string()
    }
}
