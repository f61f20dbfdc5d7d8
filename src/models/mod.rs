pub mod article;
pub mod asset;
pub mod profile;
pub mod project;
pub mod resume;
pub mod subscriber;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::richtext::assets::AssetLookup;
use crate::richtext::PLACEHOLDER_IMAGE;

/// A CMS entry is missing a field it cannot be shaped without, or the field
/// has the wrong shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub content_type: String,
    pub entry_id: String,
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entry {}: field '{}' {}",
            self.content_type, self.entry_id, self.field, self.reason
        )
    }
}

impl std::error::Error for SchemaError {}

/// View models shaped from one CMS content type.
pub trait FromEntry: Sized {
    const CONTENT_TYPE: &'static str;

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError>;

    /// Sort key; entries without an `order` field keep CMS order.
    fn order(&self) -> i64 {
        0
    }
}

/// Borrowed view over a raw CMS entry (`{sys: {...}, fields: {...}}`).
pub struct Entry<'a> {
    pub content_type: &'a str,
    pub id: &'a str,
    pub updated_at: Option<&'a str>,
    pub fields: &'a Map<String, Value>,
}

impl<'a> Entry<'a> {
    pub fn parse(content_type: &'a str, raw: &'a Value) -> Result<Self, SchemaError> {
        let id = raw
            .get("sys")
            .and_then(|s| s.get("id"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError {
                content_type: content_type.to_string(),
                entry_id: "?".to_string(),
                field: "sys.id".to_string(),
                reason: "is missing".to_string(),
            })?;
        let fields = raw
            .get("fields")
            .and_then(|v| v.as_object())
            .ok_or_else(|| SchemaError {
                content_type: content_type.to_string(),
                entry_id: id.to_string(),
                field: "fields".to_string(),
                reason: "is missing".to_string(),
            })?;
        let updated_at = raw
            .get("sys")
            .and_then(|s| s.get("updatedAt"))
            .and_then(|v| v.as_str());
        Ok(Entry { content_type, id, updated_at, fields })
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty string field.
    pub fn text(&self, key: &str) -> Option<String> {
        self.raw(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.text(key).unwrap_or_else(|| default.to_string())
    }

    pub fn require_text(&self, key: &str) -> Result<String, SchemaError> {
        self.text(key).ok_or_else(|| self.missing(key))
    }

    /// Integer field; numeric strings are accepted.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.raw(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer or string field displayed as text (e.g. a year).
    pub fn display(&self, key: &str) -> Option<String> {
        match self.raw(key)? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    /// String list; a single string is treated as a comma-separated list.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.raw(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Id of a linked entry or asset (`{sys: {id}}`).
    pub fn link_id(&self, key: &str) -> Option<&'a str> {
        link_id(self.raw(key)?)
    }

    pub fn link_ids(&self, key: &str) -> Vec<&'a str> {
        match self.raw(key) {
            Some(Value::Array(items)) => items.iter().filter_map(link_id).collect(),
            _ => Vec::new(),
        }
    }

    /// Image field that may hold either a plain URL or an asset link.
    /// Unresolvable links fall back to `None`.
    pub fn image(&self, key: &str, assets: &dyn AssetLookup) -> Option<String> {
        match self.raw(key)? {
            Value::String(url) if !url.trim().is_empty() => {
                Some(asset::absolute_url(url.trim()))
            }
            other => {
                let id = link_id(other)?;
                assets.lookup(id).map(|a| a.url)
            }
        }
    }

    pub fn image_or_placeholder(&self, key: &str, assets: &dyn AssetLookup) -> String {
        self.image(key, assets)
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.raw(key).and_then(|v| v.as_str()).and_then(parse_date)
    }

    pub fn require_date(&self, key: &str) -> Result<NaiveDate, SchemaError> {
        match self.raw(key) {
            None => Err(self.missing(key)),
            Some(v) => v
                .as_str()
                .and_then(parse_date)
                .ok_or_else(|| self.malformed(key, "is not a date")),
        }
    }

    pub fn missing(&self, key: &str) -> SchemaError {
        self.malformed(key, "is missing")
    }

    pub fn malformed(&self, key: &str, reason: &str) -> SchemaError {
        SchemaError {
            content_type: self.content_type.to_string(),
            entry_id: self.id.to_string(),
            field: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn link_id(value: &Value) -> Option<&str> {
    value
        .get("sys")
        .and_then(|s| s.get("id"))
        .and_then(|v| v.as_str())
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// `dd/mm/yyyy`, the French short date format.
pub fn format_date_fr(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

/// `mars 2024`
pub fn format_month_year_fr(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!("{} {}", MONTHS_FR[date.month0() as usize], date.year())
}
