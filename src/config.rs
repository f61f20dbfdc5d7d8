use std::collections::HashMap;
use std::path::Path;

/// Default values for every key the site reads. Anything set in
/// `portfolio.toml`, `.env` or the process environment overrides these.
const DEFAULTS: &[(&str, &str)] = &[
    ("contentful_environment", "master"),
    ("contentful_base_url", "https://cdn.contentful.com"),
    ("openai_model", "gpt-3.5-turbo"),
    ("openai_base_url", "https://api.openai.com/v1"),
    ("cors_allowed_origins", "https://www.jorissalmon.com,https://porte-folio-kappa.vercel.app"),
    ("email_smtp_host", "smtp.gmail.com"),
    ("email_smtp_port", "587"),
    ("form_relay_url", "https://formsubmit.co"),
    ("site_url", "http://localhost:8000"),
    ("site_name", "Portfolio"),
    ("owner_name", "Joris Salmon"),
    (
        "chatbot_fallback_prompt",
        "Tu es l'assistant virtuel de ce portfolio. Réponds de manière concise et professionnelle \
         aux questions sur le parcours, les compétences et les projets présentés sur le site.",
    ),
    ("rate_limit_chat_per_minute", "10"),
    ("rate_limit_subscribe_per_hour", "5"),
    ("trust_proxy_headers", "false"),
    ("database_path", "website/db/portfolio.db"),
];

/// Every key that may be overridden from the environment (upper-cased).
const ENV_KEYS: &[&str] = &[
    "contentful_space_id",
    "contentful_access_token",
    "contentful_environment",
    "contentful_base_url",
    "openai_api_key",
    "openai_model",
    "openai_base_url",
    "cors_allowed_origins",
    "email_smtp_host",
    "email_smtp_port",
    "email_user",
    "email_pass",
    "admin_email",
    "form_relay_url",
    "site_url",
    "site_name",
    "owner_name",
    "chatbot_fallback_prompt",
    "rate_limit_chat_per_minute",
    "rate_limit_subscribe_per_hour",
    "trust_proxy_headers",
    "database_path",
];

/// Flat key/value settings map shared with every provider module.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Load defaults, then `portfolio.toml`, then `.env`, then the process environment.
    pub fn load() -> Self {
        let mut settings = Self::defaults();

        let path = Path::new("portfolio.toml");
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(raw) => match parse_toml(&raw) {
                    Ok(map) => settings.values.extend(map),
                    Err(e) => log::warn!("[config] Ignoring portfolio.toml: {}", e),
                },
                Err(e) => log::warn!("[config] Cannot read portfolio.toml: {}", e),
            }
        }

        if let Err(e) = dotenvy::dotenv() {
            log::debug!("[config] No .env loaded: {}", e);
        }

        for key in ENV_KEYS {
            if let Ok(value) = std::env::var(key.to_uppercase()) {
                settings.values.insert(key.to_string(), value);
            }
        }

        settings
    }

    pub fn defaults() -> Self {
        let values = DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings { values }
    }

    pub fn from_map(map: HashMap<String, String>) -> Self {
        let mut settings = Self::defaults();
        settings.values.extend(map);
        settings
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Returns the value only when it is present and non-empty.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.is_empty()).cloned()
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> u64 {
        self.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }

    /// Comma-separated list, trimmed, empties dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }
}

/// Flatten a `portfolio.toml` document. Tables become `table_key` prefixes so
/// `[contentful] space_id = "x"` maps to `contentful_space_id`.
fn parse_toml(raw: &str) -> Result<HashMap<String, String>, String> {
    let doc: toml::Table = raw.parse().map_err(|e: toml::de::Error| e.to_string())?;
    let mut out = HashMap::new();
    flatten_into(&mut out, "", &doc);
    Ok(out)
}

fn flatten_into(out: &mut HashMap<String, String>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}_{}", prefix, key)
        };
        match value {
            toml::Value::Table(inner) => flatten_into(out, &full, inner),
            toml::Value::String(s) => {
                out.insert(full, s.clone());
            }
            toml::Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|v| match v {
                        toml::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                out.insert(full, joined);
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}
