use std::sync::OnceLock;

use regex::Regex;
use rocket::FromForm;
use serde::Serialize;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

/// A form field that failed validation, with the message shown next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Newsletter address check.
pub fn validate_subscriber(email: Option<&str>) -> Result<String, ValidationError> {
    let email = email.map(str::trim).unwrap_or("");
    if email.is_empty() || !is_valid_email(email) {
        return Err(ValidationError { field: "email", message: "Email invalide" });
    }
    Ok(email.to_string())
}

#[derive(Debug, Clone, Default, FromForm, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    /// Every failing field, in form order.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError { field: "name", message: "Veuillez entrer votre nom" });
        }
        let email = self.email.trim();
        if email.is_empty() {
            errors.push(ValidationError { field: "email", message: "Veuillez entrer votre email" });
        } else if !is_valid_email(email) {
            errors.push(ValidationError { field: "email", message: "Veuillez entrer un email valide" });
        }
        if self.subject.trim().is_empty() {
            errors.push(ValidationError { field: "subject", message: "Veuillez entrer un sujet" });
        }
        if self.message.trim().is_empty() {
            errors.push(ValidationError { field: "message", message: "Veuillez entrer votre message" });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Forwards validated contact messages to the hosted form-to-mail service.
#[derive(Debug, Clone)]
pub struct ContactRelay {
    endpoint: String,
}

impl ContactRelay {
    pub fn new(relay_url: &str, recipient: &str) -> Self {
        ContactRelay {
            endpoint: format!("{}/{}", relay_url.trim_end_matches('/'), recipient),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn send(&self, form: &ContactForm) -> Result<(), String> {
        let fields = [
            ("name", form.name.trim()),
            ("email", form.email.trim()),
            ("subject", form.subject.trim()),
            ("message", form.message.trim()),
            ("_captcha", "false"),
            ("_subject", "Nouveau message de contact du site web"),
        ];

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;

        let resp = client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .form(&fields)
            .send()
            .map_err(|e| format!("Form relay request failed: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("Form relay returned {}", resp.status()));
        }
        Ok(())
    }
}
