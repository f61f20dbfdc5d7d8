use std::collections::HashMap;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Outbound mail. Implementations must be callable from blocking threads.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String>;
}

impl<M: Mailer + ?Sized> Mailer for std::sync::Arc<M> {
    fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        (**self).send(to, subject, html)
    }
}

/// STARTTLS relay with the site's mailbox credentials.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl SmtpMailer {
    pub fn from_settings(settings: &HashMap<String, String>) -> Option<Self> {
        let get = |key: &str| settings.get(key).cloned().unwrap_or_default();
        let username = get("email_user");
        let password = get("email_pass");
        if username.is_empty() || password.is_empty() {
            return None;
        }
        let host = match get("email_smtp_host") {
            h if h.is_empty() => "smtp.gmail.com".to_string(),
            h => h,
        };
        let port = get("email_smtp_port").parse().unwrap_or(587);
        Some(SmtpMailer {
            host,
            port,
            username,
            password,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        send_smtp(
            &self.host,
            self.port,
            &self.username,
            &self.password,
            &self.username,
            to,
            subject,
            html,
        )
    }
}

/// Stand-in used when no SMTP credentials are configured.
pub struct Unconfigured;

impl Mailer for Unconfigured {
    fn send(&self, to: &str, _subject: &str, _html: &str) -> Result<(), String> {
        log::warn!("[email] No SMTP credentials configured, cannot send to {}", to);
        Err("No email provider configured".into())
    }
}

pub fn mailer_from_settings(settings: &HashMap<String, String>) -> Box<dyn Mailer> {
    match SmtpMailer::from_settings(settings) {
        Some(m) => Box::new(m),
        None => Box::new(Unconfigured),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn send_smtp(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
    from: &str,
    to: &str,
    subject: &str,
    html: &str,
) -> Result<(), String> {
    let email = Message::builder()
        .from(from.parse().map_err(|e| format!("Invalid from address: {}", e))?)
        .to(to.parse().map_err(|e| format!("Invalid to address: {}", e))?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .map_err(|e| format!("Failed to build email: {}", e))?;

    let creds = Credentials::new(username.to_string(), password.to_string());

    let mailer = SmtpTransport::starttls_relay(host)
        .map_err(|e| format!("SMTP relay error: {}", e))?
        .port(port)
        .credentials(creds)
        .build();

    mailer.send(&email).map_err(|e| format!("SMTP send error: {}", e))?;
    Ok(())
}

// ── Newsletter messages ───────────────────────────────

fn wrap(inner: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">{}</div>",
        inner
    )
}

pub fn confirmation_body(site_name: &str) -> String {
    wrap(&format!(
        "<h2>Merci pour votre abonnement !</h2>\
         <p>Vous recevrez désormais les dernières actualités de {}.</p>\
         <p>Si vous n'avez pas demandé cet abonnement, vous pouvez ignorer ce message.</p>",
        crate::render::html_escape(site_name)
    ))
}

pub fn admin_notification_body(email: &str, when: &str) -> String {
    wrap(&format!(
        "<h2>Nouvel abonnement</h2>\
         <p>Un nouvel utilisateur s'est abonné à la newsletter :</p>\
         <p><strong>Email :</strong> {}</p>\
         <p><strong>Date :</strong> {}</p>",
        crate::render::html_escape(email),
        crate::render::html_escape(when)
    ))
}

/// Confirmation to the new subscriber.
pub fn send_confirmation(mailer: &dyn Mailer, to: &str, site_name: &str) -> Result<(), String> {
    mailer.send(
        to,
        "Confirmation d'abonnement à la newsletter",
        &confirmation_body(site_name),
    )
}

/// Tell the site owner about a new subscriber. Skipped when no admin
/// address is configured.
pub fn notify_admin(mailer: &dyn Mailer, admin_email: Option<&str>, subscriber: &str) {
    let admin = match admin_email.filter(|a| !a.trim().is_empty()) {
        Some(a) => a,
        None => {
            log::info!("[email] No admin_email set, skipping subscriber notification");
            return;
        }
    };
    let when = chrono::Local::now().format("%d/%m/%Y %H:%M").to_string();
    match mailer.send(
        admin,
        "Nouvel abonnement à la newsletter",
        &admin_notification_body(subscriber, &when),
    ) {
        Ok(()) => log::info!("[email] Admin notified of new subscriber"),
        Err(e) => log::warn!("[email] Failed to notify admin: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_needs_credentials() {
        assert!(SmtpMailer::from_settings(&HashMap::new()).is_none());
        let mut s = HashMap::new();
        s.insert("email_user".to_string(), "me@example.com".to_string());
        s.insert("email_pass".to_string(), "pw".to_string());
        let m = SmtpMailer::from_settings(&s).unwrap();
        assert_eq!(m.host, "smtp.gmail.com");
        assert_eq!(m.port, 587);
    }

    #[test]
    fn unconfigured_mailer_errors() {
        assert!(mailer_from_settings(&HashMap::new())
            .send("a@b.co", "s", "b")
            .is_err());
    }

    #[test]
    fn notification_escapes_address() {
        let body = admin_notification_body("<x>@y.fr", "01/01/2025 10:00");
        assert!(body.contains("&lt;x&gt;@y.fr"));
        assert!(body.contains("01/01/2025 10:00"));
    }
}
