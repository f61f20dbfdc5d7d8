#[macro_use]
extern crate rocket;

use std::path::Path;
use std::sync::Arc;

use rocket::fs::FileServer;
use rocket::response::content::RawHtml;
use rocket::{Build, Rocket};

mod boot;
mod chat;
mod cms;
mod config;
mod cors;
mod db;
mod email;
mod forms;
mod guards;
mod models;
mod pagination;
mod rate_limit;
mod render;
mod richtext;
mod routes;
mod sections;
mod seo;

#[cfg(test)]
mod tests;

use chat::openai::OpenAiClient;
use chat::{ChatBackend, ChatWidget, ProxyChatBackend};
use cms::proxy::ProxyClient;
use cms::CmsGateway;
use config::Settings;
use db::DbPool;
use forms::ContactRelay;
use rate_limit::RateLimiter;
use routes::Services;

#[catch(404)]
fn not_found() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>404</h1><p>Page introuvable.</p><a href='/'>← Accueil</a></body></html>".to_string())
}

#[catch(500)]
fn server_error() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>500</h1><p>Erreur interne du serveur.</p><a href='/'>← Accueil</a></body></html>".to_string())
}

/// Upstream clients as configured. Missing credentials yield stand-ins that
/// fail per request instead of at startup.
pub fn services_from_settings(settings: &Settings) -> Services {
    let map = settings.as_map();
    let chat: Option<Arc<dyn ChatBackend>> = match OpenAiClient::from_settings(map) {
        Ok(c) => Some(Arc::new(c)),
        Err(e) => {
            log::warn!("[chat] {}", e);
            None
        }
    };
    let recipient = settings
        .get("admin_email")
        .or_else(|| settings.get("email_user"))
        .unwrap_or_default();

    Services {
        cms: cms::contentful::source_from_settings(map),
        chat,
        mailer: Arc::from(email::mailer_from_settings(map)),
        relay: ContactRelay::new(&settings.get_or("form_relay_url", "https://formsubmit.co"), &recipient),
    }
}

pub fn build(settings: Settings, pool: DbPool, services: Services) -> Rocket<Build> {
    let cors = cors::Cors::new(settings.get_list("cors_allowed_origins"));

    let mut app = rocket::build()
        .manage(pool)
        .manage(RateLimiter::new())
        .manage(services)
        .manage(settings)
        .attach(cors)
        .mount("/", routes::public::routes())
        .mount("/api", routes::api::routes())
        .register("/", catchers![not_found, server_error]);

    if Path::new("website/static").is_dir() {
        app = app.mount("/static", FileServer::from("website/static"));
    }
    app
}

fn run_chat(settings: &Settings) -> std::io::Result<()> {
    let site = settings.get_or("site_url", "http://localhost:8000");
    let fallback = settings.get_or("chatbot_fallback_prompt", "");
    let gateway = CmsGateway::new(ProxyClient::new(&site));
    let mut widget = ChatWidget::new(ProxyChatBackend::new(&site), &fallback).with_cms(gateway);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    chat::terminal::run_session(&mut widget, stdin.lock(), &mut stdout, chat::reveal::REVEAL_INTERVAL)
}

fn main() {
    env_logger::init();
    let settings = Settings::load();

    if std::env::args().nth(1).as_deref() == Some("chat") {
        if let Err(e) = run_chat(&settings) {
            log::error!("[chat] Session ended: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Boot check: create directories, report missing credentials
    boot::run(&settings);

    let db_path = settings.get_or("database_path", "website/db/portfolio.db");
    let pool = match db::init_pool(&db_path) {
        Ok(p) => p,
        Err(e) => {
            log::error!("[boot] Failed to initialize database pool: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&pool) {
        log::error!("[boot] Failed to run database migrations: {}", e);
        std::process::exit(1);
    }

    let services = services_from_settings(&settings);
    if let Err(e) = rocket::execute(build(settings, pool, services).launch()) {
        log::error!("[boot] Server stopped: {}", e);
        std::process::exit(1);
    }
}
