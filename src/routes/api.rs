use std::time::Duration;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Services;
use crate::chat::ChatMessage;
use crate::cms::ProxyRequest;
use crate::config::Settings;
use crate::db::DbPool;
use crate::email;
use crate::forms;
use crate::guards::{hash_ip, ClientIp};
use crate::models::subscriber::Subscriber;
use crate::rate_limit::RateLimiter;

type ApiResponse = (Status, Json<Value>);

/// Endpoints that answer 405 for anything but POST (and OPTIONS where CORS applies).
const POST_ONLY: &[&str] = &["contentful", "callopenai", "subscribe"];

/// Stale limiter entries are pruned once this many clients are tracked.
const MAX_TRACKED_KEYS: usize = 10_000;

fn under_limit(limiter: &RateLimiter, settings: &Settings, bucket: &str, ip: &str, setting: &str, window: Duration) -> bool {
    let max = settings.get_u64(setting);
    if max == 0 {
        return true;
    }
    if limiter.tracked_keys() > MAX_TRACKED_KEYS {
        limiter.cleanup(Duration::from_secs(3600));
    }
    limiter.check_and_record(&format!("{}:{}", bucket, hash_ip(ip)), max, window)
}

// ── CMS proxy ──────────────────────────────────────────

#[post("/contentful", data = "<body>")]
pub async fn contentful(services: &State<Services>, body: Json<Value>) -> ApiResponse {
    let req = match ProxyRequest::from_body(&body) {
        Ok(r) => r,
        Err(msg) => {
            return (Status::BadRequest, Json(json!({ "error": msg })));
        }
    };

    let source = services.cms.clone();
    let result = rocket::tokio::task::spawn_blocking(move || source.call(&req)).await;

    match result {
        Ok(Ok(value)) => (Status::Ok, Json(value)),
        Ok(Err(e)) => {
            log::warn!("[cms] Proxy request failed: {}", e);
            (
                Status::InternalServerError,
                Json(json!({ "error": "Contentful request failed", "message": e.message })),
            )
        }
        Err(e) => {
            log::error!("[cms] Proxy task failed: {}", e);
            (
                Status::InternalServerError,
                Json(json!({ "error": "Contentful request failed", "message": e.to_string() })),
            )
        }
    }
}

// ── Chat completion proxy ──────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[post("/callopenai", data = "<body>")]
pub async fn callopenai(
    services: &State<Services>,
    settings: &State<Settings>,
    limiter: &State<RateLimiter>,
    client_ip: ClientIp,
    body: Json<ChatRequest>,
) -> ApiResponse {
    if !under_limit(limiter, settings, "chat", &client_ip.0, "rate_limit_chat_per_minute", Duration::from_secs(60)) {
        return (
            Status::TooManyRequests,
            Json(json!({ "message": "Too many requests", "error": "Rate limit exceeded" })),
        );
    }

    let messages = body.into_inner().messages;
    if messages.is_empty() {
        return (
            Status::BadRequest,
            Json(json!({ "message": "Bad request", "error": "messages must not be empty" })),
        );
    }

    let backend = match &services.chat {
        Some(b) => b.clone(),
        None => {
            return (
                Status::InternalServerError,
                Json(json!({ "message": "Internal server error", "error": "OpenAI API key not configured" })),
            );
        }
    };

    let result = rocket::tokio::task::spawn_blocking(move || backend.complete(&messages)).await;

    match result {
        Ok(Ok(completion)) => (Status::Ok, Json(completion)),
        Ok(Err(e)) => {
            log::warn!("[chat] Completion failed: {}", e);
            (
                Status::InternalServerError,
                Json(json!({ "message": "Internal server error", "error": e.to_string() })),
            )
        }
        Err(e) => {
            log::error!("[chat] Completion task failed: {}", e);
            (
                Status::InternalServerError,
                Json(json!({ "message": "Internal server error", "error": e.to_string() })),
            )
        }
    }
}

// ── Newsletter ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: Option<String>,
}

#[post("/subscribe", data = "<body>")]
pub async fn subscribe(
    pool: &State<DbPool>,
    services: &State<Services>,
    settings: &State<Settings>,
    limiter: &State<RateLimiter>,
    client_ip: ClientIp,
    body: Json<SubscribeRequest>,
) -> ApiResponse {
    let address = match forms::validate_subscriber(body.email.as_deref()) {
        Ok(e) => e,
        Err(v) => return (Status::BadRequest, Json(json!({ "error": v.message }))),
    };

    if !under_limit(limiter, settings, "subscribe", &client_ip.0, "rate_limit_subscribe_per_hour", Duration::from_secs(3600)) {
        return (
            Status::TooManyRequests,
            Json(json!({ "error": "Trop de tentatives. Veuillez réessayer plus tard." })),
        );
    }

    let ip_hash = hash_ip(&client_ip.0);
    match Subscriber::create(pool, &address, Some(&ip_hash)) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                Status::Conflict,
                Json(json!({ "error": "Cet email est déjà inscrit" })),
            );
        }
        Err(e) => {
            log::error!("[email] Failed to store subscriber: {}", e);
            return (
                Status::InternalServerError,
                Json(json!({ "error": "Erreur lors du traitement de l'abonnement", "message": e })),
            );
        }
    }

    let mailer = services.mailer.clone();
    let site_name = settings.get_or("site_name", "Portfolio");
    let admin = settings.get("admin_email");
    let to = address.clone();
    let sent = rocket::tokio::task::spawn_blocking(move || {
        email::send_confirmation(mailer.as_ref(), &to, &site_name)?;
        email::notify_admin(mailer.as_ref(), admin.as_deref(), &to);
        Ok::<(), String>(())
    })
    .await
    .unwrap_or_else(|e| Err(e.to_string()));

    if let Err(e) = sent {
        log::warn!("[email] Confirmation failed, rolling back subscriber: {}", e);
        if let Err(de) = Subscriber::delete(pool, &address) {
            log::error!("[email] Failed to remove subscriber after send error: {}", de);
        }
        return (
            Status::InternalServerError,
            Json(json!({ "error": "Erreur lors du traitement de l'abonnement", "message": e })),
        );
    }

    log::info!("[email] New newsletter subscriber");
    (
        Status::Ok,
        Json(json!({ "success": true, "message": "Inscription réussie!" })),
    )
}

// ── Preflight and wrong methods ────────────────────────

#[options("/callopenai")]
pub fn callopenai_preflight() -> Status {
    Status::Ok
}

#[options("/subscribe")]
pub fn subscribe_preflight() -> Status {
    Status::Ok
}

fn method_not_allowed(endpoint: &str) -> Option<ApiResponse> {
    if !POST_ONLY.contains(&endpoint) {
        return None;
    }
    Some((
        Status::MethodNotAllowed,
        Json(json!({ "message": "Method not allowed" })),
    ))
}

#[get("/<endpoint>")]
pub fn get_not_allowed(endpoint: &str) -> Option<ApiResponse> {
    method_not_allowed(endpoint)
}

#[put("/<endpoint>")]
pub fn put_not_allowed(endpoint: &str) -> Option<ApiResponse> {
    method_not_allowed(endpoint)
}

#[delete("/<endpoint>")]
pub fn delete_not_allowed(endpoint: &str) -> Option<ApiResponse> {
    method_not_allowed(endpoint)
}

#[patch("/<endpoint>")]
pub fn patch_not_allowed(endpoint: &str) -> Option<ApiResponse> {
    method_not_allowed(endpoint)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        contentful,
        callopenai,
        subscribe,
        callopenai_preflight,
        subscribe_preflight,
        get_not_allowed,
        put_not_allowed,
        delete_not_allowed,
        patch_not_allowed,
    ]
}
