#![cfg(test)]

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::chat::{ChatBackend, ChatError, ChatMessage, ChatWidget, Role};
use crate::cms::{CmsGateway, ContentSource, Endpoint, GatewayError, ProxyRequest};
use crate::config::Settings;
use crate::db::{run_migrations, DbPool};
use crate::email::Mailer;
use crate::forms::ContactRelay;
use crate::models::article::Article;
use crate::models::project::{self, Project};
use crate::models::resume::{Experience, Skill};
use crate::models::subscriber::Subscriber;
use crate::render::{self, HomeView};
use crate::routes::Services;
use crate::sections;

/// Atomic counter for unique shared-cache DB names so parallel tests don't collide.
static TEST_DB_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Fresh in-memory SQLite pool with migrations applied. Named shared-cache
/// so every pooled connection sees the same data.
fn test_pool() -> DbPool {
    let id = TEST_DB_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let uri = format!("file:testdb_{}?mode=memory&cache=shared", id);
    let manager = SqliteConnectionManager::file(uri);
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .expect("Failed to create test pool");
    run_migrations(&pool).expect("Failed to run migrations");
    pool
}

// ═══════════════════════════════════════════════════════════
// Fakes
// ═══════════════════════════════════════════════════════════

fn entry(id: &str, fields: Value) -> Value {
    json!({ "sys": { "id": id, "updatedAt": "2025-01-10T09:00:00.000Z" }, "fields": fields })
}

fn bundle(items: Vec<Value>) -> Value {
    json!({ "items": items })
}

/// Canned CMS: list bundles per content type, detail bundles per id.
#[derive(Default)]
struct FakeSource {
    lists: HashMap<String, Value>,
    by_id: HashMap<String, Value>,
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn with_list(mut self, content_type: &str, items: Vec<Value>) -> Self {
        self.lists.insert(content_type.to_string(), bundle(items));
        self
    }

    fn with_entry(mut self, id: &str, raw: Value) -> Self {
        self.by_id.insert(id.to_string(), bundle(vec![raw]));
        self
    }

    fn failing(mut self, content_type: &str) -> Self {
        self.failing.push(content_type.to_string());
        self
    }
}

impl ContentSource for FakeSource {
    fn call(&self, req: &ProxyRequest) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match req.endpoint {
            Endpoint::Entries => {
                if let Some(id) = req.query_params.get("sys.id") {
                    return Ok(self.by_id.get(id).cloned().unwrap_or_else(|| bundle(vec![])));
                }
                let ct = req.query_params.get("content_type").cloned().unwrap_or_default();
                if self.failing.contains(&ct) {
                    return Err(GatewayError::new(500, "upstream down"));
                }
                Ok(self.lists.get(&ct).cloned().unwrap_or_else(|| bundle(vec![])))
            }
            _ => Err(GatewayError::not_found("Asset")),
        }
    }
}

/// Chat backend that echoes the last message and records every request.
#[derive(Default)]
struct FakeBackend {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ChatBackend for FakeBackend {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(json!({ "choices": [{ "message": { "role": "assistant", "content": format!("Réponse à: {}", last) } }] }))
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl Mailer for RecordingMailer {
    fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), String> {
        if self.fail {
            return Err("SMTP send error: connection refused".into());
        }
        self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

fn portfolio_source() -> FakeSource {
    FakeSource::default()
        .with_list(
            project::CONTENT_TYPE,
            vec![
                entry("p1", json!({ "title": "Tableau de bord ventes", "category": "BI" })),
                entry("p2", json!({ "title": "Prévision de churn", "category": "data-science" })),
                entry("p3", json!({ "title": "Rapport RH", "category": "Data-Analyse" })),
            ],
        )
        .with_list(
            crate::models::article::CONTENT_TYPE,
            vec![entry("a1", json!({ "Titre": "Bienvenue", "categorie": "ia", "dateDePublication": "2025-02-01" }))],
        )
        .with_entry(
            "a1",
            entry("a1", json!({ "Titre": "Bienvenue", "categorie": "ia", "dateDePublication": "2025-02-01" })),
        )
}

struct Harness {
    client: Client,
    pool: DbPool,
    mailer: Arc<RecordingMailer>,
    backend: Arc<FakeBackend>,
}

fn harness_with(source: FakeSource, mailer: RecordingMailer, extra: &[(&str, &str)], chat: bool) -> Harness {
    let mut map = HashMap::new();
    map.insert("site_url".to_string(), "https://example.com".to_string());
    map.insert("admin_email".to_string(), "owner@example.com".to_string());
    map.insert("cors_allowed_origins".to_string(), "https://www.example.com".to_string());
    for (k, v) in extra {
        map.insert(k.to_string(), v.to_string());
    }
    let settings = Settings::from_map(map);

    let pool = test_pool();
    let mailer = Arc::new(mailer);
    let backend = Arc::new(FakeBackend::default());
    let services = Services {
        cms: Arc::new(source),
        chat: if chat { Some(backend.clone() as Arc<dyn ChatBackend>) } else { None },
        mailer: mailer.clone(),
        relay: ContactRelay::new("http://127.0.0.1:9", "owner@example.com"),
    };

    let client = Client::tracked(crate::build(settings, pool.clone(), services)).expect("valid rocket");
    Harness { client, pool, mailer, backend }
}

fn harness() -> Harness {
    harness_with(portfolio_source(), RecordingMailer::default(), &[], true)
}

// ═══════════════════════════════════════════════════════════
// Content shaping
// ═══════════════════════════════════════════════════════════

#[test]
fn article_defaults_fill_missing_fields() {
    let gw = CmsGateway::new(FakeSource::default().with_list(
        crate::models::article::CONTENT_TYPE,
        vec![entry("a9", json!({}))],
    ));
    let articles: Vec<Article> = gw.articles().unwrap();
    assert_eq!(articles.len(), 1);
    let a = &articles[0];
    assert_eq!(a.title, "Article sans titre");
    assert_eq!(a.summary, "Aucun résumé disponible");
    assert_eq!(a.image_url, crate::richtext::PLACEHOLDER_IMAGE);
    assert_eq!(a.link, "/article/a9");
    assert_eq!(a.category, "filter-data");
    assert_eq!(a.updated, chrono::NaiveDate::from_ymd_opt(2025, 1, 10));
}

#[test]
fn project_categories_map_to_filters() {
    let gw = CmsGateway::new(portfolio_source());
    let projects: Vec<Project> = gw.projects().unwrap();
    let classes: Vec<&str> = projects.iter().map(|p| p.category.as_str()).collect();
    assert_eq!(classes, vec!["filter-bi", "filter-data", "filter-bi"]);
}

#[test]
fn related_projects_prefer_same_category() {
    let gw = CmsGateway::new(portfolio_source());
    let projects = gw.projects().unwrap();
    let related = project::related(&projects, "p1", "filter-bi");
    let ids: Vec<&str> = related.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p3", "p2"]);
}

#[test]
fn invalid_resume_entries_are_skipped() {
    let gw = CmsGateway::new(
        FakeSource::default()
            .with_list(
                "skill",
                vec![
                    entry("s1", json!({ "title": "SQL", "percentage": 90, "order": 2 })),
                    entry("s2", json!({ "percentage": 50 })),
                    entry("s3", json!({ "title": "Python", "percentage": 140, "order": 1 })),
                ],
            )
            .with_list(
                "experience",
                vec![
                    entry("e1", json!({ "company": "Acme", "startDate": "2023-01-01", "endDate": "2023-07-01" })),
                    entry("e2", json!({ "company": "NoDate" })),
                ],
            ),
    );
    let skills: Vec<Skill> = gw.skills().unwrap();
    let titles: Vec<&str> = skills.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Python", "SQL"]);
    assert_eq!(skills[0].percentage, 100);

    let experiences: Vec<Experience> = gw.experiences().unwrap();
    assert_eq!(experiences.len(), 1);
    let today = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    assert_eq!(experiences[0].duration_months(today), 6);
}

// ═══════════════════════════════════════════════════════════
// Home page sections
// ═══════════════════════════════════════════════════════════

#[test]
fn failing_profile_leaves_other_sections_rendered() {
    let gw = CmsGateway::new(portfolio_source().failing("profileSettings"));
    let home = sections::load_home(&gw);
    assert!(home.profile.is_err());
    assert_eq!(home.failed(), vec!["profile"]);
    assert_eq!(home.projects.as_ref().unwrap().len(), 3);

    let settings = Settings::defaults();
    let html = render::render_home(&settings, &home, &HomeView::default());
    assert!(html.contains("data-section=\"about\""));
    assert!(html.contains("Tableau de bord ventes"));
    assert!(html.contains("Bienvenue"));
    assert!(!html.contains("data-section=\"portfolio\""));
}

#[test]
fn all_sections_load_concurrently_once() {
    let source = Arc::new(portfolio_source());
    let gw = CmsGateway::new(source.clone());
    let home = sections::load_home(&gw);
    assert!(home.failed().is_empty());
    assert_eq!(source.calls.load(Ordering::SeqCst), 7);
}

// ═══════════════════════════════════════════════════════════
// Chat widget
// ═══════════════════════════════════════════════════════════

#[test]
fn second_send_carries_system_and_four_messages() {
    let backend = Arc::new(FakeBackend::default());
    let source = FakeSource::default().with_list(
        "profileSettings",
        vec![entry("prof", json!({ "chatbotPrompt": "Tu es l'assistant de Joris." }))],
    );
    let mut widget = ChatWidget::new(backend.clone(), "fallback").with_cms(CmsGateway::new(source));

    widget.send("Bonjour").unwrap();
    widget.send("Quelles compétences ?").unwrap();

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let second = &requests[1];
    let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(second[0].content, "Tu es l'assistant de Joris.");
    assert_eq!(widget.transcript().len(), 5);
}

// ═══════════════════════════════════════════════════════════
// Subscribers
// ═══════════════════════════════════════════════════════════

#[test]
fn subscriber_create_is_case_insensitive_unique() {
    let pool = test_pool();
    let id = Subscriber::create(&pool, "Ada@Example.com", Some("hash")).unwrap();
    assert!(id.is_some());
    assert_eq!(Subscriber::create(&pool, "ada@example.com", None).unwrap(), None);
    assert_eq!(Subscriber::count(&pool), 1);

    let found = Subscriber::find_by_email(&pool, "ADA@example.com").unwrap();
    assert_eq!(found.email, "Ada@Example.com");
    assert_eq!(found.ip_hash.as_deref(), Some("hash"));
}

#[test]
fn subscriber_list_and_delete() {
    let pool = test_pool();
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        Subscriber::create(&pool, email, None).unwrap();
    }
    assert_eq!(Subscriber::list(&pool, 2, 0).len(), 2);
    assert_eq!(Subscriber::list(&pool, 10, 2).len(), 1);

    assert!(Subscriber::delete(&pool, "b@example.com").unwrap());
    assert!(!Subscriber::delete(&pool, "b@example.com").unwrap());
    assert_eq!(Subscriber::count(&pool), 2);
}

// ═══════════════════════════════════════════════════════════
// /api/contentful
// ═══════════════════════════════════════════════════════════

#[test]
fn contentful_proxy_returns_cms_json() {
    let h = harness();
    let res = h
        .client
        .post("/api/contentful")
        .header(ContentType::JSON)
        .body(r#"{"endpoint":"entries","queryParams":{"content_type":"projectPortfolio","include":2}}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert!(res.headers().get_one("Access-Control-Allow-Origin").is_none());
    let body: Value = res.into_json().unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[test]
fn contentful_proxy_rejects_bad_bodies() {
    let h = harness();
    let res = h
        .client
        .post("/api/contentful")
        .header(ContentType::JSON)
        .body(r#"{"endpoint":"asset"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
    let body: Value = res.into_json().unwrap();
    assert_eq!(body["error"], "Endpoint 'asset' requires an id");
}

#[test]
fn contentful_proxy_upstream_failure_is_500() {
    let h = harness_with(
        portfolio_source().failing("skill"),
        RecordingMailer::default(),
        &[],
        true,
    );
    let res = h
        .client
        .post("/api/contentful")
        .header(ContentType::JSON)
        .body(r#"{"endpoint":"entries","queryParams":{"content_type":"skill"}}"#)
        .dispatch();
    assert_eq!(res.status(), Status::InternalServerError);
    let body: Value = res.into_json().unwrap();
    assert_eq!(body["message"], "upstream down");
}

#[test]
fn api_wrong_methods_are_405() {
    let h = harness();
    let res = h.client.get("/api/contentful").dispatch();
    assert_eq!(res.status(), Status::MethodNotAllowed);
    let body: Value = res.into_json().unwrap();
    assert_eq!(body["message"], "Method not allowed");

    assert_eq!(h.client.delete("/api/subscribe").dispatch().status(), Status::MethodNotAllowed);
    assert_eq!(h.client.put("/api/callopenai").dispatch().status(), Status::MethodNotAllowed);
    assert_eq!(h.client.get("/api/nothing").dispatch().status(), Status::NotFound);
}

// ═══════════════════════════════════════════════════════════
// /api/callopenai
// ═══════════════════════════════════════════════════════════

#[test]
fn chat_proxy_forwards_messages() {
    let h = harness();
    let res = h
        .client
        .post("/api/callopenai")
        .header(ContentType::JSON)
        .header(Header::new("Origin", "https://www.example.com"))
        .body(r#"{"messages":[{"role":"system","content":"S"},{"role":"user","content":"Salut"}]}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(
        res.headers().get_one("Access-Control-Allow-Origin"),
        Some("https://www.example.com")
    );
    let body: Value = res.into_json().unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "Réponse à: Salut");
    assert_eq!(h.backend.requests.lock().unwrap()[0].len(), 2);
}

#[test]
fn chat_preflight_and_unknown_origin() {
    let h = harness();
    let res = h
        .client
        .options("/api/callopenai")
        .header(Header::new("Origin", "https://evil.example"))
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.headers().get_one("Access-Control-Allow-Origin"), Some("null"));
    assert_eq!(
        res.headers().get_one("Access-Control-Allow-Methods"),
        Some("GET, POST, OPTIONS")
    );
}

#[test]
fn chat_proxy_without_key_is_500() {
    let h = harness_with(portfolio_source(), RecordingMailer::default(), &[], false);
    let res = h
        .client
        .post("/api/callopenai")
        .header(ContentType::JSON)
        .body(r#"{"messages":[{"role":"user","content":"Salut"}]}"#)
        .dispatch();
    assert_eq!(res.status(), Status::InternalServerError);
    let body: Value = res.into_json().unwrap();
    assert_eq!(body["message"], "Internal server error");
}

#[test]
fn chat_proxy_is_rate_limited() {
    let h = harness_with(
        portfolio_source(),
        RecordingMailer::default(),
        &[("rate_limit_chat_per_minute", "2")],
        true,
    );
    let send = || {
        h.client
            .post("/api/callopenai")
            .header(ContentType::JSON)
            .body(r#"{"messages":[{"role":"user","content":"Salut"}]}"#)
            .dispatch()
            .status()
    };
    assert_eq!(send(), Status::Ok);
    assert_eq!(send(), Status::Ok);
    assert_eq!(send(), Status::TooManyRequests);
}

#[test]
fn rotating_forwarded_for_does_not_escape_chat_limit() {
    let send = |h: &Harness, n: usize| {
        h.client
            .post("/api/callopenai")
            .header(ContentType::JSON)
            .header(Header::new("X-Forwarded-For", format!("198.51.100.{}", n)))
            .body(r#"{"messages":[{"role":"user","content":"Salut"}]}"#)
            .dispatch()
            .status()
    };

    let h = harness_with(
        portfolio_source(),
        RecordingMailer::default(),
        &[("rate_limit_chat_per_minute", "1")],
        true,
    );
    assert_eq!(send(&h, 1), Status::Ok);
    assert_eq!(send(&h, 2), Status::TooManyRequests);

    let h = harness_with(
        portfolio_source(),
        RecordingMailer::default(),
        &[("rate_limit_chat_per_minute", "1"), ("trust_proxy_headers", "true")],
        true,
    );
    assert_eq!(send(&h, 1), Status::Ok);
    assert_eq!(send(&h, 2), Status::Ok);
    assert_eq!(send(&h, 1), Status::TooManyRequests);
}

// ═══════════════════════════════════════════════════════════
// /api/subscribe
// ═══════════════════════════════════════════════════════════

fn subscribe(client: &Client, email: &str) -> (Status, Value) {
    let res = client
        .post("/api/subscribe")
        .header(ContentType::JSON)
        .body(json!({ "email": email }).to_string())
        .dispatch();
    let status = res.status();
    assert_eq!(res.headers().get_one("Access-Control-Allow-Origin"), Some("*"));
    (status, res.into_json().unwrap())
}

#[test]
fn subscribe_rejects_invalid_email() {
    let h = harness();
    let (status, body) = subscribe(&h.client, "not-an-email");
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"], "Email invalide");
    assert_eq!(Subscriber::count(&h.pool), 0);
}

#[test]
fn subscribe_stores_and_notifies() {
    let h = harness();
    let (status, body) = subscribe(&h.client, "ada@example.com");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Inscription réussie!");

    assert_eq!(Subscriber::count(&h.pool), 1);
    let sent = h.mailer.sent.lock().unwrap();
    let recipients: Vec<&str> = sent.iter().map(|(to, _)| to.as_str()).collect();
    assert_eq!(recipients, vec!["ada@example.com", "owner@example.com"]);
}

#[test]
fn subscribe_twice_is_conflict() {
    let h = harness();
    assert_eq!(subscribe(&h.client, "ada@example.com").0, Status::Ok);
    let (status, _) = subscribe(&h.client, "ADA@example.com");
    assert_eq!(status, Status::Conflict);
    assert_eq!(Subscriber::count(&h.pool), 1);
}

#[test]
fn failed_confirmation_rolls_back() {
    let h = harness_with(
        portfolio_source(),
        RecordingMailer { fail: true, ..Default::default() },
        &[],
        true,
    );
    let (status, body) = subscribe(&h.client, "ada@example.com");
    assert_eq!(status, Status::InternalServerError);
    assert_eq!(body["error"], "Erreur lors du traitement de l'abonnement");
    assert_eq!(Subscriber::count(&h.pool), 0);
}

// ═══════════════════════════════════════════════════════════
// Public pages
// ═══════════════════════════════════════════════════════════

#[test]
fn home_page_renders_with_failed_section() {
    let h = harness_with(
        portfolio_source().failing("education"),
        RecordingMailer::default(),
        &[],
        true,
    );
    let res = h
        .client
        .get("/?projects_filter=filter-bi&width=800&blog_filter=bogus")
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let html = res.into_string().unwrap();
    assert!(html.contains("data-section=\"education\""));
    assert!(html.contains("Tableau de bord ventes"));
    assert!(!html.contains("Prévision de churn"));
    assert!(html.contains("Bienvenue"));
}

#[test]
fn home_page_sizes_grids_for_reported_width() {
    let h = harness();
    let html = h.client.get("/").dispatch().into_string().unwrap();
    assert!(html.contains("<script data-debounce=\"250\">"));
    assert!(html.contains("data-grid=\"portfolio\" data-page-size=\"3\""));

    let html = h.client.get("/?width=500").dispatch().into_string().unwrap();
    assert!(html.contains("data-grid=\"portfolio\" data-page-size=\"1\""));
    assert!(html.contains("data-grid=\"blog\" data-page-size=\"1\""));
    assert!(html.contains("1-1 / 3"));
    assert!(html.contains("width=500#portfolio"));
}

#[test]
fn article_page_and_missing_article() {
    let h = harness();
    let res = h.client.get("/article/a1").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let html = res.into_string().unwrap();
    assert!(html.contains("<h1>Bienvenue</h1>"));
    assert!(html.contains("01/02/2025"));

    let res = h.client.get("/article/missing").dispatch();
    assert_eq!(res.status(), Status::NotFound);
    assert!(res.into_string().unwrap().contains("Article introuvable."));
}

#[test]
fn contact_form_reports_field_errors() {
    let h = harness();
    let res = h
        .client
        .post("/contact")
        .header(ContentType::Form)
        .body("name=Ada&email=bad&subject=Bonjour&message=Salut")
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
    let html = res.into_string().unwrap();
    assert!(html.contains("data-field=\"email\""));
    assert!(!html.contains("data-field=\"name\""));
}

#[test]
fn robots_and_sitemap() {
    let h = harness();
    let robots = h.client.get("/robots.txt").dispatch().into_string().unwrap();
    assert!(robots.contains("Sitemap: https://example.com/sitemap.xml"));

    let res = h.client.get("/sitemap.xml").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let xml = res.into_string().unwrap();
    assert!(xml.contains("<loc>https://example.com/article/a1</loc><lastmod>2025-01-10</lastmod>"));
    assert!(xml.contains("<loc>https://example.com/project/p3</loc>"));
}
