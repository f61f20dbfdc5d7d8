use rocket::form::Form;
use rocket::http::Status;
use rocket::response::content::{RawHtml, RawXml};
use rocket::State;

use super::Services;
use crate::cms::GatewayError;
use crate::config::Settings;
use crate::forms::{ContactForm, ValidationError};
use crate::models::{article, project, today};
use crate::render::{self, HomeView};
use crate::sections::{self, HomeSections, UNAVAILABLE};
use crate::seo;

type Page = (Status, RawHtml<String>);

fn known_filter(filter: Option<String>, filters: &[(&str, &str)]) -> String {
    filter
        .filter(|f| filters.iter().any(|(key, _)| *key == f.as_str()))
        .unwrap_or_else(|| "*".to_string())
}

fn detail_error(settings: &Settings, what: &str, err: &GatewayError) -> Page {
    if err.is_not_found() {
        let msg = format!("{} introuvable.", what);
        return (Status::NotFound, RawHtml(render::render_error(settings, 404, &msg)));
    }
    log::warn!("[cms] {} unavailable: {}", what, err);
    (
        Status::InternalServerError,
        RawHtml(render::render_error(settings, 500, UNAVAILABLE)),
    )
}

fn task_failed(e: rocket::tokio::task::JoinError) -> GatewayError {
    log::error!("[cms] Loader task failed: {}", e);
    GatewayError::new(500, e.to_string())
}

// ── Home ───────────────────────────────────────────────

#[get("/?<blog_page>&<blog_filter>&<projects_page>&<projects_filter>&<width>")]
pub async fn homepage(
    settings: &State<Settings>,
    services: &State<Services>,
    blog_page: Option<usize>,
    blog_filter: Option<String>,
    projects_page: Option<usize>,
    projects_filter: Option<String>,
    width: Option<u32>,
) -> RawHtml<String> {
    let defaults = HomeView::default();
    let view = HomeView {
        blog_page: blog_page.unwrap_or(defaults.blog_page),
        blog_filter: known_filter(blog_filter, article::FILTERS),
        projects_page: projects_page.unwrap_or(defaults.projects_page),
        projects_filter: known_filter(projects_filter, project::FILTERS),
        width: width.unwrap_or(defaults.width),
    };

    let gw = services.gateway();
    let home = rocket::tokio::task::spawn_blocking(move || sections::load_home(&gw))
        .await
        .unwrap_or_else(|e| HomeSections::all_failed(task_failed(e)));

    let failed = home.failed();
    if !failed.is_empty() {
        log::info!("[cms] Home rendered without: {}", failed.join(", "));
    }

    RawHtml(render::render_home(settings, &home, &view))
}

// ── Detail pages ───────────────────────────────────────

#[get("/article/<id>")]
pub async fn article_page(settings: &State<Settings>, services: &State<Services>, id: &str) -> Page {
    let gw = services.gateway();
    let id = id.to_string();
    let result = rocket::tokio::task::spawn_blocking(move || gw.article(&id))
        .await
        .unwrap_or_else(|e| Err(task_failed(e)));

    match result {
        Ok(detail) => (Status::Ok, RawHtml(render::render_article(settings, &detail))),
        Err(e) => detail_error(settings, "Article", &e),
    }
}

#[get("/project/<id>")]
pub async fn project_page(settings: &State<Settings>, services: &State<Services>, id: &str) -> Page {
    let gw = services.gateway();
    let id = id.to_string();
    let loaded = rocket::tokio::task::spawn_blocking(move || {
        std::thread::scope(|s| {
            let detail = s.spawn(|| gw.project(&id));
            let all = s.spawn(|| gw.projects());
            (
                detail
                    .join()
                    .unwrap_or_else(|_| Err(GatewayError::new(500, "project loader panicked"))),
                all.join()
                    .unwrap_or_else(|_| Err(GatewayError::new(500, "projects loader panicked"))),
            )
        })
    })
    .await;

    let (detail, all) = match loaded {
        Ok(pair) => pair,
        Err(e) => {
            let err = task_failed(e);
            return detail_error(settings, "Projet", &err);
        }
    };

    let detail = match detail {
        Ok(d) => d,
        Err(e) => return detail_error(settings, "Projet", &e),
    };

    // Related projects are optional
    let all = all.unwrap_or_else(|e| {
        log::warn!("[cms] Related projects unavailable: {}", e);
        Vec::new()
    });
    let related = project::related(&all, &detail.id, &detail.category);

    (
        Status::Ok,
        RawHtml(render::render_project(settings, &detail, &related)),
    )
}

// ── Contact form ───────────────────────────────────────

#[post("/contact", data = "<form>")]
pub async fn contact(
    settings: &State<Settings>,
    services: &State<Services>,
    form: Form<ContactForm>,
) -> Page {
    let form = form.into_inner();
    if let Err(errors) = form.validate() {
        let body = render::render_contact(Some(Err(&errors[..])));
        return (
            Status::BadRequest,
            RawHtml(render::page(settings, "Contact", "", &body)),
        );
    }

    let relay = services.relay.clone();
    let sent = rocket::tokio::task::spawn_blocking(move || relay.send(&form))
        .await
        .unwrap_or_else(|e| Err(e.to_string()));

    match sent {
        Ok(()) => {
            log::info!("[email] Contact message relayed");
            let body = render::render_contact(Some(Ok(
                "Votre message a bien été envoyé. Merci !",
            )));
            (Status::Ok, RawHtml(render::page(settings, "Contact", "", &body)))
        }
        Err(e) => {
            log::warn!("[email] Contact relay failed: {}", e);
            let errors = [ValidationError {
                field: "form",
                message: "Une erreur est survenue lors de l'envoi. Veuillez réessayer.",
            }];
            let body = render::render_contact(Some(Err(&errors[..])));
            (
                Status::BadGateway,
                RawHtml(render::page(settings, "Contact", "", &body)),
            )
        }
    }
}

// ── SEO ────────────────────────────────────────────────

#[get("/sitemap.xml")]
pub async fn sitemap(settings: &State<Settings>, services: &State<Services>) -> RawXml<String> {
    let gw = services.gateway();
    let (articles, projects) =
        rocket::tokio::task::spawn_blocking(move || (gw.articles(), gw.projects()))
            .await
            .unwrap_or_else(|e| {
                let err = task_failed(e);
                (Err(err.clone()), Err(err))
            });

    let articles = articles.unwrap_or_else(|e| {
        log::warn!("[cms] Sitemap without articles: {}", e);
        Vec::new()
    });
    let projects = projects.unwrap_or_else(|e| {
        log::warn!("[cms] Sitemap without projects: {}", e);
        Vec::new()
    });

    let site_url = settings.get_or("site_url", "http://localhost:8000");
    RawXml(seo::generate_sitemap(&site_url, &articles, &projects, today()))
}

#[get("/robots.txt")]
pub fn robots(settings: &State<Settings>) -> String {
    seo::generate_robots(&settings.get_or("site_url", "http://localhost:8000"))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        homepage,
        article_page,
        project_page,
        contact,
        sitemap,
        robots,
    ]
}
