use chrono::NaiveDate;
use serde::Serialize;

use super::{format_date_fr, parse_date, Entry, FromEntry, SchemaError};
use crate::richtext;
use crate::richtext::assets::AssetLookup;

pub const CONTENT_TYPE: &str = "projectPortfolio";

const DEFAULT_DESCRIPTION: &str = "Aucune description disponible";

/// Card in the portfolio grid.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub link: String,
    /// Last CMS edit, for the sitemap.
    pub updated: Option<NaiveDate>,
}

/// Project page.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    pub content_html: String,
    pub image_url: String,
    pub gallery: Vec<String>,
    pub video_url: Option<String>,
    pub external_url: Option<String>,
    pub technologies: Vec<String>,
    pub client: Option<String>,
    pub project_type: Option<String>,
    pub category: String,
}

/// CMS category value → filter class. Both spellings used in the CMS for
/// business-intelligence projects map to the same class.
pub fn category_class(raw: Option<&str>) -> &'static str {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("bi") | Some("data-analyse") => "filter-bi",
        Some("data-science") => "filter-data",
        Some("recherche") => "filter-recherche",
        _ => "filter-other",
    }
}

pub fn category_label(class: &str) -> &'static str {
    match class {
        "filter-bi" => "Business Intelligence",
        "filter-data" => "Data Science",
        "filter-recherche" => "Recherche",
        _ => "Projet",
    }
}

/// Filter buttons offered above the grid: (filter value, label).
pub const FILTERS: &[(&str, &str)] = &[
    ("*", "Tous"),
    ("filter-bi", "Business Intelligence"),
    ("filter-data", "Data Science"),
    ("filter-recherche", "Recherche"),
];

impl FromEntry for Project {
    const CONTENT_TYPE: &'static str = CONTENT_TYPE;

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        Ok(Project {
            id: entry.id.to_string(),
            name: entry.text_or("title", "Projet sans titre"),
            description: entry.text_or("description", DEFAULT_DESCRIPTION),
            category: category_class(entry.text("category").as_deref()).to_string(),
            image_url: entry.image_or_placeholder("image", assets),
            link: format!("/project/{}", entry.id),
            updated: entry.updated_at.and_then(parse_date),
        })
    }
}

impl FromEntry for ProjectDetail {
    const CONTENT_TYPE: &'static str = CONTENT_TYPE;

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        let content_html = entry
            .raw("detailedDescription")
            .and_then(richtext::render_field)
            .unwrap_or_else(|| {
                "<p>La description détaillée de ce projet n'est pas disponible.</p>".to_string()
            });

        let gallery = entry
            .link_ids("galleryImages")
            .into_iter()
            .filter_map(|id| assets.lookup(id).map(|a| a.url))
            .collect();

        Ok(ProjectDetail {
            id: entry.id.to_string(),
            title: entry.text_or("title", "Projet sans titre"),
            description: entry.text_or("description", DEFAULT_DESCRIPTION),
            date: entry.date("date").map(format_date_fr),
            content_html,
            image_url: entry.image_or_placeholder("image", assets),
            gallery,
            video_url: entry.text("videoUrl"),
            external_url: entry.text("url"),
            technologies: entry.list("technologies"),
            client: entry.text("client"),
            project_type: entry.text("projectType"),
            category: category_class(entry.text("category").as_deref()).to_string(),
        })
    }
}

/// Up to three other projects, same category first, then the rest in
/// their original order.
pub fn related<'a>(all: &'a [Project], current_id: &str, category: &str) -> Vec<&'a Project> {
    let others = || all.iter().filter(move |p| p.id != current_id);
    others()
        .filter(|p| p.category == category)
        .chain(others().filter(|p| p.category != category))
        .take(3)
        .collect()
}

/// Embeddable player URL for YouTube and Vimeo links; other URLs are
/// returned unchanged.
pub fn video_embed_url(url: &str) -> String {
    let parsed = match url::Url::parse(url) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };
    let host = parsed.host_str().unwrap_or("").trim_start_matches("www.");
    match host {
        "youtube.com" | "m.youtube.com" => {
            if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                return format!("https://www.youtube.com/embed/{}", v);
            }
            url.to_string()
        }
        "youtu.be" => {
            let id = parsed.path().trim_start_matches('/');
            format!("https://www.youtube.com/embed/{}", id)
        }
        "vimeo.com" => {
            let id = parsed.path().trim_start_matches('/');
            format!("https://player.vimeo.com/video/{}", id)
        }
        _ => url.to_string(),
    }
}
