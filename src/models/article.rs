use chrono::NaiveDate;
use serde::Serialize;

use super::{format_date_fr, parse_date, today, Entry, FromEntry, SchemaError};
use crate::richtext;
use crate::richtext::assets::AssetLookup;

pub const CONTENT_TYPE: &str = "blogPortfolio";

/// Blog card shown in the carousel.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub date: String,
    pub summary: String,
    pub image_url: String,
    pub link: String,
    pub category: String,
    /// Last CMS edit, for the sitemap.
    pub updated: Option<NaiveDate>,
}

/// Full article page.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub date: String,
    pub content_html: String,
    pub image_url: String,
    pub category: String,
}

/// CMS category value → filter class used by the carousel buttons.
pub fn category_class(raw: Option<&str>) -> &'static str {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("bi") => "filter-bi",
        Some("ia") => "filter-ia",
        Some("career") => "filter-career",
        _ => "filter-data",
    }
}

pub fn category_label(class: &str) -> &'static str {
    match class {
        "filter-bi" => "Business Intelligence",
        "filter-ia" => "Intelligence Artificielle",
        "filter-career" => "Carrière",
        _ => "Data",
    }
}

/// Filter buttons above the carousel: (filter value, label).
pub const FILTERS: &[(&str, &str)] = &[
    ("*", "Tous"),
    ("filter-bi", "Business Intelligence"),
    ("filter-ia", "Intelligence Artificielle"),
    ("filter-data", "Data"),
    ("filter-career", "Carrière"),
];

fn publication_date(entry: &Entry) -> String {
    format_date_fr(entry.date("dateDePublication").unwrap_or_else(today))
}

impl FromEntry for Article {
    const CONTENT_TYPE: &'static str = CONTENT_TYPE;

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        Ok(Article {
            id: entry.id.to_string(),
            title: entry.text_or("Titre", "Article sans titre"),
            author: entry.text("auteur"),
            date: publication_date(entry),
            summary: entry.text_or("rsum", "Aucun résumé disponible"),
            image_url: entry.image_or_placeholder("imagePrincipale", assets),
            link: format!("/article/{}", entry.id),
            updated: entry.updated_at.and_then(parse_date),
            category: category_class(entry.text("categorie").as_deref()).to_string(),
        })
    }
}

impl FromEntry for ArticleDetail {
    const CONTENT_TYPE: &'static str = CONTENT_TYPE;

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        let content_html = entry
            .raw("contenu")
            .and_then(richtext::render_field)
            .unwrap_or_else(|| "<p>Le contenu de cet article n'est pas disponible.</p>".to_string());
        Ok(ArticleDetail {
            id: entry.id.to_string(),
            title: entry.text_or("Titre", "Article sans titre"),
            author: entry.text("auteur"),
            date: publication_date(entry),
            content_html,
            image_url: entry.image_or_placeholder("imagePrincipale", assets),
            category: category_class(entry.text("categorie").as_deref()).to_string(),
        })
    }
}
