use chrono::NaiveDate;
use serde::Serialize;

use super::{format_month_year_fr, Entry, FromEntry, SchemaError};
use crate::richtext;
use crate::richtext::assets::AssetLookup;
use crate::richtext::PLACEHOLDER_IMAGE;

#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub id: String,
    pub title: String,
    pub level: String,
    pub percentage: u8,
    pub order: i64,
}

impl FromEntry for Skill {
    const CONTENT_TYPE: &'static str = "skill";

    fn from_entry(entry: &Entry, _assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        let percentage = entry.int("percentage").unwrap_or(0).clamp(0, 100) as u8;
        Ok(Skill {
            id: entry.id.to_string(),
            title: entry.require_text("title")?,
            level: entry.text("level").unwrap_or_else(|| format!("{}%", percentage)),
            percentage,
            order: entry.int("order").unwrap_or(0),
        })
    }

    fn order(&self) -> i64 {
        self.order
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub start_year: String,
    pub end_year: String,
    pub location: Option<String>,
    pub logo_url: String,
    pub order: i64,
}

impl FromEntry for Education {
    const CONTENT_TYPE: &'static str = "education";

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        Ok(Education {
            id: entry.id.to_string(),
            institution: entry.require_text("institution")?,
            degree: entry.text_or("degree", ""),
            start_year: entry.display("startYear").unwrap_or_default(),
            end_year: entry.display("endYear").unwrap_or_default(),
            location: entry.text("location"),
            logo_url: entry
                .image("logo", assets)
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            order: entry.int("order").unwrap_or(0),
        })
    }

    fn order(&self) -> i64 {
        self.order
    }
}

impl Education {
    pub fn period(&self) -> String {
        match (self.start_year.is_empty(), self.end_year.is_empty()) {
            (false, false) => format!("{} - {}", self.start_year, self.end_year),
            (false, true) => self.start_year.clone(),
            (true, false) => self.end_year.clone(),
            (true, true) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub description_html: String,
    pub logo_url: Option<String>,
    pub order: i64,
}

impl FromEntry for Experience {
    const CONTENT_TYPE: &'static str = "experience";

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        Ok(Experience {
            id: entry.id.to_string(),
            company: entry.require_text("company")?,
            position: entry.text_or("position", ""),
            start_date: entry.require_date("startDate")?,
            end_date: entry.date("endDate"),
            location: entry.text("location"),
            description_html: entry
                .raw("description")
                .and_then(richtext::render_field)
                .unwrap_or_default(),
            logo_url: entry.image("logo", assets),
            order: entry.int("order").unwrap_or(0),
        })
    }

    fn order(&self) -> i64 {
        self.order
    }
}

impl Experience {
    /// Length in 30-day months, rounded; open-ended roles run until `today`.
    pub fn duration_months(&self, today: NaiveDate) -> i64 {
        let end = self.end_date.unwrap_or(today);
        let days = (end - self.start_date).num_days().max(0);
        (days as f64 / 30.0).round() as i64
    }

    /// `février 2025 - Présent`
    pub fn period_label(&self) -> String {
        let start = format_month_year_fr(self.start_date);
        match self.end_date {
            Some(end) => format!("{} - {}", start, format_month_year_fr(end)),
            None => format!("{} - Présent", start),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Passion {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub order: i64,
}

impl FromEntry for Passion {
    const CONTENT_TYPE: &'static str = "passion";

    fn from_entry(entry: &Entry, assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        Ok(Passion {
            id: entry.id.to_string(),
            title: entry.require_text("title")?,
            category: entry.text_or("category", ""),
            description: entry.text_or("description", ""),
            image_url: entry.image_or_placeholder("image", assets),
            order: entry.int("order").unwrap_or(0),
        })
    }

    fn order(&self) -> i64 {
        self.order
    }
}
