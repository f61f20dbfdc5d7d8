use serde::Serialize;

use super::{Entry, FromEntry, SchemaError};
use crate::richtext;
use crate::richtext::assets::AssetLookup;

/// Site-wide owner profile. One entry is expected; the first one wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileSettings {
    pub id: String,
    pub title: Option<String>,
    pub chatbot_prompt: Option<String>,
    pub job_titles: Vec<String>,
    pub about_html: Option<String>,
    pub cv_link: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
}

impl FromEntry for ProfileSettings {
    const CONTENT_TYPE: &'static str = "profileSettings";

    fn from_entry(entry: &Entry, _assets: &dyn AssetLookup) -> Result<Self, SchemaError> {
        Ok(ProfileSettings {
            id: entry.id.to_string(),
            title: entry.text("title"),
            chatbot_prompt: entry.text("chatbotPrompt"),
            job_titles: entry.list("jobTitles"),
            about_html: entry.raw("aboutDescription").and_then(richtext::render_field),
            cv_link: entry.text("cvLink"),
            location: entry.text("location"),
            phone: entry.text("phone"),
            email: entry.text("email"),
            github_url: entry.text("githubUrl"),
            linkedin_url: entry.text("linkedinUrl"),
        })
    }
}
