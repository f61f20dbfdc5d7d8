use std::thread::ScopedJoinHandle;

use crate::cms::{CmsGateway, ContentSource, GatewayError};
use crate::models::article::Article;
use crate::models::profile::ProfileSettings;
use crate::models::project::Project;
use crate::models::resume::{Education, Experience, Passion, Skill};

/// One independently loaded part of a page.
pub type Section<T> = Result<T, GatewayError>;

/// Shown in place of a section whose load failed.
pub const UNAVAILABLE: &str =
    "Cette section est momentanément indisponible. Veuillez réessayer plus tard.";

/// Everything the home page shows, each part loaded on its own.
pub struct HomeSections {
    pub profile: Section<ProfileSettings>,
    pub articles: Section<Vec<Article>>,
    pub projects: Section<Vec<Project>>,
    pub skills: Section<Vec<Skill>>,
    pub education: Section<Vec<Education>>,
    pub experiences: Section<Vec<Experience>>,
    pub passions: Section<Vec<Passion>>,
}

impl HomeSections {
    /// Every section failed with the same error.
    pub fn all_failed(err: GatewayError) -> Self {
        HomeSections {
            profile: Err(err.clone()),
            articles: Err(err.clone()),
            projects: Err(err.clone()),
            skills: Err(err.clone()),
            education: Err(err.clone()),
            experiences: Err(err.clone()),
            passions: Err(err),
        }
    }

    /// Names of the sections that failed to load.
    pub fn failed(&self) -> Vec<&'static str> {
        let checks = [
            ("profile", self.profile.is_err()),
            ("articles", self.articles.is_err()),
            ("projects", self.projects.is_err()),
            ("skills", self.skills.is_err()),
            ("education", self.education.is_err()),
            ("experiences", self.experiences.is_err()),
            ("passions", self.passions.is_err()),
        ];
        checks
            .iter()
            .filter(|(_, failed)| *failed)
            .map(|(name, _)| *name)
            .collect()
    }
}

fn join<T>(name: &str, handle: ScopedJoinHandle<'_, Section<T>>) -> Section<T> {
    let result = handle.join().unwrap_or_else(|_| {
        Err(GatewayError::new(500, format!("{} loader panicked", name)))
    });
    if let Err(ref e) = result {
        log::warn!("[cms] Section {} unavailable: {}", name, e);
    }
    result
}

/// Load every home section concurrently. A failing section never affects
/// the others.
pub fn load_home<S: ContentSource>(gw: &CmsGateway<S>) -> HomeSections {
    std::thread::scope(|s| {
        let profile = s.spawn(|| gw.profile());
        let articles = s.spawn(|| gw.articles());
        let projects = s.spawn(|| gw.projects());
        let skills = s.spawn(|| gw.skills());
        let education = s.spawn(|| gw.education());
        let experiences = s.spawn(|| gw.experiences());
        let passions = s.spawn(|| gw.passions());

        HomeSections {
            profile: join("profile", profile),
            articles: join("articles", articles),
            projects: join("projects", projects),
            skills: join("skills", skills),
            education: join("education", education),
            experiences: join("experiences", experiences),
            passions: join("passions", passions),
        }
    })
}
