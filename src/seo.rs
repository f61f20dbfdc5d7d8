use chrono::NaiveDate;

use crate::models::article::Article;
use crate::models::project::Project;

/// Home page anchors listed in the sitemap: (anchor, changefreq, priority).
const SECTIONS: &[(&str, &str, &str)] = &[
    ("about", "monthly", "0.9"),
    ("portfolio", "weekly", "0.9"),
    ("blog", "weekly", "0.9"),
    ("education", "monthly", "0.8"),
    ("experiences", "monthly", "0.8"),
    ("contact", "yearly", "0.7"),
];

fn url_entry(xml: &mut String, loc: &str, lastmod: NaiveDate, changefreq: &str, priority: &str) {
    xml.push_str(&format!(
        "  <url><loc>{}</loc><lastmod>{}</lastmod><changefreq>{}</changefreq><priority>{}</priority></url>\n",
        crate::render::html_escape(loc),
        lastmod.format("%Y-%m-%d"),
        changefreq,
        priority
    ));
}

/// Generate sitemap.xml content. Entries without an edit date use `today`.
pub fn generate_sitemap(
    site_url: &str,
    articles: &[Article],
    projects: &[Project],
    today: NaiveDate,
) -> String {
    let site_url = site_url.trim_end_matches('/');
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
"#,
    );

    // Homepage
    url_entry(&mut xml, &format!("{}/", site_url), today, "weekly", "1.0");

    for (anchor, freq, priority) in SECTIONS {
        url_entry(&mut xml, &format!("{}/#{}", site_url, anchor), today, freq, priority);
    }

    for a in articles {
        url_entry(
            &mut xml,
            &format!("{}{}", site_url, a.link),
            a.updated.unwrap_or(today),
            "monthly",
            "0.8",
        );
    }

    for p in projects {
        url_entry(
            &mut xml,
            &format!("{}{}", site_url, p.link),
            p.updated.unwrap_or(today),
            "monthly",
            "0.7",
        );
    }

    xml.push_str("</urlset>");
    xml
}

/// Generate robots.txt content with the sitemap URL.
pub fn generate_robots(site_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}/sitemap.xml",
        site_url.trim_end_matches('/')
    )
}
