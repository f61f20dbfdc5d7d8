use crate::chat;
use crate::chat::links::Linkifier;
use crate::config::Settings;
use crate::models::article::{self, Article, ArticleDetail};
use crate::models::profile::ProfileSettings;
use crate::models::project::{self, Project, ProjectDetail};
use crate::models::resume::{Education, Experience, Passion, Skill};
use crate::models::today;
use crate::pagination::{Breakpoints, Pager, RESIZE_DEBOUNCE};
use crate::sections::{HomeSections, Section, UNAVAILABLE};

/// Grid state carried in the home page query string.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeView {
    pub blog_page: usize,
    pub blog_filter: String,
    pub projects_page: usize,
    pub projects_filter: String,
    pub width: u32,
}

impl Default for HomeView {
    fn default() -> Self {
        HomeView {
            blog_page: 0,
            blog_filter: "*".to_string(),
            projects_page: 0,
            projects_filter: "*".to_string(),
            width: 1200,
        }
    }
}

impl HomeView {
    fn href(&self, anchor: &str) -> String {
        format!(
            "/?blog_page={}&amp;blog_filter={}&amp;projects_page={}&amp;projects_filter={}&amp;width={}#{}",
            self.blog_page,
            html_escape(&self.blog_filter),
            self.projects_page,
            html_escape(&self.projects_filter),
            self.width,
            anchor
        )
    }
}

/// Full page shell around `body_html`.
pub fn page(settings: &Settings, title: &str, description: &str, body_html: &str) -> String {
    let site_name = settings.get_or("site_name", "Portfolio");
    let owner = settings.get_or("owner_name", "");
    let full_title = if title.is_empty() {
        site_name.clone()
    } else {
        format!("{} | {}", title, site_name)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <meta name="description" content="{description}">
    <meta property="og:title" content="{title}">
    <meta property="og:description" content="{description}">
    <link rel="stylesheet" href="/static/css/style.css">
    <style>{css}</style>
</head>
<body>
    <header class="site-header">
        <a href="/" class="site-name">{site_name}</a>
        <nav>
            <a href="/#about">À propos</a>
            <a href="/#resume">Parcours</a>
            <a href="/#portfolio">Portfolio</a>
            <a href="/#blog">Blog</a>
            <a href="/#contact">Contact</a>
        </nav>
    </header>
    <main>
{body}
    </main>
    <footer class="site-footer">
        <p>&copy; {year} {owner}</p>
    </footer>
</body>
</html>"#,
        title = html_escape(&full_title),
        description = html_escape(description),
        css = BASE_CSS,
        site_name = html_escape(&site_name),
        body = body_html,
        year = chrono::Utc::now().format("%Y"),
        owner = html_escape(&owner),
    )
}

/// Inline block shown in place of a section that failed to load.
pub fn unavailable(section_id: &str) -> String {
    format!(
        "<div class=\"section-error\" data-section=\"{}\"><p>{}</p></div>",
        html_escape(section_id),
        UNAVAILABLE
    )
}

fn section<T>(id: &str, title: &str, data: &Section<T>, body: impl FnOnce(&T) -> String) -> String {
    let inner = match data {
        Ok(v) => body(v),
        Err(_) => unavailable(id),
    };
    format!(
        "<section id=\"{id}\" class=\"section\">\n<h2>{title}</h2>\n{inner}\n</section>",
        id = id,
        title = html_escape(title),
        inner = inner
    )
}

// ── Home ──────────────────────────────────────────────

pub fn render_home(settings: &Settings, sections: &HomeSections, view: &HomeView) -> String {
    let fallback_prompt = settings.get_or("chatbot_fallback_prompt", "");
    let profile_for_chat = sections.profile.as_ref().ok();

    let mut body = String::new();
    body.push_str(&section("about", "À propos", &sections.profile, render_profile));
    body.push_str(&format!(
        "<section id=\"resume\" class=\"section\">\n<h2>Parcours</h2>\n{}\n{}\n{}\n</section>",
        section("experiences", "Expériences", &sections.experiences, |v| render_experiences(v)),
        section("education", "Formation", &sections.education, |v| render_education(v)),
        section("skills", "Compétences", &sections.skills, |v| render_skills(v)),
    ));
    body.push_str(&section("portfolio", "Portfolio", &sections.projects, |v| {
        render_project_grid(v, view)
    }));
    body.push_str(&section("blog", "Blog", &sections.articles, |v| render_blog_carousel(v, view)));
    body.push_str(&section("passions", "Passions", &sections.passions, |v| render_passions(v)));
    body.push_str(&render_contact(None));
    body.push_str(&render_newsletter());
    body.push_str(&render_chat_widget(profile_for_chat, &fallback_prompt));
    body.push_str(&format!(
        "<script data-debounce=\"{}\">{}</script>",
        RESIZE_DEBOUNCE.as_millis(),
        GRID_JS
    ));

    let description = sections
        .profile
        .as_ref()
        .ok()
        .and_then(|p| p.title.clone())
        .unwrap_or_default();
    page(settings, "", &description, &body)
}

fn render_profile(p: &ProfileSettings) -> String {
    let mut html = String::from("<div class=\"profile\">");
    if let Some(title) = &p.title {
        html.push_str(&format!("<h3>{}</h3>", html_escape(title)));
    }
    if !p.job_titles.is_empty() {
        html.push_str("<p class=\"job-titles\">");
        let titles: Vec<String> = p
            .job_titles
            .iter()
            .map(|t| format!("<span class=\"typed\">{}</span>", html_escape(t)))
            .collect();
        html.push_str(&titles.join(" · "));
        html.push_str("</p>");
    }
    if let Some(about) = &p.about_html {
        html.push_str(&format!("<div class=\"about\">{}</div>", about));
    }
    html.push_str("<ul class=\"profile-details\">");
    if let Some(loc) = &p.location {
        html.push_str(&format!("<li><strong>Localisation :</strong> {}</li>", html_escape(loc)));
    }
    if let Some(email) = &p.email {
        html.push_str(&format!(
            "<li><strong>Email :</strong> <a href=\"mailto:{e}\">{e}</a></li>",
            e = html_escape(email)
        ));
    }
    if let Some(phone) = &p.phone {
        html.push_str(&format!("<li><strong>Téléphone :</strong> {}</li>", html_escape(phone)));
    }
    html.push_str("</ul>");
    if let Some(cv) = &p.cv_link {
        html.push_str(&format!(
            "<a class=\"btn\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">Télécharger mon CV</a>",
            html_escape(cv)
        ));
    }
    html.push_str("</div>");
    html
}

fn render_skills(skills: &[Skill]) -> String {
    if skills.is_empty() {
        return "<p class=\"empty\">Aucune compétence disponible.</p>".to_string();
    }
    let mut html = String::from("<div class=\"skills\">");
    for s in skills {
        html.push_str(&format!(
            "<div class=\"progress\"><span class=\"skill\">{title} <i class=\"val\">{level}</i></span>\
             <div class=\"progress-bar-wrap\"><div class=\"progress-bar\" role=\"progressbar\" aria-valuenow=\"{pct}\" \
             aria-valuemin=\"0\" aria-valuemax=\"100\" style=\"width: {pct}%\"></div></div></div>",
            title = html_escape(&s.title),
            level = html_escape(&s.level),
            pct = s.percentage
        ));
    }
    html.push_str("</div>");
    html
}

fn render_education(items: &[Education]) -> String {
    if items.is_empty() {
        return "<p class=\"empty\">Aucune formation disponible.</p>".to_string();
    }
    let mut html = String::new();
    for e in items {
        html.push_str(&format!(
            "<div class=\"resume-item\"><img class=\"logo\" src=\"{logo}\" alt=\"{inst}\">\
             <h4>{degree}</h4><h5>{period}</h5><p><em>{inst}</em>{loc}</p></div>",
            logo = html_escape(&e.logo_url),
            inst = html_escape(&e.institution),
            degree = html_escape(&e.degree),
            period = html_escape(&e.period()),
            loc = e
                .location
                .as_deref()
                .map(|l| format!(", {}", html_escape(l)))
                .unwrap_or_default(),
        ));
    }
    html
}

fn render_experiences(items: &[Experience]) -> String {
    if items.is_empty() {
        return "<p class=\"empty\">Aucune expérience disponible.</p>".to_string();
    }
    let today = today();
    let mut html = String::new();
    for x in items {
        let months = x.duration_months(today);
        let logo = x
            .logo_url
            .as_deref()
            .map(|u| format!("<img class=\"logo\" src=\"{}\" alt=\"{}\">", html_escape(u), html_escape(&x.company)))
            .unwrap_or_default();
        html.push_str(&format!(
            "<div class=\"resume-item\">{logo}<h4>{position}</h4>\
             <h5>{period} <span class=\"duration\">({months} mois)</span></h5>\
             <p><em>{company}</em>{loc}</p>{desc}</div>",
            logo = logo,
            position = html_escape(&x.position),
            period = html_escape(&x.period_label()),
            months = months,
            company = html_escape(&x.company),
            loc = x
                .location
                .as_deref()
                .map(|l| format!(", {}", html_escape(l)))
                .unwrap_or_default(),
            desc = x.description_html,
        ));
    }
    html
}

fn render_passions(items: &[Passion]) -> String {
    if items.is_empty() {
        return "<p class=\"empty\">Aucune passion disponible.</p>".to_string();
    }
    let mut html = String::from("<div class=\"passions\">");
    for p in items {
        html.push_str(&format!(
            "<div class=\"passion\"><img src=\"{img}\" alt=\"{title}\"><h4>{title}</h4>\
             <span class=\"category\">{cat}</span><p>{desc}</p></div>",
            img = html_escape(&p.image_url),
            title = html_escape(&p.title),
            cat = html_escape(&p.category),
            desc = html_escape(&p.description),
        ));
    }
    html.push_str("</div>");
    html
}

/// Filter buttons, the current page of cards and prev/next arrows with the
/// `start-end / total` counter.
fn paged_grid<T>(
    pager: &Pager<T>,
    breakpoints: &Breakpoints,
    filters: &[(&str, &str)],
    active: &str,
    anchor: &str,
    href_for: impl Fn(usize, &str) -> String,
    card: impl Fn(&T) -> String,
) -> String {
    let mut html = format!(
        "<ul class=\"filters\" data-grid=\"{}\" data-page-size=\"{}\" data-breakpoints=\"{}\">",
        anchor,
        pager.page_size(),
        html_escape(&breakpoints.to_json())
    );
    for (value, label) in filters {
        let class = if *value == active { " class=\"filter-active\"" } else { "" };
        html.push_str(&format!(
            "<li{}><a href=\"{}\" data-filter=\"{}\">{}</a></li>",
            class,
            href_for(0, value),
            html_escape(value),
            html_escape(label)
        ));
    }
    html.push_str("</ul>");

    if pager.is_empty() {
        html.push_str("<p class=\"empty\">Aucun élément dans cette catégorie.</p>");
        return html;
    }

    html.push_str(&format!("<div class=\"grid\" data-grid=\"{}\">", anchor));
    for item in pager.current_slice() {
        html.push_str(&card(item));
    }
    html.push_str("</div>");

    let page = pager.current_page();
    let (range, total) = pager.range_label();
    let arrow = |enabled: bool, target: usize, label: &str, class: &str| {
        if enabled {
            format!(
                "<a class=\"{}\" href=\"{}\">{}</a>",
                class,
                href_for(target, active),
                label
            )
        } else {
            format!("<span class=\"{} disabled\">{}</span>", class, label)
        }
    };
    html.push_str(&format!(
        "<div class=\"pager\">{}<span class=\"counter\">{} / {}</span>{}</div>",
        arrow(pager.has_prev(), page.saturating_sub(1), "&larr;", "prev"),
        range,
        total,
        arrow(pager.has_next(), page + 1, "&rarr;", "next"),
    ));
    html
}

/// Pager over `items` for a filter class ("*" shows everything), sized for
/// the viewport and positioned on `page` (clamped).
fn pager_for<T: Clone + Send + Sync + 'static>(
    items: &[T],
    filter: &str,
    category: fn(&T) -> &str,
    breakpoints: &Breakpoints,
    width: u32,
    page: usize,
) -> Pager<T> {
    let mut pager = Pager::with_items(items.to_vec(), breakpoints.page_size_for(width));
    if filter != "*" {
        let wanted = filter.to_string();
        pager.set_filter(move |item| category(item) == wanted);
    }
    pager.go_to(page);
    pager
}

pub fn render_project_grid(projects: &[Project], view: &HomeView) -> String {
    let breakpoints = Breakpoints::portfolio();
    let pager = pager_for(
        projects,
        &view.projects_filter,
        |p| p.category.as_str(),
        &breakpoints,
        view.width,
        view.projects_page,
    );
    paged_grid(
        &pager,
        &breakpoints,
        project::FILTERS,
        &view.projects_filter,
        "portfolio",
        |page, filter| {
            HomeView { projects_page: page, projects_filter: filter.to_string(), ..view.clone() }
                .href("portfolio")
        },
        |p| {
            format!(
                "<div class=\"portfolio-item {cat}\"><a href=\"{link}\"><img src=\"{img}\" alt=\"{name}\"></a>\
                 <div class=\"portfolio-info\"><h4>{name}</h4><span class=\"category\">{label}</span><p>{desc}</p></div></div>",
                cat = html_escape(&p.category),
                link = html_escape(&p.link),
                img = html_escape(&p.image_url),
                name = html_escape(&p.name),
                label = project::category_label(&p.category),
                desc = html_escape(&p.description),
            )
        },
    )
}

pub fn render_blog_carousel(articles: &[Article], view: &HomeView) -> String {
    let breakpoints = Breakpoints::blog();
    let pager = pager_for(
        articles,
        &view.blog_filter,
        |a| a.category.as_str(),
        &breakpoints,
        view.width,
        view.blog_page,
    );
    paged_grid(
        &pager,
        &breakpoints,
        article::FILTERS,
        &view.blog_filter,
        "blog",
        |page, filter| {
            HomeView { blog_page: page, blog_filter: filter.to_string(), ..view.clone() }.href("blog")
        },
        |a| {
            format!(
                "<article class=\"blog-card {cat}\"><img src=\"{img}\" alt=\"{title}\">\
                 <div class=\"blog-meta\"><span class=\"date\">{date}</span>{author}<span class=\"category\">{label}</span></div>\
                 <h4><a href=\"{link}\">{title}</a></h4><p>{summary}</p>\
                 <a class=\"read-more\" href=\"{link}\">Lire la suite</a></article>",
                cat = html_escape(&a.category),
                img = html_escape(&a.image_url),
                title = html_escape(&a.title),
                date = html_escape(&a.date),
                author = a
                    .author
                    .as_deref()
                    .map(|au| format!("<span class=\"author\">{}</span>", html_escape(au)))
                    .unwrap_or_default(),
                label = article::category_label(&a.category),
                link = html_escape(&a.link),
                summary = html_escape(&a.summary),
            )
        },
    )
}

/// Contact form; `result` carries the outcome of the last submission.
pub fn render_contact(result: Option<Result<&str, &[crate::forms::ValidationError]>>) -> String {
    let notice = match result {
        None => String::new(),
        Some(Ok(msg)) => format!("<div class=\"alert alert-success\">{}</div>", html_escape(msg)),
        Some(Err(errors)) => {
            let items: Vec<String> = errors
                .iter()
                .map(|e| format!("<li data-field=\"{}\">{}</li>", e.field, html_escape(e.message)))
                .collect();
            format!("<div class=\"alert alert-error\"><ul>{}</ul></div>", items.join(""))
        }
    };
    format!(
        r#"<section id="contact" class="section">
<h2>Contact</h2>
{notice}
<form id="contactForm" action="/contact" method="post">
    <input type="text" name="name" placeholder="Votre nom" required>
    <input type="email" name="email" placeholder="Votre email" required>
    <input type="text" name="subject" placeholder="Sujet" required>
    <textarea name="message" rows="5" placeholder="Message" required></textarea>
    <button type="submit">Envoyer</button>
</form>
</section>"#,
        notice = notice
    )
}

fn render_newsletter() -> String {
    r#"<section id="newsletter" class="section">
<h2>Newsletter</h2>
<form id="newsletterForm" data-endpoint="/api/subscribe">
    <input type="email" name="email" placeholder="Votre email" required>
    <button type="submit">S'abonner</button>
</form>
</section>"#
        .to_string()
}

/// Chat bubble and popup. The system prompt is embedded once per page.
pub fn render_chat_widget(profile: Option<&ProfileSettings>, fallback_prompt: &str) -> String {
    let prompt = profile
        .and_then(|p| p.chatbot_prompt.as_deref())
        .unwrap_or(fallback_prompt);
    let links = Linkifier::from_profile(profile.unwrap_or(&ProfileSettings::default()));
    let presets: String = chat::PRESET_PHRASES
        .iter()
        .map(|p| format!("<button type=\"button\">{}</button>", html_escape(p)))
        .collect();
    format!(
        r#"<div id="chatbotBubble" class="chatbot-bubble">&#128172;</div>
<div id="chatPopup" class="chat-popup" data-endpoint="/api/callopenai" data-system-prompt="{prompt}" data-error="{error}" data-links="{links}">
    <div id="chatPopupBody" class="chat-body"><p>{greeting}</p><div class="preset-phrases">{presets}</div></div>
    <input type="text" id="userMessage" placeholder="Posez votre question...">
</div>
<script>{js}</script>"#,
        prompt = html_escape(prompt),
        error = html_escape(chat::ERROR_BUBBLE),
        links = html_escape(&links.anchors_json()),
        greeting = html_escape(chat::GREETING),
        presets = presets,
        js = CHAT_JS,
    )
}

// ── Detail pages ──────────────────────────────────────

pub fn render_article(settings: &Settings, article: &ArticleDetail) -> String {
    let body = format!(
        r#"<article class="article-detail">
<a href="/#blog" class="back">&larr; Retour au blog</a>
<img class="hero" src="{img}" alt="{title}">
<h1>{title}</h1>
<div class="blog-meta"><span class="date">{date}</span>{author}<span class="category">{label}</span></div>
<div class="article-content">{content}</div>
</article>"#,
        img = html_escape(&article.image_url),
        title = html_escape(&article.title),
        date = html_escape(&article.date),
        author = article
            .author
            .clone()
            .or_else(|| settings.get("owner_name"))
            .map(|a| format!("<span class=\"author\">Par {}</span>", html_escape(&a)))
            .unwrap_or_default(),
        label = article::category_label(&article.category),
        content = article.content_html,
    );
    page(settings, &article.title, "", &body)
}

pub fn render_project(settings: &Settings, project: &ProjectDetail, related: &[&Project]) -> String {
    let mut side = String::from("<ul class=\"project-info\">");
    side.push_str(&format!(
        "<li><strong>Catégorie :</strong> {}</li>",
        project::category_label(&project.category)
    ));
    if let Some(client) = &project.client {
        side.push_str(&format!("<li><strong>Client :</strong> {}</li>", html_escape(client)));
    }
    if let Some(kind) = &project.project_type {
        side.push_str(&format!("<li><strong>Type :</strong> {}</li>", html_escape(kind)));
    }
    if let Some(date) = &project.date {
        side.push_str(&format!("<li><strong>Date :</strong> {}</li>", html_escape(date)));
    }
    if let Some(url) = &project.external_url {
        side.push_str(&format!(
            "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">Voir le projet</a></li>",
            html_escape(url)
        ));
    }
    side.push_str("</ul>");

    if !project.technologies.is_empty() {
        side.push_str("<div class=\"technologies\">");
        for t in &project.technologies {
            side.push_str(&format!("<span class=\"tech\">{}</span>", html_escape(t)));
        }
        side.push_str("</div>");
    }

    let gallery: String = project
        .gallery
        .iter()
        .map(|url| format!("<img src=\"{}\" alt=\"{}\">", html_escape(url), html_escape(&project.title)))
        .collect();

    let video = project
        .video_url
        .as_deref()
        .map(|url| {
            format!(
                "<div class=\"video\"><iframe src=\"{}\" allowfullscreen></iframe></div>",
                html_escape(&project::video_embed_url(url))
            )
        })
        .unwrap_or_default();

    let related_html: String = related
        .iter()
        .map(|p| {
            format!(
                "<a class=\"related\" href=\"{}\"><img src=\"{}\" alt=\"{name}\"><span>{name}</span></a>",
                html_escape(&p.link),
                html_escape(&p.image_url),
                name = html_escape(&p.name)
            )
        })
        .collect();

    let body = format!(
        r#"<article class="project-detail">
<a href="/#portfolio" class="back">&larr; Retour au portfolio</a>
<h1>{title}</h1>
<p class="lead">{desc}</p>
<img class="hero" src="{img}" alt="{title}">
<div class="project-layout"><div class="project-content">{content}{video}<div class="gallery">{gallery}</div></div>
<aside>{side}</aside></div>
<section class="related-projects"><h2>Projets similaires</h2>{related}</section>
</article>"#,
        title = html_escape(&project.title),
        desc = html_escape(&project.description),
        img = html_escape(&project.image_url),
        content = project.content_html,
        video = video,
        gallery = gallery,
        side = side,
        related = related_html,
    );
    page(settings, &project.title, &project.description, &body)
}

/// Error page for a detail view that could not be loaded.
pub fn render_error(settings: &Settings, status: u16, message: &str) -> String {
    let body = format!(
        "<div class=\"error-page\"><h1>{}</h1><p>{}</p><a href=\"/\">&larr; Accueil</a></div>",
        status,
        html_escape(message)
    );
    page(settings, &status.to_string(), "", &body)
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const BASE_CSS: &str = r#"
.section-error{padding:1rem;border:1px solid #e0b4b4;background:#fff6f6;color:#9f3a38;border-radius:4px}
.filters{list-style:none;display:flex;gap:.5rem;padding:0}
.filters .filter-active a{font-weight:bold;text-decoration:underline}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(260px,1fr));gap:1rem}
.pager{display:flex;align-items:center;justify-content:center;gap:1rem;margin-top:1rem}
.pager .disabled{opacity:.3}
.content-image{max-width:100%;height:auto}
.chatbot-bubble{position:fixed;right:20px;bottom:20px;cursor:pointer;font-size:2rem}
.chat-popup{display:none;position:fixed;right:20px;bottom:80px;width:320px;background:#fff;border:1px solid #ddd;border-radius:8px}
.chat-body{max-height:360px;overflow-y:auto;padding:.5rem}
"#;

const CHAT_JS: &str = r#"
(function(){
  var popup=document.getElementById('chatPopup'),bubble=document.getElementById('chatbotBubble'),
      body=document.getElementById('chatPopupBody'),input=document.getElementById('userMessage');
  if(!popup||!bubble)return;
  var system={role:'system',content:popup.dataset.systemPrompt},history=[],links=JSON.parse(popup.dataset.links||'[]');
  bubble.onclick=function(){popup.style.display=popup.style.display==='block'?'none':'block';};
  function esc(s){var d=document.createElement('div');d.textContent=s;return d.innerHTML.replace(/"/g,'&quot;');}
  function linkify(s){if(!links.length)return s;
    var re=new RegExp(links.map(function(l){return l[0].replace(/[.*+?^${}()|[\]\\]/g,'\\$&');}).join('|'),'g');
    return s.replace(re,function(m){for(var i=0;i<links.length;i++)if(links[i][0]===m)return links[i][1];return m;});}
  function lastUser(){for(var i=history.length-1;i>=0;i--)if(history[i].role==='user')return history[i].content;return null;}
  function reveal(el,text){var i=0,out='';var t=setInterval(function(){
    if(i>=text.length){clearInterval(t);return;}
    if(text[i]==='<'){var j=text.indexOf('>',i);if(j>=0){out+=text.slice(i,j+1);i=j+1;el.innerHTML=out;return;}}
    out+=text[i++];el.innerHTML=out;},5);}
  function send(msg){msg=(msg||input.value).trim();if(!msg)return;input.value='';
    var presets=body.querySelector('.preset-phrases');if(presets)presets.style.display='none';
    body.insertAdjacentHTML('beforeend','<p class="bulle-utilisateur"><strong>Vous:</strong> '+esc(msg)+'</p>');
    var pending=history.length&&history[history.length-1].role==='user'&&history[history.length-1].content===msg;
    var prior=pending?history.slice(0,-1):history.slice();
    if(lastUser()!==msg)history.push({role:'user',content:msg});
    fetch(popup.dataset.endpoint,{method:'POST',headers:{'Content-Type':'application/json'},
      body:JSON.stringify({messages:[system].concat(prior,[{role:'user',content:msg}])})})
    .then(function(r){if(!r.ok)throw new Error(r.status);return r.json();})
    .then(function(d){var reply=d.choices[0].message.content;history.push({role:'assistant',content:reply});
      var p=document.createElement('p');p.className='bulle-joris';body.appendChild(p);reveal(p,linkify(esc(reply)));})
    .catch(function(){body.insertAdjacentHTML('beforeend','<p class="bulle-joris"><strong>Erreur:</strong> '+esc(popup.dataset.error)+'</p>');});}
  input.addEventListener('keypress',function(e){if(e.key==='Enter'){e.preventDefault();send();}});
  body.querySelectorAll('.preset-phrases button').forEach(function(b){b.onclick=function(e){e.stopPropagation();send(b.textContent);};});
})();
"#;

const GRID_JS: &str = r#"
(function(){
  var lists=document.querySelectorAll('ul.filters[data-breakpoints]');if(!lists.length)return;
  var wait=+(document.currentScript&&document.currentScript.dataset.debounce)||250,timer;
  function size(bp,w){for(var i=0;i<bp.thresholds.length;i++)if(w<bp.thresholds[i][0])return Math.max(1,bp.thresholds[i][1]);return bp.widest;}
  function check(){var w=window.innerWidth,stale=false;
    lists.forEach(function(l){if(size(JSON.parse(l.dataset.breakpoints),w)!==+l.dataset.pageSize)stale=true;});
    if(!stale)return;var u=new URL(window.location.href);u.searchParams.set('width',w);window.location.replace(u.toString());}
  window.addEventListener('resize',function(){clearTimeout(timer);timer=setTimeout(check,wait);});
  check();
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, cat: &str) -> Project {
        Project {
            id: id.into(),
            name: format!("P{}", id),
            description: String::new(),
            category: cat.into(),
            image_url: String::new(),
            link: format!("/project/{}", id),
            updated: None,
        }
    }

    #[test]
    fn escape_covers_markup_chars() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn grid_pages_by_viewport_and_filter() {
        let items: Vec<Project> = (1..=5).map(|i| project(&i.to_string(), "filter-bi")).collect();
        let view = HomeView { width: 800, ..Default::default() };
        let html = render_project_grid(&items, &view);
        assert!(html.contains("P1") && html.contains("P2") && !html.contains("P3"));
        assert!(html.contains("1-2 / 5"));

        let view = HomeView { width: 800, projects_page: 2, ..Default::default() };
        let html = render_project_grid(&items, &view);
        assert!(html.contains("5-5 / 5"));
        assert!(html.contains("<span class=\"next disabled\">"));

        let view = HomeView { projects_filter: "filter-data".into(), ..Default::default() };
        let html = render_project_grid(&items, &view);
        assert!(html.contains("Aucun élément"));
    }

    #[test]
    fn failed_section_renders_inline_notice() {
        let html = unavailable("about");
        assert!(html.contains("data-section=\"about\""));
        assert!(html.contains(UNAVAILABLE));
    }

    #[test]
    fn chat_widget_embeds_prompt_and_presets() {
        let profile = ProfileSettings { chatbot_prompt: Some("Tu es \"moi\"".into()), ..Default::default() };
        let html = render_chat_widget(Some(&profile), "fallback");
        assert!(html.contains("data-system-prompt=\"Tu es &quot;moi&quot;\""));
        assert!(html.contains(chat::PRESET_PHRASES[0]));
        assert!(render_chat_widget(None, "fallback").contains("data-system-prompt=\"fallback\""));
    }

    #[test]
    fn chat_widget_carries_profile_link_table() {
        let profile = ProfileSettings {
            github_url: Some("https://github.com/someone".into()),
            ..Default::default()
        };
        let html = render_chat_widget(Some(&profile), "fallback");
        assert!(html.contains("data-links=\"[[&quot;https://github.com/someone&quot;,"));
        assert!(html.contains("&gt;GitHub&lt;/a&gt;"));
        assert!(html.contains("linkify(esc(reply))"));
        assert!(render_chat_widget(None, "fallback").contains("data-links=\"[]\""));
    }

    #[test]
    fn grids_expose_page_size_and_breakpoints() {
        let items: Vec<Project> = (1..=4).map(|i| project(&i.to_string(), "filter-bi")).collect();
        let html = render_project_grid(&items, &HomeView { width: 500, ..Default::default() });
        assert!(html.contains("data-page-size=\"1\""));
        assert!(html.contains(
            "data-breakpoints=\"{&quot;thresholds&quot;:[[576,1],[992,2]],&quot;widest&quot;:3}\""
        ));
        assert!(html.contains("1-1 / 4"));

        let html = render_blog_carousel(&[], &HomeView::default());
        assert!(html.contains("data-page-size=\"2\""));
    }
}
