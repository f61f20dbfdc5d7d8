use serde_json::json;

use crate::models::profile::ProfileSettings;
use crate::render::html_escape;

struct Rule {
    needle: String,
    href: String,
    label: String,
}

/// Turns the owner's known URLs, e-mail and phone number into links when
/// they appear verbatim in a reply.
pub struct Linkifier {
    rules: Vec<Rule>,
}

impl Linkifier {
    pub fn from_profile(profile: &ProfileSettings) -> Self {
        let mut rules = Vec::new();
        push_rule(&mut rules, &profile.github_url, |v| v.to_string(), Some("GitHub"));
        push_rule(&mut rules, &profile.linkedin_url, |v| v.to_string(), Some("LinkedIn"));
        push_rule(&mut rules, &profile.cv_link, |v| v.to_string(), Some("CV"));
        push_rule(&mut rules, &profile.email, |v| format!("mailto:{}", v), None);
        push_rule(&mut rules, &profile.phone, |v| format!("tel:{}", international_phone(v)), None);

        // Longest first so a URL wins over any shorter needle inside it
        rules.sort_by(|a, b| b.needle.len().cmp(&a.needle.len()));
        Linkifier { rules }
    }

    fn anchor(rule: &Rule) -> String {
        let target = if rule.href.starts_with("http") {
            " target=\"_blank\""
        } else {
            ""
        };
        format!(
            "<a href=\"{}\"{} class=\"styled-link\">{}</a>",
            html_escape(&rule.href),
            target,
            html_escape(&rule.label)
        )
    }

    /// `[escaped needle, anchor html]` pairs, longest needle first. The chat
    /// page swaps each needle in the escaped reply for its anchor in one pass.
    pub fn anchors_json(&self) -> String {
        let pairs: Vec<_> = self
            .rules
            .iter()
            .map(|r| json!([html_escape(&r.needle), Self::anchor(r)]))
            .collect();
        serde_json::Value::Array(pairs).to_string()
    }

    /// Terminal rendering: `Label <href>` for named links.
    pub fn plain(&self, reply: &str) -> String {
        let mut out = reply.to_string();
        for rule in &self.rules {
            if rule.label != rule.needle {
                out = out.replace(&rule.needle, &format!("{} <{}>", rule.label, rule.href));
            }
        }
        out
    }
}

fn push_rule(rules: &mut Vec<Rule>, value: &Option<String>, href: fn(&str) -> String, label: Option<&str>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        rules.push(Rule {
            needle: v.to_string(),
            href: href(v),
            label: label.unwrap_or(v).to_string(),
        });
    }
}

/// French national number → E.164 (`0766840946` → `+33766840946`).
fn international_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
    match digits.strip_prefix('0') {
        Some(rest) if digits.len() == 10 => format!("+33{}", rest),
        _ => digits,
    }
}
