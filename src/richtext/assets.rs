use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::asset::Asset;
use crate::render::html_escape;

/// Anything that can turn an asset id into a resolved asset.
pub trait AssetLookup: Sync {
    fn lookup(&self, id: &str) -> Option<Asset>;
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<img id="asset-([^"]+)" data-asset-id="[^"]*"[^>]*>"#)
            .expect("placeholder regex is valid")
    })
}

/// Placeholders carry the id attribute-escaped; lookups need it raw.
fn unescape_id(escaped: &str) -> String {
    escaped
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Distinct asset ids of the placeholder images in `html`, in document order.
pub fn placeholder_ids(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholder_re()
        .captures_iter(html)
        .map(|c| unescape_id(&c[1]))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Swap every placeholder image for the resolved asset. Each distinct id is
/// looked up once; lookups run concurrently. Ids that fail to resolve keep
/// their placeholder.
pub fn resolve_placeholders(html: &str, lookup: &dyn AssetLookup) -> String {
    let ids = placeholder_ids(html);
    if ids.is_empty() {
        return html.to_string();
    }

    let resolved: HashMap<String, Asset> = std::thread::scope(|scope| {
        let handles: Vec<_> = ids
            .iter()
            .map(|id| scope.spawn(move || (id.clone(), lookup.lookup(id))))
            .collect();
        handles
            .into_iter()
            .filter_map(|h| match h.join() {
                Ok((id, Some(asset))) => Some((id, asset)),
                Ok((id, None)) => {
                    log::warn!("[richtext] Asset {} could not be resolved, keeping placeholder", id);
                    None
                }
                Err(_) => None,
            })
            .collect()
    });

    placeholder_re()
        .replace_all(html, |caps: &Captures| match resolved.get(&unescape_id(&caps[1])) {
            Some(asset) => format!(
                "<img id=\"asset-{}\" src=\"{}\" alt=\"{}\" class=\"content-image\">",
                &caps[1],
                html_escape(&asset.url),
                html_escape(asset.title.as_deref().unwrap_or("Image"))
            ),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::{placeholder_img, PLACEHOLDER_IMAGE};
    use std::sync::Mutex;

    struct Fixed {
        calls: Mutex<Vec<String>>,
    }

    impl AssetLookup for Fixed {
        fn lookup(&self, id: &str) -> Option<Asset> {
            self.calls.lock().unwrap().push(id.to_string());
            if id == "missing" {
                return None;
            }
            Some(Asset {
                id: id.to_string(),
                url: format!("https://images.example/{}.png", id),
                title: Some(format!("titre {}", id)),
                description: None,
            })
        }
    }

    #[test]
    fn resolves_each_distinct_id_once() {
        let html = format!(
            "<p>a</p>{}{}{}",
            placeholder_img("one"),
            placeholder_img("two"),
            placeholder_img("one")
        );
        let lookup = Fixed { calls: Mutex::new(Vec::new()) };
        let out = resolve_placeholders(&html, &lookup);

        let mut calls = lookup.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["one", "two"]);
        assert_eq!(out.matches("https://images.example/one.png").count(), 2);
        assert!(out.contains("alt=\"titre two\""));
        assert!(!out.contains(PLACEHOLDER_IMAGE));
    }

    #[test]
    fn unresolved_keeps_placeholder() {
        let html = placeholder_img("missing");
        let lookup = Fixed { calls: Mutex::new(Vec::new()) };
        assert_eq!(resolve_placeholders(&html, &lookup), html);
    }

    #[test]
    fn ids_with_markup_chars_are_looked_up_raw() {
        let html = placeholder_img("a&b\"c");
        assert!(html.contains("id=\"asset-a&amp;b&quot;c\""));
        assert_eq!(placeholder_ids(&html), vec!["a&b\"c"]);

        let lookup = Fixed { calls: Mutex::new(Vec::new()) };
        let out = resolve_placeholders(&html, &lookup);
        assert_eq!(*lookup.calls.lock().unwrap(), vec!["a&b\"c"]);
        assert!(out.contains("src=\"https://images.example/a&amp;b&quot;c.png\""));
        assert!(out.contains("id=\"asset-a&amp;b&quot;c\""));
    }

    #[test]
    fn no_placeholders_is_a_no_op() {
        let lookup = Fixed { calls: Mutex::new(Vec::new()) };
        assert_eq!(resolve_placeholders("<p>x</p>", &lookup), "<p>x</p>");
        assert!(lookup.calls.lock().unwrap().is_empty());
    }
}
