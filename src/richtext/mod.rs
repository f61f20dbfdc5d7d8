pub mod assets;

use serde_json::Value;

use crate::render::html_escape;

/// Image shown until an embedded asset is resolved.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder1.jpg";

/// Link schemes a document may point at. Relative links are always allowed.
const LINK_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// One node of a CMS rich-text document. Only the fields the renderer needs
/// are modelled; everything else in `data` is kept as raw JSON.
#[derive(Debug, Clone, Default)]
pub struct RichNode {
    pub node_type: String,
    pub value: Option<String>,
    pub marks: Vec<String>,
    pub data: Value,
    pub content: Option<Vec<RichNode>>,
}

/// Closed set of node types the renderer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading(u8),
    UnorderedList,
    OrderedList,
    ListItem,
    Hyperlink,
    EmbeddedAsset,
    Blockquote,
    Hr,
    Text,
}

impl NodeKind {
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "document" => Self::Document,
            "paragraph" => Self::Paragraph,
            "heading-1" => Self::Heading(1),
            "heading-2" => Self::Heading(2),
            "heading-3" => Self::Heading(3),
            "heading-4" => Self::Heading(4),
            "heading-5" => Self::Heading(5),
            "heading-6" => Self::Heading(6),
            "unordered-list" => Self::UnorderedList,
            "ordered-list" => Self::OrderedList,
            "list-item" => Self::ListItem,
            "hyperlink" => Self::Hyperlink,
            "embedded-asset-block" => Self::EmbeddedAsset,
            "blockquote" => Self::Blockquote,
            "hr" => Self::Hr,
            "text" => Self::Text,
            _ => return None,
        };
        Some(kind)
    }
}

/// Mark precedence: each later mark wraps the earlier ones.
const MARK_ORDER: &[(&str, &str)] = &[
    ("bold", "strong"),
    ("italic", "em"),
    ("underline", "u"),
    ("code", "code"),
];

impl RichNode {
    /// Parse a rich-text field value. Returns `None` when the value is not a
    /// JSON object (plain string fields are handled by the caller). Malformed
    /// children become untyped nodes that render to nothing.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let node_type = obj
            .get("nodeType")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let marks = obj
            .get("marks")
            .and_then(|v| v.as_array())
            .map(|marks| {
                marks
                    .iter()
                    .filter_map(|m| m.get("type").and_then(|t| t.as_str()))
                    .map(|t| t.to_string())
                    .collect()
            })
            .unwrap_or_default();
        let content = obj.get("content").and_then(|v| v.as_array()).map(|items| {
            items
                .iter()
                .map(|child| Self::from_value(child).unwrap_or_default())
                .collect()
        });
        Some(RichNode {
            node_type,
            value: obj.get("value").and_then(|v| v.as_str()).map(|s| s.to_string()),
            marks,
            data: obj.get("data").cloned().unwrap_or(Value::Null),
            content,
        })
    }

    pub fn kind(&self) -> Option<NodeKind> {
        NodeKind::parse(&self.node_type)
    }

    /// Asset id referenced by an `embedded-asset-block`. Accepts the standard
    /// `data.target.sys.id`, a bare string target, or an array whose first
    /// element carries `sys.id`.
    pub fn asset_id(&self) -> Option<String> {
        let target = self.data.get("target")?;
        let id = match target {
            Value::String(s) => Some(s.as_str()),
            Value::Array(items) => items
                .first()
                .and_then(|t| t.get("sys"))
                .and_then(|s| s.get("id"))
                .and_then(|v| v.as_str()),
            other => other
                .get("sys")
                .and_then(|s| s.get("id"))
                .and_then(|v| v.as_str()),
        };
        id.filter(|s| !s.is_empty()).map(|s| s.to_string())
    }
}

/// Render a whole rich-text document to HTML. A document with no content
/// renders a short "not available" paragraph.
pub fn render_document(doc: &RichNode) -> String {
    if doc.content.is_none() {
        return "<p>Contenu non disponible.</p>".to_string();
    }
    render(doc)
}

/// Render any node to HTML. Never fails: unknown node types and malformed
/// nodes degrade to empty output or a placeholder image.
pub fn render(node: &RichNode) -> String {
    let kind = match node.kind() {
        Some(k) => k,
        None => {
            log::warn!("[richtext] Unsupported node type: {:?}", node.node_type);
            return String::new();
        }
    };

    match kind {
        NodeKind::Document => render_children(node),
        NodeKind::Paragraph => wrap("p", node),
        NodeKind::Heading(level) => wrap(&format!("h{}", level), node),
        NodeKind::UnorderedList => wrap("ul", node),
        NodeKind::OrderedList => wrap("ol", node),
        NodeKind::ListItem => wrap("li", node),
        NodeKind::Blockquote => wrap("blockquote", node),
        NodeKind::Hr => "<hr>".to_string(),
        NodeKind::Hyperlink => {
            let uri = node
                .data
                .get("uri")
                .and_then(|v| v.as_str())
                .unwrap_or("#");
            if !is_safe_link(uri) {
                log::warn!("[richtext] Dropping link with disallowed scheme: {}", uri);
                return render_children(node);
            }
            format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                html_escape(uri),
                render_children(node)
            )
        }
        NodeKind::EmbeddedAsset => match node.asset_id() {
            Some(id) => placeholder_img(&id),
            None => {
                log::warn!("[richtext] Embedded asset without a usable target: {}", node.data);
                format!(
                    "<img src=\"{}\" alt=\"Image\" class=\"content-image\">",
                    PLACEHOLDER_IMAGE
                )
            }
        },
        NodeKind::Text => render_text(node),
    }
}

fn is_safe_link(uri: &str) -> bool {
    match url::Url::parse(uri) {
        Ok(parsed) => LINK_SCHEMES.contains(&parsed.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Placeholder image keyed by asset id, picked up later by
/// [`assets::resolve_placeholders`].
pub fn placeholder_img(asset_id: &str) -> String {
    let id = html_escape(asset_id);
    format!(
        "<img id=\"asset-{id}\" data-asset-id=\"{id}\" src=\"{src}\" alt=\"Image en cours de chargement\" class=\"content-image\">",
        id = id,
        src = PLACEHOLDER_IMAGE
    )
}

fn render_children(node: &RichNode) -> String {
    node.content
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(render)
        .collect()
}

fn wrap(tag: &str, node: &RichNode) -> String {
    format!("<{tag}>{}</{tag}>", render_children(node), tag = tag)
}

fn render_text(node: &RichNode) -> String {
    let mut text = html_escape(node.value.as_deref().unwrap_or(""));
    for (mark, tag) in MARK_ORDER {
        if node.marks.iter().any(|m| m == mark) {
            text = format!("<{tag}>{}</{tag}>", text, tag = tag);
        }
    }
    text
}

/// Render a CMS long-form field that may be either a rich-text document or a
/// plain markdown string. Anything else yields `None`.
pub fn render_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(render_markdown(s)),
        Value::Object(_) => RichNode::from_value(value).map(|doc| render_document(&doc)),
        _ => None,
    }
}

/// Markdown to HTML for CMS "Long text" fields.
pub fn render_markdown(src: &str) -> String {
    use pulldown_cmark::{html, Options, Parser};
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(src, opts);
    let mut out = String::with_capacity(src.len() * 2);
    html::push_html(&mut out, parser);
    out
}
