use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ContentSource, GatewayError, ProxyRequest};
use crate::models::article::{Article, ArticleDetail};
use crate::models::asset::Asset;
use crate::models::profile::ProfileSettings;
use crate::models::project::{Project, ProjectDetail};
use crate::models::resume::{Education, Experience, Passion, Skill};
use crate::models::{Entry, FromEntry};
use crate::richtext::assets::{resolve_placeholders, AssetLookup};

/// Link depth for list queries.
pub const LIST_INCLUDE: u8 = 2;
/// Link depth for a single entry page.
pub const ENTRY_INCLUDE: u8 = 10;

/// Typed access to the CMS over any `ContentSource`.
pub struct CmsGateway<S> {
    source: S,
}

impl<S: ContentSource> CmsGateway<S> {
    pub fn new(source: S) -> Self {
        CmsGateway { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Raw entries bundle (`{items, includes}`) for one content type.
    pub fn fetch_entries(&self, content_type: &str, include: u8) -> Result<Value, GatewayError> {
        self.source
            .call(&ProxyRequest::entries(content_type, include))
    }

    /// Bundle holding the single entry `id` and everything it links to.
    pub fn fetch_entry(&self, id: &str) -> Result<Value, GatewayError> {
        let bundle = self.source.call(
            &ProxyRequest::entries_by_id(id, ENTRY_INCLUDE),
        )?;
        if items(&bundle).is_empty() {
            return Err(GatewayError::not_found("Entry"));
        }
        Ok(bundle)
    }

    /// Fetch one asset. Assets without a file are treated as missing.
    pub fn fetch_asset(&self, id: &str) -> Result<Asset, GatewayError> {
        let raw = self.source.call(&ProxyRequest::asset(id))?;
        Asset::from_value(&raw).ok_or_else(|| GatewayError::not_found("Asset"))
    }

    /// Every entry of `T`'s content type, shaped and sorted by `order`.
    pub fn entries<T: FromEntry>(&self) -> Result<Vec<T>, GatewayError> {
        self.query(ProxyRequest::entries(T::CONTENT_TYPE, LIST_INCLUDE))
    }

    fn query<T: FromEntry>(&self, req: ProxyRequest) -> Result<Vec<T>, GatewayError> {
        let bundle = self.source.call(&req)?;
        let resolver = AssetResolver::new(self, &bundle);
        Ok(shape_items(&bundle, &resolver))
    }

    fn entry<T: FromEntry>(&self, id: &str) -> Result<(T, AssetResolver<'_, S>), GatewayError> {
        let bundle = self.fetch_entry(id)?;
        let resolver = AssetResolver::new(self, &bundle);
        let raw = items(&bundle)
            .first()
            .ok_or_else(|| GatewayError::not_found("Entry"))?;
        let entry = Entry::parse(T::CONTENT_TYPE, raw).map_err(|e| {
            log::warn!("[cms] {}", e);
            GatewayError::new(500, e.to_string())
        })?;
        let shaped = T::from_entry(&entry, &resolver).map_err(|e| {
            log::warn!("[cms] {}", e);
            GatewayError::new(500, e.to_string())
        })?;
        Ok((shaped, resolver))
    }

    // ── Typed sections ────────────────────────────────

    /// Blog cards, newest first.
    pub fn articles(&self) -> Result<Vec<Article>, GatewayError> {
        self.query(
            ProxyRequest::entries(Article::CONTENT_TYPE, LIST_INCLUDE)
                .param("order", "-sys.createdAt"),
        )
    }

    pub fn article(&self, id: &str) -> Result<ArticleDetail, GatewayError> {
        let (mut article, resolver) = self.entry::<ArticleDetail>(id)?;
        article.content_html = resolve_placeholders(&article.content_html, &resolver);
        Ok(article)
    }

    pub fn projects(&self) -> Result<Vec<Project>, GatewayError> {
        self.entries()
    }

    pub fn project(&self, id: &str) -> Result<ProjectDetail, GatewayError> {
        let (mut project, resolver) = self.entry::<ProjectDetail>(id)?;
        project.content_html = resolve_placeholders(&project.content_html, &resolver);
        Ok(project)
    }

    /// First profile entry; an empty profile when none is published.
    pub fn profile(&self) -> Result<ProfileSettings, GatewayError> {
        Ok(self
            .entries::<ProfileSettings>()?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    pub fn skills(&self) -> Result<Vec<Skill>, GatewayError> {
        self.entries()
    }

    pub fn education(&self) -> Result<Vec<Education>, GatewayError> {
        self.entries()
    }

    pub fn experiences(&self) -> Result<Vec<Experience>, GatewayError> {
        self.entries()
    }

    pub fn passions(&self) -> Result<Vec<Passion>, GatewayError> {
        self.entries()
    }
}

fn items(bundle: &Value) -> &[Value] {
    bundle
        .get("items")
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Shape every item of a bundle. Entries that fail shaping are logged and
/// skipped; the rest keep CMS order within equal `order` keys.
fn shape_items<T: FromEntry>(bundle: &Value, assets: &dyn AssetLookup) -> Vec<T> {
    let mut shaped: Vec<T> = items(bundle)
        .iter()
        .filter_map(|raw| {
            let entry = Entry::parse(T::CONTENT_TYPE, raw)
                .and_then(|e| T::from_entry(&e, assets));
            match entry {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("[cms] Skipping entry: {}", e);
                    None
                }
            }
        })
        .collect();
    shaped.sort_by_key(|v| v.order());
    shaped
}

// ── Asset resolution ──────────────────────────────────

/// Resolves asset ids from a bundle's `includes.Asset` first, then by
/// fetching each missing id once. Fetch failures resolve to `None`.
pub struct AssetResolver<'a, S> {
    gateway: &'a CmsGateway<S>,
    included: HashMap<String, Asset>,
    fetched: Mutex<HashMap<String, Option<Asset>>>,
}

impl<'a, S: ContentSource> AssetResolver<'a, S> {
    pub fn new(gateway: &'a CmsGateway<S>, bundle: &Value) -> Self {
        let included = bundle
            .get("includes")
            .and_then(|i| i.get("Asset"))
            .and_then(|a| a.as_array())
            .map(|assets| {
                assets
                    .iter()
                    .filter_map(Asset::from_value)
                    .map(|a| (a.id.clone(), a))
                    .collect()
            })
            .unwrap_or_default();
        AssetResolver {
            gateway,
            included,
            fetched: Mutex::new(HashMap::new()),
        }
    }
}

impl<'a, S: ContentSource> AssetLookup for AssetResolver<'a, S> {
    fn lookup(&self, id: &str) -> Option<Asset> {
        if let Some(asset) = self.included.get(id) {
            return Some(asset.clone());
        }
        if let Ok(cache) = self.fetched.lock() {
            if let Some(hit) = cache.get(id) {
                return hit.clone();
            }
        }

        let asset = match self.gateway.fetch_asset(id) {
            Ok(a) => Some(a),
            Err(e) => {
                log::warn!("[cms] Asset {} unavailable: {}", id, e);
                None
            }
        };
        if let Ok(mut cache) = self.fetched.lock() {
            cache.insert(id.to_string(), asset.clone());
        }
        asset
    }
}
