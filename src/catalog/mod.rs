// Product catalog module
// Fetches the upstream product list, caches it on disk, and derives the
// canonical embedding text for each item

#[cfg(test)]
mod tests;

pub mod conditions;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Payload fields contributing to an item's embedding text, in a fixed
/// order, with the human-readable label prepended to each value. Fields
/// absent from the payload are skipped rather than zero-filled.
pub const PRODUCT_EMBEDDING_FEATURES: &[(&str, &str)] = &[
    ("name", "Product Name"),
    ("keyBenefits", "Key Benefits"),
    ("description", "Detailed Description"),
    ("howToUse", "How to Use"),
    ("timeOfUse", "Recommended Time of Use"),
    ("recommendedUsageDuration", "Recommended Usage Duration"),
    ("doNotUseWith", "Do Not Use With / Contraindications"),
    ("activeContent", "Key Active Ingredients"),
    ("contents", "Full Ingredients List (INCI)"),
    ("price", "Price"),
    ("discountedPrice", "Discounted Price"),
];

/// A single product as served by the upstream catalog API.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub id: i64,
    pub name: String,
    /// The full upstream JSON object, kept opaque for display formatting.
    pub payload: Value,
}

impl CatalogProduct {
    /// Build a product from a raw catalog entry. Entries without an `id`
    /// or `name` are rejected; everything else is carried verbatim.
    #[inline]
    pub fn from_json(raw: &Value) -> Option<Self> {
        let id = raw.get("id").and_then(Value::as_i64)?;
        let name = raw.get("name").and_then(Value::as_str)?.to_string();

        Some(Self {
            id,
            name,
            payload: raw.clone(),
        })
    }

    /// The canonical text embedded for this product.
    #[inline]
    pub fn embedding_text(&self) -> String {
        embedding_text_from_payload(&self.payload)
    }
}

/// Derive the embedding text for an item payload from the fixed feature
/// list. Deterministic: same payload, same text.
#[inline]
pub fn embedding_text_from_payload(payload: &Value) -> String {
    PRODUCT_EMBEDDING_FEATURES
        .iter()
        .filter_map(|(field, label)| {
            let value = payload.get(*field)?;
            let rendered = render_feature_value(value)?;
            Some(format!("{}: {}", label, rendered))
        })
        .join("\n")
}

/// Render a payload value as display text. Arrays are comma-joined,
/// scalars stringified; null and empty values drop the whole line.
fn render_feature_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let joined = items.iter().filter_map(render_feature_value).join(", ");
            if joined.is_empty() { None } else { Some(joined) }
        }
        Value::Object(_) => None,
    }
}

/// HTTP client for the upstream product catalog with an on-disk cache.
///
/// The cache is a plain JSON copy of the last successful fetch; it is used
/// as a fallback when the upstream is unreachable, never as authoritative
/// state.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    products_url: String,
    cache_path: PathBuf,
    agent: ureq::Agent,
}

impl CatalogClient {
    #[inline]
    pub fn new(config: &Config) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.catalog.timeout_seconds)))
            .build()
            .into();

        Self {
            products_url: config.catalog.products_url.clone(),
            cache_path: config.catalog_cache_path(),
            agent,
        }
    }

    /// Fetch the full product list, refreshing the on-disk cache on
    /// success and falling back to the cached copy when the upstream is
    /// unreachable.
    #[inline]
    pub fn fetch_products(&self) -> Result<Vec<CatalogProduct>> {
        match self.fetch_from_upstream() {
            Ok(raw) => {
                let products = parse_catalog(&raw)?;
                info!("Fetched {} products from catalog API", products.len());

                if let Err(e) = self.write_cache(&raw) {
                    warn!("Failed to update catalog cache: {}", e);
                }

                Ok(products)
            }
            Err(e) => {
                warn!("Catalog fetch failed ({}), trying cached copy", e);
                self.load_cached_products()
                    .context("Catalog unreachable and no usable cache")
            }
        }
    }

    /// Load products from the on-disk cache without touching the network.
    #[inline]
    pub fn load_cached_products(&self) -> Result<Vec<CatalogProduct>> {
        let content = fs::read_to_string(&self.cache_path).with_context(|| {
            format!("Failed to read catalog cache: {}", self.cache_path.display())
        })?;

        let raw: Value =
            serde_json::from_str(&content).context("Failed to parse catalog cache")?;

        let products = parse_catalog(&raw)?;
        debug!("Loaded {} products from catalog cache", products.len());
        Ok(products)
    }

    fn fetch_from_upstream(&self) -> Result<Value> {
        debug!("Fetching product catalog from {}", self.products_url);

        let body = self
            .agent
            .get(&self.products_url)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Catalog request failed: {}", self.products_url))?;

        serde_json::from_str(&body).context("Failed to parse catalog response")
    }

    fn write_cache(&self, raw: &Value) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache dir: {}", parent.display()))?;
        }

        fs::write(&self.cache_path, serde_json::to_string(raw)?)
            .with_context(|| format!("Failed to write cache: {}", self.cache_path.display()))?;

        debug!("Catalog cache updated at {}", self.cache_path.display());
        Ok(())
    }
}

/// Parse a catalog document. Accepts both the wrapped `{"products": [...]}`
/// shape served by the API and a bare array.
fn parse_catalog(raw: &Value) -> Result<Vec<CatalogProduct>> {
    let entries = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("products")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    let mut products = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;

    for entry in entries {
        match CatalogProduct::from_json(entry) {
            Some(product) => products.push(product),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} catalog entries without id or name", skipped);
    }

    Ok(products)
}
