// Ingest module
// Batch pipeline: load the product catalog and condition profiles,
// upsert metadata rows, embed what changed, and store vectors


use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::catalog::conditions::SKIN_CONDITION_PROFILES;
use crate::catalog::{CatalogClient, CatalogProduct};
use crate::config::Config;
use crate::database::lancedb::vector_store::VectorStore;
use crate::database::lancedb::{Collection, EmbeddingRecord, ItemMetadata};
use crate::database::sqlite::models::{NewProduct, NewSkinCondition};
use crate::database::sqlite::Database;
use crate::embeddings::OllamaClient;

/// On-disk cache of computed embeddings, keyed by collection-qualified
/// item id. An entry is only reused while its embedding text is
/// unchanged, so payload edits always re-embed.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmbeddingCache {
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    text: String,
    vector: Vec<f32>,
}

impl EmbeddingCache {
    /// Load the cache, treating a missing or unreadable file as empty.
    #[inline]
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Discarding unreadable embedding cache: {}", e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache dir: {}", parent.display()))?;
        }

        let content = serde_json::to_string(self).context("Failed to serialize cache")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write cache: {}", path.display()))?;
        Ok(())
    }

    /// Cached vector for an item, only if the text it was computed from
    /// still matches.
    #[inline]
    pub fn lookup(&self, key: &str, text: &str) -> Option<&[f32]> {
        self.entries
            .get(key)
            .filter(|entry| entry.text == text)
            .map(|entry| entry.vector.as_slice())
    }

    #[inline]
    pub fn store(&mut self, key: String, text: String, vector: Vec<f32>) {
        self.entries.insert(key, CacheEntry { text, vector });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What an ingestion run accomplished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub products_ingested: usize,
    pub conditions_ingested: usize,
    pub embeddings_computed: usize,
    pub embeddings_reused: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Drop and recreate the vector tables before ingesting
    pub rebuild: bool,
    pub products_only: bool,
    pub conditions_only: bool,
}

/// The batch ingestion job.
pub struct Ingestor {
    config: Config,
    database: Database,
    store: VectorStore,
    embedder: OllamaClient,
    catalog: CatalogClient,
}

impl Ingestor {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::initialize(&config)
            .await
            .context("Failed to initialize metadata database")?;

        let store = VectorStore::new(&config)
            .await
            .context("Failed to initialize vector store")?;

        let embedder =
            OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;

        let catalog = CatalogClient::new(&config);

        Ok(Self {
            config,
            database,
            store,
            embedder,
            catalog,
        })
    }

    /// Run the full ingestion pipeline.
    #[inline]
    pub async fn run(&self, options: IngestOptions) -> Result<IngestStats> {
        let cache_path = self.config.embedding_cache_path();
        let mut cache = EmbeddingCache::load(&cache_path);
        let mut stats = IngestStats::default();

        if !options.conditions_only {
            self.ingest_products(&mut cache, options.rebuild, &mut stats)
                .await?;
        }

        if !options.products_only {
            self.ingest_conditions(&mut cache, options.rebuild, &mut stats)
                .await?;
        }

        cache
            .save(&cache_path)
            .context("Failed to persist embedding cache")?;

        info!(
            "Ingestion complete: {} products, {} conditions, {} embeddings computed, {} reused",
            stats.products_ingested,
            stats.conditions_ingested,
            stats.embeddings_computed,
            stats.embeddings_reused
        );

        Ok(stats)
    }

    async fn ingest_products(
        &self,
        cache: &mut EmbeddingCache,
        rebuild: bool,
        stats: &mut IngestStats,
    ) -> Result<()> {
        info!("Ingesting product catalog");

        let products = self
            .catalog
            .fetch_products()
            .context("Failed to load product catalog")?;

        if products.is_empty() {
            warn!("Catalog returned no products, skipping product ingestion");
            return Ok(());
        }

        if rebuild {
            self.store.reset_collection(Collection::Products).await?;
        }

        let items: Vec<(CatalogProduct, String)> = products
            .into_iter()
            .map(|product| {
                let text = product.embedding_text();
                (product, text)
            })
            .collect();

        for (product, text) in &items {
            self.database
                .upsert_product(NewProduct {
                    id: product.id,
                    name: product.name.clone(),
                    payload: product.payload.to_string(),
                    embedding_text: text.clone(),
                })
                .await?;
        }

        let records = self
            .embed_items(
                cache,
                stats,
                Collection::Products,
                items.iter().map(|(product, text)| {
                    (
                        product.id,
                        product.name.clone(),
                        product.payload.to_string(),
                        text.clone(),
                    )
                }),
            )
            .context("Failed to embed products")?;

        self.store
            .upsert_embeddings(Collection::Products, records)
            .await?;

        stats.products_ingested += items.len();
        Ok(())
    }

    async fn ingest_conditions(
        &self,
        cache: &mut EmbeddingCache,
        rebuild: bool,
        stats: &mut IngestStats,
    ) -> Result<()> {
        info!("Ingesting skin condition profiles");

        if rebuild {
            self.store
                .reset_collection(Collection::SkinConditions)
                .await?;
        }

        let mut rows = Vec::with_capacity(SKIN_CONDITION_PROFILES.len());
        for (name, description) in SKIN_CONDITION_PROFILES {
            let row = self
                .database
                .upsert_skin_condition(NewSkinCondition {
                    name: (*name).to_string(),
                    description: (*description).to_string(),
                })
                .await?;
            rows.push(row);
        }

        let records = self
            .embed_items(
                cache,
                stats,
                Collection::SkinConditions,
                rows.iter().map(|row| {
                    (
                        row.id,
                        row.name.clone(),
                        serde_json::json!({
                            "id": row.id,
                            "name": row.name,
                            "description": row.description,
                        })
                        .to_string(),
                        row.description.clone(),
                    )
                }),
            )
            .context("Failed to embed skin conditions")?;

        self.store
            .upsert_embeddings(Collection::SkinConditions, records)
            .await?;

        stats.conditions_ingested += rows.len();
        Ok(())
    }

    /// Resolve embeddings for a set of items, reusing cached vectors when
    /// the embedding text is unchanged and batching the rest through the
    /// provider.
    fn embed_items(
        &self,
        cache: &mut EmbeddingCache,
        stats: &mut IngestStats,
        collection: Collection,
        items: impl Iterator<Item = (i64, String, String, String)>,
    ) -> Result<Vec<EmbeddingRecord>> {
        let items: Vec<(i64, String, String, String)> = items.collect();
        let created_at = Utc::now().to_rfc3339();

        let mut vectors: Vec<Option<Vec<f32>>> = Vec::with_capacity(items.len());
        let mut pending: Vec<usize> = Vec::new();
        let mut pending_texts: Vec<String> = Vec::new();

        for (index, (item_id, _, _, text)) in items.iter().enumerate() {
            let key = cache_key(collection, *item_id);
            if let Some(vector) = cache.lookup(&key, text) {
                vectors.push(Some(vector.to_vec()));
                stats.embeddings_reused += 1;
            } else {
                vectors.push(None);
                pending.push(index);
                pending_texts.push(text.clone());
            }
        }

        if !pending.is_empty() {
            debug!(
                "Embedding {} of {} items in '{}' ({} cached)",
                pending.len(),
                items.len(),
                collection,
                items.len() - pending.len()
            );

            let progress = ProgressBar::new(pending.len() as u64);
            progress.set_style(
                ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            progress.set_message(format!("Embedding {}", collection));

            let fresh = self.embedder.embed_batch(&pending_texts)?;
            for (slot, vector) in pending.iter().zip(fresh.into_iter()) {
                let (item_id, _, _, text) = &items[*slot];
                cache.store(cache_key(collection, *item_id), text.clone(), vector.clone());
                vectors[*slot] = Some(vector);
                stats.embeddings_computed += 1;
                progress.inc(1);
            }

            progress.finish_and_clear();
        }

        let records = items
            .into_iter()
            .zip(vectors.into_iter())
            .filter_map(|((item_id, name, payload, _), vector)| {
                vector.map(|vector| EmbeddingRecord {
                    id: item_id.to_string(),
                    vector,
                    metadata: ItemMetadata {
                        item_id,
                        name,
                        payload,
                        created_at: created_at.clone(),
                    },
                })
            })
            .collect();

        Ok(records)
    }
}

fn cache_key(collection: Collection, item_id: i64) -> String {
    format!("{}:{}", collection, item_id)
}
