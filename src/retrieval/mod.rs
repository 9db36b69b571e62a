// Retrieval module
// Fans a query out across collections, shares a single query embedding,
// isolates per-collection failures, and merges ranked results

#[cfg(test)]
mod tests;

pub mod ranker;

pub use crate::database::lancedb::Collection;
pub use ranker::{Candidate, RankedResult, cosine_similarity, rank, rerank_merged};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::lancedb::vector_store::{SearchHit, VectorStore};
use crate::embeddings::Embedder;
use crate::{AdvisorError, Result};

/// A collection that could not be searched during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFailure {
    pub collection: Collection,
    pub error: String,
}

/// Outcome of a retrieval: surviving ranked results plus any collections
/// that failed along the way. `failures` non-empty with `results` present
/// means a partial answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    pub results: Vec<RankedResult>,
    pub failures: Vec<CollectionFailure>,
}

impl RetrievalOutcome {
    #[inline]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Multi-collection retriever: one query embedding shared across all
/// requested collections, per-collection error isolation, merged top-k.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve the `top_k` nearest items for a text query.
    ///
    /// The query is embedded exactly once. Each requested collection is
    /// searched independently; a store failure in one collection is
    /// recorded and the others still answer. Only when every collection
    /// fails does the call return `RetrievalUnavailable`. Embedding and
    /// configuration errors are not collection-local and propagate
    /// directly.
    #[inline]
    pub async fn retrieve(
        &self,
        query_text: &str,
        collections: &[Collection],
        top_k: usize,
    ) -> Result<RetrievalOutcome> {
        if collections.is_empty() || top_k == 0 {
            return Ok(RetrievalOutcome {
                results: Vec::new(),
                failures: Vec::new(),
            });
        }

        let query_vector = self.embedder.embed(query_text)?;
        debug!(
            "Retrieving top {} from {} collection(s) for query ({} chars)",
            top_k,
            collections.len(),
            query_text.len()
        );

        let mut merged: Vec<RankedResult> = Vec::new();
        let mut failures: Vec<CollectionFailure> = Vec::new();

        for &collection in collections {
            match self.store.search(collection, &query_vector, top_k).await {
                Ok(hits) => {
                    merged.extend(hits.into_iter().map(|hit| into_ranked(collection, hit)));
                }
                // A bad dimension or connection string is a setup problem;
                // masking it as data-unavailability would hide real bugs.
                Err(config_err @ AdvisorError::Config(_)) => return Err(config_err),
                Err(e) => {
                    warn!("Search failed for collection '{}': {}", collection, e);
                    failures.push(CollectionFailure {
                        collection,
                        error: e.to_string(),
                    });
                }
            }
        }

        if failures.len() == collections.len() {
            return Err(AdvisorError::RetrievalUnavailable);
        }

        let results = if collections.len() == 1 {
            // Single collection: the store already returned ranked hits.
            merged
        } else {
            rerank_merged(merged, top_k)
        };

        Ok(RetrievalOutcome { results, failures })
    }

    /// Convenience wrapper for the common single-collection case.
    #[inline]
    pub async fn retrieve_from(
        &self,
        query_text: &str,
        collection: Collection,
        top_k: usize,
    ) -> Result<RetrievalOutcome> {
        self.retrieve(query_text, &[collection], top_k).await
    }

    /// Search a collection with an existing embedding, skipping the
    /// embedding call. Used when the query vector is already known.
    #[inline]
    pub async fn retrieve_with_vector(
        &self,
        query_vector: &[f32],
        collection: Collection,
        top_k: usize,
    ) -> Result<Vec<RankedResult>> {
        let hits = self.store.search(collection, query_vector, top_k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| into_ranked(collection, hit))
            .collect())
    }
}

/// Convert a store hit into a ranked result, parsing the stored payload
/// exactly once at this boundary. A malformed payload degrades to null
/// rather than dropping the hit.
fn into_ranked(collection: Collection, hit: SearchHit) -> RankedResult {
    let payload = serde_json::from_str::<Value>(&hit.payload).unwrap_or_else(|e| {
        warn!(
            "Malformed payload for item {} in '{}': {}",
            hit.item_id, collection, e
        );
        Value::Null
    });

    RankedResult {
        collection,
        item_id: hit.item_id,
        name: hit.name,
        similarity: hit.similarity,
        payload,
    }
}
