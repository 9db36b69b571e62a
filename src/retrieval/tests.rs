use super::*;
use crate::config::{Config, OllamaConfig};
use crate::database::lancedb::{EmbeddingRecord, ItemMetadata};
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;

/// Deterministic embedder mapping known phrases to fixed unit vectors.
struct StaticEmbedder {
    vectors: HashMap<&'static str, Vec<f32>>,
    default: Vec<f32>,
}

impl StaticEmbedder {
    fn new() -> Self {
        let mut vectors = HashMap::new();
        vectors.insert("cleanser query", vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        vectors.insert("moisturizer query", vec![0.0, 1.0, 0.0, 0.0, 0.0]);
        vectors.insert("redness query", vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        Self {
            vectors,
            default: vec![0.5, 0.5, 0.0, 0.0, 0.0],
        }
    }
}

impl Embedder for StaticEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Embedder that always fails, simulating an offline provider.
struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(AdvisorError::Embedding("provider offline".to_string()))
    }
}

fn record(item_id: i64, name: &str, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: item_id.to_string(),
        vector,
        metadata: ItemMetadata {
            item_id,
            name: name.to_string(),
            payload: json!({"id": item_id, "name": name}).to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        },
    }
}

async fn seeded_store() -> (Arc<VectorStore>, TempDir, Config) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ollama: OllamaConfig {
            embedding_dimension: 5,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };

    let store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .upsert_embeddings(
            Collection::Products,
            vec![
                record(1, "Foaming Cleanser", vec![0.95, 0.05, 0.0, 0.0, 0.0]),
                record(2, "Rich Moisturizer", vec![0.05, 0.95, 0.0, 0.0, 0.0]),
                record(3, "Calming Serum", vec![0.1, 0.1, 0.8, 0.0, 0.0]),
            ],
        )
        .await
        .expect("should seed products");

    store
        .upsert_embeddings(
            Collection::SkinConditions,
            vec![
                record(1, "Redness", vec![0.0, 0.0, 1.0, 0.0, 0.0]),
                record(2, "Dry Skin", vec![0.0, 0.9, 0.1, 0.0, 0.0]),
            ],
        )
        .await
        .expect("should seed conditions");

    (Arc::new(store), temp_dir, config)
}

/// Drop a collection's table out from under the retriever to simulate a
/// store-side failure for that collection only.
async fn sabotage_collection(config: &Config, collection: Collection) {
    let uri = format!("file://{}", config.vector_database_path().display());
    let connection = lancedb::connect(&uri)
        .execute()
        .await
        .expect("should connect to vector db");
    connection
        .drop_table(collection.table_name())
        .await
        .expect("should drop table");
}

#[tokio::test]
async fn single_collection_retrieval_ranks_by_similarity() {
    let (store, _temp_dir, _config) = seeded_store().await;
    let retriever = Retriever::new(Arc::new(StaticEmbedder::new()), store);

    let outcome = retriever
        .retrieve_from("cleanser query", Collection::Products, 2)
        .await
        .expect("retrieval should succeed");

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].name, "Foaming Cleanser");
    assert!(outcome.results[0].similarity >= outcome.results[1].similarity);
    assert!(outcome.failures.is_empty());
    assert!(!outcome.is_partial());

    // Payload is parsed once at the boundary.
    assert_eq!(outcome.results[0].payload["name"], "Foaming Cleanser");
}

#[tokio::test]
async fn multi_collection_retrieval_merges_and_reranks() {
    let (store, _temp_dir, _config) = seeded_store().await;
    let retriever = Retriever::new(Arc::new(StaticEmbedder::new()), store);

    let outcome = retriever
        .retrieve("redness query", &Collection::ALL, 3)
        .await
        .expect("retrieval should succeed");

    assert_eq!(outcome.results.len(), 3);
    // The exact-match condition vector outranks the calming product.
    assert_eq!(outcome.results[0].collection, Collection::SkinConditions);
    assert_eq!(outcome.results[0].name, "Redness");
    assert!(
        outcome
            .results
            .windows(2)
            .all(|pair| pair[0].similarity >= pair[1].similarity)
    );
}

#[tokio::test]
async fn multi_collection_caps_at_top_k() {
    let (store, _temp_dir, _config) = seeded_store().await;
    let retriever = Retriever::new(Arc::new(StaticEmbedder::new()), store);

    let outcome = retriever
        .retrieve("moisturizer query", &Collection::ALL, 2)
        .await
        .expect("retrieval should succeed");

    // Five items exist across both collections; the merge must cap at 2.
    assert_eq!(outcome.results.len(), 2);
}

#[tokio::test]
async fn partial_failure_returns_surviving_collection() {
    let (store, _temp_dir, config) = seeded_store().await;
    sabotage_collection(&config, Collection::SkinConditions).await;

    let retriever = Retriever::new(Arc::new(StaticEmbedder::new()), store);
    let outcome = retriever
        .retrieve("cleanser query", &Collection::ALL, 3)
        .await
        .expect("partial retrieval should still succeed");

    assert!(!outcome.results.is_empty());
    assert!(
        outcome
            .results
            .iter()
            .all(|r| r.collection == Collection::Products)
    );
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].collection, Collection::SkinConditions);
    assert!(outcome.is_partial());
}

#[tokio::test]
async fn total_failure_signals_retrieval_unavailable() {
    let (store, _temp_dir, config) = seeded_store().await;
    sabotage_collection(&config, Collection::Products).await;
    sabotage_collection(&config, Collection::SkinConditions).await;

    let retriever = Retriever::new(Arc::new(StaticEmbedder::new()), store);
    let error = retriever
        .retrieve("cleanser query", &Collection::ALL, 3)
        .await
        .expect_err("all collections failing should error");

    assert!(matches!(error, AdvisorError::RetrievalUnavailable));
}

#[tokio::test]
async fn embedding_failure_propagates_as_embedding_error() {
    let (store, _temp_dir, _config) = seeded_store().await;
    let retriever = Retriever::new(Arc::new(FailingEmbedder), store);

    let error = retriever
        .retrieve_from("anything", Collection::Products, 3)
        .await
        .expect_err("embedding failure should propagate");

    assert!(matches!(error, AdvisorError::Embedding(_)));
}

#[tokio::test]
async fn empty_collection_list_yields_empty_outcome() {
    let (store, _temp_dir, _config) = seeded_store().await;
    let retriever = Retriever::new(Arc::new(StaticEmbedder::new()), store);

    let outcome = retriever
        .retrieve("cleanser query", &[], 3)
        .await
        .expect("empty fan-out should succeed");

    assert!(outcome.results.is_empty());
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn retrieve_with_vector_skips_embedding() {
    let (store, _temp_dir, _config) = seeded_store().await;
    // A failing embedder proves the vector path never embeds.
    let retriever = Retriever::new(Arc::new(FailingEmbedder), store);

    let results = retriever
        .retrieve_with_vector(&[1.0, 0.0, 0.0, 0.0, 0.0], Collection::Products, 1)
        .await
        .expect("vector retrieval should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Foaming Cleanser");
}
