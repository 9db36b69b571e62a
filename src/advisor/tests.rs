use super::*;
use crate::config::{Config, OllamaConfig};
use crate::database::lancedb::vector_store::VectorStore;
use crate::database::lancedb::{EmbeddingRecord, ItemMetadata};
use crate::database::sqlite::models::NewSkinCondition;
use crate::embeddings::Embedder;
use crate::generation::Completion;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Keyword-routed embedder: acne-flavored text lands on one axis,
/// redness-flavored text on another.
struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        let text = text.to_lowercase();
        if text.contains("acne") || text.contains("breakout") {
            Ok(vec![1.0, 0.0, 0.0, 0.0, 0.0])
        } else if text.contains("redness") || text.contains("soothe") || text.contains("red skin") {
            Ok(vec![0.0, 1.0, 0.0, 0.0, 0.0])
        } else {
            Ok(vec![0.0, 0.0, 1.0, 0.0, 0.0])
        }
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(AdvisorError::Embedding("embedding model offline".to_string()))
    }
}

/// Fails on the first call, works afterwards. Used to check that the
/// degraded state clears on recovery.
struct FlakyEmbedder {
    failed_once: AtomicBool,
}

impl FlakyEmbedder {
    fn new() -> Self {
        Self {
            failed_once: AtomicBool::new(false),
        }
    }
}

impl Embedder for FlakyEmbedder {
    fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        if self.failed_once.swap(true, Ordering::SeqCst) {
            Ok(vec![1.0, 0.0, 0.0, 0.0, 0.0])
        } else {
            Err(AdvisorError::Embedding("first call fails".to_string()))
        }
    }
}

/// Embedder failing with an error class the fallback chain must NOT
/// swallow.
struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(AdvisorError::Other(anyhow::anyhow!("unexpected bug")))
    }
}

struct StaticGenerator;

impl Generator for StaticGenerator {
    fn generate(&self, messages: &[ChatMessage]) -> crate::Result<Completion> {
        Ok(Completion {
            content: format!("Generated answer from {} messages", messages.len()),
            tokens: TokenUsage {
                prompt: 40,
                completion: 25,
            },
        })
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _messages: &[ChatMessage]) -> crate::Result<Completion> {
        Err(AdvisorError::Generation("chat model offline".to_string()))
    }
}

struct TestHarness {
    advisor: Advisor,
    config: Config,
    _temp_dir: TempDir,
}

async fn build_advisor(
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
) -> TestHarness {
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
            crate::retrieval::Collection::Products,
            vec![
                EmbeddingRecord {
                    id: "1".to_string(),
                    vector: vec![1.0, 0.0, 0.0, 0.0, 0.0],
                    metadata: ItemMetadata {
                        item_id: 1,
                        name: "Clarifying Acne Gel".to_string(),
                        payload: json!({
                            "id": 1,
                            "name": "Clarifying Acne Gel",
                            "keyBenefits": "Treats breakouts",
                            "activeContent": "Salicylic Acid 2%",
                            "howToUse": "Apply nightly",
                            "price": 19.5
                        })
                        .to_string(),
                        created_at: "2025-01-01T00:00:00Z".to_string(),
                    },
                },
                EmbeddingRecord {
                    id: "2".to_string(),
                    vector: vec![0.0, 1.0, 0.0, 0.0, 0.0],
                    metadata: ItemMetadata {
                        item_id: 2,
                        name: "Soothing Cica Cream".to_string(),
                        payload: json!({
                            "id": 2,
                            "name": "Soothing Cica Cream",
                            "keyBenefits": "Calms redness",
                            "price": 24.0
                        })
                        .to_string(),
                        created_at: "2025-01-01T00:00:00Z".to_string(),
                    },
                },
            ],
        )
        .await
        .expect("should seed products");

    let database = Database::new(
        temp_dir
            .path()
            .join("metadata.db")
            .to_string_lossy()
            .as_ref(),
    )
    .await
    .expect("should create database");

    database
        .upsert_skin_condition(NewSkinCondition {
            name: "Redness".to_string(),
            description: "Products that calm and soothe red skin".to_string(),
        })
        .await
        .expect("should seed condition");

    let retriever = Retriever::new(embedder, Arc::new(store));
    let advisor = Advisor::new(
        retriever,
        generator,
        Arc::new(database),
        &config.retrieval,
    );

    TestHarness {
        advisor,
        config,
        _temp_dir: temp_dir,
    }
}

async fn sabotage_vector_store(config: &Config) {
    let uri = format!("file://{}", config.vector_database_path().display());
    let connection = lancedb::connect(&uri)
        .execute()
        .await
        .expect("should connect to vector db");
    for collection in crate::retrieval::Collection::ALL {
        connection
            .drop_table(collection.table_name())
            .await
            .expect("should drop table");
    }
}

#[tokio::test]
async fn full_pipeline_generates_grounded_answer() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;

    let outcome = harness
        .advisor
        .answer("s1", "what helps with acne breakouts?")
        .await
        .expect("answer should succeed");

    assert_eq!(outcome.source, AnswerSource::Generated);
    assert!(outcome.using_rag());
    assert!(!outcome.using_memory);
    assert!(outcome.answer.starts_with("Generated answer"));
    assert_eq!(outcome.tokens.prompt, 40);
    assert!(!outcome.sources.is_empty());
    assert_eq!(outcome.sources[0].label, "Clarifying Acne Gel");
    assert!(harness.advisor.health().is_healthy());
}

#[tokio::test]
async fn second_turn_uses_memory() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;

    let first = harness
        .advisor
        .answer("s1", "what helps with acne?")
        .await
        .expect("first answer should succeed");
    assert!(!first.using_memory);

    let second = harness
        .advisor
        .answer("s1", "and for redness?")
        .await
        .expect("second answer should succeed");
    assert!(second.using_memory);

    // Other sessions stay fresh.
    let other = harness
        .advisor
        .answer("s2", "hello")
        .await
        .expect("other session should succeed");
    assert!(!other.using_memory);
}

#[tokio::test]
async fn generation_failure_degrades_to_retrieval_only() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(FailingGenerator)).await;

    let outcome = harness
        .advisor
        .answer("s1", "what helps with acne?")
        .await
        .expect("answer should degrade, not fail");

    assert_eq!(outcome.source, AnswerSource::RetrievalOnly);
    assert!(outcome.using_rag());
    assert!(outcome.answer.contains("Clarifying Acne Gel"));
    assert_eq!(outcome.tokens, TokenUsage::default());

    let reason = harness
        .advisor
        .health()
        .degraded_reason()
        .expect("should be degraded");
    assert!(reason.contains("generation"));
}

#[tokio::test]
async fn embedding_failure_degrades_to_canned_answer() {
    let harness = build_advisor(Arc::new(FailingEmbedder), Arc::new(StaticGenerator)).await;

    let outcome = harness
        .advisor
        .answer("s1", "my skin is really oily")
        .await
        .expect("answer should degrade, not fail");

    assert_eq!(outcome.source, AnswerSource::Canned);
    assert!(!outcome.using_rag());
    assert!(!outcome.answer.is_empty());
    assert!(outcome.answer.contains("salicylic acid"));
    assert!(!harness.advisor.health().is_healthy());
}

#[tokio::test]
async fn store_failure_degrades_to_canned_answer() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;
    sabotage_vector_store(&harness.config).await;

    let outcome = harness
        .advisor
        .answer("s1", "help with wrinkles please")
        .await
        .expect("answer should degrade, not fail");

    assert_eq!(outcome.source, AnswerSource::Canned);
    assert!(!outcome.using_rag());
    assert!(outcome.answer.contains("retinoids"));
}

#[tokio::test]
async fn unrelated_errors_propagate_instead_of_degrading() {
    let harness = build_advisor(Arc::new(BrokenEmbedder), Arc::new(StaticGenerator)).await;

    let error = harness
        .advisor
        .answer("s1", "anything")
        .await
        .expect_err("unrelated errors must escape the fallback chain");

    assert!(matches!(error, AdvisorError::Other(_)));
}

#[tokio::test]
async fn degraded_state_clears_on_recovery() {
    let harness = build_advisor(Arc::new(FlakyEmbedder::new()), Arc::new(StaticGenerator)).await;

    let first = harness
        .advisor
        .answer("s1", "acne advice?")
        .await
        .expect("first answer should degrade");
    assert_eq!(first.source, AnswerSource::Canned);
    assert!(!harness.advisor.health().is_healthy());

    let second = harness
        .advisor
        .answer("s1", "acne advice again?")
        .await
        .expect("second answer should succeed");
    assert_eq!(second.source, AnswerSource::Generated);
    assert!(harness.advisor.health().is_healthy());
}

#[tokio::test]
async fn recommendations_for_acne_rank_acne_product_first() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;

    let payload = harness
        .advisor
        .recommend_for_concerns(&["acne".to_string()])
        .await
        .expect("recommendation should succeed");

    match &payload.outcome {
        RecommendationOutcome::Matches { products } => {
            assert_eq!(products[0].name, "Clarifying Acne Gel");
            assert_eq!(products[0].price.as_deref(), Some("$19.50"));
        }
        other => panic!("expected matches, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_concern_still_produces_a_query() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;

    let payload = harness
        .advisor
        .recommend_for_concerns(&["maskne".to_string()])
        .await
        .expect("recommendation should succeed");

    assert_eq!(payload.query, "maskne");
    assert!(!payload.query.is_empty());
}

#[tokio::test]
async fn empty_concerns_yield_no_matches_without_searching() {
    let harness = build_advisor(Arc::new(FailingEmbedder), Arc::new(StaticGenerator)).await;

    // The embedder would fail if a search were attempted; an empty query
    // short-circuits before it.
    let payload = harness
        .advisor
        .recommend_for_concerns(&[])
        .await
        .expect("empty concerns should not search");

    assert_eq!(payload.outcome, RecommendationOutcome::NoMatches);
}

#[tokio::test]
async fn unavailable_store_is_reported_distinctly_from_no_matches() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;
    sabotage_vector_store(&harness.config).await;

    let payload = harness
        .advisor
        .recommend_for_concerns(&["acne".to_string()])
        .await
        .expect("unavailability should produce a payload, not an error");

    assert!(matches!(
        payload.outcome,
        RecommendationOutcome::Unavailable { .. }
    ));
    assert_ne!(
        payload.render(),
        RecommendationPayload::from_results(vec![], String::new(), &[]).render()
    );
}

#[tokio::test]
async fn condition_recommendations_use_profile_description() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;

    let payload = harness
        .advisor
        .recommend_for_condition("redness")
        .await
        .expect("condition recommendation should succeed");

    assert!(payload.query.contains("soothe"));
    match &payload.outcome {
        RecommendationOutcome::Matches { products } => {
            assert_eq!(products[0].name, "Soothing Cica Cream");
        }
        other => panic!("expected matches, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_condition_surfaces_not_found() {
    let harness = build_advisor(Arc::new(KeywordEmbedder), Arc::new(StaticGenerator)).await;

    let error = harness
        .advisor
        .recommend_for_condition("rosacea")
        .await
        .expect_err("unknown condition should be NotFound");

    assert!(matches!(error, AdvisorError::NotFound(_)));
}
