// Advisor module
// The request pipeline: retrieve grounding context, generate an answer,
// and degrade tier by tier when providers fail

#[cfg(test)]
mod tests;

pub mod fallback;
pub mod prompt;
pub mod recommend;
pub mod session;

pub use recommend::{
    ProductRecommendation, RecommendationOutcome, RecommendationPayload, expand_concerns,
    format_price,
};
pub use session::SessionStore;

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::database::sqlite::Database;
use crate::generation::{ChatMessage, Generator, TokenUsage};
use crate::retrieval::{Collection, RankedResult, Retriever};
use crate::{AdvisorError, Result};

/// Where an answer came from. `Generated` is the full pipeline;
/// `RetrievalOnly` skipped the LLM; `Canned` touched no provider at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Generated,
    RetrievalOnly,
    Canned,
}

/// A reference to evidence backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub label: String,
    pub similarity: f32,
}

/// A completed chat turn, always well-formed regardless of which
/// degradation tier produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub tokens: TokenUsage,
    pub source: AnswerSource,
    pub using_memory: bool,
}

impl ChatOutcome {
    /// Whether retrieval grounded this answer. False only for canned
    /// fallback content, so consumers can assert on provenance.
    #[inline]
    pub fn using_rag(&self) -> bool {
        self.source != AnswerSource::Canned
    }
}

/// Health of the primary pipeline. Degraded state carries the reason for
/// the most recent fallback and clears on the next fully successful
/// call; there is no latch, every call re-attempts the primary path.
#[derive(Debug, Default)]
pub struct HealthState {
    degraded_reason: Mutex<Option<String>>,
}

impl HealthState {
    #[inline]
    pub fn mark_healthy(&self) {
        if let Ok(mut reason) = self.degraded_reason.lock() {
            if reason.take().is_some() {
                info!("Pipeline recovered, clearing degraded state");
            }
        }
    }

    #[inline]
    pub fn mark_degraded(&self, new_reason: String) {
        if let Ok(mut reason) = self.degraded_reason.lock() {
            *reason = Some(new_reason);
        }
    }

    #[inline]
    pub fn degraded_reason(&self) -> Option<String> {
        self.degraded_reason
            .lock()
            .map(|reason| reason.clone())
            .unwrap_or(None)
    }

    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.degraded_reason().is_none()
    }
}

/// The advisory pipeline with layered fallback.
///
/// Tier 1: embed, retrieve, generate a grounded answer.
/// Tier 2: on generation failure only, format raw retrieval results.
/// Tier 3: on embedding or store failure, serve canned content.
/// Anything else (configuration, IO, bugs) propagates untouched.
pub struct Advisor {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    database: Arc<Database>,
    sessions: SessionStore,
    health: HealthState,
    /// Results per retrieval, for chat context and recommendations alike
    top_k: usize,
}

impl Advisor {
    #[inline]
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        database: Arc<Database>,
        retrieval_config: &RetrievalConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            database,
            sessions: SessionStore::new(),
            health: HealthState::default(),
            top_k: retrieval_config.recommend_top_k,
        }
    }

    #[inline]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[inline]
    pub fn health(&self) -> &HealthState {
        &self.health
    }

    /// Answer a user message within a session.
    ///
    /// Never fails for provider unavailability; those cases produce a
    /// lower-tier answer instead. Only unrelated errors escape.
    #[inline]
    pub async fn answer(&self, session_id: &str, message: &str) -> Result<ChatOutcome> {
        let history = self.sessions.history(session_id);
        let using_memory = !history.is_empty();

        let (answer, sources, tokens, source) =
            match self.grounded_answer(message, &history).await {
                Ok(grounded) => {
                    self.health.mark_healthy();
                    grounded
                }
                Err(error) => self.fallback_answer(message, error)?,
            };

        self.sessions.append_exchange(
            session_id,
            ChatMessage::user(message),
            ChatMessage::assistant(answer.clone()),
        );

        Ok(ChatOutcome {
            answer,
            sources,
            tokens,
            source,
            using_memory,
        })
    }

    /// Tiers 1 and 2: retrieval-grounded answering.
    async fn grounded_answer(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<(String, Vec<SourceRef>, TokenUsage, AnswerSource)> {
        let retrieval = self
            .retriever
            .retrieve_from(message, Collection::Products, self.top_k)
            .await?;

        let sources = source_refs(&retrieval.results);
        let context = prompt::build_context(&retrieval.results);
        let messages = prompt::build_messages(history, message, &context);

        match self.generator.generate(&messages) {
            Ok(completion) => {
                debug!("Generated grounded answer from {} sources", sources.len());
                Ok((
                    completion.content,
                    sources,
                    completion.tokens,
                    AnswerSource::Generated,
                ))
            }
            Err(AdvisorError::Generation(reason)) => {
                warn!("Generation failed, serving raw retrieval: {}", reason);
                self.health.mark_degraded(format!("generation: {}", reason));
                Ok((
                    format_retrieval_answer(&retrieval.results),
                    sources,
                    TokenUsage::default(),
                    AnswerSource::RetrievalOnly,
                ))
            }
            Err(other) => Err(other),
        }
    }

    /// Tier 3: canned content, selected purely by the kind of error the
    /// primary path produced.
    fn fallback_answer(
        &self,
        message: &str,
        error: AdvisorError,
    ) -> Result<(String, Vec<SourceRef>, TokenUsage, AnswerSource)> {
        let reason = match &error {
            AdvisorError::Embedding(reason) => format!("embedding: {}", reason),
            AdvisorError::Store(reason) => format!("store: {}", reason),
            AdvisorError::RetrievalUnavailable => "retrieval unavailable".to_string(),
            // Unrelated failures must not be masked as data unavailability.
            _ => return Err(error),
        };

        warn!("Primary pipeline failed ({}), serving canned answer", reason);
        self.health.mark_degraded(reason);

        let canned = fallback::canned_answer(message);
        Ok((
            canned.answer.to_string(),
            canned.source_refs(),
            TokenUsage::default(),
            AnswerSource::Canned,
        ))
    }

    /// Compose product recommendations for a set of named concerns.
    #[inline]
    pub async fn recommend_for_concerns(
        &self,
        concerns: &[String],
    ) -> Result<RecommendationPayload> {
        let query = expand_concerns(concerns);
        self.recommend_with_query(concerns.to_vec(), query).await
    }

    /// Compose product recommendations for a named skin condition,
    /// using its stored profile description as the query.
    #[inline]
    pub async fn recommend_for_condition(
        &self,
        condition_name: &str,
    ) -> Result<RecommendationPayload> {
        let condition = self
            .database
            .get_skin_condition_by_name(condition_name)
            .await
            .map_err(|e| AdvisorError::Store(format!("{:#}", e)))?
            .ok_or_else(|| {
                AdvisorError::NotFound(format!("Skin condition '{}' not found", condition_name))
            })?;

        self.recommend_with_query(vec![condition.name.clone()], condition.description)
            .await
    }

    async fn recommend_with_query(
        &self,
        concerns: Vec<String>,
        query: String,
    ) -> Result<RecommendationPayload> {
        if query.trim().is_empty() {
            return Ok(RecommendationPayload::from_results(concerns, query, &[]));
        }

        match self
            .retriever
            .retrieve_from(&query, Collection::Products, self.top_k)
            .await
        {
            Ok(outcome) => {
                self.health.mark_healthy();
                Ok(RecommendationPayload::from_results(
                    concerns,
                    query,
                    &outcome.results,
                ))
            }
            Err(
                error @ (AdvisorError::Embedding(_)
                | AdvisorError::Store(_)
                | AdvisorError::RetrievalUnavailable),
            ) => {
                let reason = error.to_string();
                warn!("Recommendation retrieval failed: {}", reason);
                self.health.mark_degraded(reason.clone());
                Ok(RecommendationPayload::unavailable(concerns, query, reason))
            }
            Err(other) => Err(other),
        }
    }
}

fn source_refs(results: &[RankedResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|result| SourceRef {
            label: result.name.clone(),
            similarity: result.similarity,
        })
        .collect()
}

/// Tier-2 answer: the retrieved products presented directly, without the
/// LLM's prose.
fn format_retrieval_answer(results: &[RankedResult]) -> String {
    if results.is_empty() {
        return "I couldn't generate a full answer right now. Could you tell me more about \
                your skin type or concerns so I can point you at suitable products?"
            .to_string();
    }

    let mut answer = String::from("I found some products that might help:\n\n");
    for result in results {
        let _ = write!(answer, "- {}", result.name);
        if let Some(benefits) = result.payload.get("keyBenefits").and_then(|v| v.as_str()) {
            let _ = write!(answer, ": {}", benefits);
        }
        answer.push('\n');
    }

    answer.trim_end().to_string()
}
