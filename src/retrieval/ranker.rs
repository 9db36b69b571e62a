//! Pure similarity ranking.
//!
//! Everything here is deterministic and allocation-light: given a query
//! vector and candidates, compute cosine similarities, order descending,
//! break ties by input order, and cap at top-k. No store access, no
//! mutation of the caller's data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::lancedb::Collection;

/// A scoring candidate: an item with the vector it was indexed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item_id: i64,
    pub name: String,
    pub payload: Value,
    pub vector: Vec<f32>,
}

/// One ranked retrieval result, ordered descending by similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub collection: Collection,
    pub item_id: i64,
    pub name: String,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
    pub payload: Value,
}

/// Cosine similarity of two vectors. Returns 0.0 for mismatched lengths
/// or zero-magnitude inputs so degenerate candidates sink to the bottom
/// instead of poisoning the ordering with NaN.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() { similarity } else { 0.0 }
}

/// Rank candidates against a query vector and keep the top `k`.
///
/// Returns at most `min(k, candidates.len())` results sorted by
/// non-increasing similarity. Equal scores preserve candidate order
/// (stable sort, first seen wins). Empty input yields an empty list.
#[inline]
pub fn rank(
    query_vector: &[f32],
    candidates: &[Candidate],
    collection: Collection,
    k: usize,
) -> Vec<RankedResult> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut results: Vec<RankedResult> = candidates
        .iter()
        .map(|candidate| RankedResult {
            collection,
            item_id: candidate.item_id,
            name: candidate.name.clone(),
            similarity: cosine_similarity(query_vector, &candidate.vector),
            payload: candidate.payload.clone(),
        })
        .collect();

    sort_and_cap(&mut results, k);
    results
}

/// Re-rank an already-scored result set, used when merging hits from
/// several collections into one list. Same ordering rules as [`rank`].
#[inline]
pub fn rerank_merged(mut results: Vec<RankedResult>, k: usize) -> Vec<RankedResult> {
    sort_and_cap(&mut results, k);
    results
}

fn sort_and_cap(results: &mut Vec<RankedResult>, k: usize) {
    // Stable sort: equal similarities keep their input order.
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);
}
