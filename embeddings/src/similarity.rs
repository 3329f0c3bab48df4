//! Similarity computation for embeddings.

use std::cmp::Reverse;
use std::collections::HashMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal (or either vector is zero)
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// A similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// ID of the matched item.
    pub id: String,

    /// Cosine similarity, or `None` when the item had no usable embedding.
    pub score: Option<f32>,
}

impl SimilarityResult {
    pub fn scored(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score: Some(score),
        }
    }

    pub fn unranked(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: None,
        }
    }
}

/// Rank `candidate_ids` against `query`.
///
/// Candidates with a vector in `vectors` come first, by descending score;
/// equal scores keep candidate order. Candidates without a vector, or whose
/// vector has a different dimension, follow in candidate order with no score.
/// The output always has exactly one entry per candidate.
pub fn rank_candidates(
    query: &[f32],
    candidate_ids: &[String],
    vectors: &HashMap<String, Embedding>,
) -> Vec<SimilarityResult> {
    let mut scored: Vec<SimilarityResult> = Vec::with_capacity(candidate_ids.len());
    let mut missing: Vec<SimilarityResult> = Vec::new();

    for id in candidate_ids {
        let Some(embedding) = vectors.get(id) else {
            missing.push(SimilarityResult::unranked(id.as_str()));
            continue;
        };

        match cosine_similarity(query, embedding) {
            Ok(score) => scored.push(SimilarityResult::scored(id.as_str(), score)),
            Err(e) => {
                warn!("Skipping stored embedding for {id}: {e}");
                missing.push(SimilarityResult::unranked(id.as_str()));
            }
        }
    }

    // `sort_by_key` is stable, which keeps ties in candidate order.
    scored.sort_by_key(|r| Reverse(OrderedFloat(r.score.unwrap_or(f32::NEG_INFINITY))));
    scored.extend(missing);
    scored
}

/// Normalize an embedding to unit length.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}
