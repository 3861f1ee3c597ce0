// ── Scoring: Similarity-Dependent Feature Extractors ───────────────────────
//
// The three signals that need to know what the store already holds:
// repetition, context_anchoring, novelty. All three are computed from ONE
// shared `recall` call so scoring stays O(1) in external calls.
//
// This lookup must never fail the scoring operation: on a collaborator
// error every signal falls back to a neutral 3 ("unknown, lean
// uninteresting") and scoring proceeds.

use log::warn;

use crate::atoms::traits::MemoryStore;
use crate::atoms::types::MemoryTier;

/// Content shorter than this skips the recall entirely.
const MIN_QUERY_LEN: usize = 20;

/// How many neighbors the shared recall fetches.
const RECALL_LIMIT: usize = 5;

/// Neutral value substituted for all three signals when the collaborator
/// errors out.
const FALLBACK_SCORE: u8 = 3;

/// The recall-backed slice of the factor vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityFactors {
    pub repetition: u8,
    pub context_anchoring: u8,
    pub novelty: u8,
}

impl SimilarityFactors {
    /// Values for content with no similar neighbors: nothing repeated,
    /// nothing anchoring, fully novel.
    fn no_neighbors() -> Self {
        Self { repetition: 0, context_anchoring: 0, novelty: 10 }
    }

    fn collaborator_down() -> Self {
        Self {
            repetition: FALLBACK_SCORE,
            context_anchoring: FALLBACK_SCORE,
            novelty: FALLBACK_SCORE,
        }
    }
}

/// Compute repetition / context_anchoring / novelty against the store.
///
/// One `recall` over the full concatenated content; all three signals
/// consume the same result set. Sub-20-char content is treated as having
/// no neighbors (the neutral-3 fallback is reserved for actual errors).
pub async fn similarity_factors(store: &dyn MemoryStore, content: &str) -> SimilarityFactors {
    if content.len() < MIN_QUERY_LEN {
        return SimilarityFactors::no_neighbors();
    }

    let results = match store.recall(content, RECALL_LIMIT, None).await {
        Ok(results) => results,
        Err(e) => {
            warn!("[scoring] recall failed, using neutral similarity factors: {}", e);
            return SimilarityFactors::collaborator_down();
        }
    };

    if results.is_empty() {
        return SimilarityFactors::no_neighbors();
    }

    // repetition: high similarity to existing memories ⇒ high score
    let avg_relevance: f64 =
        results.iter().map(|r| r.relevance_score).sum::<f64>() / results.len() as f64;
    let repetition = (avg_relevance * 10.0).round().clamp(0.0, 10.0) as u8;

    // context_anchoring: high-value neighbors pull the content in
    let explicit_neighbors =
        results.iter().filter(|r| r.metadata.tier == MemoryTier::Explicit).count();
    let silent_neighbors =
        results.iter().filter(|r| r.metadata.tier == MemoryTier::Silent).count();
    let context_anchoring = (explicit_neighbors * 3 + silent_neighbors * 2).min(10) as u8;

    // novelty: inverse of similarity. Computed independently from the same
    // result set, NOT derived as `10 - repetition`; the two may diverge
    // by a point of rounding.
    let novelty = ((1.0 - avg_relevance) * 10.0).round().clamp(0.0, 10.0) as u8;

    SimilarityFactors { repetition, context_anchoring, novelty }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
