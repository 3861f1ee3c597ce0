// ── Scoring: Importance Pipeline ───────────────────────────────────────────
//
// Turns a conversation into {score, tier, reasoning, recommended action}.
//
// Pipeline per call:
//   1. Disabled short-circuit – canned result from default_tier
//   2. Gating short-circuit   – trivial result for short/sparse chatter
//   3. External-model scorer  – if configured; falls back on any failure
//   4. Heuristic extractors   – pure lexicon signals (heuristics.rs)
//   5. Similarity extractors  – one shared recall (similarity.rs)
//   6. Weighted aggregation   – calculate_weighted_score
//   7. Tier classification    – ScoringConfig::tier_for + action resolver
//
// The engine holds no mutable state beyond the config snapshot, which is
// replaced wholesale on update. Scoring never returns an error: backend
// and model failures degrade to neutral signals or the heuristic path.

pub mod heuristics;
pub mod similarity;

use std::cmp::Ordering;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;
use reqwest::Client;

use crate::atoms::error::EngineResult;
use crate::atoms::traits::MemoryStore;
use crate::atoms::types::{
    CleanupReport, ConversationSegment, HealthStatus, MemoryTier, RecommendedAction,
    ReinforcementReport, ScoringConfig, ScoringFactors, ScoringResult,
};
use crate::engine::lifecycle;
use crate::engine::llm_scorer;

// ═══════════════════════════════════════════════════════════════════════════
// Aggregation Weights
// ═══════════════════════════════════════════════════════════════════════════

const W_EXPLICIT_EMPHASIS: f64 = 2.0;
const W_EMOTIONAL_WEIGHT: f64 = 1.5;
const W_FUTURE_UTILITY: f64 = 1.8;
const W_REPETITION: f64 = 1.3;
const W_TIME_SENSITIVITY: f64 = 1.5;
const W_CONTEXT_ANCHORING: f64 = 1.2;
const W_NOVELTY: f64 = 1.0;

/// Fixed score of the gated ("trivial") result.
const TRIVIAL_SCORE: u8 = 2;

// ═══════════════════════════════════════════════════════════════════════════
// Pure Aggregation & Classification
// ═══════════════════════════════════════════════════════════════════════════

fn weighted_table(f: &ScoringFactors) -> [(&'static str, u8, f64); 7] {
    [
        ("explicit_emphasis", f.explicit_emphasis, W_EXPLICIT_EMPHASIS),
        ("emotional_weight", f.emotional_weight, W_EMOTIONAL_WEIGHT),
        ("future_utility", f.future_utility, W_FUTURE_UTILITY),
        ("repetition", f.repetition, W_REPETITION),
        ("time_sensitivity", f.time_sensitivity, W_TIME_SENSITIVITY),
        ("context_anchoring", f.context_anchoring, W_CONTEXT_ANCHORING),
        ("novelty", f.novelty, W_NOVELTY),
    ]
}

/// Weighted linear combination normalized into 0..=10.
/// Pure and deterministic: identical factor vectors always produce the
/// same integer.
pub fn calculate_weighted_score(factors: &ScoringFactors) -> u8 {
    let table = weighted_table(factors);
    let weighted_sum: f64 = table.iter().map(|(_, v, w)| *v as f64 * w).sum();
    let max_sum: f64 = table.iter().map(|(_, _, w)| 10.0 * w).sum();
    let score = (weighted_sum / max_sum * 10.0).round() as u8;
    score.min(10)
}

fn action_for_tier(tier: MemoryTier) -> RecommendedAction {
    match tier {
        MemoryTier::Explicit => RecommendedAction::StoreExplicit,
        MemoryTier::Silent => RecommendedAction::StoreSilent,
        MemoryTier::Ephemeral => RecommendedAction::StoreEphemeral,
    }
}

/// Assemble the final result from a score. An emphasis marker floors the
/// score at the explicit threshold, so the marker guarantees the top tier
/// no matter what the other factors (or the external model) said.
fn finish_result(
    score: u8,
    has_emphasis: bool,
    reasoning: String,
    config: &ScoringConfig,
) -> ScoringResult {
    let score = if has_emphasis { score.max(config.explicit_threshold) } else { score };
    let tier = config.tier_for(score);
    let action = if has_emphasis { RecommendedAction::StoreExplicit } else { action_for_tier(tier) };

    ScoringResult {
        score,
        tier,
        reasoning,
        expires_in_hours: config.expiry_hours_for(tier),
        recommended_action: action,
    }
}

/// Name the top contributing signals. Log/UI aid only.
fn build_reasoning(score: u8, factors: &ScoringFactors, has_emphasis: bool) -> String {
    let mut table = weighted_table(factors);
    table.sort_by(|a, b| {
        let (ca, cb) = (a.1 as f64 * a.2, b.1 as f64 * b.2);
        cb.partial_cmp(&ca).unwrap_or(Ordering::Equal)
    });
    let top: Vec<String> =
        table.iter().take(3).map(|(name, value, _)| format!("{}={}", name, value)).collect();

    if has_emphasis {
        format!("score {}/10 — explicit marker present; top signals: {}", score, top.join(", "))
    } else {
        format!("score {}/10 — top signals: {}", score, top.join(", "))
    }
}

fn disabled_result(config: &ScoringConfig) -> ScoringResult {
    let tier = config.default_tier;
    let score = match tier {
        MemoryTier::Explicit => 9,
        MemoryTier::Silent => 6,
        MemoryTier::Ephemeral => 3,
    };
    ScoringResult {
        score,
        tier,
        reasoning: format!("scoring disabled — defaulting to {} tier", tier.as_str()),
        expires_in_hours: config.expiry_hours_for(tier),
        recommended_action: action_for_tier(tier),
    }
}

fn trivial_result(config: &ScoringConfig) -> ScoringResult {
    ScoringResult {
        score: TRIVIAL_SCORE,
        tier: MemoryTier::Ephemeral,
        reasoning: "trivial".to_string(),
        expires_in_hours: config.expiry_hours_for(MemoryTier::Ephemeral),
        recommended_action: RecommendedAction::StoreEphemeral,
    }
}

/// Full factor vector: pure lexicon signals plus the recall-backed trio.
async fn gather_factors(
    store: &dyn MemoryStore,
    content: &str,
    segment_count: usize,
) -> ScoringFactors {
    let sim = similarity::similarity_factors(store, content).await;
    ScoringFactors {
        explicit_emphasis: heuristics::explicit_emphasis(content),
        emotional_weight: heuristics::emotional_weight(content),
        future_utility: heuristics::future_utility(content, segment_count),
        repetition: sim.repetition,
        time_sensitivity: heuristics::time_sensitivity(content),
        context_anchoring: sim.context_anchoring,
        novelty: sim.novelty,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MemoryEngine
// ═══════════════════════════════════════════════════════════════════════════

/// The importance-scoring and lifecycle engine. Stateless aggregation
/// logic over an injected storage collaborator; safe to call concurrently
/// from the host, since the only shared state is the config snapshot.
pub struct MemoryEngine {
    store: Arc<dyn MemoryStore>,
    config: RwLock<Arc<ScoringConfig>>,
    http: Client,
}

impl MemoryEngine {
    /// Construct with a validated config. An invalid threshold pair is a
    /// hard error: the engine must not start in a broken state.
    pub fn new(store: Arc<dyn MemoryStore>, config: ScoringConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: RwLock::new(Arc::new(config)),
            http: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        })
    }

    /// Current config snapshot.
    pub fn config(&self) -> Arc<ScoringConfig> {
        self.config.read().clone()
    }

    /// Replace the config wholesale. A violating threshold pair is logged
    /// and the previous valid pair retained, while unrelated fields still
    /// apply; a config that remains invalid even with the old thresholds
    /// is dropped entirely.
    pub fn update_config(&self, new: ScoringConfig) {
        let replacement = match new.validate() {
            Ok(()) => new,
            Err(e) => {
                let current = self.config();
                warn!("[scoring] config update has invalid thresholds, keeping {}..{}: {}",
                    current.ephemeral_threshold, current.explicit_threshold, e);
                let merged = ScoringConfig {
                    explicit_threshold: current.explicit_threshold,
                    ephemeral_threshold: current.ephemeral_threshold,
                    ..new
                };
                match merged.validate() {
                    Ok(()) => merged,
                    Err(e) => {
                        warn!("[scoring] config update rejected entirely: {}", e);
                        return;
                    }
                }
            }
        };
        *self.config.write() = Arc::new(replacement);
    }

    /// Score a conversation. Never fails: backend errors degrade to
    /// neutral signals, model errors fall back to the heuristic path,
    /// and the caller always receives a well-formed result.
    pub async fn score_conversation(&self, segments: &[ConversationSegment]) -> ScoringResult {
        let config = self.config();

        if !config.enabled {
            return disabled_result(&config);
        }

        let content =
            segments.iter().map(|s| s.content.as_str()).collect::<Vec<_>>().join("\n");
        let has_emphasis = heuristics::has_emphasis_marker(&content);

        // Gating: don't waste a recall on greetings
        if (content.len() < config.min_conversation_length
            || segments.len() < config.min_message_count)
            && !has_emphasis
        {
            return trivial_result(&config);
        }

        // External-model delegation, heuristics as the fallback
        if let Some(llm) = &config.llm {
            match llm_scorer::score_with_model(&self.http, llm, &config, segments).await {
                Ok(verdict) => {
                    // Authoritative tier comes from the score, not the label
                    let derived = config.tier_for(verdict.score);
                    if verdict.tier_label != derived.as_str() {
                        info!(
                            "[llm] tier label \"{}\" disagrees with derived \"{}\" — using derived",
                            verdict.tier_label,
                            derived.as_str()
                        );
                    }
                    return finish_result(verdict.score, has_emphasis, verdict.reasoning, &config);
                }
                Err(e) => {
                    warn!("[llm] model scoring failed, falling back to heuristics: {}", e);
                }
            }
        }

        let factors = gather_factors(self.store.as_ref(), &content, segments.len()).await;
        let score = calculate_weighted_score(&factors);
        let reasoning = build_reasoning(score, &factors, has_emphasis);
        finish_result(score, has_emphasis, reasoning, &config)
    }

    // ── Lifecycle passthroughs ─────────────────────────────────────────

    /// Delegate the expiry sweep to the collaborator (see lifecycle.rs).
    pub async fn cleanup_expired_memories(&self) -> CleanupReport {
        lifecycle::cleanup_expired_memories(self.store.as_ref()).await
    }

    /// Run one reinforcement-processing pass (see lifecycle.rs).
    pub async fn process_reinforcements(&self) -> ReinforcementReport {
        let config = self.config();
        lifecycle::process_reinforcements(self.store.as_ref(), &config).await
    }

    /// Prepare the collaborator. Idempotent.
    pub async fn initialize(&self) -> EngineResult<()> {
        self.store.initialize().await
    }

    /// Release the collaborator. Idempotent.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.store.shutdown().await
    }

    /// Probe the collaborator, degrading to unhealthy instead of erroring.
    pub async fn health_check(&self) -> HealthStatus {
        match self.store.health_check().await {
            Ok(status) => status,
            Err(e) => {
                warn!("[scoring] health check failed: {}", e);
                HealthStatus { healthy: false, backend: "unavailable".to_string() }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::LlmScorerConfig;
    use crate::engine::fakes::FakeMemoryStore;

    fn engine_with(store: Arc<FakeMemoryStore>, config: ScoringConfig) -> MemoryEngine {
        MemoryEngine::new(store, config).expect("valid config")
    }

    // ── Aggregator ─────────────────────────────────────────────────────

    #[test]
    fn test_weighted_score_deterministic() {
        let factors = ScoringFactors {
            explicit_emphasis: 10,
            emotional_weight: 4,
            future_utility: 7,
            repetition: 2,
            time_sensitivity: 0,
            context_anchoring: 5,
            novelty: 8,
        };
        let first = calculate_weighted_score(&factors);
        for _ in 0..10 {
            assert_eq!(calculate_weighted_score(&factors), first);
        }
    }

    #[test]
    fn test_weighted_score_bounds() {
        let zeros = ScoringFactors::default();
        assert_eq!(calculate_weighted_score(&zeros), 0);

        let tens = ScoringFactors {
            explicit_emphasis: 10,
            emotional_weight: 10,
            future_utility: 10,
            repetition: 10,
            time_sensitivity: 10,
            context_anchoring: 10,
            novelty: 10,
        };
        assert_eq!(calculate_weighted_score(&tens), 10);
    }

    #[test]
    fn test_weighted_score_known_value() {
        // 10*2.0 + 2*1.5 + 5*1.8 + 10*1.0 = 42; 42/103*10 ≈ 4.08 → 4
        let factors = ScoringFactors {
            explicit_emphasis: 10,
            emotional_weight: 2,
            future_utility: 5,
            novelty: 10,
            ..Default::default()
        };
        assert_eq!(calculate_weighted_score(&factors), 4);
    }

    // ── Classifier & short-circuits ────────────────────────────────────

    #[tokio::test]
    async fn test_disabled_engine_returns_canned_result() {
        let config = ScoringConfig {
            enabled: false,
            default_tier: MemoryTier::Silent,
            ..Default::default()
        };
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), config);

        let result = engine
            .score_conversation(&[ConversationSegment::user("please remember my api key")])
            .await;
        assert_eq!(result.score, 6);
        assert_eq!(result.tier, MemoryTier::Silent);
        assert_eq!(result.recommended_action, RecommendedAction::StoreSilent);
    }

    #[tokio::test]
    async fn test_gating_returns_trivial_result() {
        let store = Arc::new(FakeMemoryStore::new());
        let engine = engine_with(store.clone(), ScoringConfig::default());

        let result = engine.score_conversation(&[ConversationSegment::user("hi")]).await;
        assert_eq!(result.score, 2);
        assert_eq!(result.tier, MemoryTier::Ephemeral);
        assert_eq!(result.recommended_action, RecommendedAction::StoreEphemeral);
        assert_eq!(result.reasoning, "trivial");
        assert_eq!(store.recall_calls(), 0, "gated scoring must not hit the store");
    }

    #[tokio::test]
    async fn test_gating_bypassed_by_emphasis_marker() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());

        // Short, but carries an explicit marker: must not gate
        let result = engine.score_conversation(&[ConversationSegment::user("remember: 42")]).await;
        assert_eq!(result.recommended_action, RecommendedAction::StoreExplicit);
        assert_eq!(result.tier, MemoryTier::Explicit);
    }

    #[tokio::test]
    async fn test_round_trip_explicit_marker() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());

        let result = engine
            .score_conversation(&[ConversationSegment::user(
                "I really love dark mode, please remember this forever",
            )])
            .await;
        assert_eq!(result.tier, MemoryTier::Explicit);
        assert_eq!(result.recommended_action, RecommendedAction::StoreExplicit);
        assert_eq!(result.expires_in_hours, None, "explicit memories never expire");
    }

    #[tokio::test]
    async fn test_plain_chatter_lands_below_explicit() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());

        let result = engine
            .score_conversation(&[ConversationSegment::user(
                "the weather was reasonably pleasant on the walk home",
            )])
            .await;
        assert!(result.tier != MemoryTier::Explicit);
        assert!(result.expires_in_hours.is_some());
    }

    #[tokio::test]
    async fn test_recall_failure_still_yields_valid_result() {
        let store = Arc::new(FakeMemoryStore::new());
        store.fail_recall();
        let engine = engine_with(store, ScoringConfig::default());

        let result = engine
            .score_conversation(&[ConversationSegment::user(
                "my deployment workflow runs through the staging cluster",
            )])
            .await;
        assert!(result.score <= 10);
        assert!(result.expires_in_hours.is_some() || result.tier == MemoryTier::Explicit);
    }

    #[tokio::test]
    async fn test_expiry_follows_tier() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());

        let result = engine
            .score_conversation(&[ConversationSegment::user(
                "my api key for the staging cluster is rotated monthly",
            )])
            .await;
        match result.tier {
            MemoryTier::Explicit => assert_eq!(result.expires_in_hours, None),
            MemoryTier::Silent => assert_eq!(result.expires_in_hours, Some(30 * 24)),
            MemoryTier::Ephemeral => assert_eq!(result.expires_in_hours, Some(72)),
        }
    }

    // ── Config lifecycle ───────────────────────────────────────────────

    #[test]
    fn test_construction_rejects_invalid_thresholds() {
        let config = ScoringConfig {
            explicit_threshold: 3,
            ephemeral_threshold: 8,
            ..Default::default()
        };
        assert!(MemoryEngine::new(Arc::new(FakeMemoryStore::new()), config).is_err());
    }

    #[test]
    fn test_update_config_keeps_thresholds_on_violation() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());

        engine.update_config(ScoringConfig {
            explicit_threshold: 2,
            ephemeral_threshold: 9,
            default_ephemeral_hours: 48,
            ..Default::default()
        });

        let config = engine.config();
        assert_eq!(config.explicit_threshold, 7, "previous valid threshold retained");
        assert_eq!(config.ephemeral_threshold, 4);
        assert_eq!(config.default_ephemeral_hours, 48, "unrelated fields still apply");
    }

    #[test]
    fn test_update_config_applies_valid_thresholds() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());
        engine.update_config(ScoringConfig {
            explicit_threshold: 9,
            ephemeral_threshold: 2,
            ..Default::default()
        });
        let config = engine.config();
        assert_eq!(config.explicit_threshold, 9);
        assert_eq!(config.ephemeral_threshold, 2);
    }

    // ── External-model fallback ────────────────────────────────────────

    #[tokio::test]
    async fn test_unreachable_model_falls_back_to_heuristics() {
        let input = [ConversationSegment::user(
            "I prefer dark mode and my editor config lives in dotfiles",
        )];

        let heuristic_engine =
            engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());
        let expected = heuristic_engine.score_conversation(&input).await;

        let llm_config = ScoringConfig {
            llm: Some(LlmScorerConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                api_key: None,
                model: "rater".to_string(),
                timeout_secs: 2,
                temperature: 0.1,
                max_tokens: 256,
            }),
            ..Default::default()
        };
        let llm_engine = engine_with(Arc::new(FakeMemoryStore::new()), llm_config);
        let result = llm_engine.score_conversation(&input).await;

        assert_eq!(result, expected, "fallback must be indistinguishable from heuristics");
    }

    // ── Health ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_health_check_passthrough() {
        let engine = engine_with(Arc::new(FakeMemoryStore::new()), ScoringConfig::default());
        let health = engine.health_check().await;
        assert!(health.healthy);
        assert_eq!(health.backend, "fake");
    }
}
