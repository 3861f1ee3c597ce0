// ── Mnemo Atoms: Pure Data Types ──────────────────────────────────────────
// All plain struct/enum definitions with no logic beyond pure helpers.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.
//
// The retention model is three-tiered:
//   explicit  – permanent, never expires
//   silent    – medium-term, expires unless reinforced
//   ephemeral – short-term, auto-expiring within days

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::atoms::error::{EngineError, EngineResult};

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 1: Conversation Input
// ═══════════════════════════════════════════════════════════════════════════

/// Who produced a conversation segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged span of dialogue text considered for capture.
/// Built per capture event, scored once, then discarded. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSegment {
    pub content: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationSegment {
    pub fn user(content: impl Into<String>) -> Self {
        Self { content: content.into(), role: Role::User, timestamp: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { content: content.into(), role: Role::Assistant, timestamp: None }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 2: Tiers, Sources, Actions
// ═══════════════════════════════════════════════════════════════════════════

/// Retention class of a memory. Tier fully determines expiry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    Explicit,
    Silent,
    Ephemeral,
}

impl MemoryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::Explicit => "explicit",
            MemoryTier::Silent => "silent",
            MemoryTier::Ephemeral => "ephemeral",
        }
    }

    /// Retention rank: higher = longer-lived. A record's tier may only
    /// move to a higher rank through reinforcement, never sideways.
    pub fn rank(&self) -> u8 {
        match self {
            MemoryTier::Ephemeral => 0,
            MemoryTier::Silent => 1,
            MemoryTier::Explicit => 2,
        }
    }
}

/// How a memory entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    AutoCapture,
    UserExplicit,
    AgentAuto,
}

/// What the engine recommends the caller do with a scored conversation.
/// `Skip` is part of the contract surface; the current resolver never
/// emits it (every tier maps to a store action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    StoreExplicit,
    StoreSilent,
    StoreEphemeral,
    Skip,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 3: Scoring Signals & Results
// ═══════════════════════════════════════════════════════════════════════════

/// The seven independent signals feeding the aggregator, each in 0..=10.
/// Computed once per scoring call, then discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringFactors {
    /// 10 when an emphasis phrase ("remember", "critical", …) is present, else 0.
    pub explicit_emphasis: u8,
    /// Additive lexicon hits across preference/negative/concern/positive buckets.
    pub emotional_weight: u8,
    /// Baseline 5, nudged by utility keywords and conversation length.
    pub future_utility: u8,
    /// Similarity to existing memories (recall-backed).
    pub repetition: u8,
    /// Urgency/deadline/recurrence lexicon hits.
    pub time_sensitivity: u8,
    /// Presence of high-value neighbors among recalled memories.
    pub context_anchoring: u8,
    /// Inverse of similarity: 10 when nothing similar exists.
    pub novelty: u8,
}

/// Output contract of a single scoring call. Immutable; the caller
/// consumes it immediately to decide a storage action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Integer importance in 0..=10.
    pub score: u8,
    /// Fully determined by `score` and the configured thresholds.
    pub tier: MemoryTier,
    /// Human-readable explanation. For logs/UI only, never authoritative.
    pub reasoning: String,
    /// Present iff tier is silent or ephemeral.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_hours: Option<u32>,
    /// Tier mapping plus the explicit-marker override.
    pub recommended_action: RecommendedAction,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 4: Stored-Record Views
// ═══════════════════════════════════════════════════════════════════════════

/// The engine's view of a persisted record's metadata. The storage
/// collaborator owns the record; the engine only reads these fields and
/// writes them back through `update()` on promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub tier: MemoryTier,
    /// Importance score at capture time (0..=10).
    pub score: u8,
    pub source: MemorySource,
    pub created_at: DateTime<Utc>,
    /// Set iff tier is silent or ephemeral.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Only ever increases.
    #[serde(default)]
    pub reinforcement_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reinforced: Option<DateTime<Utc>>,
    /// Reserved for the (unimplemented) downgrade path. Never written
    /// by this engine; carried so adapters round-trip it faithfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downgraded_from: Option<MemoryTier>,
}

impl MemoryMetadata {
    /// Metadata for a freshly captured memory. Expiry follows the tier:
    /// ephemeral and silent records are time-boxed, explicit never expires.
    pub fn for_new(
        tier: MemoryTier,
        score: u8,
        source: MemorySource,
        config: &ScoringConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = config
            .expiry_hours_for(tier)
            .map(|h| now + Duration::hours(h as i64));
        Self {
            tier,
            score,
            source,
            created_at: now,
            expires_at,
            reinforcement_count: 0,
            last_reinforced: None,
            downgraded_from: None,
        }
    }

    /// Metadata after a reinforcement-driven promotion to silent.
    /// The reinforcement path is the only legal upward mutator of tier;
    /// promotion resets the expiry window to the silent horizon.
    pub fn promoted_to_silent(&self, silent_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            tier: MemoryTier::Silent,
            expires_at: Some(now + Duration::hours(silent_days as i64 * 24)),
            reinforcement_count: self.reinforcement_count + 1,
            last_reinforced: Some(now),
            ..self.clone()
        }
    }
}

/// One result row from `recall` / `list` / `get_related`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalledMemory {
    pub id: String,
    pub content: String,
    /// Similarity to the query, in [0, 1]. Meaningless for `list`.
    pub relevance_score: f64,
    pub metadata: MemoryMetadata,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 5: Sweep Reports & Health
// ═══════════════════════════════════════════════════════════════════════════

/// Counts returned by the storage collaborator's expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub upgraded: usize,
}

/// Counts from one reinforcement-processing pass.
/// `downgraded` is always 0: the symmetric downgrade path is a known
/// extension point, not yet implemented (see lifecycle.rs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementReport {
    pub upgraded: usize,
    pub downgraded: usize,
}

/// Backend health probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 6: Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// External-model delegation settings. When present, scoring is delegated
/// to a chat-completion endpoint, with the heuristic pipeline as fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmScorerConfig {
    /// Chat-completions base URL (e.g. http://localhost:11434/v1).
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    /// Request timeout; the call is cancelled and scoring falls back to
    /// heuristics when it elapses.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_timeout_secs() -> u64 {
    10
}

fn default_llm_temperature() -> f64 {
    0.1
}

fn default_llm_max_tokens() -> u32 {
    256
}

/// Process-wide scoring configuration. Constructed fully-resolved by the
/// host and injected at engine construction; the engine never reads env
/// vars or files. Replaced wholesale on update (never mutated in place)
/// so concurrent readers can't observe a torn threshold pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Master switch. When false, scoring returns a canned result using
    /// `default_tier` without running any extractor.
    pub enabled: bool,
    /// Scores >= this land in the explicit (permanent) tier. 1..=10.
    pub explicit_threshold: u8,
    /// Scores below this land in the ephemeral tier. 0..=9, and strictly
    /// less than `explicit_threshold`.
    pub ephemeral_threshold: u8,
    /// Expiry horizon for ephemeral captures, in hours. >= 1.
    pub default_ephemeral_hours: u32,
    /// Expiry horizon for silent captures, in days. >= 1.
    pub default_silent_days: u32,
    /// How often the host should trigger the cleanup sweep. >= 1.
    pub cleanup_interval_hours: u32,
    /// Conversations shorter than this (total chars) gate to the trivial
    /// result unless an emphasis marker is present.
    pub min_conversation_length: usize,
    /// Conversations with fewer segments than this gate likewise.
    pub min_message_count: usize,
    /// Tier used for the canned result when the engine is disabled.
    pub default_tier: MemoryTier,
    /// External-model delegation; None = heuristic pipeline only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmScorerConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            explicit_threshold: 7,
            ephemeral_threshold: 4,
            default_ephemeral_hours: 72,
            default_silent_days: 30,
            cleanup_interval_hours: 24,
            min_conversation_length: 20,
            min_message_count: 1,
            default_tier: MemoryTier::Silent,
            llm: None,
        }
    }
}

impl ScoringConfig {
    /// Contract check. Construction must reject a violating config;
    /// `update_config` retains the previous valid threshold pair instead.
    pub fn validate(&self) -> EngineResult<()> {
        if self.explicit_threshold < 1 || self.explicit_threshold > 10 {
            return Err(EngineError::Config(format!(
                "explicit_threshold must be in 1..=10, got {}",
                self.explicit_threshold
            )));
        }
        if self.ephemeral_threshold > 9 {
            return Err(EngineError::Config(format!(
                "ephemeral_threshold must be in 0..=9, got {}",
                self.ephemeral_threshold
            )));
        }
        if self.ephemeral_threshold >= self.explicit_threshold {
            return Err(EngineError::Config(format!(
                "ephemeral_threshold ({}) must be < explicit_threshold ({})",
                self.ephemeral_threshold, self.explicit_threshold
            )));
        }
        if self.default_ephemeral_hours < 1 {
            return Err(EngineError::Config("default_ephemeral_hours must be >= 1".into()));
        }
        if self.default_silent_days < 1 {
            return Err(EngineError::Config("default_silent_days must be >= 1".into()));
        }
        if self.cleanup_interval_hours < 1 {
            return Err(EngineError::Config("cleanup_interval_hours must be >= 1".into()));
        }
        Ok(())
    }

    /// The tier transition table: the single source of truth mapping a
    /// score onto a retention tier. Both the heuristic path and the
    /// external-model path derive tiers through this.
    pub fn tier_for(&self, score: u8) -> MemoryTier {
        if score >= self.explicit_threshold {
            MemoryTier::Explicit
        } else if score >= self.ephemeral_threshold {
            MemoryTier::Silent
        } else {
            MemoryTier::Ephemeral
        }
    }

    /// Expiry horizon in hours for a tier; None = permanent.
    pub fn expiry_hours_for(&self, tier: MemoryTier) -> Option<u32> {
        match tier {
            MemoryTier::Explicit => None,
            MemoryTier::Silent => Some(self.default_silent_days * 24),
            MemoryTier::Ephemeral => Some(self.default_ephemeral_hours),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
