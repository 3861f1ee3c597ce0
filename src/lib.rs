// ── mnemo-core ─────────────────────────────────────────────────────────────
// Importance scoring and memory lifecycle engine for agent conversations.
//
// The engine turns free-text conversation into a bounded retention
// decision: a 0–10 importance score, one of three tiers (explicit /
// silent / ephemeral), a deterministic expiry, and a recommended storage
// action. A reinforcement sweep promotes short-lived memories that keep
// proving relevant; an expiry sweep (delegated to the backend) clears
// the rest. Persistence itself is pluggable: any backend that implements
// the `MemoryStore` trait works (graph database, vector store, or the
// in-memory fake shipped for tests).
//
// Layering:
//   atoms/  – pure data types, the storage trait, error types. No I/O.
//   engine/ – scoring pipeline, external-model scorer, lifecycle sweeps.
//
// The host owns config resolution, scheduling (heartbeat for the
// sweeps), and the decision of what to do with each ScoringResult.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::MemoryStore;
pub use atoms::types::{
    CleanupReport, ConversationSegment, HealthStatus, LlmScorerConfig, MemoryMetadata,
    MemorySource, MemoryTier, RecalledMemory, RecommendedAction, ReinforcementReport, Role,
    ScoringConfig, ScoringFactors, ScoringResult,
};
pub use engine::fakes::FakeMemoryStore;
pub use engine::scoring::{calculate_weighted_score, MemoryEngine};
