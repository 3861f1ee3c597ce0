// ── Mnemo Atoms: Storage Collaborator Trait ────────────────────────────────
// The narrow contract the engine needs from whichever external backend is
// configured (graph database, vector store, …). The engine never reaches
// into backend-specific types: adapters implement this trait and the
// engine consumes it as `Arc<dyn MemoryStore>`.
//
// Contract notes for implementors:
//   • `update` and `cleanup` must be idempotent (at-least-once safe):
//     re-promoting an already-silent record is a no-op, not an error.
//   • `cleanup` owns the expiry sweep: it deletes expired ephemeral
//     records below the promotion threshold and promotes reinforced ones
//     to silent, returning both counts.
//   • `update` on a missing id is an error the caller must catch.
//   • `relevance_score` on recall results must be in [0, 1].
//   • An in-memory fake is provided for testing via `engine::fakes`.

use async_trait::async_trait;

use crate::atoms::error::EngineResult;
use crate::atoms::types::{
    CleanupReport, HealthStatus, MemoryMetadata, MemoryTier, RecalledMemory,
};

/// Backend-agnostic persistence contract for memory records.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Prepare the backend (connect, ensure schema). Idempotent.
    async fn initialize(&self) -> EngineResult<()>;

    /// Release backend resources. Idempotent.
    async fn shutdown(&self) -> EngineResult<()>;

    /// Persist a new record; the backend assigns and returns the id.
    async fn store(&self, content: &str, metadata: &MemoryMetadata) -> EngineResult<String>;

    /// Similarity search over stored records.
    async fn recall(
        &self,
        query: &str,
        limit: usize,
        tier: Option<MemoryTier>,
    ) -> EngineResult<Vec<RecalledMemory>>;

    /// Enumerate records (most recent first), optionally filtered by tier.
    /// Same result shape as `recall`; no query filtering.
    async fn list(&self, limit: usize, tier: Option<MemoryTier>)
        -> EngineResult<Vec<RecalledMemory>>;

    /// Overwrite a record's content and metadata. Missing id is an error.
    async fn update(&self, id: &str, content: &str, metadata: &MemoryMetadata)
        -> EngineResult<()>;

    /// Delete a record.
    async fn forget(&self, id: &str) -> EngineResult<()>;

    /// Graph/semantic neighbors of a record.
    async fn get_related(&self, id: &str, depth: usize) -> EngineResult<Vec<RecalledMemory>>;

    /// Expiry sweep: delete expired un-reinforced ephemerals, promote
    /// reinforced ones to silent. Returns both counts.
    async fn cleanup(&self) -> EngineResult<CleanupReport>;

    /// Probe backend availability.
    async fn health_check(&self) -> EngineResult<HealthStatus>;
}
