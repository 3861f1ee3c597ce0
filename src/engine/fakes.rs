// ── In-Memory Fake Store (testing) ─────────────────────────────────────────
//
// `FakeMemoryStore` satisfies the `MemoryStore` contract without any
// external backend: records live in a `Mutex<Vec<…>>`, recall/related
// results are scripted by the test, and individual operations can be made
// to fail. Kept in the library (not behind #[cfg(test)]) so host adapters
// can drive their own integration tests against the same fake.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::MemoryStore;
use crate::atoms::types::{
    CleanupReport, HealthStatus, MemoryMetadata, MemorySource, MemoryTier, RecalledMemory,
};

#[derive(Debug, Clone)]
struct FakeRecord {
    id: String,
    content: String,
    metadata: MemoryMetadata,
}

/// Scriptable in-memory `MemoryStore` for tests.
#[derive(Default)]
pub struct FakeMemoryStore {
    records: Mutex<Vec<FakeRecord>>,
    recall_results: Mutex<Vec<RecalledMemory>>,
    related: Mutex<HashMap<String, Vec<RecalledMemory>>>,
    cleanup_report: Mutex<CleanupReport>,

    fail_recall: Mutex<bool>,
    fail_cleanup: Mutex<bool>,
    fail_list: Mutex<bool>,
    fail_related_for: Mutex<HashSet<String>>,
    fail_update_for: Mutex<HashSet<String>>,

    recall_calls: AtomicUsize,
    updates: Mutex<Vec<(String, MemoryMetadata)>>,
}

impl FakeMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting ──────────────────────────────────────────────────────

    /// Append a canned `recall` result row with the given relevance/tier.
    pub fn seed_recall_result(&self, content: &str, relevance: f64, tier: MemoryTier) {
        let mut results = self.recall_results.lock();
        results.push(RecalledMemory {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            relevance_score: relevance,
            metadata: fake_metadata(tier),
        });
    }

    /// Insert a stored record directly (bypassing `store`), returning its id.
    pub fn seed_record(&self, content: &str, tier: MemoryTier) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.lock().push(FakeRecord {
            id: id.clone(),
            content: content.to_string(),
            metadata: fake_metadata(tier),
        });
        id
    }

    /// Script the neighbors `get_related` returns for `id`.
    pub fn seed_related(&self, id: &str, neighbor_content: &str) {
        let neighbor = RecalledMemory {
            id: uuid::Uuid::new_v4().to_string(),
            content: neighbor_content.to_string(),
            relevance_score: 0.9,
            metadata: fake_metadata(MemoryTier::Silent),
        };
        self.related.lock().entry(id.to_string()).or_default().push(neighbor);
    }

    pub fn set_cleanup_report(&self, report: CleanupReport) {
        *self.cleanup_report.lock() = report;
    }

    // ── Failure injection ──────────────────────────────────────────────

    pub fn fail_recall(&self) {
        *self.fail_recall.lock() = true;
    }

    pub fn fail_cleanup(&self) {
        *self.fail_cleanup.lock() = true;
    }

    pub fn fail_list(&self) {
        *self.fail_list.lock() = true;
    }

    pub fn fail_related_for(&self, id: &str) {
        self.fail_related_for.lock().insert(id.to_string());
    }

    pub fn fail_update_for(&self, id: &str) {
        self.fail_update_for.lock().insert(id.to_string());
    }

    // ── Observation ────────────────────────────────────────────────────

    pub fn recall_calls(&self) -> usize {
        self.recall_calls.load(Ordering::SeqCst)
    }

    /// Every `(id, metadata)` pair written through `update`, in order.
    pub fn updates(&self) -> Vec<(String, MemoryMetadata)> {
        self.updates.lock().clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }
}

fn fake_metadata(tier: MemoryTier) -> MemoryMetadata {
    MemoryMetadata {
        tier,
        score: 5,
        source: MemorySource::AutoCapture,
        created_at: Utc::now(),
        expires_at: None,
        reinforcement_count: 0,
        last_reinforced: None,
        downgraded_from: None,
    }
}

#[async_trait]
impl MemoryStore for FakeMemoryStore {
    async fn initialize(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn shutdown(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn store(&self, content: &str, metadata: &MemoryMetadata) -> EngineResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.lock().push(FakeRecord {
            id: id.clone(),
            content: content.to_string(),
            metadata: metadata.clone(),
        });
        Ok(id)
    }

    async fn recall(
        &self,
        _query: &str,
        limit: usize,
        tier: Option<MemoryTier>,
    ) -> EngineResult<Vec<RecalledMemory>> {
        self.recall_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_recall.lock() {
            return Err(EngineError::store("recall", "backend unavailable"));
        }
        let results = self.recall_results.lock();
        Ok(results
            .iter()
            .filter(|r| tier.map(|t| r.metadata.tier == t).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        limit: usize,
        tier: Option<MemoryTier>,
    ) -> EngineResult<Vec<RecalledMemory>> {
        if *self.fail_list.lock() {
            return Err(EngineError::store("list", "backend unavailable"));
        }
        let records = self.records.lock();
        // most recent first
        Ok(records
            .iter()
            .rev()
            .filter(|r| tier.map(|t| r.metadata.tier == t).unwrap_or(true))
            .take(limit)
            .map(|r| RecalledMemory {
                id: r.id.clone(),
                content: r.content.clone(),
                relevance_score: 0.0,
                metadata: r.metadata.clone(),
            })
            .collect())
    }

    async fn update(
        &self,
        id: &str,
        content: &str,
        metadata: &MemoryMetadata,
    ) -> EngineResult<()> {
        if self.fail_update_for.lock().contains(id) {
            return Err(EngineError::store("update", "backend unavailable"));
        }
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        record.content = content.to_string();
        record.metadata = metadata.clone();
        self.updates.lock().push((id.to_string(), metadata.clone()));
        Ok(())
    }

    async fn forget(&self, id: &str) -> EngineResult<()> {
        self.records.lock().retain(|r| r.id != id);
        Ok(())
    }

    async fn get_related(&self, id: &str, _depth: usize) -> EngineResult<Vec<RecalledMemory>> {
        if self.fail_related_for.lock().contains(id) {
            return Err(EngineError::store("get_related", "backend unavailable"));
        }
        Ok(self.related.lock().get(id).cloned().unwrap_or_default())
    }

    async fn cleanup(&self) -> EngineResult<CleanupReport> {
        if *self.fail_cleanup.lock() {
            return Err(EngineError::store("cleanup", "backend unavailable"));
        }
        Ok(*self.cleanup_report.lock())
    }

    async fn health_check(&self) -> EngineResult<HealthStatus> {
        Ok(HealthStatus { healthy: true, backend: "fake".to_string() })
    }
}
