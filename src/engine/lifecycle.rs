// ── Lifecycle: Expiry & Reinforcement Sweeps ───────────────────────────────
//
// Two independent, idempotent operations, invoked periodically by the
// host's heartbeat (every `cleanup_interval_hours`):
//
//   cleanup_expired_memories – delegates the bulk expiry sweep to the
//     storage collaborator, which deletes expired un-reinforced
//     ephemerals and promotes reinforced ones. The engine only logs and
//     returns the counts.
//
//   process_reinforcements – engine-owned: walks recent ephemeral
//     records and promotes any with graph neighbors to the silent tier.
//     Each record is processed in isolation; one failure never aborts
//     the rest of the batch. Safe to re-run after a crash mid-sweep.

use chrono::Utc;
use log::{info, warn};

use crate::atoms::traits::MemoryStore;
use crate::atoms::types::{CleanupReport, MemoryTier, ReinforcementReport, ScoringConfig};

/// Upper bound on ephemeral records examined per reinforcement pass,
/// most recent first.
const REINFORCEMENT_BATCH_SIZE: usize = 50;

/// Neighbor search depth for reinforcement checks.
const RELATED_DEPTH: usize = 1;

/// Delegate the expiry sweep to the collaborator and pass its counts
/// through verbatim. A collaborator failure is logged and reported as
/// zero work done; the next heartbeat retries.
pub async fn cleanup_expired_memories(store: &dyn MemoryStore) -> CleanupReport {
    match store.cleanup().await {
        Ok(report) => {
            info!(
                "[lifecycle] cleanup: {} deleted, {} upgraded",
                report.deleted, report.upgraded
            );
            report
        }
        Err(e) => {
            warn!("[lifecycle] cleanup failed: {}", e);
            CleanupReport::default()
        }
    }
}

/// Promote ephemeral records that have acquired graph neighbors.
///
/// A related record found during the sweep is evidence the memory still
/// matters (reinforcement) and moves it up to the silent tier with a
/// fresh expiry window. Promotion is the only upward tier mutation; the
/// symmetric downgrade (silent → ephemeral on staleness) is a reserved
/// extension point, and `downgraded` stays 0 until its trigger
/// conditions are defined.
pub async fn process_reinforcements(
    store: &dyn MemoryStore,
    config: &ScoringConfig,
) -> ReinforcementReport {
    let mut report = ReinforcementReport::default();

    let batch = match store.list(REINFORCEMENT_BATCH_SIZE, Some(MemoryTier::Ephemeral)).await {
        Ok(batch) => batch,
        Err(e) => {
            warn!("[lifecycle] could not list ephemeral records: {}", e);
            return report;
        }
    };

    for record in &batch {
        // Per-record isolation: a failure here must not lose the batch
        let related = match store.get_related(&record.id, RELATED_DEPTH).await {
            Ok(related) => related,
            Err(e) => {
                warn!("[lifecycle] get_related failed for {}: {}", record.id, e);
                continue;
            }
        };
        if related.is_empty() {
            continue;
        }

        let promoted =
            record.metadata.promoted_to_silent(config.default_silent_days, Utc::now());
        match store.update(&record.id, &record.content, &promoted).await {
            Ok(()) => {
                info!("[lifecycle] reinforced {} → silent", record.id);
                report.upgraded += 1;
            }
            Err(e) => {
                warn!("[lifecycle] promotion failed for {}: {}", record.id, e);
            }
        }
    }

    info!(
        "[lifecycle] reinforcement pass: {} of {} examined records upgraded",
        report.upgraded,
        batch.len()
    );
    report
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fakes::FakeMemoryStore;

    #[tokio::test]
    async fn test_cleanup_counts_passed_through_verbatim() {
        let store = FakeMemoryStore::new();
        store.set_cleanup_report(CleanupReport { deleted: 3, upgraded: 1 });

        let report = cleanup_expired_memories(&store).await;
        assert_eq!(report, CleanupReport { deleted: 3, upgraded: 1 });
    }

    #[tokio::test]
    async fn test_cleanup_failure_reports_zero_counts() {
        let store = FakeMemoryStore::new();
        store.fail_cleanup();

        let report = cleanup_expired_memories(&store).await;
        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn test_reinforced_records_promoted_to_silent() {
        let store = FakeMemoryStore::new();
        let config = ScoringConfig::default();
        let reinforced = store.seed_record("favorite editor is helix", MemoryTier::Ephemeral);
        let lonely = store.seed_record("one-off remark", MemoryTier::Ephemeral);
        store.seed_related(&reinforced, "editor preferences discussion");

        let report = process_reinforcements(&store, &config).await;
        assert_eq!(report.upgraded, 1);
        assert_eq!(report.downgraded, 0);

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let (id, meta) = &updates[0];
        assert_eq!(id, &reinforced);
        assert_ne!(id, &lonely);
        assert_eq!(meta.tier, MemoryTier::Silent);
        assert_eq!(meta.reinforcement_count, 1);
        assert!(meta.last_reinforced.is_some());
        assert!(meta.expires_at.is_some(), "silent records stay time-boxed");
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_batch() {
        let store = FakeMemoryStore::new();
        let config = ScoringConfig::default();

        let ids: Vec<String> = (0..5)
            .map(|i| store.seed_record(&format!("ephemeral fact {i}"), MemoryTier::Ephemeral))
            .collect();
        for id in &ids {
            store.seed_related(id, "a neighbor");
        }
        // get_related blows up for the middle record only
        store.fail_related_for(&ids[2]);

        let report = process_reinforcements(&store, &config).await;
        assert_eq!(report.upgraded, 4, "records 1,2,4,5 must still be processed");

        let updated: Vec<String> = store.updates().into_iter().map(|(id, _)| id).collect();
        assert!(!updated.contains(&ids[2]));
        for (i, id) in ids.iter().enumerate() {
            if i != 2 {
                assert!(updated.contains(id), "record {i} should have been promoted");
            }
        }
    }

    #[tokio::test]
    async fn test_update_failure_is_isolated_too() {
        let store = FakeMemoryStore::new();
        let config = ScoringConfig::default();

        let a = store.seed_record("fact a", MemoryTier::Ephemeral);
        let b = store.seed_record("fact b", MemoryTier::Ephemeral);
        store.seed_related(&a, "neighbor");
        store.seed_related(&b, "neighbor");
        store.fail_update_for(&a);

        let report = process_reinforcements(&store, &config).await;
        assert_eq!(report.upgraded, 1);
    }

    #[tokio::test]
    async fn test_list_failure_returns_empty_report() {
        let store = FakeMemoryStore::new();
        store.fail_list();

        let report = process_reinforcements(&store, &ScoringConfig::default()).await;
        assert_eq!(report, ReinforcementReport::default());
    }

    #[tokio::test]
    async fn test_unreinforced_records_left_alone() {
        let store = FakeMemoryStore::new();
        store.seed_record("no neighbors here", MemoryTier::Ephemeral);

        let report = process_reinforcements(&store, &ScoringConfig::default()).await;
        assert_eq!(report.upgraded, 0);
        assert!(store.updates().is_empty());
    }
}
