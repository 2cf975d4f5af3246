//! History reconciliation
//!
//! Polls the authoritative history, retires pending entries whose bound
//! server id reached a terminal status, and builds the merged library view.
//!
//! Completion is detected purely by polling. A push-based backend could call
//! [`HistoryReconciler::apply`] with each delivered snapshot instead of
//! [`HistoryReconciler::tick`]; the retirement rule does not change.

use ace_common::api::GenerationRecord;
use ace_common::events::{EventBus, StudioEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::pending_store::{PendingEntryStore, SharedPendingStore};
use crate::error::BackendError;
use crate::models::PendingEntry;
use crate::types::HistorySource;

/// Pending entry removed by a reconciliation tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetiredEntry {
    pub temp_id: String,
    pub server_id: String,
    pub status: String,
}

/// Outcome of one successful tick
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub retired: Vec<RetiredEntry>,
    pub history: Arc<Vec<GenerationRecord>>,
}

/// One card of the merged library view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LibraryItem {
    Pending(PendingEntry),
    Record(GenerationRecord),
}

impl LibraryItem {
    /// Temp id for pending cards, server id for records
    pub fn id(&self) -> &str {
        match self {
            LibraryItem::Pending(entry) => &entry.temp_id,
            LibraryItem::Record(record) => &record.id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LibraryItem::Pending(_))
    }
}

/// Remove every bound, non-failed pending entry whose record is terminal
///
/// Entries without a server id (chain still running) and entries carrying an
/// error are never touched.
pub fn retire_terminal(
    store: &mut PendingEntryStore,
    history: &[GenerationRecord],
) -> Vec<RetiredEntry> {
    let terminal: HashMap<&str, &GenerationRecord> = history
        .iter()
        .filter(|record| record.status.is_terminal())
        .map(|record| (record.id.as_str(), record))
        .collect();

    let candidates: Vec<(String, String, String)> = store
        .entries()
        .iter()
        .filter(|entry| !entry.is_failed())
        .filter_map(|entry| {
            let server_id = entry.server_id.as_deref()?;
            let record = terminal.get(server_id)?;
            Some((
                entry.temp_id.clone(),
                server_id.to_string(),
                record.status.to_string(),
            ))
        })
        .collect();

    candidates
        .into_iter()
        .filter_map(|(temp_id, server_id, status)| {
            store.remove(&temp_id).map(|_| RetiredEntry {
                temp_id,
                server_id,
                status,
            })
        })
        .collect()
}

/// Pending entries first (insertion order), then records not shadowed by a pending entry
pub fn merge_library(pending: &[PendingEntry], history: &[GenerationRecord]) -> Vec<LibraryItem> {
    let shadowed: HashSet<&str> = pending
        .iter()
        .filter_map(|entry| entry.server_id.as_deref())
        .collect();

    pending
        .iter()
        .cloned()
        .map(LibraryItem::Pending)
        .chain(
            history
                .iter()
                .filter(|record| !shadowed.contains(record.id.as_str()))
                .cloned()
                .map(LibraryItem::Record),
        )
        .collect()
}

struct Snapshot {
    records: Arc<Vec<GenerationRecord>>,
    polled_at: Option<DateTime<Utc>>,
}

/// Timer-driven reconciler holding the last successful history snapshot
pub struct HistoryReconciler {
    source: Arc<dyn HistorySource>,
    store: SharedPendingStore,
    event_bus: EventBus,
    snapshot: RwLock<Snapshot>,
}

impl HistoryReconciler {
    pub fn new(source: Arc<dyn HistorySource>, store: SharedPendingStore, event_bus: EventBus) -> Self {
        Self {
            source,
            store,
            event_bus,
            snapshot: RwLock::new(Snapshot {
                records: Arc::new(Vec::new()),
                polled_at: None,
            }),
        }
    }

    /// Poll once and reconcile
    ///
    /// A failed poll is a transient miss: nothing is mutated and the error is
    /// returned for the caller to log.
    pub async fn tick(&self) -> Result<ReconcileReport, BackendError> {
        let records = self.source.list_history().await?;
        Ok(self.apply(records).await)
    }

    /// Reconcile against a freshly delivered history
    pub async fn apply(&self, records: Vec<GenerationRecord>) -> ReconcileReport {
        let records = Arc::new(records);

        let retired = {
            let mut store = self.store.write().await;
            retire_terminal(&mut store, &records)
        };

        {
            let mut snapshot = self.snapshot.write().await;
            snapshot.records = Arc::clone(&records);
            snapshot.polled_at = Some(Utc::now());
        }

        for entry in &retired {
            info!(
                temp_id = %entry.temp_id,
                server_id = %entry.server_id,
                status = %entry.status,
                "Pending entry retired"
            );
            self.event_bus.emit_lossy(StudioEvent::PendingRetired {
                temp_id: entry.temp_id.clone(),
                server_id: entry.server_id.clone(),
                status: entry.status.clone(),
                timestamp: Utc::now(),
            });
        }

        debug!(records = records.len(), retired = retired.len(), "History reconciled");

        ReconcileReport {
            retired,
            history: records,
        }
    }

    /// Last successfully polled history
    pub async fn snapshot(&self) -> Arc<Vec<GenerationRecord>> {
        Arc::clone(&self.snapshot.read().await.records)
    }

    pub async fn last_polled_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.polled_at
    }

    pub async fn record(&self, id: &str) -> Option<GenerationRecord> {
        self.snapshot
            .read()
            .await
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Merged, de-duplicated library view
    pub async fn library(&self) -> Vec<LibraryItem> {
        let history = self.snapshot().await;
        let store = self.store.read().await;
        merge_library(store.entries(), &history)
    }

    /// Drop a deleted record from the snapshot until the next poll
    pub async fn forget(&self, id: &str) -> bool {
        let mut snapshot = self.snapshot.write().await;
        let before = snapshot.records.len();
        let remaining: Vec<GenerationRecord> = snapshot
            .records
            .iter()
            .filter(|record| record.id != id)
            .cloned()
            .collect();
        let removed = remaining.len() != before;
        snapshot.records = Arc::new(remaining);
        removed
    }

    /// Swap in an updated record (e.g. after a details edit)
    pub async fn replace_record(&self, updated: GenerationRecord) {
        let mut snapshot = self.snapshot.write().await;
        let records: Vec<GenerationRecord> = snapshot
            .records
            .iter()
            .map(|record| {
                if record.id == updated.id {
                    updated.clone()
                } else {
                    record.clone()
                }
            })
            .collect();
        snapshot.records = Arc::new(records);
    }

    /// Log-and-continue wrapper used by the polling loop
    pub async fn tick_logged(&self) -> Option<ReconcileReport> {
        match self.tick().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "History poll failed; retrying next tick");
                None
            }
        }
    }
}
