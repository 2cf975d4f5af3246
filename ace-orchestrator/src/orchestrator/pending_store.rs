//! In-memory store of optimistic pending entries
//!
//! Every mutation is keyed by `temp_id` and touches only that entry, so
//! concurrent sequencer runs (one per temp id) never race on a field.
//! Operations on an unknown temp id are no-ops: a chain whose entry was
//! deleted by the user keeps running and its results are discarded.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{PendingEntry, PendingPatch};

/// Store shared between sequencer runs, the reconciler and the API surface
pub type SharedPendingStore = Arc<RwLock<PendingEntryStore>>;

/// Ordered collection of pending entries (insertion order)
#[derive(Debug, Default)]
pub struct PendingEntryStore {
    entries: Vec<PendingEntry>,
}

impl PendingEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedPendingStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Append a new entry
    ///
    /// Returns false (and stores nothing) if the temp id is already present.
    pub fn create(&mut self, entry: PendingEntry) -> bool {
        if self.get(&entry.temp_id).is_some() {
            tracing::warn!(temp_id = %entry.temp_id, "Duplicate pending entry ignored");
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Shallow merge of the set fields in `patch`
    ///
    /// `server_id` is write-once: a second, different id is ignored.
    /// Returns false if the entry no longer exists.
    pub fn patch(&mut self, temp_id: &str, patch: PendingPatch) -> bool {
        let Some(entry) = self.get_mut(temp_id) else {
            return false;
        };

        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(prompt) = patch.prompt {
            entry.prompt = prompt;
        }
        if let Some(server_id) = patch.server_id {
            match &entry.server_id {
                None => entry.server_id = Some(server_id),
                Some(existing) if *existing != server_id => {
                    tracing::warn!(
                        temp_id = %temp_id,
                        existing = %existing,
                        rejected = %server_id,
                        "Pending entry already bound; server id unchanged"
                    );
                }
                Some(_) => {}
            }
        }
        if let Some(error) = patch.error {
            entry.error = Some(error);
        }
        true
    }

    /// Move to the next stage, clamped to the last label
    ///
    /// Frozen (errored) entries do not advance. Returns the resulting stage
    /// index, or `None` if the entry no longer exists or is frozen.
    pub fn advance(&mut self, temp_id: &str) -> Option<usize> {
        let entry = self.get_mut(temp_id)?;
        if entry.is_failed() {
            return None;
        }
        entry.stage_index = (entry.stage_index + 1).min(entry.last_stage_index());
        Some(entry.stage_index)
    }

    pub fn remove(&mut self, temp_id: &str) -> Option<PendingEntry> {
        let position = self.entries.iter().position(|e| e.temp_id == temp_id)?;
        Some(self.entries.remove(position))
    }

    pub fn get(&self, temp_id: &str) -> Option<&PendingEntry> {
        self.entries.iter().find(|e| e.temp_id == temp_id)
    }

    fn get_mut(&mut self, temp_id: &str) -> Option<&mut PendingEntry> {
        self.entries.iter_mut().find(|e| e.temp_id == temp_id)
    }

    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
