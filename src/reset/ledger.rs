//! Reset ledger
//!
//! This module provides an in-memory store of applied decisions.

use crate::reset::{ResetRecord, Trigger};
use crate::world::PlayerHandle;
use dashmap::DashMap;
use std::sync::Arc;

/// Store for reset records
#[derive(Clone, Default)]
pub struct ResetLedger {
    records: Arc<DashMap<String, ResetRecord>>,
}

impl ResetLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record
    pub fn add(&self, record: ResetRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Get a record by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ResetRecord> {
        self.records.get(id).map(|e| e.value().clone())
    }

    /// All records, oldest first
    #[must_use]
    pub fn get_all(&self) -> Vec<ResetRecord> {
        let mut records: Vec<ResetRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| r.applied_at);
        records
    }

    /// Records for one bot, oldest first
    #[must_use]
    pub fn get_for_player(&self, player: PlayerHandle) -> Vec<ResetRecord> {
        let mut records: Vec<ResetRecord> = self
            .records
            .iter()
            .filter(|e| e.value().player == player)
            .map(|e| e.value().clone())
            .collect();
        records.sort_by_key(|r| r.applied_at);
        records
    }

    /// Number of records with the given trigger
    #[must_use]
    pub fn count_by_trigger(&self, trigger: Trigger) -> usize {
        self.records
            .iter()
            .filter(|e| e.value().trigger == trigger)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
