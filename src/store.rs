//! The record-store seam.
//!
//! Persistence is a fire-and-forget single-document insert with no
//! transactional grouping: each record is independently meaningful, so a
//! crash mid-batch leaving a partial record set is acceptable. The trait
//! keeps the concrete store out of the pipeline — a production deployment
//! implements it over its document database, tests and the CLI use
//! [`MemoryRecordStore`].

use crate::output::ChequeRecord;
use async_trait::async_trait;
use std::sync::Mutex;

/// Destination for normalized records.
///
/// `insert` is called once per record, right after normalization, in
/// processing order. An insert failure fails that image (the record is
/// still reported in the run output) but never aborts the run.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &ChequeRecord) -> Result<(), StoreError>;
}

/// Error surfaced by a [`RecordStore`] implementation.
#[derive(Debug, thiserror::Error)]
#[error("record store insert failed: {0}")]
pub struct StoreError(pub String);

/// An in-memory store: the per-run record collection kept for display and
/// for tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<ChequeRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything inserted so far, in insertion order.
    pub fn records(&self) -> Vec<ChequeRecord> {
        self.records.lock().expect("record store poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("record store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: &ChequeRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError("record store poisoned".into()))?
            .push(record.clone());
        Ok(())
    }
}
