//! Boundaries to the four evaluation data sources.
//!
//! Each source exposes a read-only query trait returning loosely-typed
//! [`SourceRow`] snapshots; the adapter functions in the submodules turn
//! fetched rows into canonical records through the field normalizer and
//! report per-row issues instead of failing the whole batch.

pub mod checklist;
pub mod hr_template;
pub mod mold_change;
pub mod payroll;

pub use checklist::ChecklistStore;
pub use hr_template::HrTemplateStore;
pub use mold_change::MoldChangeStore;
pub use payroll::PayrollStore;

use serde_json::{Map, Value};

use super::domain::{CanonicalScoreRecord, SourceKind};
use super::normalize::{self, NormalizationError};
use crate::config::EngineConfig;

/// One raw record as stored by a source system: an identifier plus the
/// fields exactly as the store carries them, legacy names and all.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Failure of a source's underlying store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A correctness problem detected in otherwise-processable source data,
/// surfaced as a warning tied to the offending record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} record {source_id}: {detail}")]
pub struct IntegrityViolation {
    pub kind: SourceKind,
    pub source_id: String,
    pub detail: String,
}

/// Per-row outcome that did not produce a clean canonical record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordIssue {
    #[error(transparent)]
    Dropped(#[from] NormalizationError),
    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),
}

/// Canonical records plus the issues encountered while producing them.
#[derive(Debug, Default)]
pub(crate) struct SourceOutcome {
    pub(crate) records: Vec<CanonicalScoreRecord>,
    pub(crate) issues: Vec<RecordIssue>,
}

/// Row-by-row canonicalization shared by the single-record adapters.
/// A rejected row is dropped and reported; it never aborts the batch.
pub(crate) fn canonicalize_rows(
    kind: SourceKind,
    rows: &[SourceRow],
    config: &EngineConfig,
) -> SourceOutcome {
    let mut outcome = SourceOutcome::default();
    for row in rows {
        match normalize::normalize(kind, row, config) {
            Ok(record) => outcome.records.push(record),
            Err(err) => {
                tracing::debug!(source = kind.label(), record = %row.id, %err, "dropped record");
                outcome.issues.push(RecordIssue::Dropped(err));
            }
        }
    }
    outcome
}
