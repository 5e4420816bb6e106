//! CSV-backed evaluation stores.
//!
//! Operations teams export each evaluation source as CSV; an archive
//! hydrated from those exports implements all four store traits, which is
//! how the CLI, demos, and the HTTP shell's inline-CSV path feed the
//! engine without a live database. Headers are field names, current or
//! legacy; cells holding JSON (checklist questions, template items) are
//! parsed, numeric cells become numbers, everything else stays text.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::FixedOffset;
use serde_json::{Map, Value};

use super::domain::{DateRange, SourceKind, UserId};
use super::normalize::{self, fields};
use super::sources::{
    ChecklistStore, HrTemplateStore, MoldChangeStore, PayrollStore, SourceRow, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read {kind} export: {source}")]
    Io {
        kind: SourceKind,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {kind} CSV data: {source}")]
    Csv {
        kind: SourceKind,
        #[source]
        source: csv::Error,
    },
}

/// In-memory snapshot of exported evaluation rows, queryable per source.
#[derive(Debug, Clone)]
pub struct ScoreArchive {
    tables: BTreeMap<SourceKind, Vec<SourceRow>>,
    reporting_offset: FixedOffset,
}

impl ScoreArchive {
    /// An archive with no rows; every fetch answers empty.
    pub fn empty(reporting_offset: FixedOffset) -> Self {
        Self {
            tables: BTreeMap::new(),
            reporting_offset,
        }
    }

    pub fn load_path<P: AsRef<Path>>(
        &mut self,
        kind: SourceKind,
        path: P,
    ) -> Result<usize, ArchiveError> {
        let file = std::fs::File::open(path).map_err(|source| ArchiveError::Io { kind, source })?;
        self.load_reader(kind, file)
    }

    /// Append rows from one CSV export. Returns the number of rows loaded.
    pub fn load_reader<R: Read>(
        &mut self,
        kind: SourceKind,
        reader: R,
    ) -> Result<usize, ArchiveError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|source| ArchiveError::Csv { kind, source })?
            .clone();

        let table = self.tables.entry(kind).or_default();
        let mut loaded = 0usize;

        for result in csv_reader.records() {
            let record = result.map_err(|source| ArchiveError::Csv { kind, source })?;

            let mut row_fields = Map::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if cell.is_empty() {
                    continue;
                }
                row_fields.insert(header.to_string(), cell_value(cell));
            }

            let id = normalize::text_field(&row_fields, &fields::row::ID)
                .unwrap_or_else(|| format!("{}-{}", kind.label().replace(' ', "-"), table.len() + 1));

            table.push(SourceRow {
                id,
                fields: row_fields,
            });
            loaded += 1;
        }

        Ok(loaded)
    }

    pub fn len(&self, kind: SourceKind) -> usize {
        self.tables.get(&kind).map_or(0, Vec::len)
    }

    fn rows_for(&self, kind: SourceKind, user_id: &UserId, range: DateRange) -> Vec<SourceRow> {
        let Some(rows) = self.tables.get(&kind) else {
            return Vec::new();
        };

        rows.iter()
            .filter(|row| {
                normalize::row_users(kind, row)
                    .iter()
                    .any(|user| user == user_id.as_str())
            })
            .filter(|row| {
                normalize::row_date(kind, row, self.reporting_offset)
                    .is_some_and(|date| range.contains(date))
            })
            .cloned()
            .collect()
    }
}

/// JSON-looking cells parse as JSON, numeric cells as numbers, the rest
/// stay strings. Unparseable JSON stays a string so the normalizer's
/// coercion rule decides what to do with it.
fn cell_value(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() {
            if let Some(number) = serde_json::Number::from_f64(number) {
                return Value::Number(number);
            }
        }
    }
    Value::String(trimmed.to_string())
}

impl ChecklistStore for ScoreArchive {
    async fn completed_instances(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> Result<Vec<SourceRow>, StoreError> {
        Ok(self.rows_for(SourceKind::Checklist, user_id, range))
    }
}

impl MoldChangeStore for ScoreArchive {
    async fn completed_tasks(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> Result<Vec<SourceRow>, StoreError> {
        Ok(self.rows_for(SourceKind::MoldChange, user_id, range))
    }
}

impl HrTemplateStore for ScoreArchive {
    async fn evaluations(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> Result<Vec<SourceRow>, StoreError> {
        Ok(self.rows_for(SourceKind::HrTemplate, user_id, range))
    }
}

impl PayrollStore for ScoreArchive {
    async fn adjustments(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> Result<Vec<SourceRow>, StoreError> {
        Ok(self.rows_for(SourceKind::Payroll, user_id, range))
    }
}
