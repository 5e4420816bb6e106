use std::future::Future;

use super::{canonicalize_rows, SourceOutcome, SourceRow, StoreError};
use crate::config::EngineConfig;
use crate::performance::domain::{DateRange, SourceKind, UserId};

/// Read-only query interface over HR evaluations scored against the
/// configurable multi-item templates.
pub trait HrTemplateStore: Send + Sync {
    fn evaluations(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<SourceRow>, StoreError>> + Send;
}

/// One `hr_template` record per evaluation, summed across template items.
/// Both the current and the legacy item field names resolve.
pub(crate) fn canonicalize(rows: &[SourceRow], config: &EngineConfig) -> SourceOutcome {
    canonicalize_rows(SourceKind::HrTemplate, rows, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn modern_and_legacy_schemas_produce_the_same_totals() {
        let modern = json!({
            "userId": "U3",
            "evaluatedAt": "2024-03-10",
            "items": [{ "score": 7, "maxScore": 10 }, { "score": 3, "maxScore": 5 }],
        });
        let legacy = json!({
            "personelId": "U3",
            "degerlendirmeTarihi": "2024-03-10",
            "maddeler": [{ "puan": 7, "maksimumPuan": 10 }, { "puan": 3, "maksimumPuan": 5 }],
        });

        let rows: Vec<SourceRow> = [modern, legacy]
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let serde_json::Value::Object(fields) = value else {
                    unreachable!()
                };
                SourceRow {
                    id: format!("hr-{index}"),
                    fields,
                }
            })
            .collect();

        let outcome = canonicalize(&rows, &EngineConfig::default());
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.records[0].points, outcome.records[1].points);
        assert_eq!(outcome.records[0].max_points, outcome.records[1].max_points);
        assert_eq!(outcome.records[0].points, 10.0);
        assert_eq!(outcome.records[0].max_points, 15.0);
    }
}
