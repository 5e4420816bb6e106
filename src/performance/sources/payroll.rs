use std::future::Future;

use super::{canonicalize_rows, SourceOutcome, SourceRow, StoreError};
use crate::config::EngineConfig;
use crate::performance::domain::{DateRange, SourceKind, UserId};

/// Read-only query interface over payroll-adjacent adjustments: overtime,
/// absences, and discretionary bonus evaluations.
pub trait PayrollStore: Send + Sync {
    fn adjustments(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<SourceRow>, StoreError>> + Send;
}

pub(crate) fn canonicalize(rows: &[SourceRow], config: &EngineConfig) -> SourceOutcome {
    canonicalize_rows(SourceKind::Payroll, rows, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::domain::ScoreCategory;
    use serde_json::json;

    fn adjustment(id: &str, fields: serde_json::Value) -> SourceRow {
        let serde_json::Value::Object(fields) = fields else {
            unreachable!()
        };
        SourceRow {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn each_adjustment_kind_maps_to_its_category() {
        let config = EngineConfig::default();
        let rows = vec![
            adjustment(
                "pay-ot",
                json!({ "userId": "U1", "date": "2024-03-04", "adjustmentKind": "overtime", "hours": 2 }),
            ),
            adjustment(
                "pay-abs",
                json!({ "userId": "U1", "date": "2024-03-05", "adjustmentKind": "absence", "days": 1 }),
            ),
            adjustment(
                "pay-bon",
                json!({ "userId": "U1", "date": "2024-03-06", "adjustmentKind": "bonus", "points": 15, "maxPoints": 20 }),
            ),
        ];

        let outcome = canonicalize(&rows, &config);
        assert!(outcome.issues.is_empty());

        let categories: Vec<ScoreCategory> =
            outcome.records.iter().map(|record| record.category).collect();
        assert_eq!(
            categories,
            vec![
                ScoreCategory::Overtime,
                ScoreCategory::Absence,
                ScoreCategory::Bonus,
            ]
        );

        assert_eq!(outcome.records[0].points, 2.0 * config.overtime_points_per_hour);
        assert_eq!(outcome.records[1].points, -config.absence_penalty_per_day);
        assert_eq!(outcome.records[2].points, 15.0);
    }

    #[test]
    fn unknown_adjustment_kinds_are_dropped_with_an_issue() {
        let rows = vec![adjustment(
            "pay-odd",
            json!({ "userId": "U1", "date": "2024-03-04", "adjustmentKind": "travel" }),
        )];

        let outcome = canonicalize(&rows, &EngineConfig::default());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.issues.len(), 1);
    }
}
