use std::future::Future;

use super::{canonicalize_rows, SourceOutcome, SourceRow, StoreError};
use crate::config::EngineConfig;
use crate::performance::domain::{DateRange, SourceKind, UserId};

/// Read-only query interface over completed and approved checklist
/// instances, both routine and event-triggered.
pub trait ChecklistStore: Send + Sync {
    fn completed_instances(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<SourceRow>, StoreError>> + Send;
}

/// One canonical record per completed checklist instance; the instance's
/// template-kind tag selects the category.
pub(crate) fn canonicalize(rows: &[SourceRow], config: &EngineConfig) -> SourceOutcome {
    canonicalize_rows(SourceKind::Checklist, rows, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::domain::ScoreCategory;
    use serde_json::json;

    fn instance(id: &str, kind: &str) -> SourceRow {
        let fields = json!({
            "userId": "U1",
            "completedAt": "2024-03-01T09:00:00+03:00",
            "templateKind": kind,
            "questions": [{ "score": 8, "maxScore": 10 }],
        });
        let serde_json::Value::Object(fields) = fields else {
            unreachable!()
        };
        SourceRow {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn template_kind_tag_selects_the_category() {
        let cases = [
            ("routine", ScoreCategory::Checklist),
            ("event", ScoreCategory::EventTask),
            ("quality", ScoreCategory::QualityControl),
            ("kontrol", ScoreCategory::ControlScore),
        ];

        for (tag, expected) in cases {
            let outcome = canonicalize(&[instance("chk", tag)], &EngineConfig::default());
            assert_eq!(outcome.records.len(), 1, "tag {tag} should canonicalize");
            assert_eq!(outcome.records[0].category, expected);
        }
    }

    #[test]
    fn rejected_instances_do_not_abort_the_batch() {
        let rows = vec![instance("chk-ok", "routine"), instance("chk-bad", "mystery")];
        let outcome = canonicalize(&rows, &EngineConfig::default());

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].source_id, "chk-ok");
        assert_eq!(outcome.issues.len(), 1);
    }
}
