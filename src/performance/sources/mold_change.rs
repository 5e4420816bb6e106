use std::future::Future;

use super::{IntegrityViolation, RecordIssue, SourceOutcome, SourceRow, StoreError};
use crate::config::EngineConfig;
use crate::performance::domain::{CanonicalScoreRecord, DateRange, SourceKind, UserId};
use crate::performance::normalize::{self, fields};

/// Read-only query interface over completed mold-change tasks. A task may
/// be credited to a primary operator and a collaborating buddy operator;
/// the store returns rows where the queried user appears in either role.
pub trait MoldChangeStore: Send + Sync {
    fn completed_tasks(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<SourceRow>, StoreError>> + Send;
}

/// Canonicalize mold-change tasks, splitting the awarded points between
/// the two participants. For every split task the two emitted shares sum
/// to exactly 1.0 and the two point values sum to the task's points.
pub(crate) fn canonicalize(rows: &[SourceRow], config: &EngineConfig) -> SourceOutcome {
    let mut outcome = SourceOutcome::default();
    for row in rows {
        match normalize::normalize(SourceKind::MoldChange, row, config) {
            Ok(task) => split_credit(task, row, config, &mut outcome),
            Err(err) => {
                tracing::debug!(record = %row.id, %err, "dropped mold-change task");
                outcome.issues.push(RecordIssue::Dropped(err));
            }
        }
    }
    outcome
}

fn split_credit(
    task: CanonicalScoreRecord,
    row: &SourceRow,
    config: &EngineConfig,
    outcome: &mut SourceOutcome,
) {
    let buddy = normalize::text_field(&row.fields, &fields::mold_change::BUDDY)
        .map(UserId)
        .filter(|buddy| *buddy != task.user_id);

    let Some(buddy) = buddy else {
        // Solo task: the primary operator keeps the full credit.
        outcome.records.push(task);
        return;
    };

    let primary_share = match explicit_primary_share(row) {
        Some(Ok(share)) => share,
        Some(Err(raw)) => {
            outcome.issues.push(RecordIssue::Integrity(IntegrityViolation {
                kind: SourceKind::MoldChange,
                source_id: task.source_id.clone(),
                detail: format!(
                    "explicit share {raw} outside (0, 1); using configured split {}",
                    config.buddy_primary_share
                ),
            }));
            config.buddy_primary_share
        }
        None => config.buddy_primary_share,
    };

    let primary_points = task.points * primary_share;
    let primary_max = task.max_points * primary_share;

    // The buddy record takes the remainder, so the pair sums exactly to
    // the task's points regardless of the share's binary representation.
    let buddy_record = CanonicalScoreRecord {
        user_id: buddy,
        points: task.points - primary_points,
        max_points: task.max_points - primary_max,
        collaborator_share: Some(1.0 - primary_share),
        ..task.clone()
    };

    outcome.records.push(CanonicalScoreRecord {
        points: primary_points,
        max_points: primary_max,
        collaborator_share: Some(primary_share),
        ..task
    });
    outcome.records.push(buddy_record);
}

/// An explicit share on the row overrides the configured split. Legacy
/// rows store it as a percentage; anything outside (0, 1) after conversion
/// is an integrity problem and falls back to the configured default.
fn explicit_primary_share(row: &SourceRow) -> Option<Result<f64, f64>> {
    let raw = normalize::optional_numeric_field(&row.fields, &fields::mold_change::PRIMARY_SHARE)?;
    let share = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    if share > 0.0 && share < 1.0 {
        Some(Ok(share))
    } else {
        Some(Err(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: &str, fields: serde_json::Value) -> SourceRow {
        let serde_json::Value::Object(fields) = fields else {
            unreachable!()
        };
        SourceRow {
            id: id.to_string(),
            fields,
        }
    }

    fn base_task(extra: serde_json::Value) -> SourceRow {
        let mut fields = json!({
            "operatorId": "U1",
            "buddyId": "U2",
            "completedAt": "2024-03-03T10:00:00+03:00",
            "points": 20,
            "maxPoints": 20,
        });
        if let (Some(target), serde_json::Value::Object(extra)) = (fields.as_object_mut(), extra) {
            target.extend(extra);
        }
        task("mc-1", fields)
    }

    #[test]
    fn default_split_credits_both_operators_equally() {
        let outcome = canonicalize(&[base_task(json!({}))], &EngineConfig::default());

        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.records.len(), 2);

        let primary = &outcome.records[0];
        let buddy = &outcome.records[1];
        assert_eq!(primary.user_id.as_str(), "U1");
        assert_eq!(buddy.user_id.as_str(), "U2");
        assert_eq!(primary.points, 10.0);
        assert_eq!(buddy.points, 10.0);
        assert_eq!(primary.collaborator_share, Some(0.5));
        assert_eq!(buddy.collaborator_share, Some(0.5));
    }

    #[test]
    fn shares_sum_to_one_and_points_sum_to_the_task() {
        let splits = [
            json!({}),
            json!({ "primaryShare": 0.7 }),
            json!({ "operatorPayi": 60 }),
        ];

        for extra in splits {
            let outcome = canonicalize(&[base_task(extra)], &EngineConfig::default());
            assert_eq!(outcome.records.len(), 2);

            let shares: f64 = outcome
                .records
                .iter()
                .map(|record| record.collaborator_share.expect("split records carry shares"))
                .sum();
            let points: f64 = outcome.records.iter().map(|record| record.points).sum();

            assert!((shares - 1.0).abs() < 1e-9);
            assert_eq!(points, 20.0);
        }
    }

    #[test]
    fn legacy_percentage_share_is_converted() {
        let outcome = canonicalize(
            &[base_task(json!({ "operatorPayi": 75 }))],
            &EngineConfig::default(),
        );

        assert_eq!(outcome.records[0].points, 15.0);
        assert_eq!(outcome.records[0].collaborator_share, Some(0.75));
        assert_eq!(outcome.records[1].points, 5.0);
    }

    #[test]
    fn out_of_range_share_falls_back_with_an_integrity_warning() {
        let outcome = canonicalize(
            &[base_task(json!({ "primaryShare": 140 }))],
            &EngineConfig::default(),
        );

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].points, 10.0);
        assert_eq!(outcome.issues.len(), 1);
        assert!(matches!(outcome.issues[0], RecordIssue::Integrity(_)));
    }

    #[test]
    fn solo_tasks_keep_full_credit_without_a_share() {
        let solo = task(
            "mc-2",
            json!({
                "operatorId": "U1",
                "completedAt": "2024-03-03T10:00:00+03:00",
                "points": 20,
            }),
        );

        let outcome = canonicalize(&[solo], &EngineConfig::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].points, 20.0);
        assert_eq!(outcome.records[0].collaborator_share, None);
    }
}
