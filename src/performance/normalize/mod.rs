//! Pure mapping layer between raw store rows and canonical score records.
//!
//! All field-name resolution, numeric coercion, and data-integrity guards
//! live here so the adapters never probe row fields ad hoc. Missing, null,
//! or non-numeric values coerce to `0.0`; a canonical record can never
//! carry a non-finite number.

pub(crate) mod fields;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{Map, Value};

use super::domain::{CanonicalScoreRecord, ScoreCategory, SourceKind, UserId};
use super::sources::SourceRow;
use crate::config::EngineConfig;
use fields::FieldNames;

/// Raised when a row cannot be resolved into a valid canonical record.
/// The offending record is dropped and surfaced as a warning, never
/// silently clamped into the totals.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("{kind} record {source_id}: no usable user reference")]
    MissingUser { kind: SourceKind, source_id: String },
    #[error("{kind} record {source_id}: no usable evaluation date")]
    MissingDate { kind: SourceKind, source_id: String },
    #[error("{kind} record {source_id}: unknown category tag '{raw}'")]
    UnknownCategory {
        kind: SourceKind,
        source_id: String,
        raw: String,
    },
    #[error("{kind} record {source_id}: points {points} exceed maximum {max_points}")]
    PointsExceedMax {
        kind: SourceKind,
        source_id: String,
        points: f64,
        max_points: f64,
    },
    #[error("{kind} record {source_id}: negative points {points} not allowed for {category}")]
    NegativePoints {
        kind: SourceKind,
        source_id: String,
        category: ScoreCategory,
        points: f64,
    },
}

/// Resolve one raw row into the canonical shape for its source type.
///
/// Mold-change rows normalize to a single task-level record credited to the
/// primary operator; splitting the credit between the two participants is
/// the mold-change adapter's job.
pub fn normalize(
    kind: SourceKind,
    row: &SourceRow,
    config: &EngineConfig,
) -> Result<CanonicalScoreRecord, NormalizationError> {
    match kind {
        SourceKind::Checklist => normalize_checklist(row, config),
        SourceKind::MoldChange => normalize_mold_change(row, config),
        SourceKind::HrTemplate => normalize_hr_template(row, config),
        SourceKind::Payroll => normalize_payroll(row, config),
    }
}

fn normalize_checklist(
    row: &SourceRow,
    config: &EngineConfig,
) -> Result<CanonicalScoreRecord, NormalizationError> {
    use self::fields::checklist as f;

    let kind = SourceKind::Checklist;
    let user_id = require_user(kind, row, &f::USER)?;
    let date = require_date(kind, row, &f::COMPLETED_AT, config.reporting_offset)?;

    let raw_kind = text_field(&row.fields, &f::TEMPLATE_KIND).unwrap_or_default();
    let category = match raw_kind.to_ascii_lowercase().as_str() {
        "routine" | "rutin" => ScoreCategory::Checklist,
        "event" | "mold" | "kalip" => ScoreCategory::EventTask,
        "quality" | "kalite" => ScoreCategory::QualityControl,
        "control" | "kontrol" => ScoreCategory::ControlScore,
        _ => {
            return Err(NormalizationError::UnknownCategory {
                kind,
                source_id: row.id.clone(),
                raw: raw_kind,
            })
        }
    };

    let (points, max_points) =
        sum_item_scores(&row.fields, &f::QUESTIONS, &f::QUESTION_SCORE, &f::QUESTION_MAX);

    finish(kind, row, user_id, date, category, points, max_points)
}

fn normalize_mold_change(
    row: &SourceRow,
    config: &EngineConfig,
) -> Result<CanonicalScoreRecord, NormalizationError> {
    use self::fields::mold_change as f;

    let kind = SourceKind::MoldChange;
    let user_id = require_user(kind, row, &f::PRIMARY)?;
    let date = require_date(kind, row, &f::COMPLETED_AT, config.reporting_offset)?;
    let points = numeric_field(&row.fields, &f::POINTS);
    let max_points = numeric_field(&row.fields, &f::MAX_POINTS);

    finish(
        kind,
        row,
        user_id,
        date,
        ScoreCategory::EventTask,
        points,
        max_points,
    )
}

fn normalize_hr_template(
    row: &SourceRow,
    config: &EngineConfig,
) -> Result<CanonicalScoreRecord, NormalizationError> {
    use self::fields::hr_template as f;

    let kind = SourceKind::HrTemplate;
    let user_id = require_user(kind, row, &f::USER)?;
    let date = require_date(kind, row, &f::EVALUATED_AT, config.reporting_offset)?;
    let (points, max_points) =
        sum_item_scores(&row.fields, &f::ITEMS, &f::ITEM_SCORE, &f::ITEM_MAX);

    finish(
        kind,
        row,
        user_id,
        date,
        ScoreCategory::HrTemplate,
        points,
        max_points,
    )
}

fn normalize_payroll(
    row: &SourceRow,
    config: &EngineConfig,
) -> Result<CanonicalScoreRecord, NormalizationError> {
    use self::fields::payroll as f;

    let kind = SourceKind::Payroll;
    let user_id = require_user(kind, row, &f::USER)?;
    let date = require_date(kind, row, &f::DATE, config.reporting_offset)?;

    let raw_kind = text_field(&row.fields, &f::KIND).unwrap_or_default();
    let (category, points, max_points) = match raw_kind.to_ascii_lowercase().as_str() {
        "overtime" | "mesai" => {
            let hours = numeric_field(&row.fields, &f::HOURS);
            (
                ScoreCategory::Overtime,
                hours * config.overtime_points_per_hour,
                0.0,
            )
        }
        "absence" | "devamsizlik" => {
            // Legacy rows record absences in hours; an 8-hour shift is one day.
            let days = optional_numeric_field(&row.fields, &f::DAYS)
                .unwrap_or_else(|| numeric_field(&row.fields, &f::HOURS) / 8.0);
            (
                ScoreCategory::Absence,
                -(days * config.absence_penalty_per_day),
                0.0,
            )
        }
        "bonus" | "prim" => (
            ScoreCategory::Bonus,
            numeric_field(&row.fields, &f::POINTS),
            numeric_field(&row.fields, &f::MAX_POINTS),
        ),
        _ => {
            return Err(NormalizationError::UnknownCategory {
                kind,
                source_id: row.id.clone(),
                raw: raw_kind,
            })
        }
    };

    finish(kind, row, user_id, date, category, points, max_points)
}

fn finish(
    kind: SourceKind,
    row: &SourceRow,
    user_id: UserId,
    date: NaiveDate,
    category: ScoreCategory,
    points: f64,
    max_points: f64,
) -> Result<CanonicalScoreRecord, NormalizationError> {
    let max_points = max_points.max(0.0);

    if points < 0.0 && !category.allows_negative_points() {
        return Err(NormalizationError::NegativePoints {
            kind,
            source_id: row.id.clone(),
            category,
            points,
        });
    }

    if max_points > 0.0 && points > max_points {
        return Err(NormalizationError::PointsExceedMax {
            kind,
            source_id: row.id.clone(),
            points,
            max_points,
        });
    }

    Ok(CanonicalScoreRecord {
        user_id,
        date,
        category,
        points,
        max_points,
        source_type: kind,
        source_id: row.id.clone(),
        collaborator_share: None,
    })
}

fn require_user(
    kind: SourceKind,
    row: &SourceRow,
    names: &FieldNames,
) -> Result<UserId, NormalizationError> {
    text_field(&row.fields, names)
        .map(UserId)
        .ok_or_else(|| NormalizationError::MissingUser {
            kind,
            source_id: row.id.clone(),
        })
}

fn require_date(
    kind: SourceKind,
    row: &SourceRow,
    names: &FieldNames,
    offset: FixedOffset,
) -> Result<NaiveDate, NormalizationError> {
    text_field(&row.fields, names)
        .and_then(|raw| local_date(&raw, offset))
        .ok_or_else(|| NormalizationError::MissingDate {
            kind,
            source_id: row.id.clone(),
        })
}

/// Sum `score`/`max` pairs across an array of checklist questions or
/// template items. Every element contributes through the coercion rule, so
/// a half-filled legacy row sums cleanly instead of poisoning the total.
fn sum_item_scores(
    fields: &Map<String, Value>,
    array: &FieldNames,
    score: &FieldNames,
    max: &FieldNames,
) -> (f64, f64) {
    let Some(items) = array_field(fields, array) else {
        return (0.0, 0.0);
    };

    let mut points = 0.0;
    let mut max_points = 0.0;
    for item in items {
        if let Value::Object(item_fields) = item {
            points += numeric_field(item_fields, score);
            max_points += numeric_field(item_fields, max);
        }
    }
    (points, max_points)
}

fn resolve<'a>(fields: &'a Map<String, Value>, names: &FieldNames) -> Option<&'a Value> {
    names
        .candidates()
        .filter_map(|name| fields.get(name))
        .find(|value| !value.is_null())
}

pub(crate) fn text_field(fields: &Map<String, Value>, names: &FieldNames) -> Option<String> {
    match resolve(fields, names)? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// The single numeric coercion rule: absent, null, non-numeric, and
/// non-finite values all resolve to `0.0`.
pub(crate) fn numeric_field(fields: &Map<String, Value>, names: &FieldNames) -> f64 {
    optional_numeric_field(fields, names).unwrap_or(0.0)
}

/// Like [`numeric_field`], but keeps "field absent" distinct from "zero"
/// for callers whose fallback is a configured default rather than `0`.
pub(crate) fn optional_numeric_field(
    fields: &Map<String, Value>,
    names: &FieldNames,
) -> Option<f64> {
    let value = resolve(fields, names)?;
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

pub(crate) fn array_field<'a>(
    fields: &'a Map<String, Value>,
    names: &FieldNames,
) -> Option<&'a Vec<Value>> {
    match resolve(fields, names)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Convert a source timestamp to a calendar date in the reporting zone.
/// RFC 3339 timestamps are shifted into the configured offset; bare dates
/// are taken as already local.
pub(crate) fn local_date(value: &str, offset: FixedOffset) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&offset).date_naive());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// User references carried by a row, used by archive-backed stores to
/// answer per-user queries. Mold-change rows reference two operators.
pub(crate) fn row_users(kind: SourceKind, row: &SourceRow) -> Vec<String> {
    match kind {
        SourceKind::Checklist => text_field(&row.fields, &fields::checklist::USER)
            .into_iter()
            .collect(),
        SourceKind::MoldChange => {
            let mut users: Vec<String> =
                text_field(&row.fields, &fields::mold_change::PRIMARY)
                    .into_iter()
                    .collect();
            users.extend(text_field(&row.fields, &fields::mold_change::BUDDY));
            users
        }
        SourceKind::HrTemplate => text_field(&row.fields, &fields::hr_template::USER)
            .into_iter()
            .collect(),
        SourceKind::Payroll => text_field(&row.fields, &fields::payroll::USER)
            .into_iter()
            .collect(),
    }
}

/// Reporting-zone date of a row, used by archive-backed stores to answer
/// range queries.
pub(crate) fn row_date(
    kind: SourceKind,
    row: &SourceRow,
    offset: FixedOffset,
) -> Option<NaiveDate> {
    let names = match kind {
        SourceKind::Checklist => &fields::checklist::COMPLETED_AT,
        SourceKind::MoldChange => &fields::mold_change::COMPLETED_AT,
        SourceKind::HrTemplate => &fields::hr_template::EVALUATED_AT,
        SourceKind::Payroll => &fields::payroll::DATE,
    };
    text_field(&row.fields, names).and_then(|raw| local_date(&raw, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn row(id: &str, fields: Value) -> SourceRow {
        let Value::Object(fields) = fields else {
            panic!("test rows must be JSON objects");
        };
        SourceRow {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn checklist_sums_question_scores() {
        let row = row(
            "chk-1",
            json!({
                "userId": "U1",
                "completedAt": "2024-03-01T08:30:00+03:00",
                "templateKind": "routine",
                "questions": [
                    { "score": 3.0, "maxScore": 4.0 },
                    { "score": 5.0, "maxScore": 6.0 },
                ],
            }),
        );

        let record = normalize(SourceKind::Checklist, &row, &config()).expect("normalizes");
        assert_eq!(record.category, ScoreCategory::Checklist);
        assert_eq!(record.points, 8.0);
        assert_eq!(record.max_points, 10.0);
        assert_eq!(record.user_id.as_str(), "U1");
    }

    #[test]
    fn hr_template_resolves_legacy_field_names() {
        // Scenario: an old-schema evaluation with no modern field present.
        let row = row(
            "hr-7",
            json!({
                "personelId": "U9",
                "degerlendirmeTarihi": "2024-03-05",
                "maddeler": [
                    { "puan": 4, "maksimumPuan": 5 },
                    { "puan": 2, "maksimumPuan": 5 },
                    { "puan": 5, "maksimumPuan": 5 },
                ],
            }),
        );

        let record = normalize(SourceKind::HrTemplate, &row, &config()).expect("normalizes");
        assert_eq!(record.category, ScoreCategory::HrTemplate);
        assert_eq!(record.points, 11.0);
        assert_eq!(record.max_points, 15.0);
        assert_eq!(record.user_id.as_str(), "U9");
    }

    #[test]
    fn missing_and_malformed_numerics_coerce_to_zero() {
        let row = row(
            "chk-2",
            json!({
                "userId": "U1",
                "completedAt": "2024-03-01",
                "templateKind": "quality",
                "questions": [
                    { "score": null, "maxScore": 5 },
                    { "maxScore": "not-a-number" },
                    { "score": 2 },
                ],
            }),
        );

        let record = normalize(SourceKind::Checklist, &row, &config()).expect("normalizes");
        assert_eq!(record.points, 2.0);
        assert_eq!(record.max_points, 5.0);
        assert!(record.points.is_finite() && record.max_points.is_finite());
    }

    #[test]
    fn unknown_template_kind_is_rejected_not_defaulted() {
        let row = row(
            "chk-3",
            json!({
                "userId": "U1",
                "completedAt": "2024-03-01",
                "templateKind": "mystery",
                "questions": [],
            }),
        );

        let err = normalize(SourceKind::Checklist, &row, &config()).expect_err("rejected");
        assert!(matches!(err, NormalizationError::UnknownCategory { .. }));
    }

    #[test]
    fn points_above_maximum_are_rejected() {
        let row = row(
            "hr-8",
            json!({
                "userId": "U2",
                "evaluatedAt": "2024-03-05",
                "items": [{ "score": 9, "maxScore": 5 }],
            }),
        );

        let err = normalize(SourceKind::HrTemplate, &row, &config()).expect_err("rejected");
        assert!(matches!(err, NormalizationError::PointsExceedMax { .. }));
    }

    #[test]
    fn negative_points_are_only_accepted_for_absence() {
        let bonus = row(
            "pay-1",
            json!({
                "userId": "U2",
                "date": "2024-03-04",
                "adjustmentKind": "bonus",
                "points": -5,
            }),
        );
        let err = normalize(SourceKind::Payroll, &bonus, &config()).expect_err("rejected");
        assert!(matches!(err, NormalizationError::NegativePoints { .. }));

        let absence = row(
            "pay-2",
            json!({
                "userId": "U2",
                "date": "2024-03-04",
                "adjustmentKind": "absence",
                "days": 2,
            }),
        );
        let record = normalize(SourceKind::Payroll, &absence, &config()).expect("normalizes");
        assert_eq!(record.category, ScoreCategory::Absence);
        assert!(record.points < 0.0);
    }

    #[test]
    fn overtime_converts_hours_with_configured_rate() {
        let row = row(
            "pay-3",
            json!({
                "personelId": "U4",
                "tarih": "2024-03-02",
                "tur": "mesai",
                "saat": 3,
            }),
        );

        let cfg = config();
        let record = normalize(SourceKind::Payroll, &row, &cfg).expect("normalizes");
        assert_eq!(record.category, ScoreCategory::Overtime);
        assert_eq!(record.points, 3.0 * cfg.overtime_points_per_hour);
        assert_eq!(record.max_points, 0.0);
    }

    #[test]
    fn timestamps_shift_into_the_reporting_offset() {
        // 22:30 UTC is already the next day at +03:00.
        let offset = FixedOffset::east_opt(3 * 3600).expect("valid offset");
        let date = local_date("2024-03-01T22:30:00Z", offset).expect("parses");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 2).expect("valid date"));

        let bare = local_date("2024-03-01", offset).expect("parses");
        assert_eq!(bare, NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"));

        assert!(local_date("  ", offset).is_none());
        assert!(local_date("yesterday", offset).is_none());
    }

    #[test]
    fn mold_change_rows_list_both_operators() {
        let row = row(
            "mc-1",
            json!({
                "operatorId": "U1",
                "yardimciOperator": "U2",
                "completedAt": "2024-03-03T10:00:00+03:00",
                "points": 20,
            }),
        );

        let users = row_users(SourceKind::MoldChange, &row);
        assert_eq!(users, vec!["U1".to_string(), "U2".to_string()]);
    }
}
