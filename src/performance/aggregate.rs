//! Daily aggregation of canonical score records.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::domain::{CanonicalScoreRecord, CategoryTotals, DailyPerformance, ScoreCategory, UserId};

/// Group records by user and calendar day and sum them per category.
///
/// This is the only construction path for [`DailyPerformance`]: the daily
/// total and the category buckets are accumulated from the same records,
/// so `total_score == sum(category_totals[*].points)` holds by
/// construction. Output is deterministic: users and days ascending,
/// categories in enumeration order.
pub fn aggregate_daily(records: &[CanonicalScoreRecord]) -> Vec<DailyPerformance> {
    let mut groups: BTreeMap<(UserId, NaiveDate), BTreeMap<ScoreCategory, CategoryTotals>> =
        BTreeMap::new();

    for record in records {
        groups
            .entry((record.user_id.clone(), record.date))
            .or_default()
            .entry(record.category)
            .or_default()
            .add(record.points, record.max_points);
    }

    groups
        .into_iter()
        .map(|((user_id, date), category_totals)| {
            let total_score = category_totals.values().map(|totals| totals.points).sum();
            DailyPerformance {
                user_id,
                date,
                total_score,
                category_totals,
            }
        })
        .collect()
}
