//! Assembly of the externally consumed performance report.
//!
//! Upstream components exchange internal types; this module is the single
//! place that shapes the public response.

pub mod views;

pub use views::{
    CategoryBreakdownEntry, CategoryTotalsView, DailyPerformanceEntry, DrilldownEntry,
    MonthlyTotalsView, PerformanceReport,
};

use std::collections::BTreeMap;

use super::domain::{
    CanonicalScoreRecord, CategoryTotals, DailyPerformance, DateRange, MonthlyTotals,
    ScoreCategory, UserId,
};

/// Build the report for one user from already-aggregated data.
pub(crate) fn assemble(
    user_id: &UserId,
    date_range: DateRange,
    mut records: Vec<CanonicalScoreRecord>,
    days: &[DailyPerformance],
    monthly: MonthlyTotals,
    partial: bool,
    warnings: Vec<String>,
) -> PerformanceReport {
    records.sort_by(|a, b| {
        (a.date, a.category, a.source_id.as_str()).cmp(&(b.date, b.category, b.source_id.as_str()))
    });

    let daily_series = days.iter().map(daily_entry).collect();
    let category_breakdown = breakdown(days);
    let drilldown = records
        .into_iter()
        .map(|record| DrilldownEntry {
            source_type: record.source_type,
            source_id: record.source_id,
            date: record.date,
            category: record.category,
            points: record.points,
            max_points: record.max_points,
        })
        .collect();

    PerformanceReport {
        user_id: user_id.clone(),
        date_range,
        daily_series,
        monthly: monthly_view(&monthly),
        category_breakdown,
        drilldown,
        partial,
        warnings,
    }
}

fn daily_entry(day: &DailyPerformance) -> DailyPerformanceEntry {
    DailyPerformanceEntry {
        date: day.date,
        total_score: day.total_score,
        category_totals: totals_view(&day.category_totals),
    }
}

fn monthly_view(monthly: &MonthlyTotals) -> MonthlyTotalsView {
    MonthlyTotalsView {
        year_month: monthly.year_month.to_string(),
        total_score: monthly.total_score,
        daily_average: monthly.daily_average,
        category_totals: totals_view(&monthly.category_totals),
    }
}

fn totals_view(
    totals: &BTreeMap<ScoreCategory, CategoryTotals>,
) -> BTreeMap<ScoreCategory, CategoryTotalsView> {
    totals
        .iter()
        .map(|(category, bucket)| {
            (
                *category,
                CategoryTotalsView {
                    points: bucket.points,
                    max_points: bucket.max_points,
                    count: bucket.count,
                },
            )
        })
        .collect()
}

/// Per-category share of the whole requested range. A zero range total
/// yields zero percentages, never a non-finite value.
fn breakdown(days: &[DailyPerformance]) -> BTreeMap<ScoreCategory, CategoryBreakdownEntry> {
    let mut sums: BTreeMap<ScoreCategory, CategoryTotals> = BTreeMap::new();
    let mut range_total = 0.0;

    for day in days {
        range_total += day.total_score;
        for (category, bucket) in &day.category_totals {
            sums.entry(*category).or_default().merge(bucket);
        }
    }

    sums.into_iter()
        .map(|(category, bucket)| {
            let percent_of_total = if range_total == 0.0 {
                0.0
            } else {
                bucket.points / range_total
            };
            (
                category,
                CategoryBreakdownEntry {
                    points: bucket.points,
                    max_points: bucket.max_points,
                    percent_of_total,
                },
            )
        })
        .collect()
}
