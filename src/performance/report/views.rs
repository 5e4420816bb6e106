use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::performance::domain::{DateRange, ScoreCategory, SourceKind, UserId};

/// Per-category accumulation as exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryTotalsView {
    pub points: f64,
    pub max_points: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPerformanceEntry {
    pub date: NaiveDate,
    pub total_score: f64,
    pub category_totals: BTreeMap<ScoreCategory, CategoryTotalsView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotalsView {
    pub year_month: String,
    pub total_score: f64,
    pub daily_average: f64,
    pub category_totals: BTreeMap<ScoreCategory, CategoryTotalsView>,
}

/// Share of the range total contributed by one category.
/// `percent_of_total` is `0.0` when the range total is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryBreakdownEntry {
    pub points: f64,
    pub max_points: f64,
    pub percent_of_total: f64,
}

/// Traceability entry pointing back at one originating evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrilldownEntry {
    pub source_type: SourceKind,
    pub source_id: String,
    pub date: NaiveDate,
    pub category: ScoreCategory,
    pub points: f64,
    pub max_points: f64,
}

/// The externally consumed report shape. Dashboards and export tooling
/// depend on this structure and nothing upstream of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub user_id: UserId,
    pub date_range: DateRange,
    pub daily_series: Vec<DailyPerformanceEntry>,
    pub monthly: MonthlyTotalsView,
    pub category_breakdown: BTreeMap<ScoreCategory, CategoryBreakdownEntry>,
    pub drilldown: Vec<DrilldownEntry>,
    pub partial: bool,
    pub warnings: Vec<String>,
}
