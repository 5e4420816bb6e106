use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for evaluated personnel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical scoring categories. Declaration order is the reporting order
/// used for category breakdowns and daily series output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Checklist,
    EventTask,
    QualityControl,
    HrTemplate,
    Overtime,
    Absence,
    ControlScore,
    Bonus,
}

impl ScoreCategory {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Checklist,
            Self::EventTask,
            Self::QualityControl,
            Self::HrTemplate,
            Self::Overtime,
            Self::Absence,
            Self::ControlScore,
            Self::Bonus,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Checklist => "Checklist",
            Self::EventTask => "Event Task",
            Self::QualityControl => "Quality Control",
            Self::HrTemplate => "HR Template",
            Self::Overtime => "Overtime",
            Self::Absence => "Absence",
            Self::ControlScore => "Control Score",
            Self::Bonus => "Bonus",
        }
    }

    /// Only absence adjustments may subtract points.
    pub const fn allows_negative_points(self) -> bool {
        matches!(self, Self::Absence)
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Evaluation data sources feeding the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Checklist,
    MoldChange,
    HrTemplate,
    Payroll,
}

impl SourceKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Checklist,
            Self::MoldChange,
            Self::HrTemplate,
            Self::Payroll,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Checklist => "checklist",
            Self::MoldChange => "mold change",
            Self::HrTemplate => "HR template",
            Self::Payroll => "payroll",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive calendar range in the organization's reporting timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if start > end {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("date range start {start} is after end {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Calendar month key used by the monthly roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The normalized unit every adapter produces: one point-bearing event
/// traceable back to its originating evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalScoreRecord {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub category: ScoreCategory,
    pub points: f64,
    pub max_points: f64,
    pub source_type: SourceKind,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborator_share: Option<f64>,
}

/// Per-category accumulation inside a day or a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub points: f64,
    pub max_points: f64,
    pub count: usize,
}

impl CategoryTotals {
    pub(crate) fn add(&mut self, points: f64, max_points: f64) {
        self.points += points;
        self.max_points += max_points;
        self.count += 1;
    }

    pub(crate) fn merge(&mut self, other: &CategoryTotals) {
        self.points += other.points;
        self.max_points += other.max_points;
        self.count += other.count;
    }
}

/// One user's scoring for one calendar day. `total_score` always equals the
/// sum of the category buckets; the daily aggregator is the only
/// construction path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPerformance {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub total_score: f64,
    pub category_totals: BTreeMap<ScoreCategory, CategoryTotals>,
}

/// One user's scoring for one calendar month, summed from the month's
/// `DailyPerformance` values only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    pub user_id: UserId,
    pub year_month: YearMonth,
    pub total_score: f64,
    pub daily_average: f64,
    pub category_totals: BTreeMap<ScoreCategory, CategoryTotals>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_order_is_stable_for_reports() {
        let ordered = ScoreCategory::ordered();
        let mut sorted = ordered;
        sorted.sort();
        assert_eq!(ordered, sorted, "Ord must follow declaration order");
    }

    #[test]
    fn only_absence_allows_negative_points() {
        for category in ScoreCategory::ordered() {
            assert_eq!(
                category.allows_negative_points(),
                category == ScoreCategory::Absence
            );
        }
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 2).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        assert!(DateRange::new(start, end).is_err());
        assert!(DateRange::new(end, start).is_ok());
    }

    #[test]
    fn year_month_formats_with_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");
        assert_eq!(YearMonth::of(date).to_string(), "2024-03");
    }
}
