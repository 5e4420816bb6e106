//! Monthly roll-up over daily performance entries.

use std::collections::BTreeMap;

use super::domain::{
    CategoryTotals, DailyPerformance, MonthlyTotals, ScoreCategory, UserId, YearMonth,
};

/// Sum one user's daily entries for the target month.
///
/// The monthly total is the sum of the month's daily totals; there is no
/// independent recomputation from records. The daily average divides by
/// the number of days that actually carry at least one record, so
/// non-working days do not dilute it; a month with no scored days yields
/// an average of `0.0` rather than a division fault.
pub fn roll_up(user_id: &UserId, year_month: YearMonth, days: &[DailyPerformance]) -> MonthlyTotals {
    let mut total_score = 0.0;
    let mut scored_days = 0usize;
    let mut category_totals: BTreeMap<ScoreCategory, CategoryTotals> = BTreeMap::new();

    for day in days {
        if day.user_id != *user_id || !year_month.contains(day.date) {
            continue;
        }

        total_score += day.total_score;
        scored_days += 1;
        for (category, totals) in &day.category_totals {
            category_totals.entry(*category).or_default().merge(totals);
        }
    }

    let daily_average = if scored_days == 0 {
        0.0
    } else {
        total_score / scored_days as f64
    };

    MonthlyTotals {
        user_id: user_id.clone(),
        year_month,
        total_score,
        daily_average,
        category_totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::aggregate::aggregate_daily;
    use crate::performance::domain::{CanonicalScoreRecord, SourceKind};
    use chrono::NaiveDate;

    fn day(user: &str, date: (i32, u32, u32), points: f64) -> DailyPerformance {
        let records = vec![CanonicalScoreRecord {
            user_id: UserId(user.to_string()),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
            category: ScoreCategory::Checklist,
            points,
            max_points: points,
            source_type: SourceKind::Checklist,
            source_id: "rec".to_string(),
            collaborator_share: None,
        }];
        aggregate_daily(&records).pop().expect("one day")
    }

    #[test]
    fn monthly_total_is_the_sum_of_daily_totals() {
        let user = UserId("U1".to_string());
        let days = vec![
            day("U1", (2024, 3, 1), 8.0),
            day("U1", (2024, 3, 4), 12.0),
            day("U1", (2024, 4, 1), 99.0),
            day("U2", (2024, 3, 2), 50.0),
        ];

        let month = roll_up(&user, YearMonth { year: 2024, month: 3 }, &days);
        assert_eq!(month.total_score, 20.0);
        assert_eq!(month.daily_average, 10.0);
        assert_eq!(month.category_totals[&ScoreCategory::Checklist].count, 2);
    }

    #[test]
    fn empty_month_yields_zero_average_not_a_fault() {
        let user = UserId("U1".to_string());
        let month = roll_up(&user, YearMonth { year: 2024, month: 5 }, &[]);

        assert_eq!(month.total_score, 0.0);
        assert_eq!(month.daily_average, 0.0);
        assert!(month.category_totals.is_empty());
    }
}
