//! Organizational-scope filtering.
//!
//! The allow-list itself comes from an external scope resolver; this
//! module only performs the mechanical set intersection and makes no
//! authorization decisions.

use std::collections::BTreeSet;

use super::domain::{CanonicalScoreRecord, DailyPerformance, UserId};

/// Restrict requested users to the allow-list, preserving request order.
/// An absent allow-list means no restriction.
pub fn allowed_users(requested: &[UserId], allow_list: Option<&BTreeSet<UserId>>) -> Vec<UserId> {
    match allow_list {
        Some(allowed) => requested
            .iter()
            .filter(|user| allowed.contains(user))
            .cloned()
            .collect(),
        None => requested.to_vec(),
    }
}

pub fn allowed_records(
    records: Vec<CanonicalScoreRecord>,
    allowed: &BTreeSet<UserId>,
) -> Vec<CanonicalScoreRecord> {
    records
        .into_iter()
        .filter(|record| allowed.contains(&record.user_id))
        .collect()
}

pub fn allowed_days(
    days: Vec<DailyPerformance>,
    allowed: &BTreeSet<UserId>,
) -> Vec<DailyPerformance> {
    days.into_iter()
        .filter(|day| allowed.contains(&day.user_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(ids: &[&str]) -> Vec<UserId> {
        ids.iter().map(|id| UserId(id.to_string())).collect()
    }

    #[test]
    fn intersection_preserves_request_order() {
        let requested = users(&["U3", "U1", "U2"]);
        let allowed: BTreeSet<UserId> = users(&["U1", "U3"]).into_iter().collect();

        assert_eq!(
            allowed_users(&requested, Some(&allowed)),
            users(&["U3", "U1"])
        );
    }

    #[test]
    fn missing_allow_list_means_no_restriction() {
        let requested = users(&["U1", "U2"]);
        assert_eq!(allowed_users(&requested, None), requested);
    }

    #[test]
    fn empty_allow_list_filters_everyone() {
        let requested = users(&["U1", "U2"]);
        let allowed = BTreeSet::new();
        assert!(allowed_users(&requested, Some(&allowed)).is_empty());
    }

    #[test]
    fn records_and_days_filter_to_the_allowed_set() {
        use crate::performance::aggregate::aggregate_daily;
        use crate::performance::domain::{ScoreCategory, SourceKind};
        use chrono::NaiveDate;

        let records: Vec<CanonicalScoreRecord> = ["U1", "U2", "U1"]
            .iter()
            .enumerate()
            .map(|(index, user)| CanonicalScoreRecord {
                user_id: UserId(user.to_string()),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
                category: ScoreCategory::Bonus,
                points: index as f64,
                max_points: 0.0,
                source_type: SourceKind::Payroll,
                source_id: format!("rec-{index}"),
                collaborator_share: None,
            })
            .collect();
        let days = aggregate_daily(&records);

        let allowed: BTreeSet<UserId> = users(&["U1"]).into_iter().collect();
        let kept_records = allowed_records(records, &allowed);
        let kept_days = allowed_days(days, &allowed);

        assert_eq!(kept_records.len(), 2);
        assert!(kept_records
            .iter()
            .all(|record| record.user_id.as_str() == "U1"));
        assert_eq!(kept_days.len(), 1);
        assert_eq!(kept_days[0].user_id.as_str(), "U1");
    }
}
