//! Request orchestration: validate, fetch concurrently, canonicalize,
//! aggregate, and assemble per-user reports.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use super::domain::{
    CanonicalScoreRecord, DateRange, InvalidDateRange, SourceKind, UserId, YearMonth,
};
use super::report::{self, PerformanceReport};
use super::sources::{
    checklist, hr_template, mold_change, payroll, ChecklistStore, HrTemplateStore, MoldChangeStore,
    PayrollStore, SourceOutcome, SourceRow, StoreError,
};
use super::{aggregate, rollup, scope};
use crate::config::EngineConfig;

/// Report request as supplied by the calling layer.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub user_ids: Vec<UserId>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Organizational-scope allow-list from the external scope resolver.
    pub allowed_user_ids: Option<BTreeSet<UserId>>,
}

/// The only fatal error category: malformed input is rejected before any
/// aggregation is attempted. Everything source-specific degrades to a
/// partial report instead.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("at least one user id is required")]
    NoUsers,
    #[error("blank user id in request")]
    BlankUser,
    #[error(transparent)]
    InvalidRange(#[from] InvalidDateRange),
}

/// A source fetch that produced no usable rows. Recovered locally: the
/// source contributes zero records and the report is marked partial.
#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("{kind} source timed out after {timeout_ms} ms")]
    Timeout { kind: SourceKind, timeout_ms: u128 },
    #[error("{kind} source failed: {error}")]
    Store { kind: SourceKind, error: StoreError },
    #[error("{kind} source fetch task failed: {detail}")]
    Join { kind: SourceKind, detail: String },
}

/// The aggregation engine over the four evaluation sources.
///
/// Stateless between requests: every report is recomputed from source
/// data, so identical inputs over unchanged stores produce byte-identical
/// output.
pub struct PerformanceEngine<C, M, H, P> {
    checklists: Arc<C>,
    mold_changes: Arc<M>,
    hr_templates: Arc<H>,
    payroll: Arc<P>,
    config: EngineConfig,
}

type FetchResult = Result<Vec<SourceRow>, SourceFetchError>;

impl<C, M, H, P> PerformanceEngine<C, M, H, P>
where
    C: ChecklistStore + 'static,
    M: MoldChangeStore + 'static,
    H: HrTemplateStore + 'static,
    P: PayrollStore + 'static,
{
    pub fn new(
        checklists: Arc<C>,
        mold_changes: Arc<M>,
        hr_templates: Arc<H>,
        payroll: Arc<P>,
        config: EngineConfig,
    ) -> Self {
        Self {
            checklists,
            mold_changes,
            hr_templates,
            payroll,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Produce one report per requested, in-scope user. Fails fast only on
    /// malformed input; per-source problems surface inside each report.
    pub async fn report(
        &self,
        request: &ReportRequest,
    ) -> Result<Vec<PerformanceReport>, RequestError> {
        if request.user_ids.is_empty() {
            return Err(RequestError::NoUsers);
        }
        if request.user_ids.iter().any(|user| user.as_str().trim().is_empty()) {
            return Err(RequestError::BlankUser);
        }
        let range = DateRange::new(request.start, request.end)?;

        let users = scope::allowed_users(&request.user_ids, request.allowed_user_ids.as_ref());

        let mut reports = Vec::with_capacity(users.len());
        for user in &users {
            reports.push(self.report_for_user(user, range).await);
        }
        Ok(reports)
    }

    async fn report_for_user(&self, user_id: &UserId, range: DateRange) -> PerformanceReport {
        let fetches = self.fetch_all(user_id, range).await;

        let mut partial = false;
        let mut warnings = Vec::new();
        let mut records: Vec<CanonicalScoreRecord> = Vec::new();

        for (kind, fetched) in fetches {
            let rows = match fetched {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(user = %user_id, source = kind.label(), %err, "source fetch degraded");
                    partial = true;
                    warnings.push(err.to_string());
                    continue;
                }
            };

            let SourceOutcome {
                records: canonical,
                issues,
            } = match kind {
                SourceKind::Checklist => checklist::canonicalize(&rows, &self.config),
                SourceKind::MoldChange => mold_change::canonicalize(&rows, &self.config),
                SourceKind::HrTemplate => hr_template::canonicalize(&rows, &self.config),
                SourceKind::Payroll => payroll::canonicalize(&rows, &self.config),
            };

            warnings.extend(issues.iter().map(|issue| issue.to_string()));
            records.extend(canonical);
        }

        // Mold-change rows mention two operators; keep only this user's
        // side of each split, and drop anything outside the range.
        let this_user = BTreeSet::from([user_id.clone()]);
        let mut records = scope::allowed_records(records, &this_user);
        records.retain(|record| range.contains(record.date));

        let days = aggregate::aggregate_daily(&records);
        let monthly = rollup::roll_up(user_id, YearMonth::of(range.start), &days);

        report::assemble(user_id, range, records, &days, monthly, partial, warnings)
    }

    /// Issue all four source fetches as independent tasks, each under its
    /// own timeout, and join them. No failure cancels the others.
    async fn fetch_all(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> [(SourceKind, FetchResult); 4] {
        let timeout = self.config.fetch_timeout;

        let checklists = {
            let store = Arc::clone(&self.checklists);
            let user = user_id.clone();
            tokio::spawn(async move {
                tokio::time::timeout(timeout, store.completed_instances(&user, range)).await
            })
        };
        let mold_changes = {
            let store = Arc::clone(&self.mold_changes);
            let user = user_id.clone();
            tokio::spawn(async move {
                tokio::time::timeout(timeout, store.completed_tasks(&user, range)).await
            })
        };
        let hr_templates = {
            let store = Arc::clone(&self.hr_templates);
            let user = user_id.clone();
            tokio::spawn(
                async move { tokio::time::timeout(timeout, store.evaluations(&user, range)).await },
            )
        };
        let payroll = {
            let store = Arc::clone(&self.payroll);
            let user = user_id.clone();
            tokio::spawn(
                async move { tokio::time::timeout(timeout, store.adjustments(&user, range)).await },
            )
        };

        let (checklists, mold_changes, hr_templates, payroll) =
            tokio::join!(checklists, mold_changes, hr_templates, payroll);

        [
            (
                SourceKind::Checklist,
                self.unpack(SourceKind::Checklist, checklists),
            ),
            (
                SourceKind::MoldChange,
                self.unpack(SourceKind::MoldChange, mold_changes),
            ),
            (
                SourceKind::HrTemplate,
                self.unpack(SourceKind::HrTemplate, hr_templates),
            ),
            (
                SourceKind::Payroll,
                self.unpack(SourceKind::Payroll, payroll),
            ),
        ]
    }

    fn unpack(
        &self,
        kind: SourceKind,
        joined: Result<
            Result<Result<Vec<SourceRow>, StoreError>, tokio::time::error::Elapsed>,
            tokio::task::JoinError,
        >,
    ) -> FetchResult {
        match joined {
            Ok(Ok(Ok(rows))) => Ok(rows),
            Ok(Ok(Err(error))) => Err(SourceFetchError::Store { kind, error }),
            Ok(Err(_elapsed)) => Err(SourceFetchError::Timeout {
                kind,
                timeout_ms: self.config.fetch_timeout.as_millis(),
            }),
            Err(join_error) => Err(SourceFetchError::Join {
                kind,
                detail: join_error.to_string(),
            }),
        }
    }
}
