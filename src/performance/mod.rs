//! Personnel performance aggregation engine.
//!
//! Heterogeneous evaluation records (checklists, mold-change tasks with
//! buddy crediting, HR template scores, payroll adjustments) are fetched
//! concurrently, normalized into one canonical shape, aggregated per day,
//! rolled up per month, and assembled into the report consumed by
//! dashboards and export tooling.

pub mod aggregate;
pub mod archive;
pub mod domain;
pub mod engine;
pub mod normalize;
pub mod report;
pub mod rollup;
pub mod scope;
pub mod sources;

pub use archive::ScoreArchive;
pub use engine::{PerformanceEngine, ReportRequest, RequestError};
pub use report::PerformanceReport;
