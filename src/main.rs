use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use floorscore::config::{AppConfig, EngineConfig};
use floorscore::error::AppError;
use floorscore::performance::domain::{SourceKind, UserId};
use floorscore::performance::engine::ReportRequest;
use floorscore::performance::{PerformanceEngine, PerformanceReport, ScoreArchive};
use floorscore::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct MetricsState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Clone)]
struct ReportState {
    archive: Arc<ScoreArchive>,
    engine: EngineConfig,
}

type ArchiveEngine = PerformanceEngine<ScoreArchive, ScoreArchive, ScoreArchive, ScoreArchive>;

fn archive_engine(archive: Arc<ScoreArchive>, config: EngineConfig) -> ArchiveEngine {
    PerformanceEngine::new(
        Arc::clone(&archive),
        Arc::clone(&archive),
        Arc::clone(&archive),
        archive,
        config,
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "Floorscore",
    about = "Aggregate personnel performance scores across shopfloor evaluation sources",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with personnel performance reports
    Performance {
        #[command(subcommand)]
        command: PerformanceCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    #[command(flatten)]
    sources: SourceCsvArgs,
}

#[derive(Subcommand, Debug)]
enum PerformanceCommand {
    /// Generate a per-user performance report from CSV exports
    Report(PerformanceReportArgs),
}

/// CSV exports of the evaluation sources; absent sources contribute no
/// records.
#[derive(Args, Debug, Default)]
struct SourceCsvArgs {
    /// Completed checklist instances export
    #[arg(long)]
    checklist_csv: Option<PathBuf>,
    /// Completed mold-change tasks export
    #[arg(long)]
    mold_change_csv: Option<PathBuf>,
    /// HR template evaluations export
    #[arg(long)]
    hr_template_csv: Option<PathBuf>,
    /// Payroll adjustments export
    #[arg(long)]
    payroll_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PerformanceReportArgs {
    /// User to report on; repeat for multiple users
    #[arg(long = "user", required = true)]
    users: Vec<String>,
    /// Range start (YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_date)]
    start: NaiveDate,
    /// Range end (YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_date)]
    end: NaiveDate,
    /// Restrict reporting to these users; repeat per user
    #[arg(long = "allowed-user")]
    allowed_users: Vec<String>,
    /// Include the per-record drill-down listing
    #[arg(long)]
    drilldown: bool,
    #[command(flatten)]
    sources: SourceCsvArgs,
}

#[derive(Debug, Deserialize)]
struct PerformanceReportRequest {
    user_ids: Vec<String>,
    #[serde(deserialize_with = "deserialize_date")]
    start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    end: NaiveDate,
    #[serde(default)]
    allowed_user_ids: Option<Vec<String>>,
    #[serde(default)]
    sources: Option<InlineSources>,
}

/// Inline CSV exports shipped with the request instead of read from the
/// server-side archive.
#[derive(Debug, Default, Deserialize)]
struct InlineSources {
    checklist_csv: Option<String>,
    mold_change_csv: Option<String>,
    hr_template_csv: Option<String>,
    payroll_csv: Option<String>,
}

#[derive(Debug, Serialize)]
struct PerformanceReportResponse {
    data_source: ReportDataSource,
    reports: Vec<PerformanceReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum ReportDataSource {
    Archive,
    Inline,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Performance {
            command: PerformanceCommand::Report(args),
        } => run_performance_report(args).await,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

fn load_archive(config: &EngineConfig, sources: &SourceCsvArgs) -> Result<ScoreArchive, AppError> {
    let mut archive = ScoreArchive::empty(config.reporting_offset);
    let paths = [
        (SourceKind::Checklist, &sources.checklist_csv),
        (SourceKind::MoldChange, &sources.mold_change_csv),
        (SourceKind::HrTemplate, &sources.hr_template_csv),
        (SourceKind::Payroll, &sources.payroll_csv),
    ];
    for (kind, path) in paths {
        if let Some(path) = path {
            archive.load_path(kind, path).map_err(AppError::from)?;
        }
    }
    Ok(archive)
}

fn inline_archive(config: &EngineConfig, sources: InlineSources) -> Result<ScoreArchive, AppError> {
    let mut archive = ScoreArchive::empty(config.reporting_offset);
    let payloads = [
        (SourceKind::Checklist, sources.checklist_csv),
        (SourceKind::MoldChange, sources.mold_change_csv),
        (SourceKind::HrTemplate, sources.hr_template_csv),
        (SourceKind::Payroll, sources.payroll_csv),
    ];
    for (kind, payload) in payloads {
        if let Some(payload) = payload {
            archive
                .load_reader(kind, Cursor::new(payload.into_bytes()))
                .map_err(AppError::from)?;
        }
    }
    Ok(archive)
}

fn report_request(
    users: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    allowed: Option<Vec<String>>,
) -> ReportRequest {
    ReportRequest {
        user_ids: users.into_iter().map(UserId).collect(),
        start,
        end,
        allowed_user_ids: allowed
            .map(|users| users.into_iter().map(UserId).collect::<BTreeSet<UserId>>()),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let archive = load_archive(&config.engine, &args.sources)?;
    for kind in SourceKind::ordered() {
        info!(source = kind.label(), rows = archive.len(kind), "archive loaded");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let metrics_state = MetricsState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };
    let report_state = ReportState {
        archive: Arc::new(archive),
        engine: config.engine.clone(),
    };

    let app = app_router(report_state, metrics_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "performance aggregation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_performance_report(args: PerformanceReportArgs) -> Result<(), AppError> {
    let PerformanceReportArgs {
        users,
        start,
        end,
        allowed_users,
        drilldown,
        sources,
    } = args;

    let config = AppConfig::load()?;
    let archive = load_archive(&config.engine, &sources)?;
    let engine = archive_engine(Arc::new(archive), config.engine);

    let allowed = (!allowed_users.is_empty()).then_some(allowed_users);
    let request = report_request(users, start, end, allowed);
    let reports = engine.report(&request).await?;

    for report in &reports {
        render_performance_report(report, drilldown);
    }

    Ok(())
}

fn app_router(report_state: ReportState, metrics_state: MetricsState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/performance/report",
            post(performance_report_endpoint),
        )
        .layer(Extension(metrics_state))
        .with_state(report_state)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<MetricsState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<MetricsState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn performance_report_endpoint(
    State(state): State<ReportState>,
    Json(payload): Json<PerformanceReportRequest>,
) -> Result<Json<PerformanceReportResponse>, AppError> {
    let PerformanceReportRequest {
        user_ids,
        start,
        end,
        allowed_user_ids,
        sources,
    } = payload;

    let (archive, data_source) = match sources {
        Some(inline) => (
            Arc::new(inline_archive(&state.engine, inline)?),
            ReportDataSource::Inline,
        ),
        None => (state.archive.clone(), ReportDataSource::Archive),
    };

    let engine = archive_engine(archive, state.engine.clone());
    let request = report_request(user_ids, start, end, allowed_user_ids);
    let reports = engine.report(&request).await?;

    Ok(Json(PerformanceReportResponse {
        data_source,
        reports,
    }))
}

fn render_performance_report(report: &PerformanceReport, drilldown: bool) {
    println!(
        "\nPerformance report for {} ({} -> {})",
        report.user_id, report.date_range.start, report.date_range.end
    );

    if report.partial {
        println!("PARTIAL: one or more sources were unavailable");
    }

    println!(
        "Month {}: total {:.1}, daily average {:.2}",
        report.monthly.year_month, report.monthly.total_score, report.monthly.daily_average
    );

    if report.category_breakdown.is_empty() {
        println!("Category breakdown: no scored records");
    } else {
        println!("Category breakdown");
        for (category, entry) in &report.category_breakdown {
            println!(
                "- {}: {:.1} / {:.1} ({:.1}% of total)",
                category.label(),
                entry.points,
                entry.max_points,
                entry.percent_of_total * 100.0
            );
        }
    }

    if !report.daily_series.is_empty() {
        println!("Daily series");
        for day in &report.daily_series {
            println!("- {}: {:.1}", day.date, day.total_score);
        }
    }

    if !report.warnings.is_empty() {
        println!("Warnings");
        for warning in &report.warnings {
            println!("- {warning}");
        }
    }

    if drilldown {
        println!("Drill-down");
        for entry in &report.drilldown {
            println!(
                "- {} | {} | {} | {} | {:.1} / {:.1}",
                entry.date,
                entry.source_type.label(),
                entry.source_id,
                entry.category.label(),
                entry.points,
                entry.max_points
            );
        }
    }
}
