use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::FixedOffset;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Scoring and fetch policy for the aggregation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Offset of the organization's reporting timezone; source timestamps
    /// become calendar dates in this zone.
    pub reporting_offset: FixedOffset,
    /// Individual timeout applied to each source fetch.
    pub fetch_timeout: Duration,
    /// Primary operator's default fraction of a shared mold-change task.
    /// Business policy, not a constant; rows may override it explicitly.
    pub buddy_primary_share: f64,
    pub overtime_points_per_hour: f64,
    pub absence_penalty_per_day: f64,
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let reporting_offset = match env::var("REPORT_UTC_OFFSET") {
            Ok(value) => parse_utc_offset(&value).ok_or(ConfigError::InvalidUtcOffset { value })?,
            Err(_) => default_reporting_offset(),
        };

        let fetch_timeout =
            Duration::from_millis(numeric_env("SOURCE_FETCH_TIMEOUT_MS", 5_000.0)? as u64);

        let buddy_primary_share = numeric_env("BUDDY_PRIMARY_SHARE", 0.5)?;
        if !(buddy_primary_share > 0.0 && buddy_primary_share < 1.0) {
            return Err(ConfigError::InvalidShare {
                value: buddy_primary_share,
            });
        }

        Ok(Self {
            reporting_offset,
            fetch_timeout,
            buddy_primary_share,
            overtime_points_per_hour: numeric_env("OVERTIME_POINTS_PER_HOUR", 2.0)?,
            absence_penalty_per_day: numeric_env("ABSENCE_PENALTY_PER_DAY", 10.0)?,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reporting_offset: default_reporting_offset(),
            fetch_timeout: Duration::from_millis(5_000),
            buddy_primary_share: 0.5,
            overtime_points_per_hour: 2.0,
            absence_penalty_per_day: 10.0,
        }
    }
}

fn default_reporting_offset() -> FixedOffset {
    // The plants report in UTC+03:00.
    FixedOffset::east_opt(3 * 3600).expect("static offset is in range")
}

fn numeric_env(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite() && *number >= 0.0)
            .ok_or(ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

/// Parse `±HH:MM` into a fixed offset.
fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let trimmed = value.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUtcOffset { value: String },
    InvalidNumber { name: &'static str, value: String },
    InvalidShare { value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUtcOffset { value } => {
                write!(f, "REPORT_UTC_OFFSET '{}' must look like +03:00", value)
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{} '{}' must be a non-negative number", name, value)
            }
            ConfigError::InvalidShare { value } => {
                write!(
                    f,
                    "BUDDY_PRIMARY_SHARE {} must be strictly between 0 and 1",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
