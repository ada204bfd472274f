// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Everything is read once at
//! startup; a malformed value is fatal and the process exits before serving.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Strava caps `per_page` on the activities endpoint.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Log verbosity for this crate (`debug`, `info`, `warn`, `error`)
    pub log_level: String,

    // --- Strava OAuth ---
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Callback URL registered with Strava
    pub strava_redirect_url: String,

    // --- Durable store ---
    /// GCP project holding the Firestore database
    pub gcp_project_id: String,

    // --- Publishing ---
    /// X (Twitter) OAuth 2.0 user access token. Posting is disabled when unset.
    pub twitter_access_token: Option<String>,

    /// CSV file with `date,ftp` rows
    pub ftp_file_path: String,

    pub schedules: ScheduleConfig,

    /// How far back each import run looks
    pub import_overlap: chrono::Duration,
    /// `per_page` sent to Strava, never above [`MAX_PAGE_SIZE`]
    pub import_page_size: u32,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
    /// Upper bound for a single scheduled job run
    pub job_timeout: Duration,
    /// Timeout for each Firestore call
    pub store_timeout: Duration,
}

/// Cron expressions (six fields, with seconds) for every scheduled job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub token_refresh: String,
    pub data_import: String,
    pub weekly_summary: String,
    pub monthly_summary: String,
    pub yearly_summary: String,
    pub state_sweep: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            token_refresh: "0 0 2 * * *".to_string(),
            data_import: "0 0 * * * *".to_string(),
            weekly_summary: "0 0 3 * * Mon".to_string(),
            monthly_summary: "0 0 4 1 * *".to_string(),
            yearly_summary: "0 0 5 1 1 *".to_string(),
            state_sweep: "0 */10 * * * *".to_string(),
        }
    }
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 9090,
            log_level: "debug".to_string(),
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_redirect_url: "http://localhost:9090/auth/callback".to_string(),
            gcp_project_id: "test-project".to_string(),
            twitter_access_token: None,
            ftp_file_path: "./conf/ftp.csv".to_string(),
            schedules: ScheduleConfig::default(),
            import_overlap: chrono::Duration::hours(48),
            import_page_size: MAX_PAGE_SIZE,
            http_timeout: Duration::from_secs(5),
            job_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(2),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = ScheduleConfig::default();
        let schedules = ScheduleConfig {
            token_refresh: env_or("TOKEN_REFRESH_CRON", &defaults.token_refresh),
            data_import: env_or("DATA_IMPORT_CRON", &defaults.data_import),
            weekly_summary: env_or("WEEKLY_SUMMARY_CRON", &defaults.weekly_summary),
            monthly_summary: env_or("MONTHLY_SUMMARY_CRON", &defaults.monthly_summary),
            yearly_summary: env_or("YEARLY_SUMMARY_CRON", &defaults.yearly_summary),
            state_sweep: env_or("STATE_SWEEP_CRON", &defaults.state_sweep),
        };

        let overlap_hours: i64 = parse_env("IMPORT_OVERLAP_HOURS", 48)?;
        if overlap_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "IMPORT_OVERLAP_HOURS",
                reason: "must be positive".to_string(),
            });
        }

        let page_size: u32 = parse_env("IMPORT_PAGE_SIZE", MAX_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                var: "IMPORT_PAGE_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }

        let log_level = env_or("LOG_LEVEL", "info").to_lowercase();
        if !matches!(
            log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::Invalid {
                var: "LOG_LEVEL",
                reason: format!("unknown level '{}'", log_level),
            });
        }

        Ok(Self {
            port: parse_env("PORT", 9090)?,
            log_level,
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            strava_redirect_url: env_or(
                "STRAVA_REDIRECT_URL",
                "http://localhost:9090/auth/callback",
            ),
            gcp_project_id: env_or("GCP_PROJECT_ID", "local-dev"),
            twitter_access_token: env::var("TWITTER_ACCESS_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            ftp_file_path: env_or("FTP_FILE_PATH", "./conf/ftp.csv"),
            schedules,
            import_overlap: chrono::Duration::hours(overlap_hours),
            import_page_size: page_size.min(MAX_PAGE_SIZE),
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 30)?),
            job_timeout: Duration::from_secs(parse_env("JOB_TIMEOUT_SECS", 600)?),
            store_timeout: Duration::from_secs(parse_env("STORE_TIMEOUT_SECS", 10)?),
        })
    }
}

/// Read a variable, treating unset and blank the same.
fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
