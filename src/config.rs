use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime, Utc};

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// WAL appends between compaction passes.
    pub compact_threshold: u64,
    /// Minutes added to UTC to get the office's civil time. The same-day
    /// lead-time rule and "today" comparisons all run in office time.
    pub utc_offset_minutes: i32,
    pub staff_token: String,
    /// Calendar mirror webhook. Mirroring is disabled when unset.
    pub calendar_url: Option<String>,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind: var("DOCKET_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed("DOCKET_PORT").unwrap_or(8080),
            data_dir: PathBuf::from(var("DOCKET_DATA_DIR").unwrap_or_else(|| "./data".into())),
            compact_threshold: parsed("DOCKET_COMPACT_THRESHOLD").unwrap_or(1000),
            utc_offset_minutes: parsed("DOCKET_UTC_OFFSET_MINUTES").unwrap_or(0),
            staff_token: var("DOCKET_STAFF_TOKEN").unwrap_or_else(|| "docket".into()),
            calendar_url: var("DOCKET_CALENDAR_URL"),
            metrics_port: parsed("DOCKET_METRICS_PORT"),
        }
    }

    /// Current office-local civil time.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(self.utc_offset_minutes as i64)
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|s| s.parse().ok())
}
