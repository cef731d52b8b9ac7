//! JSON dump files, filename grammar, and run summaries.
//!
//! Filenames are the only schema downstream consumers see:
//! `{exchange}_{instrument}_1min_{days}d_{YYYYmmdd_HHMM}.json` for
//! minute backfills, `{exchange}_{instrument}_{YYYYmmdd}.json` for
//! daily snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::api::OpenInterestBar;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Slashes in instrument names would otherwise split the file path.
pub fn sanitize_instrument(raw: &str) -> String {
    raw.replace('/', "-")
}

pub fn minute_dump_filename(
    exchange: &str,
    instrument: &str,
    days: u32,
    generated_at: DateTime<Utc>,
) -> String {
    format!(
        "{exchange}_{}_1min_{days}d_{}.json",
        sanitize_instrument(instrument),
        generated_at.format("%Y%m%d_%H%M")
    )
}

pub fn daily_dump_filename(exchange: &str, instrument: &str, date: NaiveDate) -> String {
    format!(
        "{exchange}_{}_{}.json",
        sanitize_instrument(instrument),
        date.format("%Y%m%d")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Writes any serializable payload as pretty-printed JSON, creating
/// the output directory if absent.
pub fn write_json_file<T: Serialize>(
    dir: &Path,
    filename: &str,
    payload: &T,
) -> Result<DumpedFile, PersistError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let body = serde_json::to_vec_pretty(payload)?;
    fs::write(&path, &body)?;

    Ok(DumpedFile {
        path,
        size_bytes: body.len() as u64,
    })
}

/// Writes the accumulated records as one JSON array.
pub fn write_json_dump<T: Serialize>(
    dir: &Path,
    filename: &str,
    records: &[T],
) -> Result<DumpedFile, PersistError> {
    let dumped = write_json_file(dir, filename, &records)?;
    info!(
        component = "persist",
        event = "dump.written",
        path = %dumped.path.display(),
        records = records.len(),
        size_bytes = dumped.size_bytes
    );
    Ok(dumped)
}

/// Min/max `TIMESTAMP` over the accumulated bars, in arrival order.
pub fn timestamp_range(bars: &[OpenInterestBar]) -> Option<(i64, i64)> {
    let mut timestamps = bars.iter().map(|bar| bar.timestamp_s);
    let first = timestamps.next()?;
    Some(timestamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
}

pub fn format_utc_minute(ts_s: i64) -> String {
    match Utc.timestamp_opt(ts_s, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("invalid({ts_s})"),
    }
}

/// Descriptive end-of-run metrics. Purely observational.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub days: u32,
    pub total_minutes: i64,
    pub api_calls: u64,
    pub elapsed: Duration,
    pub file_size_bytes: u64,
    pub timestamp_range_s: Option<(i64, i64)>,
}

impl RunSummary {
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Days backfilled".to_string(), self.days.to_string()),
            ("Total minutes".to_string(), self.total_minutes.to_string()),
            ("API calls".to_string(), self.api_calls.to_string()),
            (
                "Run time (s)".to_string(),
                format!("{:.1}", self.elapsed.as_secs_f64()),
            ),
            (
                "File size (MB)".to_string(),
                format!("{:.1}", self.file_size_bytes as f64 / (1024.0 * 1024.0)),
            ),
        ];

        if let Some((first_ts, last_ts)) = self.timestamp_range_s {
            rows.push((
                "Date range (UTC)".to_string(),
                format!(
                    "{} -> {}",
                    format_utc_minute(first_ts),
                    format_utc_minute(last_ts)
                ),
            ));
        }

        rows
    }
}

/// Renders metric/value rows as a github-style table.
pub fn render_summary_table(rows: &[(String, String)]) -> String {
    let metric_width = rows
        .iter()
        .map(|(metric, _)| metric.len())
        .max()
        .unwrap_or(0)
        .max("Metric".len());
    let value_width = rows
        .iter()
        .map(|(_, value)| value.len())
        .max()
        .unwrap_or(0)
        .max("Value".len());

    let mut out = String::new();
    out.push_str(&format!(
        "| {:metric_width$} | {:value_width$} |\n",
        "Metric", "Value"
    ));
    out.push_str(&format!(
        "|{}|{}|\n",
        "-".repeat(metric_width + 2),
        "-".repeat(value_width + 2)
    ));
    for (metric, value) in rows {
        out.push_str(&format!("| {metric:metric_width$} | {value:value_width$} |\n"));
    }

    out
}
