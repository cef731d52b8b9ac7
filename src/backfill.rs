//! Backward pagination over the minute-level historical open-interest
//! endpoint.
//!
//! Pages are requested newest-first: each successful page moves the
//! `to_ts` cursor to one minute before the earliest timestamp it
//! contained, until the window start is crossed, the API runs out of
//! data, or a request fails. Failures keep whatever accumulated so far.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{
    decode_bars, open_interest_query, DataApi, OpenInterestBar, MINUTE_OPEN_INTEREST_PATH,
};

pub const MINUTE_STEP_S: i64 = 60;
pub const MINUTES_PER_DAY: i64 = 1_440;
pub const DEFAULT_CHUNK_SIZE: u32 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillRequest {
    pub market: String,
    pub instrument: String,
    pub start_ts_s: i64,
    pub end_ts_s: i64,
    pub chunk_size: u32,
}

impl BackfillRequest {
    /// Window covering the last `days` days, ending at `end_ts_s`.
    pub fn over_days(
        market: impl Into<String>,
        instrument: impl Into<String>,
        days: u32,
        end_ts_s: i64,
    ) -> Self {
        Self {
            market: market.into(),
            instrument: instrument.into(),
            start_ts_s: end_ts_s - i64::from(days) * MINUTES_PER_DAY * MINUTE_STEP_S,
            end_ts_s,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn total_minutes(&self) -> i64 {
        (self.end_ts_s - self.start_ts_s) / MINUTE_STEP_S
    }

    /// Upper bound on loop iterations when every page is full.
    pub fn expected_calls(&self) -> u64 {
        let total = self.total_minutes();
        if total <= 0 || self.chunk_size == 0 {
            return 0;
        }
        let chunk = i64::from(self.chunk_size);
        ((total + chunk - 1) / chunk) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillConfig {
    /// Fixed delay between calls, for rate-limit courtesy.
    pub page_delay_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self { page_delay_ms: 1_000 }
    }
}

/// Why the pagination loop stopped. Only `WindowExhausted` means the
/// whole window was covered; every variant still yields the records
/// accumulated up to that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    WindowExhausted,
    NoMoreData { cursor_ts_s: i64 },
    RequestFailed { message: String },
    CursorStalled { cursor_ts_s: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackfillOutcome {
    pub bars: Vec<OpenInterestBar>,
    pub call_count: u64,
    pub elapsed: Duration,
    pub stop: StopReason,
}

impl BackfillOutcome {
    pub fn completed(&self) -> bool {
        matches!(self.stop, StopReason::WindowExhausted)
    }
}

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("invalid backfill request: {0}")]
    InvalidRequest(String),
}

/// Runs the backward pagination loop. `on_page` is invoked once per
/// successful page with the running call count; it is observational
/// only and has no effect on control flow.
pub fn run_minute_backfill_with_fetcher(
    req: &BackfillRequest,
    cfg: &BackfillConfig,
    fetcher: &dyn DataApi,
    mut on_page: impl FnMut(u64),
) -> Result<BackfillOutcome, BackfillError> {
    validate_request(req)?;

    info!(
        component = "backfill",
        event = "backfill.start",
        market = %req.market,
        instrument = %req.instrument,
        total_minutes = req.total_minutes(),
        chunk_size = req.chunk_size,
        expected_calls = req.expected_calls()
    );

    let started = Instant::now();
    let mut bars: Vec<OpenInterestBar> = Vec::new();
    let mut call_count = 0u64;
    let mut cursor_ts_s = req.end_ts_s;

    let stop = loop {
        let remaining_minutes = (cursor_ts_s - req.start_ts_s) / MINUTE_STEP_S;
        if remaining_minutes <= 0 {
            break StopReason::WindowExhausted;
        }

        let limit = remaining_minutes.min(i64::from(req.chunk_size));
        let query = open_interest_query(&req.market, &req.instrument, limit, cursor_ts_s);
        let page = match fetcher
            .get_json(MINUTE_OPEN_INTEREST_PATH, &query)
            .and_then(|payload| decode_bars(payload, MINUTE_OPEN_INTEREST_PATH))
        {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    component = "backfill",
                    event = "backfill.request_failed",
                    market = %req.market,
                    instrument = %req.instrument,
                    to_ts = cursor_ts_s,
                    error = %err
                );
                break StopReason::RequestFailed {
                    message: err.to_string(),
                };
            }
        };

        if page.is_empty() {
            warn!(
                component = "backfill",
                event = "backfill.exhausted",
                market = %req.market,
                instrument = %req.instrument,
                to_ts = cursor_ts_s
            );
            break StopReason::NoMoreData { cursor_ts_s };
        }

        let Some(earliest_ts_s) = page.iter().map(|bar| bar.timestamp_s).min() else {
            break StopReason::NoMoreData { cursor_ts_s };
        };
        let next_cursor = earliest_ts_s - MINUTE_STEP_S;
        if next_cursor >= cursor_ts_s {
            warn!(
                component = "backfill",
                event = "backfill.cursor_stalled",
                market = %req.market,
                instrument = %req.instrument,
                to_ts = cursor_ts_s,
                earliest_ts = earliest_ts_s
            );
            break StopReason::CursorStalled { cursor_ts_s };
        }

        let page_rows = page.len();
        bars.extend(page);
        call_count += 1;
        cursor_ts_s = next_cursor;
        on_page(call_count);

        info!(
            component = "backfill",
            event = "backfill.page",
            call = call_count,
            rows = page_rows,
            next_to_ts = cursor_ts_s
        );

        if cfg.page_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(cfg.page_delay_ms));
        }
    };

    let elapsed = started.elapsed();
    info!(
        component = "backfill",
        event = "backfill.finish",
        calls = call_count,
        rows = bars.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        stop = ?stop
    );

    Ok(BackfillOutcome {
        bars,
        call_count,
        elapsed,
        stop,
    })
}

fn validate_request(req: &BackfillRequest) -> Result<(), BackfillError> {
    if req.end_ts_s <= req.start_ts_s {
        return Err(BackfillError::InvalidRequest(
            "end_ts_s must be greater than start_ts_s".to_string(),
        ));
    }
    if req.chunk_size == 0 {
        return Err(BackfillError::InvalidRequest(
            "chunk_size must be >= 1".to_string(),
        ));
    }
    Ok(())
}
