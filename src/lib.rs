//! Fetchers for CoinDesk futures open-interest data.
//!
//! Current implemented scope:
//! - backward minute-level backfill pagination over the historical
//!   open-interest endpoint
//! - daily open-interest snapshots for a configured instrument map
//! - futures instrument catalog discovery (active BTC perpetuals)
//! - timestamped JSON dump files with end-of-run summaries

mod api;
mod backfill;
mod config;
mod daily;
mod instruments;
mod observability;
mod persist;

pub use api::{
    decode_bars, open_interest_query, ApiClient, ApiError, DataApi, OpenInterestBar,
    DAILY_OPEN_INTEREST_PATH, DEFAULT_BASE_URL, MARKETS_INSTRUMENTS_PATH,
    MINUTE_OPEN_INTEREST_PATH,
};
pub use backfill::{
    run_minute_backfill_with_fetcher, BackfillConfig, BackfillError, BackfillOutcome,
    BackfillRequest, StopReason, DEFAULT_CHUNK_SIZE, MINUTES_PER_DAY, MINUTE_STEP_S,
};
pub use config::{ApiConfig, ConfigError, InstrumentMap, API_KEY_ENV};
pub use daily::fetch_daily_open_interest;
pub use instruments::{
    btc_perpetual_symbols, discover_btc_perpetuals, fetch_market_instruments, instruments_query,
    InstrumentMeta, MarketRow, MarketStatus,
};
pub use observability::{
    init_logging, log_run_start, logging_config_from_env, LogFormat, LoggingConfig,
    LoggingInitError,
};
pub use persist::{
    daily_dump_filename, format_utc_minute, minute_dump_filename, render_summary_table,
    sanitize_instrument, timestamp_range, write_json_dump, write_json_file, DumpedFile,
    PersistError, RunSummary,
};
