//! Live smoke tests against the real data API. Gated behind the
//! `live-coindesk-tests` feature and `--ignored`; they need
//! `OIFETCH_API_KEY` in the environment.

#![cfg(feature = "live-coindesk-tests")]

use chrono::Utc;
use oifetch::{
    fetch_daily_open_interest, fetch_market_instruments, run_minute_backfill_with_fetcher,
    ApiConfig, BackfillConfig, BackfillRequest,
};

#[test]
#[ignore = "requires external network access and an API key"]
fn live_minute_backfill_smoke() {
    let api_cfg = ApiConfig::from_env().expect("live tests need OIFETCH_API_KEY");
    let client = api_cfg.client().expect("client should build");

    let mut request = BackfillRequest::over_days(
        "okex",
        "BTC-USDT-VANILLA-PERPETUAL",
        1,
        Utc::now().timestamp(),
    );
    request.chunk_size = 500;

    let outcome = run_minute_backfill_with_fetcher(
        &request,
        &BackfillConfig {
            page_delay_ms: api_cfg.page_delay_ms,
        },
        &client,
        |_| {},
    )
    .expect("live backfill should run");

    assert!(!outcome.bars.is_empty());
}

#[test]
#[ignore = "requires external network access and an API key"]
fn live_daily_and_catalog_smoke() {
    let api_cfg = ApiConfig::from_env().expect("live tests need OIFETCH_API_KEY");
    let client = api_cfg.client().expect("client should build");

    let bars = fetch_daily_open_interest(
        "binance",
        "BTC-USDT-VANILLA-PERPETUAL",
        7,
        Utc::now().timestamp(),
        &client,
    )
    .expect("live daily fetch should succeed");
    assert!(!bars.is_empty());

    let instruments =
        fetch_market_instruments("binance", &client).expect("live catalog fetch should succeed");
    assert!(!instruments.is_empty());
}
