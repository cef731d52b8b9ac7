//! Single-request daily open-interest snapshots.

use tracing::{info, warn};

use crate::api::{
    decode_bars, open_interest_query, ApiError, DataApi, OpenInterestBar,
    DAILY_OPEN_INTEREST_PATH,
};

/// Fetches the last `days` daily open-interest bars for one
/// market/instrument pair. One request, no pagination; an empty result
/// is reported as a warning but is not an error.
pub fn fetch_daily_open_interest(
    market: &str,
    instrument: &str,
    days: u32,
    now_ts_s: i64,
    fetcher: &dyn DataApi,
) -> Result<Vec<OpenInterestBar>, ApiError> {
    let query = open_interest_query(market, instrument, i64::from(days), now_ts_s);
    let payload = fetcher.get_json(DAILY_OPEN_INTEREST_PATH, &query)?;
    let bars = decode_bars(payload, DAILY_OPEN_INTEREST_PATH)?;

    if bars.is_empty() {
        warn!(
            component = "daily",
            event = "daily.empty",
            market,
            instrument
        );
    } else {
        info!(
            component = "daily",
            event = "daily.fetched",
            market,
            instrument,
            rows = bars.len()
        );
    }

    Ok(bars)
}
