//! Futures instrument catalog discovery.
//!
//! The markets/instruments endpoint nests its payload by market:
//! `Data -> {market} -> instruments -> {SYMBOL: {INSTRUMENT_STATUS, ..}}`.
//! Discovery sweeps a list of target exchanges and reports a per-market
//! outcome row, so one failing exchange never aborts the rest.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiError, DataApi, MARKETS_INSTRUMENTS_PATH};

const ACTIVE_STATUS: &str = "ACTIVE";

/// Per-instrument metadata. Fields beyond the status are opaque.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstrumentMeta {
    #[serde(rename = "INSTRUMENT_STATUS", default)]
    pub status: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

pub fn instruments_query(market: &str) -> Vec<(String, String)> {
    vec![
        ("market".to_string(), market.to_string()),
        ("instrument_status".to_string(), ACTIVE_STATUS.to_string()),
    ]
}

/// Fetches the instrument catalog for one market.
pub fn fetch_market_instruments(
    market: &str,
    fetcher: &dyn DataApi,
) -> Result<BTreeMap<String, InstrumentMeta>, ApiError> {
    let payload = fetcher.get_json(MARKETS_INSTRUMENTS_PATH, &instruments_query(market))?;
    decode_market_instruments(market, payload)
}

fn decode_market_instruments(
    market: &str,
    payload: Value,
) -> Result<BTreeMap<String, InstrumentMeta>, ApiError> {
    let instruments = payload
        .get("Data")
        .and_then(|data| data.get(market))
        .and_then(|entry| entry.get("instruments"))
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    serde_json::from_value(instruments).map_err(|err| ApiError::Decode {
        url: MARKETS_INSTRUMENTS_PATH.to_string(),
        message: err.to_string(),
    })
}

/// Active BTC perpetual symbols, sorted by symbol name.
pub fn btc_perpetual_symbols(instruments: &BTreeMap<String, InstrumentMeta>) -> Vec<String> {
    instruments
        .iter()
        .filter(|(symbol, meta)| {
            let upper = symbol.to_ascii_uppercase();
            upper.contains("BTC") && upper.contains("PERPETUAL") && meta.status == ACTIVE_STATUS
        })
        .map(|(symbol, _)| symbol.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketStatus {
    Found { symbols: Vec<String> },
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRow {
    pub market: String,
    pub display_name: String,
    pub status: MarketStatus,
}

/// Sweeps every `(slug, display_name)` target market for active BTC
/// perpetuals. Transport failures are captured in the row and the
/// sweep continues.
pub fn discover_btc_perpetuals(
    targets: &[(&str, &str)],
    fetcher: &dyn DataApi,
) -> Vec<MarketRow> {
    targets
        .iter()
        .map(|(market, display_name)| {
            let status = match fetch_market_instruments(market, fetcher) {
                Ok(instruments) => {
                    let symbols = btc_perpetual_symbols(&instruments);
                    if symbols.is_empty() {
                        MarketStatus::Empty
                    } else {
                        info!(
                            component = "instruments",
                            event = "discovery.market_resolved",
                            market,
                            perpetuals = symbols.len()
                        );
                        MarketStatus::Found { symbols }
                    }
                }
                Err(err) => {
                    warn!(
                        component = "instruments",
                        event = "discovery.market_failed",
                        market,
                        error = %err
                    );
                    MarketStatus::Failed {
                        message: err.to_string(),
                    }
                }
            };

            MarketRow {
                market: (*market).to_string(),
                display_name: (*display_name).to_string(),
                status,
            }
        })
        .collect()
}
