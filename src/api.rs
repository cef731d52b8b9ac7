//! CoinDesk data API transport and wire model.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://data-api.coindesk.com";

pub const MINUTE_OPEN_INTEREST_PATH: &str = "futures/v1/historical/open-interest/minutes";
pub const DAILY_OPEN_INTEREST_PATH: &str = "futures/v1/historical/open-interest/days";
pub const MARKETS_INSTRUMENTS_PATH: &str = "futures/v1/markets/instruments";

const API_KEY_HEADER: &str = "x-api-key";
const HISTORY_GROUPS: &str = "ID,MAPPING,OHLC";
const STATUS_BODY_LIMIT: usize = 512;

/// One time-bucketed open-interest observation. Only `TIMESTAMP`
/// (Unix seconds) is interpreted; every other field is carried through
/// unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenInterestBar {
    #[serde(rename = "TIMESTAMP")]
    pub timestamp_s: i64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP client build error: {0}")]
    ClientBuild(String),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("unexpected HTTP status {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Blocking GET seam. Loops and sweeps take this instead of a concrete
/// client so tests can run against scripted in-memory responses.
pub trait DataApi {
    fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError>;
}

pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(api_key: &str, base_url: &str, timeout_ms: u64) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut key_value = HeaderValue::from_str(api_key)
            .map_err(|err| ApiError::ClientBuild(err.to_string()))?;
        key_value.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key_value);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|err| ApiError::ClientBuild(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl DataApi for ApiClient {
    fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(component = "api", event = "api.request", url = %url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|err| ApiError::Transport {
                url: url.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(&response.text().unwrap_or_default());
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().map_err(|err| ApiError::Decode {
            url,
            message: err.to_string(),
        })
    }
}

/// Query parameters shared by both historical open-interest endpoints.
/// `to_ts_s` is the exclusive upper bound of the requested page.
pub fn open_interest_query(
    market: &str,
    instrument: &str,
    limit: i64,
    to_ts_s: i64,
) -> Vec<(String, String)> {
    vec![
        ("market".to_string(), market.to_string()),
        ("instrument".to_string(), instrument.to_string()),
        ("groups".to_string(), HISTORY_GROUPS.to_string()),
        ("limit".to_string(), limit.to_string()),
        ("aggregate".to_string(), "1".to_string()),
        ("fill".to_string(), "true".to_string()),
        ("apply_mapping".to_string(), "true".to_string()),
        ("to_ts".to_string(), to_ts_s.to_string()),
    ]
}

/// Decodes the `Data` array envelope. A payload without a `Data` field
/// decodes as an empty page.
pub fn decode_bars(payload: Value, endpoint: &str) -> Result<Vec<OpenInterestBar>, ApiError> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(rename = "Data", default)]
        data: Vec<OpenInterestBar>,
    }

    serde_json::from_value::<Envelope>(payload)
        .map(|envelope| envelope.data)
        .map_err(|err| ApiError::Decode {
            url: endpoint.to_string(),
            message: err.to_string(),
        })
}

fn truncate_body(body: &str) -> String {
    if body.len() <= STATUS_BODY_LIMIT {
        return body.to_string();
    }

    let mut cut = STATUS_BODY_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}
