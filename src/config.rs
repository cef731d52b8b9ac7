//! Environment-driven configuration.
//!
//! Binaries call `dotenv::dotenv().ok()` before reading this, so a
//! local `.env` file works the same as exported variables.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiClient, ApiError, DEFAULT_BASE_URL};

pub const API_KEY_ENV: &str = "OIFETCH_API_KEY";
const BASE_URL_ENV: &str = "OIFETCH_BASE_URL";
const OUTPUT_DIR_ENV: &str = "OIFETCH_OUTPUT_DIR";
const HTTP_TIMEOUT_ENV: &str = "OIFETCH_HTTP_TIMEOUT_MS";
const PAGE_DELAY_ENV: &str = "OIFETCH_PAGE_DELAY_MS";
const INSTRUMENT_MAP_ENV: &str = "OIFETCH_INSTRUMENT_MAP";

const DEFAULT_OUTPUT_DIR: &str = "open_interest_data";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_PAGE_DELAY_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {API_KEY_ENV} in the environment")]
    MissingApiKey,
    #[error("invalid value '{value}' for {var}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("failed to load instrument map from {path}: {message}")]
    InstrumentMap { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub output_dir: PathBuf,
    pub http_timeout_ms: u64,
    pub page_delay_ms: u64,
}

impl ApiConfig {
    /// Reads configuration from the environment. A missing API key is
    /// fatal before any request goes out.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty(API_KEY_ENV).ok_or(ConfigError::MissingApiKey)?;
        let base_url = non_empty(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let output_dir = non_empty(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let http_timeout_ms = parse_millis(HTTP_TIMEOUT_ENV, DEFAULT_HTTP_TIMEOUT_MS)?;
        let page_delay_ms = parse_millis(PAGE_DELAY_ENV, DEFAULT_PAGE_DELAY_MS)?;

        Ok(Self {
            api_key,
            base_url,
            output_dir,
            http_timeout_ms,
            page_delay_ms,
        })
    }

    pub fn client(&self) -> Result<ApiClient, ApiError> {
        ApiClient::new(&self.api_key, &self.base_url, self.http_timeout_ms)
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_millis(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match non_empty(var) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}

/// Exchange slug -> instrument symbols fetched by the daily snapshot
/// run. A BTreeMap keeps per-run iteration order stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMap(BTreeMap<String, Vec<String>>);

impl InstrumentMap {
    /// The BTC perpetual pairs confirmed against the live catalog.
    /// CME is absent: its BTC futures are not perpetuals and the
    /// historical endpoints reject them.
    pub fn builtin_btc_perpetuals() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            "binance".to_string(),
            vec!["BTC-USDT-VANILLA-PERPETUAL".to_string()],
        );
        map.insert(
            "bitget".to_string(),
            vec![
                "BTC-USDT-VANILLA-PERPETUAL".to_string(),
                "BTC-USDC-VANILLA-PERPETUAL".to_string(),
            ],
        );
        map.insert(
            "bybit".to_string(),
            vec![
                "BTC-USD-INVERSE-PERPETUAL".to_string(),
                "BTC-USDC-VANILLA-PERPETUAL".to_string(),
                "BTC-USDT-VANILLA-PERPETUAL".to_string(),
            ],
        );
        map.insert(
            "hyperliquid".to_string(),
            vec!["BTC-USDT-QUANTO-PERPETUAL".to_string()],
        );
        map.insert(
            "okex".to_string(),
            vec![
                "BTC-USDC-VANILLA-PERPETUAL".to_string(),
                "BTC-USD-INVERSE-PERPETUAL".to_string(),
                "BTC-USDT-VANILLA-PERPETUAL".to_string(),
            ],
        );
        Self(map)
    }

    /// Loads the mapping from the JSON file named by
    /// `OIFETCH_INSTRUMENT_MAP`, falling back to the built-in mapping
    /// when the variable is unset.
    pub fn from_env_or_builtin() -> Result<Self, ConfigError> {
        match non_empty(INSTRUMENT_MAP_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => Ok(Self::builtin_btc_perpetuals()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path).map_err(|err| ConfigError::InstrumentMap {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|err| ConfigError::InstrumentMap {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(exchange, instruments)| (exchange.as_str(), instruments.as_slice()))
    }

    pub fn pair_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}
