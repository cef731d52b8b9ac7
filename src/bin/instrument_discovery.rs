use std::collections::BTreeMap;
use std::error::Error;

use chrono::Utc;
use oifetch::{
    discover_btc_perpetuals, init_logging, log_run_start, logging_config_from_env,
    write_json_file, ApiConfig, MarketStatus,
};

// "okex", not "okx": the data API kept the legacy slug.
const TARGET_EXCHANGES: [(&str, &str); 6] = [
    ("cme", "CME"),
    ("binance", "BINANCE"),
    ("hyperliquid", "HYPERLIQUID"),
    ("bybit", "BYBIT"),
    ("bitget", "BITGET"),
    ("okex", "OKEX"),
];

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let logging = logging_config_from_env();
    init_logging(&logging)?;
    log_run_start("instrument_discovery", &logging);

    let api_cfg = ApiConfig::from_env()?;
    let client = api_cfg.client()?;

    println!(
        "Discovering active BTC perpetuals across {} exchanges...",
        TARGET_EXCHANGES.len()
    );

    let rows = discover_btc_perpetuals(&TARGET_EXCHANGES, &client);

    let mut mapping: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in &rows {
        match &row.status {
            MarketStatus::Found { symbols } => {
                println!(
                    "{}: found {} BTC perpetuals: {symbols:?}",
                    row.display_name,
                    symbols.len()
                );
                mapping.insert(row.market.clone(), symbols.clone());
            }
            MarketStatus::Empty => println!("{}: no BTC perpetuals found", row.display_name),
            MarketStatus::Failed { message } => {
                println!("{}: FAILED: {message}", row.display_name);
            }
        }
    }

    println!("\nBTC perpetual mapping:");
    for (market, symbols) in &mapping {
        println!("  {market}: {symbols:?}");
    }

    let filename = format!("btc_perpetual_mapping_{}.json", Utc::now().format("%Y%m%d"));
    let dumped = write_json_file(&api_cfg.output_dir, &filename, &mapping)?;
    println!(
        "\nSaved mapping for {} exchanges to {}",
        mapping.len(),
        dumped.path.display()
    );

    Ok(())
}
