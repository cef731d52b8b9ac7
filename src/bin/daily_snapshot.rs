use std::error::Error;

use chrono::{DateTime, Utc};
use oifetch::{
    daily_dump_filename, fetch_daily_open_interest, init_logging, log_run_start,
    logging_config_from_env, write_json_dump, ApiConfig, DataApi, DumpedFile, InstrumentMap,
};

const DAYS: u32 = 7;

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let logging = logging_config_from_env();
    init_logging(&logging)?;
    log_run_start("daily_snapshot", &logging);

    let api_cfg = ApiConfig::from_env()?;
    let client = api_cfg.client()?;
    let instrument_map = InstrumentMap::from_env_or_builtin()?;
    let now = Utc::now();

    println!(
        "Fetching {DAYS}-day daily open interest for {} exchange/instrument pairs...",
        instrument_map.pair_count()
    );

    let mut failures = 0usize;
    for (exchange, instruments) in instrument_map.iter() {
        for instrument in instruments {
            println!("-> {exchange} {instrument}");
            match fetch_and_save(exchange, instrument, now, &api_cfg, &client) {
                Ok(Some((records, dumped))) => {
                    println!("   saved {records} records to {}", dumped.path.display());
                }
                Ok(None) => println!("   WARN: no data returned"),
                Err(err) => {
                    failures += 1;
                    println!("   FAILED: {err}");
                }
            }
        }
    }

    if failures > 0 {
        println!("\n{failures} pair(s) failed; see lines above.");
    }

    Ok(())
}

fn fetch_and_save(
    exchange: &str,
    instrument: &str,
    now: DateTime<Utc>,
    api_cfg: &ApiConfig,
    client: &dyn DataApi,
) -> Result<Option<(usize, DumpedFile)>, Box<dyn Error>> {
    let bars = fetch_daily_open_interest(exchange, instrument, DAYS, now.timestamp(), client)?;
    if bars.is_empty() {
        return Ok(None);
    }

    let filename = daily_dump_filename(exchange, instrument, now.date_naive());
    let dumped = write_json_dump(&api_cfg.output_dir, &filename, &bars)?;
    Ok(Some((bars.len(), dumped)))
}
