use std::error::Error;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use oifetch::{
    init_logging, log_run_start, logging_config_from_env, minute_dump_filename,
    render_summary_table, run_minute_backfill_with_fetcher, timestamp_range, write_json_dump,
    ApiConfig, BackfillConfig, BackfillRequest, RunSummary, StopReason,
};

const DAYS: u32 = 180;
const CHUNK_SIZE: u32 = 2_000;
const EXCHANGE: &str = "okex";
const INSTRUMENT: &str = "BTC-USDT-VANILLA-PERPETUAL";

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let logging = logging_config_from_env();
    init_logging(&logging)?;
    log_run_start("minute_backfill", &logging);

    let api_cfg = ApiConfig::from_env()?;
    let client = api_cfg.client()?;

    let generated_at = Utc::now();
    let mut request =
        BackfillRequest::over_days(EXCHANGE, INSTRUMENT, DAYS, generated_at.timestamp());
    request.chunk_size = CHUNK_SIZE;

    println!(
        "Backfilling {DAYS} days ({} minutes) of {EXCHANGE} {INSTRUMENT} in at most {} calls...",
        request.total_minutes(),
        request.expected_calls()
    );

    let progress = ProgressBar::new(request.expected_calls());
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{percent:>3}%|{bar:40}| {pos}/{len} calls [{elapsed}<{eta}]")?
            .progress_chars("#>-"),
    );

    let backfill_cfg = BackfillConfig {
        page_delay_ms: api_cfg.page_delay_ms,
    };
    let outcome =
        run_minute_backfill_with_fetcher(&request, &backfill_cfg, &client, |_| progress.inc(1))?;
    progress.finish_and_clear();

    match &outcome.stop {
        StopReason::WindowExhausted => {}
        StopReason::NoMoreData { .. } => println!("No more data returned; stopped early."),
        StopReason::RequestFailed { message } => {
            println!("Request failed: {message}; writing partial results.");
        }
        StopReason::CursorStalled { cursor_ts_s } => {
            println!("Pagination cursor stalled at {cursor_ts_s}; writing partial results.");
        }
    }

    println!(
        "Completed: {} bars in {} calls ({:.1}s)",
        outcome.bars.len(),
        outcome.call_count,
        outcome.elapsed.as_secs_f64()
    );

    let filename = minute_dump_filename(EXCHANGE, INSTRUMENT, DAYS, generated_at);
    let dumped = write_json_dump(&api_cfg.output_dir, &filename, &outcome.bars)?;
    println!(
        "Saved {} bars to {}",
        outcome.bars.len(),
        dumped.path.display()
    );

    let summary = RunSummary {
        days: DAYS,
        total_minutes: request.total_minutes(),
        api_calls: outcome.call_count,
        elapsed: outcome.elapsed,
        file_size_bytes: dumped.size_bytes,
        timestamp_range_s: timestamp_range(&outcome.bars),
    };
    println!("\n{}", render_summary_table(&summary.rows()));

    Ok(())
}
