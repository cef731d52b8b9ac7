use std::cell::RefCell;
use std::collections::VecDeque;

use oifetch::{
    run_minute_backfill_with_fetcher, ApiError, BackfillConfig, BackfillRequest, DataApi,
    StopReason, MINUTE_STEP_S,
};
use serde_json::{json, Value};

struct ScriptedApi {
    responses: RefCell<VecDeque<Result<Value, ApiError>>>,
    queries: RefCell<Vec<Vec<(String, String)>>>,
}

impl ScriptedApi {
    fn new(responses: Vec<Result<Value, ApiError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn query_param(&self, call: usize, key: &str) -> Option<String> {
        self.queries.borrow().get(call).and_then(|query| {
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| value.clone())
        })
    }

    fn call_count(&self) -> usize {
        self.queries.borrow().len()
    }
}

impl DataApi for ScriptedApi {
    fn get_json(&self, _path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        self.queries.borrow_mut().push(query.to_vec());
        self.responses.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(ApiError::Transport {
                url: "scripted".to_string(),
                message: "script exhausted".to_string(),
            })
        })
    }
}

/// A page whose newest record sits at `top_ts_s`, with one record per
/// minute going backward.
fn page_desc(top_ts_s: i64, rows: i64) -> Value {
    let bars: Vec<Value> = (0..rows)
        .map(|i| {
            json!({
                "TIMESTAMP": top_ts_s - i * MINUTE_STEP_S,
                "OPEN": 100.0 + i as f64,
                "CLOSE": 101.0 + i as f64,
            })
        })
        .collect();
    json!({ "Data": bars })
}

fn no_delay() -> BackfillConfig {
    BackfillConfig { page_delay_ms: 0 }
}

fn request(window_minutes: i64, chunk_size: u32) -> BackfillRequest {
    let end_ts_s = 1_750_000_020;
    BackfillRequest {
        market: "okex".to_string(),
        instrument: "BTC-USDT-VANILLA-PERPETUAL".to_string(),
        start_ts_s: end_ts_s - window_minutes * MINUTE_STEP_S,
        end_ts_s,
        chunk_size,
    }
}

#[test]
fn full_pages_finish_within_the_expected_call_count() {
    // 180 minutes at 60 per page: the window must close in exactly
    // ceil(180 / 60) = 3 calls.
    let req = request(180, 60);
    let api = ScriptedApi::new(vec![
        Ok(page_desc(req.end_ts_s, 60)),
        Ok(page_desc(req.end_ts_s - 60 * MINUTE_STEP_S, 60)),
        Ok(page_desc(req.end_ts_s - 120 * MINUTE_STEP_S, 60)),
    ]);

    let outcome = run_minute_backfill_with_fetcher(&req, &no_delay(), &api, |_| {}).unwrap();

    assert_eq!(outcome.stop, StopReason::WindowExhausted);
    assert!(outcome.call_count <= req.expected_calls());
    assert_eq!(outcome.call_count, 3);
    assert_eq!(outcome.bars.len(), 180);
    assert_eq!(api.call_count(), 3);
}

#[test]
fn cursor_walks_backward_one_chunk_per_call() {
    // Every page returns exactly 2000 one-minute records, so the
    // cursor after N pages is end_ts - N*2000*60.
    let chunk = 2_000i64;
    let req = request(3 * chunk, 2_000);
    let api = ScriptedApi::new(vec![
        Ok(page_desc(req.end_ts_s, chunk)),
        Ok(page_desc(req.end_ts_s - chunk * MINUTE_STEP_S, chunk)),
        Ok(page_desc(req.end_ts_s - 2 * chunk * MINUTE_STEP_S, chunk)),
    ]);

    let outcome = run_minute_backfill_with_fetcher(&req, &no_delay(), &api, |_| {}).unwrap();

    assert_eq!(outcome.stop, StopReason::WindowExhausted);
    assert_eq!(outcome.bars.len(), 6_000);

    for call in 0..3 {
        let expected_to_ts = req.end_ts_s - call as i64 * chunk * MINUTE_STEP_S;
        assert_eq!(
            api.query_param(call, "to_ts"),
            Some(expected_to_ts.to_string())
        );
        assert_eq!(api.query_param(call, "limit"), Some("2000".to_string()));
    }
}

#[test]
fn final_partial_page_requests_only_the_remainder() {
    let req = request(4_500, 2_000);
    let api = ScriptedApi::new(vec![
        Ok(page_desc(req.end_ts_s, 2_000)),
        Ok(page_desc(req.end_ts_s - 2_000 * MINUTE_STEP_S, 2_000)),
        Ok(page_desc(req.end_ts_s - 4_000 * MINUTE_STEP_S, 500)),
    ]);

    let outcome = run_minute_backfill_with_fetcher(&req, &no_delay(), &api, |_| {}).unwrap();

    assert_eq!(outcome.stop, StopReason::WindowExhausted);
    assert_eq!(outcome.bars.len(), 4_500);
    assert_eq!(api.query_param(0, "limit"), Some("2000".to_string()));
    assert_eq!(api.query_param(1, "limit"), Some("2000".to_string()));
    assert_eq!(api.query_param(2, "limit"), Some("500".to_string()));
}

#[test]
fn empty_first_page_reports_zero_records_without_error() {
    let req = request(10_000, 2_000);
    let api = ScriptedApi::new(vec![Ok(json!({ "Data": [] }))]);

    let outcome = run_minute_backfill_with_fetcher(&req, &no_delay(), &api, |_| {}).unwrap();

    assert!(outcome.bars.is_empty());
    assert_eq!(outcome.call_count, 0);
    assert_eq!(
        outcome.stop,
        StopReason::NoMoreData {
            cursor_ts_s: req.end_ts_s
        }
    );
}

#[test]
fn http_500_on_the_third_call_keeps_the_first_two_pages() {
    let req = request(10_000, 2_000);
    let api = ScriptedApi::new(vec![
        Ok(page_desc(req.end_ts_s, 2_000)),
        Ok(page_desc(req.end_ts_s - 2_000 * MINUTE_STEP_S, 2_000)),
        Err(ApiError::Status {
            url: "scripted".to_string(),
            status: 500,
            body: "internal error".to_string(),
        }),
    ]);

    let outcome = run_minute_backfill_with_fetcher(&req, &no_delay(), &api, |_| {}).unwrap();

    assert_eq!(outcome.bars.len(), 4_000);
    assert_eq!(outcome.call_count, 2);
    match &outcome.stop {
        StopReason::RequestFailed { message } => assert!(message.contains("500")),
        other => panic!("unexpected stop reason: {other:?}"),
    }
}

#[test]
fn records_stay_in_page_arrival_order_with_fields_intact() {
    let req = request(120, 60);
    let api = ScriptedApi::new(vec![
        Ok(page_desc(req.end_ts_s, 60)),
        Ok(page_desc(req.end_ts_s - 60 * MINUTE_STEP_S, 60)),
    ]);

    let outcome = run_minute_backfill_with_fetcher(&req, &no_delay(), &api, |_| {}).unwrap();

    // First record of the run is the newest record of the first page;
    // later pages hold earlier timestamps.
    assert_eq!(outcome.bars[0].timestamp_s, req.end_ts_s);
    assert_eq!(
        outcome.bars[60].timestamp_s,
        req.end_ts_s - 60 * MINUTE_STEP_S
    );
    assert!(outcome.bars[0].fields.contains_key("OPEN"));
    assert!(outcome.bars[0].fields.contains_key("CLOSE"));
}
