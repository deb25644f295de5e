use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use cbecs_insight::backend::MemoryBackend;
use cbecs_insight::cli::HttpSession;
use cbecs_insight::dispatch::Dispatcher;
use cbecs_insight::result::{row_from_pairs, RowSet};
use cbecs_insight::server::{self, AppState};
use cbecs_insight::AppError;

struct Guard(JoinHandle<()>);
impl Drop for Guard { fn drop(&mut self) { self.0.abort(); } }

fn test_backend() -> Arc<MemoryBackend> {
    let daylight = RowSet::new(
        vec!["category".into(), "avg_kwh".into()],
        vec![
            row_from_pairs([("category", json!("No daylight")), ("avg_kwh", json!("140.25"))]),
            row_from_pairs([("category", json!("Daylight")), ("avg_kwh", json!("101.5"))]),
        ],
    );
    let water = RowSet::new(
        vec!["region".into(), "system".into(), "count".into()],
        vec![
            row_from_pairs([("region", json!("Northeast")), ("system", json!("Natural gas")), ("count", json!(812))]),
            row_from_pairs([("region", json!("South")), ("system", json!("Electricity")), ("count", json!(1503))]),
            row_from_pairs([("region", json!("Northeast")), ("system", json!("Electricity")), ("count", json!(405))]),
        ],
    );
    // wrong shape for the fuel share pies: no percentage column
    let fuel = RowSet::new(
        vec!["region".into(), "source".into()],
        vec![row_from_pairs([("region", json!("West")), ("source", json!("Electricity"))])],
    );
    Arc::new(
        MemoryBackend::new()
            .with_rows("calculate_daylight_statistics", daylight)
            .with_rows("get_water_heating_system_statistics", water)
            .with_rows("get_consolidated_energy_source_usage", fuel)
            .with_rows("get_building_size_energy_consumption", RowSet::new(vec!["building_size".into()], vec![]))
            .with_failure("get_heating_statistics", AppError::backend("08006", "connection reset by peer")),
    )
}

// Start the HTTP API on an ephemeral localhost port. Returns (guard, base_url).
async fn start_server(backend: Arc<MemoryBackend>) -> (Guard, String) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let port = listener.local_addr().unwrap().port();
    let state = AppState::new(Dispatcher::new(backend));
    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            eprintln!("http server task error: {e:?}");
        }
    });
    (Guard(handle), format!("http://127.0.0.1:{}", port))
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.expect("request");
    let status = resp.status().as_u16();
    (status, resp.json().await.expect("json body"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_and_catalog_listing() {
    let (_g, base) = start_server(test_backend()).await;

    let text = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
    assert_eq!(text, "cbecs ok");

    let (status, v) = get_json(&format!("{base}/api/queries")).await;
    assert_eq!(status, 200);
    let vis: Vec<u64> = v["visualized"].as_array().unwrap().iter().map(|e| e["id"].as_u64().unwrap()).collect();
    assert_eq!(vis, vec![2, 5, 6, 9, 13, 26]);
    assert_eq!(v["data_only"].as_array().unwrap().len(), 20);
    assert_eq!(v["visualized"][3]["procedure"], "calculate_daylight_statistics");
    assert_eq!(v["visualized"][3]["visual"], "daylight_comparison");
    assert_eq!(v["data_only"][0]["visual"], Value::Null);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn query_data_returns_uniform_result() {
    let backend = test_backend();
    let (_g, base) = start_server(backend.clone()).await;

    let (status, v) = get_json(&format!("{base}/api/queryData?queryId=9")).await;
    assert_eq!(status, 200);
    assert_eq!(v["id"], 9);
    assert_eq!(v["fields"], json!(["category", "avg_kwh"]));
    assert_eq!(v["rows"][0]["category"], "No daylight");
    assert_eq!(backend.calls(), vec!["calculate_daylight_statistics"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_selection_is_400_and_skips_backend() {
    let backend = test_backend();
    let (_g, base) = start_server(backend.clone()).await;

    for q in ["", "?queryId=", "?queryId=0", "?queryId=27", "?queryId=abc"] {
        let (status, v) = get_json(&format!("{base}/api/queryData{q}")).await;
        assert_eq!(status, 400, "{q}");
        assert_eq!(v["status"], "error");
        assert!(v["code"] == "missing_query_id" || v["code"] == "invalid_query_id", "{q}: {v}");
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undecodable_query_string_is_json_400() {
    let backend = test_backend();
    let (_g, base) = start_server(backend.clone()).await;

    for path in ["/api/queryData?queryId=1&queryId=2", "/api/view?queryId=9&queryId=13"] {
        let resp = reqwest::get(format!("{base}{path}")).await.expect("request");
        assert_eq!(resp.status().as_u16(), 400, "{path}");
        let v: Value = resp.json().await.expect("json error body");
        assert_eq!(v["status"], "error");
        assert_eq!(v["code"], "invalid_request");
        assert!(!v["message"].as_str().unwrap_or_default().is_empty());
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backend_failure_is_502() {
    let (_g, base) = start_server(test_backend()).await;
    let (status, v) = get_json(&format!("{base}/api/queryData?queryId=20")).await;
    assert_eq!(status, 502);
    assert_eq!(v["code"], "08006");
    assert_eq!(v["message"], "connection reset by peer");

    // a procedure the backend does not know reports like Postgres does
    let (status, v) = get_json(&format!("{base}/api/queryData?queryId=1")).await;
    assert_eq!(status, 502);
    assert_eq!(v["code"], "42883");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn view_combines_chart_and_sorted_table() {
    let (_g, base) = start_server(test_backend()).await;

    let (status, v) = get_json(&format!("{base}/api/view?queryId=9&sort=avg_kwh")).await;
    assert_eq!(status, 200);
    assert_eq!(v["entry"]["id"], 9);
    assert_eq!(v["visual"]["status"], "chart");
    assert_eq!(v["visual"]["chart"]["type"], "bar");
    assert_eq!(v["visual"]["chart"]["orientation"], "horizontal");
    assert_eq!(v["visual"]["chart"]["labels"].as_array().unwrap().len(), 2);
    assert_eq!(v["table"]["status"], "grid");
    assert_eq!(v["table"]["columns"][1]["header"], "Avg kwh");
    assert_eq!(v["table"]["rows"][0][0], "Daylight");
    assert_eq!(v["table"]["sort"]["key"]["direction"], "ascending");

    let (_, v) = get_json(&format!("{base}/api/view?queryId=9&sort=avg_kwh&desc=true")).await;
    assert_eq!(v["table"]["rows"][0][0], "No daylight");

    let (status, v) = get_json(&format!("{base}/api/view?queryId=9&sort=nope")).await;
    assert_eq!(status, 400);
    assert_eq!(v["code"], "unknown_sort_field");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn view_pies_and_fail_closed_cases() {
    let (_g, base) = start_server(test_backend()).await;

    let (_, v) = get_json(&format!("{base}/api/view?queryId=13")).await;
    assert_eq!(v["visual"]["chart"]["type"], "pies");
    let pies = v["visual"]["chart"]["pies"].as_array().unwrap();
    assert_eq!(pies.len(), 2);
    assert_eq!(pies[0]["labels"].as_array().unwrap().len(), 2);
    assert_eq!(pies[1]["labels"].as_array().unwrap().len(), 1);

    // mismatched shape: chart is withheld, table is still served
    let (status, v) = get_json(&format!("{base}/api/view?queryId=26")).await;
    assert_eq!(status, 200);
    assert_eq!(v["visual"]["status"], "no_data");
    assert_eq!(v["visual"]["kind"], "fuel_share_by_region");
    assert_eq!(v["table"]["status"], "grid");

    // no rows: placeholder table, no chart configured
    let (_, v) = get_json(&format!("{base}/api/view?queryId=16")).await;
    assert_eq!(v["visual"]["status"], "table_only");
    assert_eq!(v["table"]["status"], "no_data");
    assert_eq!(v["table"]["message"], "No data to display");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_session_round_trips_results_and_errors() {
    let (_g, base) = start_server(test_backend()).await;
    let session = HttpSession::connect(&base).await.expect("connect");

    let res = session.query_data(Some("13")).await.unwrap();
    assert_eq!(res.id.get(), 13);
    assert_eq!(res.rows.len(), 3);

    let err = session.query_data(Some("99")).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest { .. }));
    assert_eq!(err.code_str(), "invalid_query_id");

    let err = session.query_data(Some("20")).await.unwrap_err();
    assert!(matches!(err, AppError::Backend { .. }));
}
