//! Mock dashboard backend for integration tests.
//!
//! Serves canned responses for the `/api/...` endpoints and records what the
//! client sent.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the mock has received.
#[derive(Default)]
pub struct Recorded {
    pub saved_settings: Vec<Value>,
    pub list_bodies: Vec<Value>,
    pub list_queries: Vec<HashMap<String, String>>,
    pub upload_content_types: Vec<String>,
    pub reloaded: Vec<i64>,
    pub status_bodies: Vec<(i64, Value)>,
    pub info_bodies: Vec<(i64, Value)>,
    pub deleted: Vec<i64>,
    pub builtin_imports: usize,
    /// (endpoint, body) of every data download.
    pub download_bodies: Vec<(&'static str, Value)>,
}

struct MockState {
    settings: Value,
    total_signals: usize,
    recorded: Mutex<Recorded>,
}

/// A mock backend bound to an ephemeral port.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

/// Strategy id the mock answers 404 for.
pub const MISSING_STRATEGY_ID: i64 = 404;

pub fn signal_json(id: usize, side: &str) -> Value {
    json!({
        "id": id.to_string(),
        "symbol": if id % 2 == 0 { "BTCUSDT" } else { "ETHUSDT" },
        "signal": side,
        "strategy": "macd_cross",
        "exchange": "BINANCE",
        "price": 100 + id,
        "profitLossRatio": 2.0,
        "signalTime": "2024-03-01T08:00:00"
    })
}

fn page_items(page_1based: usize, size: usize, total: usize) -> Vec<Value> {
    let start = (page_1based - 1) * size;
    (start..total.min(start + size))
        .map(|i| signal_json(i, if i % 3 == 0 { "SELL" } else { "BUY" }))
        .collect()
}

async fn get_settings(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(state.settings.clone())
}

async fn save_settings(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> StatusCode {
    state.recorded.lock().saved_settings.push(body);
    StatusCode::OK
}

async fn list_signals(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    let page = body["page"].as_u64().unwrap_or(1) as usize;
    let size = body["size"].as_u64().unwrap_or(10) as usize;
    state.recorded.lock().list_bodies.push(body);

    let total_pages = state.total_signals.div_ceil(size);
    Json(json!({
        "content": page_items(page, size, state.total_signals),
        "totalPages": total_pages
    }))
}

async fn query_signals(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let page0: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size: usize = query.get("size").and_then(|s| s.parse().ok()).unwrap_or(20);
    state.recorded.lock().list_queries.push(query);

    Json(json!({
        "content": page_items(page0 + 1, size, state.total_signals),
        "totalElements": state.total_signals,
        "number": page0
    }))
}

async fn latest_signals(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(5);
    Json(Value::Array(
        (0..limit).map(|i| signal_json(1000 + i, "BUY")).collect(),
    ))
}

async fn stats() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "stats failed", "message": "database unavailable"})),
    )
}

async fn chart() -> Json<Value> {
    Json(json!({
        "chartData": {
            "labels": ["2024-01", "2024-02"],
            "buyData": [3, 4],
            "sellData": [1, 0]
        }
    }))
}

fn strategy_json(id: i64) -> Value {
    json!({
        "id": id,
        "filename": format!("strategy_{id}.py"),
        "originalFilename": "rsi.py",
        "fileSize": 1200,
        "status": "ACTIVE",
        "uploadTime": "2024-02-01T09:30:00"
    })
}

async fn list_strategies() -> Json<Value> {
    Json(json!([strategy_json(1), strategy_json(2)]))
}

async fn upload_strategy(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    _body: Bytes,
) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.recorded.lock().upload_content_types.push(content_type);
    Json(strategy_json(3))
}

async fn download_strategy(Path(id): Path<i64>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"rsi.py\"".to_string(),
        )],
        format!("# strategy {id}\n"),
    )
}

async fn select_options() -> Json<Value> {
    Json(json!({
        "exchangeTypes": ["BINANCE", "GATE_IO"],
        "strategyNames": ["macd_cross", "rsi_reversal"],
        "defaultCryptoCoinSymbols": ["BTC", "ETH", "SOL"]
    }))
}

async fn reload_strategy(State(state): State<Arc<MockState>>, Path(id): Path<i64>) -> Json<Value> {
    state.recorded.lock().reloaded.push(id);
    Json(json!({"success": true, "message": format!("Strategy {id} reloaded")}))
}

async fn set_strategy_status(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut strategy = strategy_json(id);
    strategy["status"] = body["status"].clone();
    state.recorded.lock().status_bodies.push((id, body));
    Json(strategy)
}

async fn update_strategy_info(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut strategy = strategy_json(id);
    if let (Some(target), Some(fields)) = (strategy.as_object_mut(), body.as_object()) {
        target.extend(fields.clone());
    }
    state.recorded.lock().info_bodies.push((id, body));
    Json(strategy)
}

async fn delete_strategy(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if id == MISSING_STRATEGY_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Not Found", "message": format!("strategy {id} not found")})),
        );
    }
    state.recorded.lock().deleted.push(id);
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": "Strategy deleted"})),
    )
}

async fn import_builtin(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.recorded.lock().builtin_imports += 1;
    Json(json!({
        "message": "Imported 2 builtin strategies",
        "count": 2,
        "strategies": [strategy_json(10), strategy_json(11)]
    }))
}

async fn download_data(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    let response = json!({"success": true, "symbol": body["symbol"], "records": 720});
    state.recorded.lock().download_bodies.push(("download-data", body));
    Json(response)
}

async fn batch_download(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    let count = body["symbols"].as_array().map_or(0, Vec::len);
    state.recorded.lock().download_bodies.push(("batch-download", body));
    Json(json!({"success": true, "downloaded": count}))
}

async fn data_info() -> Json<Value> {
    Json(json!({
        "dataDirectory": "/data/history",
        "fileCount": 2,
        "symbols": ["BTCUSDT", "ETHUSDT"]
    }))
}

async fn run_backtest(Json(body): Json<Value>) -> Json<Value> {
    if body["symbol"] == "UNKNOWN" {
        return Json(json!({"success": false, "message": "no data for UNKNOWN"}));
    }
    Json(json!({
        "success": true,
        "data": {
            "strategyName": body["strategyName"],
            "symbol": body["symbol"],
            "totalTrades": 12,
            "totalReturnPct": 8.5,
            "tradeRecords": [{"action": "BUY", "price": 100.0, "timestamp": "2024-01-02T00:00:00"}]
        }
    }))
}

impl MockBackend {
    /// Start a mock backend with the given stored settings and signal count.
    pub async fn start(settings: Value, total_signals: usize) -> Self {
        let state = Arc::new(MockState {
            settings,
            total_signals,
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/api/getSettings", get(get_settings))
            .route("/api/saveSettings", post(save_settings))
            .route("/api/signals/list", post(list_signals))
            .route("/api/signals", get(query_signals))
            .route("/api/dashboard/latest-signals", get(latest_signals))
            .route("/api/dashboard/stats", get(stats))
            .route("/api/dashboard/chart", get(chart))
            .route("/api/select-options", get(select_options))
            .route("/api/strategies", get(list_strategies))
            .route("/api/strategies/upload", post(upload_strategy))
            .route("/api/strategies/import-builtin", post(import_builtin))
            .route("/api/strategies/{id}", delete(delete_strategy))
            .route("/api/strategies/{id}/download", get(download_strategy))
            .route("/api/strategies/{id}/reload", post(reload_strategy))
            .route("/api/strategies/{id}/status", put(set_strategy_status))
            .route("/api/strategies/{id}/info", put(update_strategy_info))
            .route("/api/backtest/run", post(run_backtest))
            .route("/api/backtest/download-data", post(download_data))
            .route("/api/backtest/batch-download", post(batch_download))
            .route("/api/backtest/data-info", get(data_info))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL of the mock.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Run a closure against the recorded requests.
    pub fn recorded<R>(&self, f: impl FnOnce(&Recorded) -> R) -> R {
        f(&self.state.recorded.lock())
    }

    /// Shutdown the server.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
