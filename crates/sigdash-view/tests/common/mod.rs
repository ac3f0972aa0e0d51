//! Stateful mock of the strategy and backtest endpoints.
//!
//! Strategy edits change what the next list request returns, so view models
//! that reload after a mutation see the effect.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
struct BackendState {
    strategies: Mutex<Vec<Value>>,
    next_id: Mutex<i64>,
    reloaded: Mutex<Vec<i64>>,
    downloads: Mutex<Vec<(&'static str, Value)>>,
    backtests: Mutex<Vec<Value>>,
}

impl BackendState {
    fn add(&self, original_filename: &str) -> Value {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let strategy = json!({
            "id": id,
            "filename": format!("strategy_{id}.py"),
            "originalFilename": original_filename,
            "fileSize": 64,
            "status": "INACTIVE"
        });
        self.strategies.lock().push(strategy.clone());
        strategy
    }

    fn update(&self, id: i64, fields: &Value) -> Option<Value> {
        let mut strategies = self.strategies.lock();
        let strategy = strategies.iter_mut().find(|s| s["id"] == id)?;
        if let (Some(target), Some(fields)) = (strategy.as_object_mut(), fields.as_object()) {
            target.extend(fields.clone());
        }
        Some(strategy.clone())
    }
}

type Shared = State<Arc<BackendState>>;

async fn list(State(state): Shared) -> Json<Value> {
    Json(Value::Array(state.strategies.lock().clone()))
}

async fn upload(State(state): Shared, _body: Bytes) -> Json<Value> {
    Json(state.add("uploaded.py"))
}

async fn download(Path(id): Path<i64>) -> impl IntoResponse {
    (
        [(header::CONTENT_DISPOSITION, "attachment; filename=\"rsi.py\"")],
        format!("# strategy {id}\n"),
    )
}

async fn reload(State(state): Shared, Path(id): Path<i64>) -> Json<Value> {
    state.reloaded.lock().push(id);
    Json(json!({"success": true, "message": format!("Strategy {id} reloaded")}))
}

async fn set_status(State(state): Shared, Path(id): Path<i64>, Json(body): Json<Value>) -> Json<Value> {
    Json(state.update(id, &body).unwrap_or(Value::Null))
}

async fn set_info(State(state): Shared, Path(id): Path<i64>, Json(body): Json<Value>) -> Json<Value> {
    Json(state.update(id, &body).unwrap_or(Value::Null))
}

async fn remove(State(state): Shared, Path(id): Path<i64>) -> Json<Value> {
    state.strategies.lock().retain(|s| s["id"] != id);
    Json(json!({"success": true, "message": "Strategy deleted"}))
}

async fn import_builtin(State(state): Shared) -> Json<Value> {
    let imported = vec![state.add("macd_cross.py"), state.add("rsi_reversal.py")];
    Json(json!({"count": imported.len(), "strategies": imported}))
}

async fn run_backtest(State(state): Shared, Json(body): Json<Value>) -> Json<Value> {
    let data = json!({
        "strategyName": body["strategyName"],
        "symbol": body["symbol"],
        "totalTrades": 4,
        "totalReturnPct": 3.2
    });
    state.backtests.lock().push(body);
    Json(json!({"success": true, "data": data}))
}

async fn download_data(State(state): Shared, Json(body): Json<Value>) -> Json<Value> {
    let response = json!({"success": true, "symbol": body["symbol"]});
    state.downloads.lock().push(("download-data", body));
    Json(response)
}

async fn batch_download(State(state): Shared, Json(body): Json<Value>) -> Json<Value> {
    let response = json!({"success": true, "symbols": body["symbols"]});
    state.downloads.lock().push(("batch-download", body));
    Json(response)
}

async fn data_info() -> Json<Value> {
    Json(json!({"symbols": ["BTCUSDT"], "fileCount": 1}))
}

/// Mock strategy/backtest backend bound to an ephemeral port.
pub struct StrategyBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StrategyBackend {
    /// Start with `initial` strategies already uploaded.
    pub async fn start(initial: &[&str]) -> Self {
        let state = Arc::new(BackendState::default());
        for name in initial {
            state.add(name);
        }

        let app = Router::new()
            .route("/api/strategies", get(list))
            .route("/api/strategies/upload", post(upload))
            .route("/api/strategies/import-builtin", post(import_builtin))
            .route("/api/strategies/{id}", delete(remove))
            .route("/api/strategies/{id}/download", get(download))
            .route("/api/strategies/{id}/reload", post(reload))
            .route("/api/strategies/{id}/status", put(set_status))
            .route("/api/strategies/{id}/info", put(set_info))
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

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn reloaded(&self) -> Vec<i64> {
        self.state.reloaded.lock().clone()
    }

    pub fn downloads(&self) -> Vec<(&'static str, Value)> {
        self.state.downloads.lock().clone()
    }

    pub fn backtests(&self) -> Vec<Value> {
        self.state.backtests.lock().clone()
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
