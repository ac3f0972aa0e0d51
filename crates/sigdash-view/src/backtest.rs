//! Backtest form and runner.

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use sigdash_client::{BacktestRequest, BacktestResult, DashboardApi, DataDownloadRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::error::{ViewError, ViewResult};
use crate::notice::{Notice, NoticeBoard};

pub struct BacktestRunner {
    api: DashboardApi,
    notices: NoticeBoard,
    form: RwLock<BacktestRequest>,
    last_result: RwLock<Option<BacktestResult>>,
    running: AtomicBool,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BacktestRunner {
    /// Runner with the form's defaults relative to `today`.
    pub fn new(api: DashboardApi, notices: NoticeBoard, today: NaiveDate) -> Self {
        Self {
            api,
            notices,
            form: RwLock::new(BacktestRequest::with_defaults(today)),
            last_result: RwLock::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn form(&self) -> BacktestRequest {
        self.form.read().clone()
    }

    pub fn edit_form(&self, edit: impl FnOnce(&mut BacktestRequest)) {
        edit(&mut *self.form.write());
    }

    pub fn reset_form(&self, today: NaiveDate) {
        *self.form.write() = BacktestRequest::with_defaults(today);
    }

    pub fn last_result(&self) -> Option<BacktestResult> {
        self.last_result.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn begin(&self) -> ViewResult<RunningGuard<'_>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ViewError::Busy("backtest already running"));
        }
        Ok(RunningGuard(&self.running))
    }

    /// Validate the form and run the backtest.
    pub async fn run(&self) -> ViewResult<BacktestResult> {
        let request = self.form();
        if let Err(e) = request.validate() {
            self.notices
                .publish(Notice::from_client_error("Backtest not started", &e));
            return Err(e.into());
        }

        let _running = self.begin()?;
        info!(
            strategy = %request.strategy_name,
            symbol = %request.symbol,
            start = %request.start_date,
            end = %request.end_date,
            "Running backtest"
        );

        match self.api.run_backtest(&request).await {
            Ok(result) => {
                *self.last_result.write() = Some(result.clone());
                self.notices.publish(Notice::success(format!(
                    "Backtest finished: {} trades",
                    result.total_trades.unwrap_or(0)
                )));
                Ok(result)
            }
            Err(e) => {
                self.notices
                    .publish(Notice::from_client_error("Backtest failed", &e));
                Err(e.into())
            }
        }
    }

    /// Download historical data for `symbols` over the form's date range.
    pub async fn download_data(&self, symbols: Vec<String>) -> ViewResult<Map<String, Value>> {
        let (start, end, timeframe) = {
            let form = self.form.read();
            (
                form.start_date.clone(),
                form.end_date.clone(),
                form.timeframe.clone(),
            )
        };

        let mut request = match symbols.len() {
            0 => {
                return Err(ViewError::Validation(
                    "select at least one symbol to download".to_string(),
                ))
            }
            1 => DataDownloadRequest::single(symbols[0].clone(), &start, &end),
            _ => DataDownloadRequest::batch(symbols, &start, &end),
        };
        request.timeframe = timeframe;

        let _running = self.begin()?;
        self.api
            .download_backtest_data(&request)
            .await
            .map_err(|e| {
                self.notices
                    .publish(Notice::from_client_error("Data download failed", &e));
                ViewError::Client(e)
            })
    }

    pub async fn data_info(&self) -> ViewResult<Map<String, Value>> {
        Ok(self.api.backtest_data_info().await?)
    }
}
