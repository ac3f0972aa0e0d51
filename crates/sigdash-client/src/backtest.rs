//! Backtest endpoints.

use serde_json::{Map, Value};
use tracing::info;

use crate::client::DashboardApi;
use crate::error::{ClientError, ClientResult};
use crate::types::{BacktestRequest, BacktestResponse, BacktestResult, DataDownloadRequest};

impl DashboardApi {
    /// Run a backtest. The request is validated before anything is sent.
    ///
    /// A response with `success: false` is reported as a server error
    /// carrying the backend's message.
    pub async fn run_backtest(&self, request: &BacktestRequest) -> ClientResult<BacktestResult> {
        request.validate()?;

        let path = "/api/backtest/run";
        let response: BacktestResponse = self
            .send_json(self.client.post(self.url(path)).json(request), path)
            .await?;

        match (response.success, response.data) {
            (true, Some(result)) => {
                info!(
                    strategy = %request.strategy_name,
                    symbol = %request.symbol,
                    trades = result.total_trades.unwrap_or(0),
                    total_return_pct = result.total_return_pct.unwrap_or(0.0),
                    "Backtest finished"
                );
                Ok(result)
            }
            (true, None) => Err(ClientError::Malformed(
                "backtest succeeded without data".to_string(),
            )),
            (false, _) => Err(ClientError::Server {
                status: 200,
                message: response
                    .message
                    .unwrap_or_else(|| "backtest failed".to_string()),
            }),
        }
    }

    /// Download historical data for one symbol (`symbol`) or many (`symbols`).
    pub async fn download_backtest_data(
        &self,
        request: &DataDownloadRequest,
    ) -> ClientResult<Map<String, Value>> {
        let path = match (&request.symbol, request.symbols.is_empty()) {
            (Some(_), true) => "/api/backtest/download-data",
            (None, false) => "/api/backtest/batch-download",
            _ => {
                return Err(ClientError::Validation(
                    "exactly one of symbol or symbols must be set".to_string(),
                ))
            }
        };
        self.send_json(self.client.post(self.url(path)).json(request), path)
            .await
    }

    /// Describe the locally cached historical data.
    pub async fn backtest_data_info(&self) -> ClientResult<Map<String, Value>> {
        let path = "/api/backtest/data-info";
        self.send_json(self.client.get(self.url(path)), path).await
    }
}
