//! Wire types for the dashboard backend.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigdash_core::{Signal, SignalSide};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{ClientError, ClientResult};

/// Largest strategy file accepted for upload (10 MiB).
pub const MAX_STRATEGY_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Dropdown options offered by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOptions {
    #[serde(default)]
    pub exchange_types: Vec<String>,
    #[serde(default)]
    pub strategy_names: Vec<String>,
    #[serde(default)]
    pub default_crypto_coin_symbols: Vec<String>,
}

/// Generic `{success?, message?, error?}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiMessage {
    /// Best human-readable text in the body.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

// ============================================================================
// Dashboard
// ============================================================================

/// Aggregate counters shown on the dashboard home.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_signals: u64,
    #[serde(default)]
    pub buy_signals: u64,
    #[serde(default)]
    pub sell_signals: u64,
    #[serde(default)]
    pub active_pairs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs_change: Option<String>,
}

impl DashboardStats {
    /// Derive counters from locally loaded signals.
    pub fn from_signals(signals: &[Signal]) -> Self {
        let buy_signals = signals.iter().filter(|s| s.side == SignalSide::Buy).count() as u64;
        let pairs: HashSet<&str> = signals.iter().map(|s| s.symbol.as_str()).collect();

        Self {
            total_signals: signals.len() as u64,
            buy_signals,
            sell_signals: signals.len() as u64 - buy_signals,
            active_pairs: pairs.len() as u64,
            ..Default::default()
        }
    }
}

/// Monthly buy/sell signal counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub buy_data: Vec<u64>,
    #[serde(default)]
    pub sell_data: Vec<u64>,
}

impl ChartData {
    /// Zeroed buckets for the `months` months ending with `today`'s month,
    /// labelled `YYYY-MM`, oldest first.
    pub fn empty_months(today: NaiveDate, months: u32) -> Self {
        let first_of_month = today.with_day(1).unwrap_or(today);
        let labels: Vec<String> = (0..months)
            .rev()
            .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
            .map(|d| format!("{:04}-{:02}", d.year(), d.month()))
            .collect();
        let len = labels.len();

        Self {
            labels,
            buy_data: vec![0; len],
            sell_data: vec![0; len],
        }
    }

    /// Check that every series has one value per label.
    pub fn is_consistent(&self) -> bool {
        self.buy_data.len() == self.labels.len() && self.sell_data.len() == self.labels.len()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChartEnvelope {
    pub chart_data: Option<ChartData>,
}

// ============================================================================
// Strategies
// ============================================================================

/// Lifecycle state of an uploaded strategy file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyStatus {
    Active,
    #[default]
    Inactive,
    Updating,
    Error,
}

impl StrategyStatus {
    /// Short label for list views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Updating => "updating",
            Self::Error => "error",
        }
    }

    /// Parse a status name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "UPDATING" => Some(Self::Updating),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Updating => write!(f, "UPDATING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// An uploaded strategy file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyFile {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status: StrategyStatus,
    #[serde(default)]
    pub upload_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_update_time: Option<NaiveDateTime>,
}

impl StrategyFile {
    /// Name shown in strategy dropdowns: display name, then description,
    /// then the original file name without `.py`.
    pub fn display_label(&self) -> String {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        non_blank(&self.display_name)
            .or_else(|| non_blank(&self.description))
            .unwrap_or_else(|| {
                let name = self.original_filename.as_deref().unwrap_or(&self.filename);
                name.strip_suffix(".py").unwrap_or(name).to_string()
            })
    }
}

/// Render a byte count as `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

/// A strategy file about to be uploaded.
#[derive(Debug, Clone)]
pub struct StrategyUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
}

impl StrategyUpload {
    /// Validate and build an upload.
    ///
    /// Only `.py` files up to [`MAX_STRATEGY_UPLOAD_BYTES`] are accepted.
    pub fn new(
        filename: impl Into<String>,
        bytes: Vec<u8>,
        description: Option<String>,
    ) -> ClientResult<Self> {
        let filename = filename.into();
        if !filename.ends_with(".py") {
            return Err(ClientError::Validation(format!(
                "only .py strategy files are accepted, got {filename:?}"
            )));
        }
        if bytes.len() > MAX_STRATEGY_UPLOAD_BYTES {
            return Err(ClientError::Validation(format!(
                "strategy file is {} bytes, limit is {MAX_STRATEGY_UPLOAD_BYTES}",
                bytes.len()
            )));
        }

        Ok(Self {
            filename,
            bytes,
            description: description.filter(|d| !d.trim().is_empty()),
        })
    }
}

// ============================================================================
// Backtest
// ============================================================================

/// Backtest run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub strategy_name: String,
    pub symbol: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`.
    pub end_date: String,
    pub initial_balance: f64,
    pub timeframe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_params: Option<BTreeMap<String, Value>>,
}

impl BacktestRequest {
    /// Defaults of the backtest form: BTCUSDT, 10000 balance, 1h bars, the
    /// year up to `today`.
    pub fn with_defaults(today: NaiveDate) -> Self {
        let year_ago = today.checked_sub_months(Months::new(12)).unwrap_or(today);
        Self {
            strategy_name: String::new(),
            symbol: "BTCUSDT".to_string(),
            start_date: year_ago.format("%Y-%m-%d").to_string(),
            end_date: today.format("%Y-%m-%d").to_string(),
            initial_balance: 10_000.0,
            timeframe: "1h".to_string(),
            strategy_params: None,
        }
    }

    /// Check required fields before submitting.
    pub fn validate(&self) -> ClientResult<()> {
        let missing: Vec<&str> = [
            ("strategyName", &self.strategy_name),
            ("symbol", &self.symbol),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ClientError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| ClientError::Validation(format!("invalid date {raw:?}: {e}")))
        };
        if parse(&self.start_date)? > parse(&self.end_date)? {
            return Err(ClientError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }

        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(ClientError::Validation(
                "initialBalance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One simulated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    pub action: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub portfolio_value: Option<f64>,
    #[serde(default)]
    pub signal_strength: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Backtest summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    #[serde(default)]
    pub strategy_name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub initial_balance: Option<f64>,
    #[serde(default)]
    pub final_balance: Option<f64>,
    #[serde(default)]
    pub final_portfolio_value: Option<f64>,
    #[serde(default)]
    pub total_return: Option<f64>,
    #[serde(default)]
    pub total_return_pct: Option<f64>,
    #[serde(default)]
    pub max_drawdown: Option<f64>,
    #[serde(default)]
    pub max_drawdown_pct: Option<f64>,
    #[serde(default)]
    pub sharpe_ratio: Option<f64>,
    #[serde(default)]
    pub total_trades: Option<u32>,
    #[serde(default)]
    pub winning_trades: Option<u32>,
    #[serde(default)]
    pub losing_trades: Option<u32>,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub avg_win: Option<f64>,
    #[serde(default)]
    pub avg_loss: Option<f64>,
    #[serde(default)]
    pub profit_factor: Option<f64>,
    #[serde(default)]
    pub trade_records: Vec<TradeRecord>,
    #[serde(default)]
    pub performance_metrics: BTreeMap<String, Value>,
}

/// Backtest run response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<BacktestResult>,
}

/// Historical data download request (single symbol or batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDownloadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    pub timeframe: String,
}

impl DataDownloadRequest {
    pub fn single(symbol: impl Into<String>, start_date: &str, end_date: &str) -> Self {
        Self {
            symbol: Some(symbol.into()),
            symbols: Vec::new(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            timeframe: "1h".to_string(),
        }
    }

    pub fn batch(symbols: Vec<String>, start_date: &str, end_date: &str) -> Self {
        Self {
            symbol: None,
            symbols,
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            timeframe: "1h".to_string(),
        }
    }
}
