//! Trade signal records.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalSide {
    Buy,
    Sell,
}

impl fmt::Display for SignalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A single buy/sell recommendation produced by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: String,
    /// Trading pair (e.g., "BTCUSDT").
    pub symbol: String,
    #[serde(rename = "signal")]
    pub side: SignalSide,
    pub price: Decimal,
    #[serde(default)]
    pub buy_price: Option<Decimal>,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Reward/risk ratio, e.g. 2.5 means 2.5:1.
    #[serde(default)]
    pub profit_loss_ratio: Option<Decimal>,
    /// Backend local time of generation.
    pub signal_time: NaiveDateTime,
    #[serde(default)]
    pub strategy: Option<String>,
    pub exchange: String,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

/// Render a profit/loss ratio as `"2.50:1"`, or `"unset"` when absent.
pub fn format_profit_loss_ratio(ratio: Option<Decimal>) -> String {
    match ratio {
        Some(ratio) => format!("{:.2}:1", ratio.round_dp(2)),
        None => "unset".to_string(),
    }
}

/// Render a signal time as `YYYY-MM-DD HH:MM:SS`.
pub fn format_signal_time(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
