//! REST client for the signal dashboard backend.
//!
//! Wraps every `/api/...` endpoint the dashboard consumes and normalises the
//! responses into `sigdash-core` types:
//! - settings read/write and dropdown options
//! - signal listing (both pagination envelopes) and "latest N"
//! - dashboard stats and chart series
//! - strategy file management and backtests

pub mod backtest;
pub mod client;
pub mod error;
pub mod strategies;
pub mod types;

pub use client::{DashboardApi, ListingStyle};
pub use error::{ClientError, ClientResult};
pub use strategies::{BuiltinImport, StrategyDownload, StrategyInfoUpdate};
pub use types::{
    ApiMessage, BacktestRequest, BacktestResponse, BacktestResult, ChartData, DashboardStats,
    DataDownloadRequest, SelectOptions, StrategyFile, StrategyStatus, StrategyUpload,
    TradeRecord, format_file_size, MAX_STRATEGY_UPLOAD_BYTES,
};
