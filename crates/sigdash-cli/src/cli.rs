//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Signal dashboard client
#[derive(Parser, Debug)]
#[command(name = "sigdash", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (can also be set via SIGDASH_CONFIG env var)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the minimum fetch frequency offline
    MinFrequency {
        /// Collect every listed coin instead of a custom list
        #[arg(long)]
        all: bool,
        /// Number of coins in the custom list
        #[arg(long, default_value_t = 0)]
        coins: usize,
        /// Number of configured proxies
        #[arg(long, default_value_t = 0)]
        proxies: usize,
    },
    /// Show or edit the collection settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List signals
    Signals(SignalArgs),
    /// Show the most recent signals
    Latest {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show stats, chart and latest signals
    Dashboard,
    /// Manage strategy files
    Strategies {
        #[command(subcommand)]
        action: StrategyAction,
    },
    /// Run backtests and manage historical data
    Backtest {
        #[command(subcommand)]
        action: BacktestAction,
    },
    /// Show or change the theme mode
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// Interactive signal list with periodic refresh
    Watch(SignalArgs),
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    /// Set the fetch frequency in minutes (raised to the minimum if lower)
    SetFrequency { minutes: String },
    /// Switch between "custom" and "all"
    SetMode { mode: String },
    AddCoin { symbol: String },
    RemoveCoin { symbol: String },
    AddExchange { exchange: String },
    RemoveExchange { exchange: String },
    /// Add a proxy, e.g. `socks5://10.0.0.2:1080`
    AddProxy { uri: String },
    /// Remove the proxy at a 0-based index
    RemoveProxy { index: usize },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SignalArgs {
    /// Symbol search text
    #[arg(short, long)]
    pub search: Option<String>,
    /// buy, sell or all
    #[arg(short = 't', long = "type")]
    pub signal_type: Option<String>,
    #[arg(long)]
    pub strategy: Option<String>,
    #[arg(short, long)]
    pub exchange: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,
    /// Show the detail of one signal on the page
    #[arg(long)]
    pub detail: Option<String>,
}

impl SignalArgs {
    /// Filter edits as (field, value) pairs.
    pub fn field_edits(&self) -> Vec<(&'static str, &str)> {
        [
            ("search", &self.search),
            ("signalType", &self.signal_type),
            ("strategy", &self.strategy),
            ("exchange", &self.exchange),
            ("startDate", &self.from),
            ("endDate", &self.to),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

#[derive(Subcommand, Debug)]
pub enum StrategyAction {
    List,
    Upload {
        path: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
    },
    Download {
        id: i64,
        /// Output directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    Reload { id: i64 },
    /// Set ACTIVE, INACTIVE, UPDATING or ERROR
    Status { id: i64, status: String },
    Rename {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: i64 },
    ImportBuiltin,
}

#[derive(Subcommand, Debug)]
pub enum BacktestAction {
    Run {
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        balance: Option<f64>,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Download historical data for one or more symbols
    Download {
        symbols: Vec<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    Info,
}

#[derive(Subcommand, Debug)]
pub enum ThemeAction {
    Show,
    Cycle,
    Set { mode: String },
}
