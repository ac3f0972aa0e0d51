//! View-model layer of the signal dashboard.
//!
//! Holds the client-side state machines that sit between user actions and
//! the backend:
//! - `SignalQueryCoordinator`: debounced filtering, pagination and the single
//!   authoritative in-flight signal query
//! - `SettingsEditor`: local edits of collection settings with the
//!   fetch-frequency floor enforced on save
//! - `DashboardView`: stats, chart and latest signals with fallbacks
//! - `StrategyManager`, `BacktestRunner`: strategy files and backtests
//! - `ThemeController`: auto/dark/light theme with a day/night clock
//!
//! User-facing outcomes are published as [`Notice`]s on a broadcast channel.

pub mod backtest;
pub mod clock;
pub mod dashboard;
pub mod debounce;
pub mod error;
pub mod notice;
pub mod preferences;
pub mod settings_editor;
pub mod signals;
pub mod source;
pub mod strategies;
pub mod theme;

pub use backtest::BacktestRunner;
pub use clock::{Clock, FixedClock, SystemClock};
pub use dashboard::{DashboardSnapshot, DashboardView, CHART_FALLBACK_MONTHS};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use error::{ViewError, ViewResult};
pub use notice::{Notice, NoticeBoard, NoticeLevel, NOTICE_DISPLAY};
pub use preferences::PreferenceStore;
pub use settings_editor::{SettingsEditor, SettingsStore};
pub use signals::{
    CoordinatorConfig, FallbackPolicy, QueryOutcome, SignalQueryCoordinator, SignalViewState,
};
pub use source::{
    sample_signals, BoxFuture, DynSignalSource, MockEndpoint, MockSignalSource, PageCall,
    SignalSource,
};
pub use strategies::StrategyManager;
pub use theme::{is_night, run_theme_clock, Theme, ThemeController, ThemeMode, THEME_TICK};
