//! Core domain types for the signal dashboard client.
//!
//! This crate holds the pieces that carry actual business rules and are
//! independent of any transport or view binding:
//! - `CollectionSettings`: market-data collection settings edited by the user
//! - `frequency`: minimum fetch frequency derivation and clamping
//! - `FilterCriteria`: signal list filter fields
//! - `Signal`, `SignalPage`: signal records and normalised pages
//! - `visible_pages`: sliding pager window

pub mod error;
pub mod filter;
pub mod frequency;
pub mod page;
pub mod settings;
pub mod signal;

pub use error::{CoreError, Result};
pub use filter::{FilterCriteria, SignalTypeFilter};
pub use frequency::{
    clamp_fetch_frequency, minimum_fetch_frequency, parse_frequency_input, FrequencyAdjusted,
    ALL_COINS_ESTIMATE, MIN_FETCH_FREQUENCY_MINUTES, SECONDS_PER_COIN,
};
pub use page::{visible_pages, PageEnvelope, SignalPage, COMPACT_PAGER_SPAN, DEFAULT_PAGER_WINDOW};
pub use settings::{CollectionSettings, CryptoMode, ProxyEndpoint, ProxyKind, StoredSettings};
pub use signal::{format_profit_loss_ratio, format_signal_time, Signal, SignalSide};
