//! Minimum fetch frequency derivation.
//!
//! The backend polls every tracked coin once per cycle, spreading requests
//! over the proxy pool. The minimum interval the user may configure is the
//! time a full cycle takes, never less than [`MIN_FETCH_FREQUENCY_MINUTES`].

use serde::Serialize;
use std::fmt;

use crate::settings::{CollectionSettings, CryptoMode};

/// Hard floor for the fetch frequency (minutes).
pub const MIN_FETCH_FREQUENCY_MINUTES: u32 = 5;

/// Assumed coin count when collecting every coin.
pub const ALL_COINS_ESTIMATE: u64 = 2000;

/// Time budget per coin per proxy (seconds).
pub const SECONDS_PER_COIN: u64 = 20;

/// Informational notice: the requested frequency was raised to the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrequencyAdjusted {
    /// What the user asked for, if it was a number at all.
    pub requested: Option<i64>,
    /// The value actually applied.
    pub applied: u32,
}

impl fmt::Display for FrequencyAdjusted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fetch frequency adjusted to the minimum of {} minutes",
            self.applied
        )
    }
}

/// Compute the minimum allowed fetch frequency in minutes.
///
/// `ceil(coins * 20s / max(1, proxies) / 60)`, floored at 5 minutes.
pub fn minimum_fetch_frequency(settings: &CollectionSettings) -> u32 {
    let coin_count = match settings.crypto_mode {
        CryptoMode::Custom => settings.tracked_coin_count() as u64,
        CryptoMode::All => ALL_COINS_ESTIMATE,
    };
    let proxy_count = settings.proxies.len().max(1) as u64;

    let total_minutes = (coin_count * SECONDS_PER_COIN).div_ceil(proxy_count * 60);
    let total_minutes = u32::try_from(total_minutes).unwrap_or(u32::MAX);

    total_minutes.max(MIN_FETCH_FREQUENCY_MINUTES)
}

/// Raise a too-low fetch frequency to the minimum.
///
/// Returns the corrected settings and a notice when a change was made.
pub fn clamp_fetch_frequency(
    mut settings: CollectionSettings,
) -> (CollectionSettings, Option<FrequencyAdjusted>) {
    let minimum = minimum_fetch_frequency(&settings);
    if settings.fetch_frequency_minutes >= minimum {
        return (settings, None);
    }

    let notice = FrequencyAdjusted {
        requested: Some(i64::from(settings.fetch_frequency_minutes)),
        applied: minimum,
    };
    settings.fetch_frequency_minutes = minimum;
    (settings, Some(notice))
}

/// Apply raw user input as the new fetch frequency.
///
/// Negative, zero, non-numeric and too-low input all end up at the minimum
/// with a notice.
pub fn parse_frequency_input(
    raw: &str,
    mut settings: CollectionSettings,
) -> (CollectionSettings, Option<FrequencyAdjusted>) {
    let minimum = minimum_fetch_frequency(&settings);
    let requested = raw.trim().parse::<i64>().ok();

    match requested {
        Some(value) if value >= i64::from(minimum) => {
            settings.fetch_frequency_minutes = u32::try_from(value).unwrap_or(u32::MAX);
            (settings, None)
        }
        _ => {
            settings.fetch_frequency_minutes = minimum;
            (
                settings,
                Some(FrequencyAdjusted {
                    requested,
                    applied: minimum,
                }),
            )
        }
    }
}
