//! Theme selection.
//!
//! The mode is one of auto/dark/light. In auto mode the effective theme
//! follows the local hour: dark from 18:00 to 06:00, light otherwise. A
//! background clock re-evaluates auto mode periodically.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::ViewResult;
use crate::preferences::PreferenceStore;

/// Preference key of the persisted mode.
pub const THEME_MODE_KEY: &str = "themeMode";

/// Interval of the day/night re-evaluation.
pub const THEME_TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Dark,
    Light,
}

impl ThemeMode {
    /// Unknown values fall back to auto.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dark" => Self::Dark,
            "light" => Self::Light,
            _ => Self::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// auto → dark → light → auto
    pub fn next(self) -> Self {
        match self {
            Self::Auto => Self::Dark,
            Self::Dark => Self::Light,
            Self::Light => Self::Auto,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme actually rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// Night is `hour < 6 || hour >= 18`.
pub fn is_night(hour: u32) -> bool {
    hour < 6 || hour >= 18
}

fn resolve(mode: ThemeMode, hour: u32) -> Theme {
    match mode {
        ThemeMode::Dark => Theme::Dark,
        ThemeMode::Light => Theme::Light,
        ThemeMode::Auto if is_night(hour) => Theme::Dark,
        ThemeMode::Auto => Theme::Light,
    }
}

struct ThemeState {
    mode: ThemeMode,
    store: PreferenceStore,
}

/// Owns the theme mode and publishes the effective theme.
pub struct ThemeController {
    state: Mutex<ThemeState>,
    clock: Arc<dyn Clock>,
    tx: watch::Sender<Theme>,
}

impl ThemeController {
    /// Restore the mode saved in `store` (auto when absent or unknown).
    pub fn new(store: PreferenceStore, clock: Arc<dyn Clock>) -> Self {
        let mode = store
            .get(THEME_MODE_KEY)
            .map(ThemeMode::parse)
            .unwrap_or_default();
        let (tx, _) = watch::channel(resolve(mode, clock.hour()));

        Self {
            state: Mutex::new(ThemeState { mode, store }),
            clock,
            tx,
        }
    }

    pub fn mode(&self) -> ThemeMode {
        self.state.lock().mode
    }

    pub fn theme(&self) -> Theme {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.tx.subscribe()
    }

    /// Advance to the next mode and persist it.
    pub fn cycle(&self) -> ViewResult<ThemeMode> {
        let next = self.mode().next();
        self.set_mode(next)?;
        Ok(next)
    }

    /// Persist `mode`, then switch to it. A failed write leaves the mode
    /// unchanged.
    pub fn set_mode(&self, mode: ThemeMode) -> ViewResult<()> {
        {
            let mut state = self.state.lock();
            state.store.set(THEME_MODE_KEY, mode.as_str())?;
            state.mode = mode;
        }
        info!(mode = %mode, "Theme mode changed");
        self.evaluate();
        Ok(())
    }

    /// Re-resolve the effective theme. Returns the new theme if it changed.
    pub fn evaluate(&self) -> Option<Theme> {
        let theme = resolve(self.mode(), self.clock.hour());
        let changed = self.tx.send_if_modified(|current| {
            if *current == theme {
                return false;
            }
            *current = theme;
            true
        });
        changed.then(|| {
            debug!(theme = ?theme, "Effective theme changed");
            theme
        })
    }
}

/// Re-evaluate auto mode every `period` until cancelled.
pub async fn run_theme_clock(
    controller: Arc<ThemeController>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if controller.mode() == ThemeMode::Auto {
                    controller.evaluate();
                }
            }
            () = cancel.cancelled() => {
                debug!("Theme clock stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_night_boundaries() {
        assert!(is_night(0));
        assert!(is_night(5));
        assert!(!is_night(6));
        assert!(!is_night(17));
        assert!(is_night(18));
        assert!(is_night(23));
    }

    #[test]
    fn test_cycle_order_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let clock = Arc::new(FixedClock::new(at(12)));

        let controller = ThemeController::new(PreferenceStore::open(&path).unwrap(), clock.clone());
        assert_eq!(controller.mode(), ThemeMode::Auto);
        assert_eq!(controller.theme(), Theme::Light);

        assert_eq!(controller.cycle().unwrap(), ThemeMode::Dark);
        assert_eq!(controller.theme(), Theme::Dark);
        assert_eq!(controller.cycle().unwrap(), ThemeMode::Light);
        assert_eq!(controller.theme(), Theme::Light);

        let restored = ThemeController::new(PreferenceStore::open(&path).unwrap(), clock);
        assert_eq!(restored.mode(), ThemeMode::Light);

        assert_eq!(restored.cycle().unwrap(), ThemeMode::Auto);
    }

    #[test]
    fn test_unknown_saved_mode_is_auto() {
        let mut store = PreferenceStore::in_memory();
        store.set(THEME_MODE_KEY, "sepia").unwrap();
        let controller = ThemeController::new(store, Arc::new(FixedClock::new(at(20))));
        assert_eq!(controller.mode(), ThemeMode::Auto);
        assert_eq!(controller.theme(), Theme::Dark);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_switches_auto_theme_at_dusk() {
        let clock = Arc::new(FixedClock::new(at(17)));
        let controller = Arc::new(ThemeController::new(
            PreferenceStore::in_memory(),
            clock.clone(),
        ));
        let mut rx = controller.subscribe();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_theme_clock(
            controller.clone(),
            THEME_TICK,
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.theme(), Theme::Light);

        clock.set(at(18));
        tokio::time::sleep(THEME_TICK).await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Theme::Dark);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_leaves_fixed_mode_alone() {
        let clock = Arc::new(FixedClock::new(at(12)));
        let controller = Arc::new(ThemeController::new(
            PreferenceStore::in_memory(),
            clock.clone(),
        ));
        controller.set_mode(ThemeMode::Light).unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_theme_clock(controller.clone(), THEME_TICK, cancel.clone()));

        clock.set(at(22));
        tokio::time::sleep(THEME_TICK * 2).await;
        assert_eq!(controller.theme(), Theme::Light);

        cancel.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_failed_persist_keeps_mode() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("prefs");
        let clock = Arc::new(FixedClock::new(at(12)));
        let controller =
            ThemeController::new(PreferenceStore::open(parent.join("prefs.json")).unwrap(), clock);
        let mut rx = controller.subscribe();

        std::fs::write(&parent, "not a directory").unwrap();

        assert!(controller.set_mode(ThemeMode::Dark).is_err());
        assert_eq!(controller.mode(), ThemeMode::Auto);
        assert_eq!(controller.theme(), Theme::Light);
        assert!(!rx.has_changed().unwrap());
        assert!(controller.cycle().is_err());
        assert_eq!(controller.mode(), ThemeMode::Auto);
    }
}
