//! Dashboard home: stats cards, monthly chart and the latest signals.
//!
//! Each panel loads independently and never leaves the view empty-handed:
//! stats fall back to counters derived from the signals already loaded, the
//! chart to zeroed monthly buckets, and the latest strip to the first N
//! loaded signals.

use parking_lot::RwLock;
use sigdash_client::{ChartData, ClientError, DashboardStats};
use sigdash_core::Signal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::notice::{Notice, NoticeBoard};
use crate::source::DynSignalSource;

/// Number of monthly buckets shown when the chart cannot be loaded.
pub const CHART_FALLBACK_MONTHS: u32 = 6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub chart: ChartData,
    pub latest: Vec<Signal>,
    /// Stats were derived locally rather than fetched.
    pub stats_fallback: bool,
    /// Chart shows zeroed buckets rather than fetched data.
    pub chart_fallback: bool,
}

pub struct DashboardView {
    source: DynSignalSource,
    clock: Arc<dyn Clock>,
    notices: NoticeBoard,
    latest_limit: u32,
    state: RwLock<DashboardSnapshot>,
    loading: AtomicBool,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DashboardView {
    pub fn new(
        source: DynSignalSource,
        clock: Arc<dyn Clock>,
        notices: NoticeBoard,
        latest_limit: u32,
    ) -> Self {
        Self {
            source,
            clock,
            notices,
            latest_limit,
            state: RwLock::new(DashboardSnapshot::default()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Load the stats cards; on failure derive them from `loaded`.
    pub async fn load_stats(&self, loaded: &[Signal]) -> DashboardStats {
        let (stats, fallback) = match self.source.fetch_stats().await {
            Ok(stats) => (stats, false),
            Err(e) => {
                warn!(error = %e, "Dashboard stats unavailable, deriving from loaded signals");
                self.notices.publish(Notice::warning(format!(
                    "Statistics unavailable, showing loaded signals: {e}"
                )));
                (DashboardStats::from_signals(loaded), true)
            }
        };

        let mut state = self.state.write();
        state.stats = stats.clone();
        state.stats_fallback = fallback;
        stats
    }

    /// Load the monthly chart; on failure show zeroed buckets.
    pub async fn load_chart(&self) -> ChartData {
        let (chart, fallback) = match self.source.fetch_chart().await {
            Ok(chart) => (chart, false),
            Err(e) => {
                warn!(error = %e, "Dashboard chart unavailable");
                self.notices
                    .publish(Notice::warning(format!("Chart data unavailable: {e}")));
                (
                    ChartData::empty_months(self.clock.today(), CHART_FALLBACK_MONTHS),
                    true,
                )
            }
        };

        let mut state = self.state.write();
        state.chart = chart.clone();
        state.chart_fallback = fallback;
        chart
    }

    /// Load the latest strip; on failure show the first N of `loaded`.
    pub async fn load_latest(&self, loaded: &[Signal]) -> Vec<Signal> {
        let latest = match self.source.fetch_latest(self.latest_limit).await {
            Ok(latest) => latest,
            Err(e) => stale_latest(&self.notices, loaded, self.latest_limit, &e),
        };

        self.state.write().latest = latest.clone();
        latest
    }

    /// Refresh stats and latest signals (the dashboard tab's refresh).
    pub async fn refresh(&self, loaded: &[Signal]) {
        let _loading = self.begin();
        tokio::join!(self.load_stats(loaded), self.load_latest(loaded));
        debug!("Dashboard refreshed");
    }

    /// Load every panel.
    pub async fn load_all(&self, loaded: &[Signal]) {
        let _loading = self.begin();
        tokio::join!(
            self.load_stats(loaded),
            self.load_chart(),
            self.load_latest(loaded)
        );
    }

    fn begin(&self) -> LoadingGuard<'_> {
        self.loading.store(true, Ordering::SeqCst);
        LoadingGuard(&self.loading)
    }
}

/// Latest-strip fallback: the first `limit` signals of `loaded`, with a
/// warning notice naming the failure.
pub(crate) fn stale_latest(
    notices: &NoticeBoard,
    loaded: &[Signal],
    limit: u32,
    err: &ClientError,
) -> Vec<Signal> {
    let stale: Vec<Signal> = loaded.iter().take(limit as usize).cloned().collect();
    warn!(
        error = %err,
        shown = stale.len(),
        "Latest signals unavailable, showing loaded signals"
    );
    notices.publish(Notice::warning(format!(
        "Latest signals unavailable, showing loaded signals: {err}"
    )));
    stale
}
