//! Read side of the dashboard backend.
//!
//! [`SignalSource`] abstracts the signal and dashboard queries so the view
//! models can be driven by the real [`DashboardApi`] or by the in-memory
//! [`MockSignalSource`] in tests and demos.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sigdash_client::{ChartData, ClientError, ClientResult, DashboardApi, DashboardStats};
use sigdash_core::{FilterCriteria, Signal, SignalPage, SignalSide};
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Queries the view models issue against the backend.
pub trait SignalSource: Send + Sync {
    /// One page of signals matching `criteria` (`page` is 1-based).
    fn fetch_page<'a>(
        &'a self,
        criteria: &'a FilterCriteria,
        page: u32,
        page_size: u32,
    ) -> BoxFuture<'a, ClientResult<SignalPage>>;

    /// The most recent `limit` signals, ignoring any filter.
    fn fetch_latest(&self, limit: u32) -> BoxFuture<'_, ClientResult<Vec<Signal>>>;

    fn fetch_stats(&self) -> BoxFuture<'_, ClientResult<DashboardStats>>;

    fn fetch_chart(&self) -> BoxFuture<'_, ClientResult<ChartData>>;
}

/// Shared signal source handle.
pub type DynSignalSource = Arc<dyn SignalSource>;

impl SignalSource for DashboardApi {
    fn fetch_page<'a>(
        &'a self,
        criteria: &'a FilterCriteria,
        page: u32,
        page_size: u32,
    ) -> BoxFuture<'a, ClientResult<SignalPage>> {
        Box::pin(self.signal_page(criteria, page, page_size))
    }

    fn fetch_latest(&self, limit: u32) -> BoxFuture<'_, ClientResult<Vec<Signal>>> {
        Box::pin(self.latest_signals(limit))
    }

    fn fetch_stats(&self) -> BoxFuture<'_, ClientResult<DashboardStats>> {
        Box::pin(self.dashboard_stats())
    }

    fn fetch_chart(&self) -> BoxFuture<'_, ClientResult<ChartData>> {
        Box::pin(self.dashboard_chart())
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Endpoint selector for [`MockSignalSource::set_failing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockEndpoint {
    Page,
    Latest,
    Stats,
    Chart,
}

/// A page request seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCall {
    pub criteria: FilterCriteria,
    pub page: u32,
    pub page_size: u32,
}

/// In-memory signal source.
///
/// Filters and paginates a fixed signal set, records every page request and
/// can be told to fail or to delay individual responses.
pub struct MockSignalSource {
    signals: Mutex<Vec<Signal>>,
    page_calls: Mutex<Vec<PageCall>>,
    latest_calls: Mutex<Vec<u32>>,
    failing: Mutex<HashSet<MockEndpoint>>,
    /// Delays applied to successive page requests.
    page_delays: Mutex<VecDeque<Duration>>,
}

impl Default for MockSignalSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockSignalSource {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self {
            signals: Mutex::new(signals),
            page_calls: Mutex::new(Vec::new()),
            latest_calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            page_delays: Mutex::new(VecDeque::new()),
        }
    }

    /// Mock holding `count` generated signals, newest first.
    pub fn with_sample_signals(count: usize) -> Self {
        Self::new(sample_signals(count))
    }

    pub fn set_signals(&self, signals: Vec<Signal>) {
        *self.signals.lock() = signals;
    }

    /// Make an endpoint fail with a transport error (or recover).
    pub fn set_failing(&self, endpoint: MockEndpoint, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(endpoint);
        } else {
            set.remove(&endpoint);
        }
    }

    /// Delay the next not-yet-delayed page request by `delay`.
    pub fn push_page_delay(&self, delay: Duration) {
        self.page_delays.lock().push_back(delay);
    }

    pub fn page_calls(&self) -> Vec<PageCall> {
        self.page_calls.lock().clone()
    }

    pub fn latest_calls(&self) -> Vec<u32> {
        self.latest_calls.lock().clone()
    }

    fn check(&self, endpoint: MockEndpoint) -> ClientResult<()> {
        if self.failing.lock().contains(&endpoint) {
            return Err(ClientError::Transport(format!(
                "mock {endpoint:?} endpoint unavailable"
            )));
        }
        Ok(())
    }

    fn matching(&self, criteria: &FilterCriteria) -> Vec<Signal> {
        let search = criteria.search.to_ascii_uppercase();
        self.signals
            .lock()
            .iter()
            .filter(|s| criteria.signal_type.matches(s.side))
            .filter(|s| search.is_empty() || s.symbol.contains(&search))
            .filter(|s| criteria.exchange.is_empty() || s.exchange == criteria.exchange)
            .filter(|s| {
                criteria.strategy.is_empty()
                    || s.strategy.as_deref() == Some(criteria.strategy.as_str())
            })
            .cloned()
            .collect()
    }
}

impl SignalSource for MockSignalSource {
    fn fetch_page<'a>(
        &'a self,
        criteria: &'a FilterCriteria,
        page: u32,
        page_size: u32,
    ) -> BoxFuture<'a, ClientResult<SignalPage>> {
        Box::pin(async move {
            self.page_calls.lock().push(PageCall {
                criteria: criteria.clone(),
                page,
                page_size,
            });
            let delay = self.page_delays.lock().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.check(MockEndpoint::Page)?;

            if page_size == 0 {
                return Err(ClientError::Validation("page size must be positive".to_string()));
            }
            let matching = self.matching(criteria);
            let total_pages = u32::try_from(matching.len().div_ceil(page_size as usize))
                .unwrap_or(u32::MAX);
            let start = (page.max(1) as usize - 1) * page_size as usize;
            let items = matching
                .into_iter()
                .skip(start)
                .take(page_size as usize)
                .collect();

            Ok(SignalPage::new(items, total_pages, page))
        })
    }

    fn fetch_latest(&self, limit: u32) -> BoxFuture<'_, ClientResult<Vec<Signal>>> {
        Box::pin(async move {
            self.latest_calls.lock().push(limit);
            self.check(MockEndpoint::Latest)?;
            Ok(self
                .signals
                .lock()
                .iter()
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    fn fetch_stats(&self) -> BoxFuture<'_, ClientResult<DashboardStats>> {
        Box::pin(async move {
            self.check(MockEndpoint::Stats)?;
            Ok(DashboardStats::from_signals(&self.signals.lock()))
        })
    }

    fn fetch_chart(&self) -> BoxFuture<'_, ClientResult<ChartData>> {
        Box::pin(async move {
            self.check(MockEndpoint::Chart)?;
            let signals = self.signals.lock();
            let buys = signals.iter().filter(|s| s.side == SignalSide::Buy).count() as u64;
            Ok(ChartData {
                labels: vec!["2024-03".to_string()],
                buy_data: vec![buys],
                sell_data: vec![signals.len() as u64 - buys],
            })
        })
    }
}

/// Generate `count` signals, newest first, alternating symbols and sides.
pub fn sample_signals(count: usize) -> Vec<Signal> {
    const SYMBOLS: [&str; 4] = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "DOGEUSDT"];
    const EXCHANGES: [&str; 2] = ["BINANCE", "GATE_IO"];

    let base = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or(NaiveDateTime::MIN);

    (0..count)
        .map(|i| Signal {
            id: format!("{}", 1_000 + i),
            symbol: SYMBOLS[i % SYMBOLS.len()].to_string(),
            side: if i % 3 == 2 {
                SignalSide::Sell
            } else {
                SignalSide::Buy
            },
            price: Decimal::new(100_000 + i as i64, 2),
            buy_price: None,
            take_profit: None,
            stop_loss: None,
            profit_loss_ratio: Some(Decimal::new(25, 1)),
            signal_time: base - ChronoDuration::minutes(i as i64),
            strategy: Some("macd_cross".to_string()),
            exchange: EXCHANGES[i % EXCHANGES.len()].to_string(),
            expiration: None,
            remark: None,
        })
        .collect()
}
