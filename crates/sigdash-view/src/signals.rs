//! Signal list query coordinator.
//!
//! Owns the filter, pagination and detail-selection state of the signal
//! list and guarantees:
//! - filter edits are debounced; only the last edit in a burst queries
//! - applying or resetting a filter always starts from page 1
//! - only the most recently dispatched query may change the view; older
//!   responses are discarded when they arrive
//! - the loading flag is cleared on every settlement path
//!
//! ```text
//! Idle --edit--> Debouncing --quiet 500ms--> Requesting --> Idle
//! Idle --page/reset/apply/refresh--> Requesting --> Idle
//! ```

use parking_lot::RwLock;
use sigdash_core::{visible_pages, FilterCriteria, Signal, SignalPage, DEFAULT_PAGER_WINDOW};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dashboard::stale_latest;
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::error::{ViewError, ViewResult};
use crate::notice::{Notice, NoticeBoard};
use crate::source::DynSignalSource;

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub page_size: u32,
    pub pager_window: u32,
    pub debounce: Duration,
    /// Size of the "latest signals" strip.
    pub latest_limit: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            pager_window: DEFAULT_PAGER_WINDOW,
            debounce: DEFAULT_DEBOUNCE,
            latest_limit: 5,
        }
    }
}

/// What a failed query leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Clear the list: no items, zero pages, page 1, error notice.
    EmptyPage,
    /// Keep showing the first N signals already loaded, warning notice.
    StaleList,
}

/// Result of a query that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The response replaced the view state.
    Applied(SignalPage),
    /// A newer query was dispatched meanwhile; the response was dropped.
    Superseded,
}

/// Snapshot of the signal list view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalViewState {
    /// Filter as currently edited.
    pub criteria: FilterCriteria,
    pub page: SignalPage,
    pub loading: bool,
    /// Signal shown in the detail pane.
    pub selected: Option<Signal>,
    pub latest: Vec<Signal>,
}

struct State {
    view: SignalViewState,
    /// Filter of the most recently dispatched page query. `view.criteria`
    /// may run ahead of it while an edit is being debounced.
    applied: FilterCriteria,
    /// Tag of the most recently dispatched page query.
    page_seq: u64,
    latest_seq: u64,
}

struct Inner {
    source: DynSignalSource,
    config: CoordinatorConfig,
    state: RwLock<State>,
    notices: NoticeBoard,
    debouncer: Debouncer,
    /// Bumped each time the latest page query settles.
    settled: watch::Sender<u64>,
}

/// Clears `loading` when a query settles, unless a newer one owns it.
struct BusyGuard<'a> {
    inner: &'a Inner,
    seq: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let latest = {
            let mut state = self.inner.state.write();
            let latest = state.page_seq == self.seq;
            if latest {
                state.view.loading = false;
            }
            latest
        };
        if latest {
            self.inner.settled.send_modify(|n| *n += 1);
        }
    }
}

/// Coordinates signal list queries. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SignalQueryCoordinator {
    inner: Arc<Inner>,
}

impl SignalQueryCoordinator {
    pub fn new(source: DynSignalSource, config: CoordinatorConfig, notices: NoticeBoard) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                debouncer: Debouncer::new(config.debounce),
                config,
                state: RwLock::new(State {
                    view: SignalViewState::default(),
                    applied: FilterCriteria::default(),
                    page_seq: 0,
                    latest_seq: 0,
                }),
                notices,
                settled: watch::channel(0).0,
            }),
        }
    }

    /// Notified whenever the most recent page query settles, including
    /// queries fired by the debounce timer.
    pub fn subscribe_settled(&self) -> watch::Receiver<u64> {
        self.inner.settled.subscribe()
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.inner.config
    }

    pub fn state(&self) -> SignalViewState {
        self.inner.state.read().view.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().view.loading
    }

    pub fn current_page(&self) -> u32 {
        self.inner.state.read().view.page.current_page()
    }

    /// Page numbers to render in the pager.
    pub fn visible_pages(&self) -> RangeInclusive<u32> {
        let state = self.inner.state.read();
        visible_pages(
            state.view.page.current_page(),
            state.view.page.total_pages(),
            self.inner.config.pager_window,
        )
    }

    // ------------------------------------------------------------------
    // Filter editing
    // ------------------------------------------------------------------

    /// Edit the filter and (re)arm the debounce timer. The query fires once
    /// edits have been quiet for the debounce period.
    pub fn edit_filter(&self, edit: impl FnOnce(&mut FilterCriteria)) {
        edit(&mut self.inner.state.write().view.criteria);

        let coordinator = self.clone();
        self.inner.debouncer.arm(async move {
            // Failures are already reported as notices.
            let _ = coordinator.run_page_query(1).await;
        });
    }

    /// Edit one filter field by wire name. Returns `false` (and arms
    /// nothing) for unknown fields.
    pub fn set_field(&self, name: &str, value: &str) -> bool {
        let mut scratch = FilterCriteria::default();
        if !scratch.set_field(name, value) {
            return false;
        }
        self.edit_filter(|criteria| {
            criteria.set_field(name, value);
        });
        true
    }

    /// Query with the current filter from page 1, skipping the debounce.
    pub async fn apply_filter(&self) -> ViewResult<QueryOutcome> {
        self.inner.debouncer.cancel();
        self.run_page_query(1).await
    }

    /// Clear every filter field and query page 1.
    pub async fn reset_filter(&self) -> ViewResult<QueryOutcome> {
        self.inner.debouncer.cancel();
        self.inner.state.write().view.criteria = FilterCriteria::default();
        info!("Signal filter reset");
        self.run_page_query(1).await
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    /// Go to `target` with the applied filter. Returns `None` when the
    /// target is the current page or outside `1..=max(total_pages, 1)`.
    ///
    /// A pending filter edit stays armed and still lands on page 1.
    pub async fn change_page(&self, target: u32) -> Option<ViewResult<QueryOutcome>> {
        let (current, last) = {
            let state = self.inner.state.read();
            (state.view.page.current_page(), state.view.page.last_page())
        };
        if target == current || target < 1 || target > last {
            debug!(target, current, last, "Ignoring page change");
            return None;
        }

        Some(self.run_applied_query(target).await)
    }

    pub async fn previous_page(&self) -> Option<ViewResult<QueryOutcome>> {
        let current = self.current_page();
        if current <= 1 {
            return None;
        }
        self.change_page(current - 1).await
    }

    pub async fn next_page(&self) -> Option<ViewResult<QueryOutcome>> {
        let current = self.current_page();
        self.change_page(current.saturating_add(1)).await
    }

    /// Re-run the current page with the applied filter. A pending filter
    /// edit stays armed.
    pub async fn refresh(&self) -> ViewResult<QueryOutcome> {
        let page = self.current_page();
        self.run_applied_query(page).await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Dispatch one page query for `criteria`.
    ///
    /// Clears the detail selection and sets `loading` before the call. When
    /// the result set shrank below `page`, the last page is fetched instead.
    /// On failure the [`FallbackPolicy::EmptyPage`] state is applied and the
    /// error is returned.
    pub async fn submit_query(
        &self,
        criteria: FilterCriteria,
        page: u32,
        page_size: u32,
    ) -> ViewResult<QueryOutcome> {
        let seq = {
            let mut state = self.inner.state.write();
            state.page_seq += 1;
            state.applied = criteria.clone();
            state.view.selected = None;
            state.view.loading = true;
            state.page_seq
        };
        let _busy = BusyGuard {
            inner: &self.inner,
            seq,
        };

        debug!(
            seq,
            page,
            page_size,
            active_filters = criteria.active_count(),
            "Submitting signal query"
        );
        let mut page = page;
        let result = loop {
            let result = self.inner.source.fetch_page(&criteria, page, page_size).await;
            let past_end = result
                .as_ref()
                .ok()
                .filter(|p| p.current_page() < page && p.is_empty() && p.total_pages() > 0)
                .map(SignalPage::current_page);
            let Some(last_page) = past_end else {
                break result;
            };
            if self.inner.state.read().page_seq != seq {
                break result;
            }
            debug!(
                seq,
                requested = page,
                last_page,
                "Requested page is past the end, fetching the last page"
            );
            page = last_page;
        };

        let mut state = self.inner.state.write();
        if state.page_seq != seq {
            debug!(seq, latest = state.page_seq, "Discarding superseded signal response");
            return Ok(QueryOutcome::Superseded);
        }

        match result {
            Ok(signal_page) => {
                debug!(
                    seq,
                    page = signal_page.current_page(),
                    total_pages = signal_page.total_pages(),
                    items = signal_page.items().len(),
                    "Signal page applied"
                );
                state.view.page = signal_page.clone();
                Ok(QueryOutcome::Applied(signal_page))
            }
            Err(e) => {
                state.view.page = SignalPage::empty();
                drop(state);
                warn!(seq, error = %e, policy = ?FallbackPolicy::EmptyPage, "Signal query failed");
                self.inner
                    .notices
                    .publish(Notice::from_client_error("Failed to load signals", &e));
                Err(ViewError::Client(e))
            }
        }
    }

    /// Query `page` with the edited filter.
    async fn run_page_query(&self, page: u32) -> ViewResult<QueryOutcome> {
        let criteria = self.inner.state.read().view.criteria.clone();
        self.submit_query(criteria, page, self.inner.config.page_size)
            .await
    }

    /// Query `page` with the filter of the last dispatched query.
    async fn run_applied_query(&self, page: u32) -> ViewResult<QueryOutcome> {
        let criteria = self.inner.state.read().applied.clone();
        self.submit_query(criteria, page, self.inner.config.page_size)
            .await
    }

    /// Load the "latest N" strip. On failure the first N signals of the
    /// loaded page are shown instead ([`FallbackPolicy::StaleList`]).
    pub async fn load_latest(&self) -> ViewResult<Vec<Signal>> {
        let limit = self.inner.config.latest_limit;
        let seq = {
            let mut state = self.inner.state.write();
            state.latest_seq += 1;
            state.latest_seq
        };

        let result = self.inner.source.fetch_latest(limit).await;

        let mut state = self.inner.state.write();
        if state.latest_seq != seq {
            return Ok(state.view.latest.clone());
        }

        match result {
            Ok(latest) => {
                state.view.latest = latest.clone();
                Ok(latest)
            }
            Err(e) => {
                debug!(policy = ?FallbackPolicy::StaleList, "Latest signals query failed");
                let stale =
                    stale_latest(&self.inner.notices, state.view.page.items(), limit, &e);
                state.view.latest = stale.clone();
                Ok(stale)
            }
        }
    }

    // ------------------------------------------------------------------
    // Detail
    // ------------------------------------------------------------------

    /// Show a signal of the current page in the detail pane.
    pub fn select_detail(&self, id: &str) -> bool {
        let mut state = self.inner.state.write();
        let found = state.view.page.items().iter().find(|s| s.id == id).cloned();
        let hit = found.is_some();
        state.view.selected = found;
        hit
    }

    pub fn close_detail(&self) {
        self.inner.state.write().view.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use crate::source::{sample_signals, MockEndpoint, MockSignalSource};
    use sigdash_core::SignalTypeFilter;

    fn coordinator(source: Arc<MockSignalSource>) -> (SignalQueryCoordinator, NoticeBoard) {
        let notices = NoticeBoard::new();
        let coordinator =
            SignalQueryCoordinator::new(source, CoordinatorConfig::default(), notices.clone());
        (coordinator, notices)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_queries_once_with_last_value() {
        let source = Arc::new(MockSignalSource::with_sample_signals(30));
        let (coordinator, _) = coordinator(source.clone());

        for search in ["B", "BT", "BTC", "BTCU", "ETH"] {
            coordinator.edit_filter(|c| c.search = search.to_string());
            tokio::time::sleep(Duration::from_millis(90)).await;
        }
        assert!(source.page_calls().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;

        let calls = source.page_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].criteria.search, "ETH");
        assert_eq!(calls[0].page, 1);
        assert!(!coordinator.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_field_arms_nothing() {
        let source = Arc::new(MockSignalSource::with_sample_signals(5));
        let (coordinator, _) = coordinator(source.clone());

        assert!(!coordinator.set_field("colour", "red"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(source.page_calls().is_empty());

        assert!(coordinator.set_field("type", "sell"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.page_calls()[0].criteria.signal_type, SignalTypeFilter::Sell);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_and_reset_start_from_page_one() {
        let source = Arc::new(MockSignalSource::with_sample_signals(45));
        let (coordinator, _) = coordinator(source.clone());

        coordinator.apply_filter().await.unwrap();
        coordinator.change_page(3).await.unwrap().unwrap();
        assert_eq!(coordinator.current_page(), 3);

        coordinator.edit_filter(|c| c.exchange = "BINANCE".to_string());
        coordinator.apply_filter().await.unwrap();
        assert_eq!(coordinator.current_page(), 1);

        coordinator.change_page(2).await.unwrap().unwrap();
        coordinator.reset_filter().await.unwrap();
        assert_eq!(coordinator.current_page(), 1);
        assert!(!coordinator.state().criteria.is_active());

        let pages: Vec<u32> = source.page_calls().iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 3, 1, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_cancels_pending_debounce() {
        let source = Arc::new(MockSignalSource::with_sample_signals(10));
        let (coordinator, _) = coordinator(source.clone());

        coordinator.edit_filter(|c| c.search = "SOL".to_string());
        coordinator.apply_filter().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(source.page_calls().len(), 1);
    }

    fn calls(source: &MockSignalSource) -> Vec<(String, u32)> {
        source
            .page_calls()
            .into_iter()
            .map(|c| (c.criteria.search, c.page))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_during_debounce_keeps_pending_edit() {
        let source = Arc::new(MockSignalSource::with_sample_signals(80));
        let (coordinator, _) = coordinator(source.clone());
        coordinator.apply_filter().await.unwrap();
        coordinator.change_page(3).await.unwrap().unwrap();

        assert!(coordinator.set_field("search", "btc"));
        coordinator.refresh().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            calls(&source),
            vec![
                (String::new(), 1),
                (String::new(), 3),
                (String::new(), 3),
                ("btc".to_string(), 1),
            ]
        );
        assert_eq!(coordinator.current_page(), 1);
        assert_eq!(coordinator.state().page.total_pages(), 2);
        assert_eq!(coordinator.state().page.items().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_change_during_debounce_keeps_pending_edit() {
        let source = Arc::new(MockSignalSource::with_sample_signals(40));
        let (coordinator, _) = coordinator(source.clone());
        coordinator.apply_filter().await.unwrap();

        coordinator.set_field("search", "eth");
        coordinator.change_page(2).await.unwrap().unwrap();
        assert!(coordinator
            .state()
            .page
            .items()
            .iter()
            .any(|s| s.symbol != "ETHUSDT"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls(&source).last(), Some(&("eth".to_string(), 1)));
        assert_eq!(coordinator.current_page(), 1);
        assert!(coordinator
            .state()
            .page
            .items()
            .iter()
            .all(|s| s.symbol == "ETHUSDT"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_after_result_set_shrank_shows_last_page() {
        let source = Arc::new(MockSignalSource::with_sample_signals(50));
        let (coordinator, _) = coordinator(source.clone());
        coordinator.apply_filter().await.unwrap();
        coordinator.change_page(5).await.unwrap().unwrap();

        source.set_signals(sample_signals(20));
        coordinator.refresh().await.unwrap();

        let pages: Vec<u32> = source.page_calls().iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 5, 5, 2]);
        let page = coordinator.state().page;
        assert_eq!(page.current_page(), 2);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.items().len(), 10);
        assert!(!coordinator.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_change_bounds() {
        let source = Arc::new(MockSignalSource::with_sample_signals(25));
        let (coordinator, _) = coordinator(source.clone());
        coordinator.apply_filter().await.unwrap();

        assert!(coordinator.change_page(1).await.is_none());
        assert!(coordinator.change_page(0).await.is_none());
        assert!(coordinator.change_page(4).await.is_none());
        assert!(coordinator.previous_page().await.is_none());

        coordinator.change_page(3).await.unwrap().unwrap();
        assert!(coordinator.next_page().await.is_none());
        coordinator.previous_page().await.unwrap().unwrap();
        assert_eq!(coordinator.current_page(), 2);
        assert_eq!(coordinator.visible_pages(), 1..=3);
        assert_eq!(source.page_calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_applies_empty_page() {
        let source = Arc::new(MockSignalSource::with_sample_signals(25));
        let (coordinator, notices) = coordinator(source.clone());
        coordinator.apply_filter().await.unwrap();
        coordinator.change_page(2).await.unwrap().unwrap();

        source.set_failing(MockEndpoint::Page, true);
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, ViewError::Client(_)));

        let state = coordinator.state();
        assert!(!state.loading);
        assert!(state.page.is_empty());
        assert_eq!(state.page.total_pages(), 0);
        assert_eq!(state.page.current_page(), 1);
        assert!(coordinator.visible_pages().is_empty());
        assert_eq!(notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let source = Arc::new(MockSignalSource::with_sample_signals(30));
        let (coordinator, _) = coordinator(source.clone());

        source.push_page_delay(Duration::from_millis(1000));
        source.push_page_delay(Duration::from_millis(2000));

        let slow = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .submit_query(FilterCriteria::default(), 1, 10)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let newer = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                let criteria = FilterCriteria {
                    signal_type: SignalTypeFilter::Sell,
                    ..Default::default()
                };
                coordinator.submit_query(criteria, 1, 10).await
            })
        };

        let first = slow.await.unwrap().unwrap();
        assert_eq!(first, QueryOutcome::Superseded);
        assert!(coordinator.is_loading(), "newer query still owns the flag");

        let second = newer.await.unwrap().unwrap();
        assert!(matches!(second, QueryOutcome::Applied(_)));
        let state = coordinator.state();
        assert!(!state.loading);
        assert!(state
            .page
            .items()
            .iter()
            .all(|s| s.side == sigdash_core::SignalSide::Sell));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_clears_detail() {
        let source = Arc::new(MockSignalSource::with_sample_signals(10));
        let (coordinator, _) = coordinator(source);
        coordinator.apply_filter().await.unwrap();

        assert!(coordinator.select_detail("1003"));
        assert_eq!(coordinator.state().selected.unwrap().id, "1003");
        assert!(!coordinator.select_detail("missing"));
        assert!(coordinator.state().selected.is_none());

        coordinator.select_detail("1001");
        coordinator.refresh().await.unwrap();
        assert!(coordinator.state().selected.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_falls_back_to_loaded_signals() {
        let source = Arc::new(MockSignalSource::with_sample_signals(12));
        let (coordinator, notices) = coordinator(source.clone());
        coordinator.apply_filter().await.unwrap();

        let latest = coordinator.load_latest().await.unwrap();
        assert_eq!(latest.len(), 5);

        source.set_failing(MockEndpoint::Latest, true);
        let stale = coordinator.load_latest().await.unwrap();
        let loaded: Vec<String> = coordinator.state().page.items()[..5]
            .iter()
            .map(|s| s.id.clone())
            .collect();
        let stale_ids: Vec<String> = stale.iter().map(|s| s.id.clone()).collect();
        assert_eq!(stale_ids, loaded);
        assert_eq!(notices.last().unwrap().level, NoticeLevel::Warning);
        assert_eq!(source.latest_calls(), vec![5, 5]);
    }
}
