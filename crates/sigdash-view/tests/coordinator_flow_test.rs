//! Signal list flow tests.
//!
//! Drives the coordinator the way a frontend would:
//! - typing into the search box, then paging
//! - backend outage and recovery
//! - interleaved user actions while queries are in flight

use sigdash_view::{
    CoordinatorConfig, MockEndpoint, MockSignalSource, NoticeBoard, NoticeLevel, QueryOutcome,
    SignalQueryCoordinator,
};
use std::sync::Arc;
use std::time::Duration;

fn setup(count: usize) -> (SignalQueryCoordinator, Arc<MockSignalSource>, NoticeBoard) {
    let source = Arc::new(MockSignalSource::with_sample_signals(count));
    let notices = NoticeBoard::new();
    let coordinator =
        SignalQueryCoordinator::new(source.clone(), CoordinatorConfig::default(), notices.clone());
    (coordinator, source, notices)
}

#[tokio::test(start_paused = true)]
async fn test_typing_then_paging() {
    let (coordinator, source, _) = setup(80);
    coordinator.apply_filter().await.unwrap();
    coordinator.change_page(4).await.unwrap().unwrap();
    assert_eq!(coordinator.visible_pages(), 2..=6);

    for typed in ["b", "bt", "btc"] {
        coordinator.set_field("search", typed);
        tokio::time::sleep(Duration::from_millis(120)).await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let calls = source.page_calls();
    let last = calls.last().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(last.criteria.search, "btc");
    assert_eq!(last.page, 1);

    // 20 BTCUSDT signals at 10 per page.
    let state = coordinator.state();
    assert_eq!(state.page.total_pages(), 2);
    assert_eq!(state.page.current_page(), 1);
    assert!(state.page.items().iter().all(|s| s.symbol == "BTCUSDT"));

    coordinator.next_page().await.unwrap().unwrap();
    assert_eq!(coordinator.current_page(), 2);
    assert!(coordinator.next_page().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_outage_and_recovery() {
    let (coordinator, source, notices) = setup(30);
    let mut rx = notices.subscribe();

    source.set_failing(MockEndpoint::Page, true);
    assert!(coordinator.apply_filter().await.is_err());
    assert!(!coordinator.is_loading());
    assert!(coordinator.state().page.is_empty());
    assert_eq!(rx.recv().await.unwrap().level, NoticeLevel::Error);

    // Nothing to page through while the list is empty.
    assert!(coordinator.next_page().await.is_none());

    source.set_failing(MockEndpoint::Page, false);
    let outcome = coordinator.refresh().await.unwrap();
    assert!(matches!(outcome, QueryOutcome::Applied(_)));
    assert_eq!(coordinator.state().page.total_pages(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_page_change_during_slow_query_wins() {
    let (coordinator, source, _) = setup(50);
    coordinator.apply_filter().await.unwrap();

    source.push_page_delay(Duration::from_secs(3));
    let slow_refresh = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(coordinator.is_loading());

    coordinator.change_page(5).await.unwrap().unwrap();
    assert_eq!(coordinator.current_page(), 5);

    assert_eq!(slow_refresh.await.unwrap().unwrap(), QueryOutcome::Superseded);
    assert_eq!(coordinator.current_page(), 5);
    assert!(!coordinator.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_debounced_query_notifies_settlement() {
    let (coordinator, _, _) = setup(20);
    let mut settled = coordinator.subscribe_settled();

    coordinator.set_field("search", "eth");
    assert!(!settled.has_changed().unwrap());

    tokio::time::timeout(Duration::from_secs(2), settled.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(coordinator
        .state()
        .page
        .items()
        .iter()
        .all(|s| s.symbol == "ETHUSDT"));
}
