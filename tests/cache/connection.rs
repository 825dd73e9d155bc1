// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-transition and background-error specs

use crate::prelude::*;
use tokio::sync::mpsc;
use tokio::time::timeout;
use zc_client::ClientError;

const TREE: &str = r#"
[a]
value = "1"
"#;

#[tokio::test]
async fn suspension_is_reported_to_listeners() {
    let cluster = cluster_with(TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;

    cache.handle_connection_change(ConnectionState::Suspended);
    let event = log.next().await;
    assert_eq!(event.event_type, CacheEventType::ConnSuspended);
    log.assert_silent().await;
}

/// Losing the session re-opens the initialization latch; the reconnect
/// refresh closes it again once the re-read snapshot quiesces.
#[tokio::test]
async fn reconnect_rearms_watches_and_reinitializes() {
    let cluster = cluster_with(TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;

    cache.handle_connection_change(ConnectionState::Lost);
    let event = log.next().await;
    assert_eq!(event.event_type, CacheEventType::ConnLost);

    cache.handle_connection_change(ConnectionState::Reconnected);
    let event = log.next().await;
    assert_eq!(event.event_type, CacheEventType::ConnReconnected);
    // Unchanged data produces no adds or updates, only a fresh Initialized.
    let event = log.next().await;
    assert_eq!(event.event_type, CacheEventType::Initialized);
    log.assert_silent().await;

    // The re-armed watches observe subsequent changes.
    cluster.set_data("/a", "1b").unwrap();
    let updated = log.expect(CacheEventType::NodeUpdated, "/a").await;
    assert_eq!(updated.data.as_ref().unwrap().data(), Some(&b"1b"[..]));
}

#[tokio::test]
async fn transitions_after_stop_are_ignored() {
    let cluster = cluster_with(TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;

    cache.stop();
    log.take(2).await;

    cache.handle_connection_change(ConnectionState::Suspended);
    cache.handle_connection_change(ConnectionState::Reconnected);
    log.assert_silent().await;
}

/// Coordination errors other than NoNode fan out to error listeners.
#[tokio::test]
async fn background_errors_reach_error_listeners() {
    let cluster = cluster_with(TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);

    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    let error_listener = ErrorListener::new(move |error| {
        let _ = err_tx.send(error);
    });
    cache.add_error_listener(&error_listener);

    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;

    // Drop the session, then trip a watch so the refresh fails.
    cluster.disconnect();
    cluster.set_data("/a", "1b").unwrap();

    let error = timeout(EVENT_WAIT, err_rx.recv())
        .await
        .expect("timed out waiting for a background error")
        .expect("error channel closed");
    assert_eq!(error, CacheError::Client(ClientError::ConnectionLoss));

    // The cache is still running and returns its last view.
    assert_eq!(cache.current_data("/a").unwrap().data(), Some(&b"1"[..]));
}
