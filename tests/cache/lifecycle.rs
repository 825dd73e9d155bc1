// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup, initialization, and shutdown specs

use crate::prelude::*;
use std::collections::HashMap;

const FRESH_TREE: &str = r#"
[a]
value = "1"

[a.children.b]
value = "2"
"#;

/// A fresh subtree yields one NodeAdded per pre-existing node, then a
/// single Initialized once the snapshot quiesces.
#[tokio::test]
async fn fresh_subtree_emits_adds_then_initialized() {
    let cluster = cluster_with(FRESH_TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();

    let before = log.collect_until(CacheEventType::Initialized).await;
    assert!(
        before.iter().all(|event| event.event_type == CacheEventType::NodeAdded),
        "only NodeAdded may precede Initialized: {before:?}"
    );
    assert_eq!(paths_of(&before, CacheEventType::NodeAdded), ["/", "/a", "/a/b"]);

    let by_path: HashMap<&str, &CacheEvent> =
        before.iter().filter_map(|event| event.path().map(|path| (path, event))).collect();
    assert_eq!(by_path["/a"].data.as_ref().unwrap().data(), Some(&b"1"[..]));
    assert_eq!(by_path["/a/b"].data.as_ref().unwrap().data(), Some(&b"2"[..]));

    // Later additions never re-fire Initialized.
    cluster.create("/c", "3").unwrap();
    log.expect(CacheEventType::NodeAdded, "/c").await;
    log.assert_silent().await;
}

/// Initialization fires exactly once even when the mirrored root is absent.
#[tokio::test]
async fn empty_root_still_initializes() {
    let cluster = MemoryCluster::new();
    let cache = TreeCache::new(cluster.clone(), "/r");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();

    let before = log.collect_until(CacheEventType::Initialized).await;
    assert!(before.is_empty(), "no events expected before Initialized: {before:?}");
    log.assert_silent().await;
}

/// Stop tears the tree down and reports one removal per live node.
#[tokio::test]
async fn stop_cascade_removes_every_live_node() {
    let cluster = cluster_with(FRESH_TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;

    cache.stop();

    let removed = log.take(3).await;
    assert_eq!(paths_of(&removed, CacheEventType::NodeRemoved), ["/", "/a", "/a/b"]);
    let by_path: HashMap<&str, &CacheEvent> =
        removed.iter().filter_map(|event| event.path().map(|path| (path, event))).collect();
    // Removals carry the last-known data.
    assert_eq!(by_path["/a"].data.as_ref().unwrap().data(), Some(&b"1"[..]));
    assert_eq!(by_path["/a/b"].data.as_ref().unwrap().data(), Some(&b"2"[..]));
    log.assert_silent().await;

    assert_eq!(cache.current_data("/a"), Err(CacheError::NodeNotLive));
}

/// Remote changes after stop produce no events.
#[tokio::test]
async fn events_after_stop_are_suppressed() {
    let cluster = cluster_with(FRESH_TREE);
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;

    cache.stop();
    log.take(3).await;

    cluster.create("/late", "x").unwrap();
    cluster.set_data("/a", "changed").unwrap();
    log.assert_silent().await;
}

/// Deleting and recreating the mirrored root re-arms the existence watch.
#[tokio::test]
async fn root_delete_and_recreate_round_trips() {
    let cluster = MemoryCluster::new();
    let cache = TreeCache::new(cluster.clone(), "/r");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();

    assert!(log.collect_until(CacheEventType::Initialized).await.is_empty());

    cluster.create("/r", "x").unwrap();
    let added = log.expect(CacheEventType::NodeAdded, "/r").await;
    assert_eq!(added.data.as_ref().unwrap().data(), Some(&b"x"[..]));
    log.assert_silent().await;

    cluster.delete("/r").unwrap();
    let removed = log.expect(CacheEventType::NodeRemoved, "/r").await;
    assert_eq!(removed.data.as_ref().unwrap().data(), Some(&b"x"[..]));
    log.assert_silent().await;

    cluster.create("/r", "y").unwrap();
    let added = log.expect(CacheEventType::NodeAdded, "/r").await;
    assert_eq!(added.data.as_ref().unwrap().data(), Some(&b"y"[..]));
    log.assert_silent().await;
}
