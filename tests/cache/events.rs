// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-event specs: updates, deletions, and the event grammar

use crate::prelude::*;

const FRESH_TREE: &str = r#"
[a]
value = "1"

[a.children.b]
value = "2"
"#;

async fn started(cluster: &MemoryCluster) -> (TreeCache<MemoryCluster>, EventLog) {
    let cache = TreeCache::new(cluster.clone(), "/");
    let mut log = EventLog::attach(&cache);
    cache.start().await.unwrap();
    log.collect_until(CacheEventType::Initialized).await;
    (cache, log)
}

/// A write produces exactly one NodeUpdated carrying the new data.
#[tokio::test]
async fn update_emits_a_single_node_updated() {
    let cluster = cluster_with(FRESH_TREE);
    let (_cache, mut log) = started(&cluster).await;

    cluster.set_data("/a", "1b").unwrap();
    let updated = log.expect(CacheEventType::NodeUpdated, "/a").await;
    assert_eq!(updated.data.as_ref().unwrap().data(), Some(&b"1b"[..]));
    // No duplicates, no second Initialized.
    log.assert_silent().await;
}

/// Consecutive writes each produce their own update, in order.
#[tokio::test]
async fn updates_arrive_in_write_order() {
    let cluster = cluster_with(FRESH_TREE);
    let (_cache, mut log) = started(&cluster).await;

    cluster.set_data("/a", "v1").unwrap();
    let first = log.expect(CacheEventType::NodeUpdated, "/a").await;
    assert_eq!(first.data.as_ref().unwrap().data(), Some(&b"v1"[..]));

    cluster.set_data("/a", "v2").unwrap();
    let second = log.expect(CacheEventType::NodeUpdated, "/a").await;
    assert_eq!(second.data.as_ref().unwrap().data(), Some(&b"v2"[..]));
    log.assert_silent().await;
}

/// Recursively deleting a subtree removes every node in it, with the
/// last-known data attached.
#[tokio::test]
async fn deep_delete_removes_the_subtree() {
    let cluster = cluster_with(FRESH_TREE);
    let (cache, mut log) = started(&cluster).await;

    cluster.delete_recursive("/a").unwrap();

    let removed = log.take(2).await;
    assert_eq!(paths_of(&removed, CacheEventType::NodeRemoved), ["/a", "/a/b"]);
    for event in &removed {
        let data = event.data.as_ref().unwrap();
        let expected: &[u8] = if data.path() == "/a" { b"1" } else { b"2" };
        assert_eq!(data.data(), Some(expected));
    }
    log.assert_silent().await;

    // The subtree is gone from the local view as well.
    assert_eq!(cache.current_data("/a"), Err(CacheError::NodeNotFound));
    assert_eq!(cache.current_data("/a/b"), Err(CacheError::NodeNotFound));
    assert!(cache.current_children("/").unwrap().is_empty());
}

/// Per-path event grammar: added, updated zero or more times, removed,
/// with a fresh node identity per reappearance.
#[tokio::test]
async fn interior_node_lifecycles_never_resurrect() {
    let cluster = MemoryCluster::new();
    let (_cache, mut log) = started(&cluster).await;

    for round in 0..3u8 {
        cluster.create("/a", vec![round]).unwrap();
        let added = log.expect(CacheEventType::NodeAdded, "/a").await;
        assert_eq!(added.data.as_ref().unwrap().data(), Some(&[round][..]));

        cluster.set_data("/a", vec![round, round]).unwrap();
        log.expect(CacheEventType::NodeUpdated, "/a").await;

        cluster.delete("/a").unwrap();
        let removed = log.expect(CacheEventType::NodeRemoved, "/a").await;
        assert_eq!(removed.data.as_ref().unwrap().data(), Some(&[round, round][..]));
    }
    log.assert_silent().await;
}
