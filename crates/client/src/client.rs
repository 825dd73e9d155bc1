// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Coordinator` trait: what the tree cache needs from a cluster

use crate::error::ClientError;
use crate::event::WatchedEvent;
use crate::stat::Stat;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;

/// Channel carrying the single event of a one-shot watch.
///
/// The sender side is dropped without firing when the fetch that would have
/// registered the watch failed, so receivers must treat a closed channel as
/// "no event will come".
pub type EventWatch = oneshot::Receiver<WatchedEvent>;

/// Result of a one-shot child-list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenReply {
    pub path: String,
    /// Child segment names, unordered.
    pub children: Vec<String>,
    pub stat: Stat,
}

/// Result of a one-shot data fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReply {
    pub path: String,
    pub data: Vec<u8>,
    pub stat: Stat,
}

/// Result of a one-shot existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistReply {
    pub path: String,
    pub exists: bool,
    pub stat: Option<Stat>,
}

/// Client operations the tree cache requires from a coordination service.
///
/// Each `*_w` call performs one fetch and registers a one-shot watch in the
/// same round trip. The reply is the return value; the watch fires at most
/// once on the returned channel and is never renewed by the client. After
/// consuming an event, interested callers must issue a fresh `*_w` call.
#[async_trait]
pub trait Coordinator: Send + Sync + 'static {
    /// Whether the session is currently live.
    fn is_connected(&self) -> bool;

    /// Blocks until the session is live or the timeout elapses; returns
    /// whether the session is live.
    async fn block_until_connected(&self, timeout: Duration) -> bool;

    /// Creates `path` and any missing ancestors with empty data.
    ///
    /// Returns [`ClientError::NodeExists`] when `path` itself already
    /// exists; missing-ancestor creation never reports it.
    async fn create_with_parents(&self, path: &str) -> Result<(), ClientError>;

    /// Lists the children of `path` and watches it for child-list changes
    /// and deletion.
    async fn get_children_w(&self, path: &str)
        -> (Result<ChildrenReply, ClientError>, EventWatch);

    /// Reads the data of `path` and watches it for data changes and
    /// deletion.
    async fn get_data_w(&self, path: &str) -> (Result<DataReply, ClientError>, EventWatch);

    /// Probes the existence of `path` and watches it. Unlike the other
    /// fetches, the watch is armed even when the node is currently absent,
    /// and fires on its creation.
    async fn exists_w(&self, path: &str) -> (Result<ExistReply, ClientError>, EventWatch);
}
