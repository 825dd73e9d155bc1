// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache controller: lifecycle, queries, accounting, and event dispatch

use crate::child_data::ChildData;
use crate::error::CacheError;
use crate::event::{CacheEvent, CacheEventType};
use crate::listeners::{CacheListener, ErrorListener, Listeners};
use crate::node::{DeleteOrigin, Node};
use crate::selector::{AcceptAll, Selector};
use crate::state::{AtomicCacheState, CacheState, NodeState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zc_client::{ClientError, ConnectionState, Coordinator};

/// State shared between the controller, every node, and background tasks.
pub(crate) struct Shared<C> {
    pub(crate) client: C,
    pub(crate) selector: Arc<dyn Selector>,
    pub(crate) max_depth: usize,
    pub(crate) cache_data: bool,
    /// Closed at stop; watch waiters exit on it.
    pub(crate) closing: CancellationToken,
    state: AtomicCacheState,
    /// Background requests in flight. The first time this drains to zero
    /// the initialization latch trips and `Initialized` is published.
    outstanding_ops: AtomicU64,
    initialized: AtomicBool,
    event_listeners: Listeners<CacheEvent>,
    error_listeners: Listeners<CacheError>,
    event_tx: mpsc::UnboundedSender<CacheEvent>,
}

impl<C> Shared<C> {
    pub(crate) fn cache_state(&self) -> CacheState {
        self.state.value()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.state.value() == CacheState::Stopped
    }

    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(task);
    }

    /// Publishes unless the cache has stopped.
    pub(crate) fn publish_event(&self, event_type: CacheEventType, data: Option<ChildData>) {
        if !self.is_stopped() {
            self.publish_unchecked(event_type, data);
        }
    }

    /// Queues an event for in-order delivery to every event listener,
    /// regardless of cache state. Everything but the stop cascade goes
    /// through [`Shared::publish_event`].
    pub(crate) fn publish_unchecked(&self, event_type: CacheEventType, data: Option<ChildData>) {
        let event = CacheEvent::new(event_type, data);
        tracing::debug!(%event, "publish");
        let _ = self.event_tx.send(event);
    }

    /// Routes a background error to the error listeners, or logs and drops
    /// it when nobody is registered.
    pub(crate) fn handle_background_error(&self, error: CacheError) {
        if self.error_listeners.count() == 0 {
            tracing::warn!(%error, "background error dropped: no error listeners");
            return;
        }
        let listeners = self.error_listeners.clone();
        self.spawn(async move { listeners.broadcast(error).await });
    }

    pub(crate) fn inc_outstanding_ops_by(&self, n: u64) {
        self.outstanding_ops.fetch_add(n, Ordering::SeqCst);
    }

    /// Retires one background op. The latch is tested inside the
    /// decrement-to-zero observation so two racing decrementers cannot both
    /// publish `Initialized`.
    pub(crate) fn complete_outstanding_ops(&self) {
        if self.outstanding_ops.fetch_sub(1, Ordering::SeqCst) == 1
            && !self.initialized.swap(true, Ordering::SeqCst)
        {
            self.publish_event(CacheEventType::Initialized, None);
        }
    }

    fn reset_initialized(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }
}

/// Configures a [`TreeCache`] before it starts. All settings are frozen at
/// [`TreeCacheBuilder::build`].
pub struct TreeCacheBuilder<C> {
    client: C,
    root_path: String,
    selector: Arc<dyn Selector>,
    max_depth: usize,
    cache_data: bool,
    create_parent: bool,
}

impl<C: Coordinator> TreeCacheBuilder<C> {
    fn new(client: C, root_path: String) -> Self {
        Self {
            client,
            root_path,
            selector: Arc::new(AcceptAll),
            max_depth: usize::MAX,
            cache_data: true,
            create_parent: false,
        }
    }

    /// Sets whether payloads are retained for queries, default true.
    ///
    /// When false, events still carry node data but `current_data` and
    /// `current_children` return entries without it.
    pub fn cache_data(mut self, yes: bool) -> Self {
        self.cache_data = yes;
        self
    }

    /// Limits exploration depth: children are enumerated only for nodes at
    /// depth at most `depth` (the root is depth 0), so the deepest mirrored
    /// node sits at `depth + 1`. Unlimited by default.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Creates the root path and any missing ancestors at start. Off by
    /// default.
    pub fn create_parent_nodes(mut self, yes: bool) -> Self {
        self.create_parent = yes;
        self
    }

    /// Replaces the default accept-everything [`Selector`].
    pub fn selector(mut self, selector: impl Selector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    pub fn build(self) -> TreeCache<C> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            client: self.client,
            selector: self.selector,
            max_depth: self.max_depth,
            cache_data: self.cache_data,
            closing: CancellationToken::new(),
            state: AtomicCacheState::new(CacheState::Latent),
            outstanding_ops: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            event_listeners: Listeners::new(),
            error_listeners: Listeners::new(),
            event_tx,
        });
        let root = Node::new(Arc::clone(&shared), self.root_path, Weak::new(), 0);
        TreeCache {
            shared,
            root,
            create_parent: self.create_parent,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }
}

/// A live local mirror of a coordination-service subtree.
///
/// The cache watches the configured root path, reacts to create, update,
/// and delete events, pulls data down, and keeps the most recent view
/// queryable through [`TreeCache::current_data`] and
/// [`TreeCache::current_children`]. Registered listeners observe the
/// changes as [`CacheEvent`]s.
pub struct TreeCache<C: Coordinator> {
    shared: Arc<Shared<C>>,
    root: Arc<Node<C>>,
    create_parent: bool,
    /// Taken by the dispatcher task at start.
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<CacheEvent>>>,
}

impl<C: Coordinator> TreeCache<C> {
    /// Creates a cache rooted at `root_path` with default options.
    pub fn new(client: C, root_path: impl Into<String>) -> Self {
        Self::builder(client, root_path).build()
    }

    /// Starts configuring a cache rooted at `root_path`.
    pub fn builder(client: C, root_path: impl Into<String>) -> TreeCacheBuilder<C> {
        TreeCacheBuilder::new(client, root_path.into())
    }

    /// Path this cache mirrors.
    pub fn root_path(&self) -> &str {
        self.root.path()
    }

    /// Current lifecycle state.
    pub fn cache_state(&self) -> CacheState {
        self.shared.cache_state()
    }

    /// Starts mirroring. The cache is not started automatically.
    pub async fn start(&self) -> Result<(), CacheError> {
        if !self.shared.state.compare_exchange(CacheState::Latent, CacheState::Started) {
            return Err(CacheError::AlreadyStarted);
        }
        if self.create_parent {
            match self.shared.client.create_with_parents(self.root.path()).await {
                Ok(()) | Err(ClientError::NodeExists) => {}
                Err(err) => return Err(CacheError::CreateParents(err)),
            }
        }
        if !self.shared.client.is_connected() {
            return Err(CacheError::NotConnected);
        }
        self.spawn_dispatcher();
        self.root.was_created();
        Ok(())
    }

    /// Delivers queued events to listeners in publication order, one
    /// broadcast barrier at a time, so an event cannot overtake an earlier
    /// one for the same node.
    fn spawn_dispatcher(&self) {
        if let Some(mut event_rx) = self.event_rx.lock().take() {
            let listeners = self.shared.event_listeners.clone();
            self.shared.spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    listeners.broadcast(event).await;
                }
            });
        }
    }

    /// Stops mirroring: cancels watch waiters and tears the tree down,
    /// emitting one `NodeRemoved` per node that was live. Idempotent.
    pub fn stop(&self) {
        if self.shared.state.compare_exchange(CacheState::Started, CacheState::Stopped) {
            self.shared.closing.cancel();
            self.root.was_deleted(DeleteOrigin::Shutdown);
        }
    }

    /// The most recent view of the node at `full_path`.
    ///
    /// No accuracy guarantee: the remote may have moved on. Fails with
    /// [`CacheError::NodeNotFound`] when the path is not mirrored and
    /// [`CacheError::NodeNotLive`] when it is mirrored but not live.
    pub fn current_data(&self, full_path: &str) -> Result<ChildData, CacheError> {
        let node = self.find_node(full_path)?;
        if node.state() != NodeState::Live {
            return Err(CacheError::NodeNotLive);
        }
        node.child_data().ok_or(CacheError::NodeNotLive)
    }

    /// The most recent set of children at `full_path`, by child name.
    ///
    /// Only live children with data are included. No accuracy guarantee.
    pub fn current_children(
        &self,
        full_path: &str,
    ) -> Result<HashMap<String, ChildData>, CacheError> {
        let node = self.find_node(full_path)?;
        if node.state() != NodeState::Live {
            return Err(CacheError::NodeNotLive);
        }

        let children = node.children_snapshot();
        let mut map = HashMap::with_capacity(children.len());
        for (name, child) in children {
            // Capture data before re-reading liveness so a racing removal
            // cannot slip a half-torn entry in.
            let data = child.child_data();
            if let Some(data) = data {
                if child.state() == NodeState::Live {
                    map.insert(name.to_string(), data);
                }
            }
        }

        // The parent may have died while we iterated.
        if node.state() != NodeState::Live {
            return Err(CacheError::NodeNotLive);
        }
        Ok(map)
    }

    /// Registers a cache-event listener.
    pub fn add_event_listener(&self, listener: &CacheListener) {
        self.shared.event_listeners.add(listener);
    }

    /// Unregisters the first occurrence of `listener`.
    pub fn del_event_listener(&self, listener: &CacheListener) {
        self.shared.event_listeners.del(listener);
    }

    /// Registers a background-error listener.
    pub fn add_error_listener(&self, listener: &ErrorListener) {
        self.shared.error_listeners.add(listener);
    }

    /// Unregisters the first occurrence of `listener`.
    pub fn del_error_listener(&self, listener: &ErrorListener) {
        self.shared.error_listeners.del(listener);
    }

    /// Feeds a session-state transition into the cache.
    ///
    /// The [`Coordinator`] boundary does not report these itself; embedders
    /// that track session health forward transitions here. `Reconnected`
    /// re-arms every watch in the tree.
    pub fn handle_connection_change(&self, state: ConnectionState) {
        if self.shared.is_stopped() {
            return;
        }
        match state {
            ConnectionState::Suspended => {
                self.shared.publish_event(CacheEventType::ConnSuspended, None);
            }
            ConnectionState::Lost => {
                self.shared.reset_initialized();
                self.shared.publish_event(CacheEventType::ConnLost, None);
            }
            ConnectionState::Connected => self.root.was_created(),
            ConnectionState::Reconnected => {
                self.root.was_reconnected();
                self.shared.publish_event(CacheEventType::ConnReconnected, None);
            }
        }
    }

    /// Resolves `full_path` to a mirrored node.
    fn find_node(&self, full_path: &str) -> Result<Arc<Node<C>>, CacheError> {
        let rest = full_path.strip_prefix(self.root.path()).ok_or(CacheError::RootNotMatch)?;
        let mut current = Arc::clone(&self.root);
        for part in rest.split('/').filter(|part| !part.is_empty()) {
            let next = current.find_child(part).ok_or(CacheError::NodeNotFound)?;
            current = next;
        }
        Ok(current)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
