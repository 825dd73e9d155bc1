// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-path node automaton and its watch tasks.
//!
//! Each mirrored path is one [`Node`]: a state word (Pending → Live → Dead),
//! the cached [`ChildData`], and a map of child nodes, all driven by the
//! results and one-shot watch events of background fetches. Handlers run
//! synchronously; every fetch runs on its own task which delivers the
//! result, then waits for the watch to fire or the cache to stop.

use crate::cache::Shared;
use crate::child_data::ChildData;
use crate::error::CacheError;
use crate::event::CacheEventType;
use crate::state::{AtomicNodeState, NodeState};
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use zc_client::{
    paths, ChildrenReply, ClientError, Coordinator, DataReply, EventWatch, ExistReply,
    WatchEventType, WatchedEvent,
};

/// Why a node is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteOrigin {
    /// The coordination service reported the path gone.
    Observed,
    /// The cache is stopping and discarding its tree.
    Shutdown,
}

struct Inner<C> {
    child_data: Option<ChildData>,
    children: HashMap<SmolStr, Arc<Node<C>>>,
}

/// One mirrored path.
pub(crate) struct Node<C> {
    me: Weak<Node<C>>,
    shared: Arc<Shared<C>>,
    /// Non-owning backlink; dead for the root.
    parent: Weak<Node<C>>,
    path: String,
    depth: usize,
    state: AtomicNodeState,
    /// Guards `child_data` and `children` only; never held across a fetch
    /// or a recursive teardown. The state word lives outside it.
    inner: RwLock<Inner<C>>,
}

impl<C: Coordinator> Node<C> {
    pub(crate) fn new(
        shared: Arc<Shared<C>>,
        path: String,
        parent: Weak<Node<C>>,
        depth: usize,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            shared,
            parent,
            path,
            depth,
            state: AtomicNodeState::new(NodeState::Pending),
            inner: RwLock::new(Inner { child_data: None, children: HashMap::new() }),
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn state(&self) -> NodeState {
        self.state.value()
    }

    fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub(crate) fn child_data(&self) -> Option<ChildData> {
        self.inner.read().child_data.clone()
    }

    fn swap_child_data(&self, new: Option<ChildData>) -> Option<ChildData> {
        std::mem::replace(&mut self.inner.write().child_data, new)
    }

    pub(crate) fn find_child(&self, name: &str) -> Option<Arc<Node<C>>> {
        self.inner.read().children.get(name).cloned()
    }

    /// Snapshot of the child map, for iteration outside the lock.
    pub(crate) fn children_snapshot(&self) -> Vec<(SmolStr, Arc<Node<C>>)> {
        self.inner
            .read()
            .children
            .iter()
            .map(|(name, child)| (name.clone(), Arc::clone(child)))
            .collect()
    }

    fn remove_child(&self, name: &str) {
        self.inner.write().children.remove(name);
    }

    /// The path was observed present; fetch its state and arm watches.
    pub(crate) fn was_created(&self) {
        self.refresh();
    }

    /// Re-arms every watch in this subtree after a session reconnect.
    pub(crate) fn was_reconnected(&self) {
        self.refresh();
        for (_, child) in self.children_snapshot() {
            child.was_reconnected();
        }
    }

    /// Tears this subtree down after a deletion observation, or wholesale
    /// when the cache stops.
    pub(crate) fn was_deleted(&self, origin: DeleteOrigin) {
        let old_child_data = self.swap_child_data(None);
        for (_, child) in self.children_snapshot() {
            child.was_deleted(origin);
        }

        if origin == DeleteOrigin::Observed && self.shared.is_stopped() {
            return;
        }

        let old_state = self.state.swap(NodeState::Dead);
        if old_state == NodeState::Live {
            match origin {
                DeleteOrigin::Observed => {
                    self.shared.publish_event(CacheEventType::NodeRemoved, old_child_data);
                }
                // The stop cascade publishes past the stopped gate so every
                // node that was live yields its removal event.
                DeleteOrigin::Shutdown => {
                    self.shared.publish_unchecked(CacheEventType::NodeRemoved, old_child_data);
                }
            }
        }

        if origin == DeleteOrigin::Shutdown {
            return;
        }

        if self.is_root() {
            // The root is never detached; watch for it coming back.
            self.shared.inc_outstanding_ops_by(1);
            self.spawn_exist_fetch();
        } else if let Some(parent) = self.parent.upgrade() {
            parent.remove_child(paths::base(&self.path));
        }
    }

    /// Whether this node enumerates its children at all.
    fn traverses_children(&self) -> bool {
        self.depth <= self.shared.max_depth
            && self.shared.selector.traverse_children(&self.path)
    }

    fn refresh(&self) {
        if self.traverses_children() {
            self.shared.inc_outstanding_ops_by(2);
            self.spawn_data_fetch();
            self.spawn_children_fetch();
        } else {
            self.refresh_data();
        }
    }

    fn refresh_children(&self) {
        if self.traverses_children() {
            self.shared.inc_outstanding_ops_by(1);
            self.spawn_children_fetch();
        }
    }

    fn refresh_data(&self) {
        self.shared.inc_outstanding_ops_by(1);
        self.spawn_data_fetch();
    }

    fn spawn_children_fetch(&self) {
        let Some(node) = self.me.upgrade() else { return };
        self.shared.spawn(async move {
            let (result, watch) = node.shared.client.get_children_w(&node.path).await;
            node.process_children_result(result);
            node.await_watch(watch).await;
        });
    }

    fn spawn_data_fetch(&self) {
        let Some(node) = self.me.upgrade() else { return };
        self.shared.spawn(async move {
            let (result, watch) = node.shared.client.get_data_w(&node.path).await;
            node.process_data_result(result);
            node.await_watch(watch).await;
        });
    }

    fn spawn_exist_fetch(&self) {
        let Some(node) = self.me.upgrade() else { return };
        self.shared.spawn(async move {
            let (result, watch) = node.shared.client.exists_w(&node.path).await;
            node.process_exist_result(result);
            node.await_watch(watch).await;
        });
    }

    /// Waits for the one-shot watch to fire, or for the cache to stop.
    /// Once the cache is stopping, the event handler is never invoked even
    /// if the watch already fired.
    async fn await_watch(&self, watch: EventWatch) {
        tokio::select! {
            biased;
            _ = self.shared.closing.cancelled() => {}
            event = watch => {
                if let Ok(event) = event {
                    self.process_watch_event(event);
                }
            }
        }
    }

    /// Reacts to the single event of a one-shot watch.
    fn process_watch_event(&self, event: WatchedEvent) {
        tracing::debug!(path = %self.path, event_type = ?event.event_type, "watch event");
        match event.event_type {
            WatchEventType::NodeCreated => {
                if !self.is_root() {
                    self.shared.handle_background_error(CacheError::NonRootCreated {
                        path: self.path.clone(),
                    });
                    return;
                }
                self.was_created();
            }
            WatchEventType::NodeChildrenChanged => self.refresh_children(),
            WatchEventType::NodeDataChanged => self.refresh_data(),
            WatchEventType::NodeDeleted => self.was_deleted(DeleteOrigin::Observed),
            // Other event kinds carry no tree change.
            WatchEventType::Session => {}
        }
    }

    fn process_children_result(&self, result: Result<ChildrenReply, ClientError>) {
        match result {
            Err(ClientError::NoNode) => self.was_deleted(DeleteOrigin::Observed),
            Err(err) => self.shared.handle_background_error(err.into()),
            Ok(reply) => {
                {
                    let mut inner = self.inner.write();
                    if let Some(data) = inner.child_data.as_mut() {
                        // Refresh ancillary metadata only while the
                        // modification id is unchanged, so a pending data
                        // update is not obscured.
                        if data.stat().mzxid == reply.stat.mzxid {
                            data.set_stat(reply.stat);
                        }
                    }
                }

                // Sorted insertion keeps event order deterministic.
                let mut names = reply.children;
                names.sort_unstable();
                for name in names {
                    let full_path = paths::join(&self.path, &name);
                    if !self.shared.selector.accept_child_data(&full_path) {
                        continue;
                    }
                    let created = {
                        let mut inner = self.inner.write();
                        if inner.children.contains_key(name.as_str()) {
                            None
                        } else {
                            let child = Node::new(
                                Arc::clone(&self.shared),
                                full_path,
                                self.me.clone(),
                                self.depth + 1,
                            );
                            inner.children.insert(SmolStr::new(&name), Arc::clone(&child));
                            Some(child)
                        }
                    };
                    // Fetch outside the lock; creation recurses into the
                    // new subtree.
                    if let Some(child) = created {
                        child.was_created();
                    }
                }
            }
        }
        self.shared.complete_outstanding_ops();
    }

    fn process_data_result(&self, result: Result<DataReply, ClientError>) {
        match result {
            Err(ClientError::NoNode) => self.was_deleted(DeleteOrigin::Observed),
            Err(err) => self.shared.handle_background_error(err.into()),
            Ok(reply) => {
                let event_data = ChildData::new(reply.path, reply.stat, Some(reply.data));
                let stored = if self.shared.cache_data {
                    event_data.clone()
                } else {
                    event_data.without_data()
                };
                let old = self.swap_child_data(Some(stored));

                let added = if self.is_root() {
                    self.state.swap(NodeState::Live) != NodeState::Live
                } else {
                    let became_live =
                        self.state.compare_exchange(NodeState::Pending, NodeState::Live);
                    if !became_live && self.state.value() != NodeState::Live {
                        // Delayed reply for a node that already died; a
                        // dead node must not re-enter the tree.
                        self.shared.complete_outstanding_ops();
                        return;
                    }
                    became_live
                };

                if added {
                    self.shared.publish_event(CacheEventType::NodeAdded, Some(event_data));
                } else if old.as_ref().map(|data| data.stat().mzxid)
                    != Some(event_data.stat().mzxid)
                {
                    self.shared.publish_event(CacheEventType::NodeUpdated, Some(event_data));
                }
            }
        }
        self.shared.complete_outstanding_ops();
    }

    fn process_exist_result(&self, result: Result<ExistReply, ClientError>) {
        if !self.is_root() {
            self.shared
                .handle_background_error(CacheError::NonRootExists { path: self.path.clone() });
        }
        match result {
            Ok(reply) if reply.exists => {
                self.state.compare_exchange(NodeState::Dead, NodeState::Pending);
                self.was_created();
            }
            // Still absent; the creation watch stays armed.
            Ok(_) => {}
            Err(ClientError::NoNode) => {}
            Err(err) => self.shared.handle_background_error(err.into()),
        }
        self.shared.complete_outstanding_ops();
    }
}
