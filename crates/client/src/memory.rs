// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory coordination cluster for tests.
//!
//! A process-local znode tree with the same observable semantics the cache
//! relies on: a cluster-wide zxid counter, per-node stats, and one-shot
//! data/children/existence watches. Mutation methods play the role of the
//! remote cluster; the [`Coordinator`] impl plays the role of a connected
//! client session.

use crate::client::{ChildrenReply, Coordinator, DataReply, EventWatch, ExistReply};
use crate::error::ClientError;
use crate::event::{WatchEventType, WatchedEvent};
use crate::paths;
use crate::stat::Stat;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug)]
struct Znode {
    data: Vec<u8>,
    stat: Stat,
    children: BTreeSet<String>,
}

#[derive(Default)]
struct Watches {
    data: Vec<oneshot::Sender<WatchedEvent>>,
    children: Vec<oneshot::Sender<WatchedEvent>>,
    exists: Vec<oneshot::Sender<WatchedEvent>>,
}

struct Store {
    nodes: HashMap<String, Znode>,
    watches: HashMap<String, Watches>,
    next_zxid: i64,
    connected: bool,
}

impl Store {
    fn bump_zxid(&mut self) -> i64 {
        let zxid = self.next_zxid;
        self.next_zxid += 1;
        zxid
    }

    fn arm_data(&mut self, path: &str) -> EventWatch {
        let (tx, rx) = oneshot::channel();
        self.watches.entry(path.to_string()).or_default().data.push(tx);
        rx
    }

    fn arm_children(&mut self, path: &str) -> EventWatch {
        let (tx, rx) = oneshot::channel();
        self.watches.entry(path.to_string()).or_default().children.push(tx);
        rx
    }

    fn arm_exists(&mut self, path: &str) -> EventWatch {
        let (tx, rx) = oneshot::channel();
        self.watches.entry(path.to_string()).or_default().exists.push(tx);
        rx
    }

    fn fire_data(&mut self, path: &str, event_type: WatchEventType) {
        if let Some(watches) = self.watches.get_mut(path) {
            fire(std::mem::take(&mut watches.data), path, event_type);
        }
    }

    fn fire_children(&mut self, path: &str, event_type: WatchEventType) {
        if let Some(watches) = self.watches.get_mut(path) {
            fire(std::mem::take(&mut watches.children), path, event_type);
        }
    }

    fn fire_exists(&mut self, path: &str, event_type: WatchEventType) {
        if let Some(watches) = self.watches.get_mut(path) {
            fire(std::mem::take(&mut watches.exists), path, event_type);
        }
    }
}

fn fire(senders: Vec<oneshot::Sender<WatchedEvent>>, path: &str, event_type: WatchEventType) {
    for tx in senders {
        // Receivers that lost interest are fine to skip.
        let _ = tx.send(WatchedEvent::new(event_type, path));
    }
}

/// A watch channel whose sender is already gone; yields no event.
fn closed_watch() -> EventWatch {
    oneshot::channel().1
}

/// In-process znode tree with one-shot watches.
#[derive(Clone)]
pub struct MemoryCluster {
    store: Arc<Mutex<Store>>,
}

impl MemoryCluster {
    /// Creates a cluster holding only the root `"/"`.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            "/".to_string(),
            Znode { data: Vec::new(), stat: Stat::default(), children: BTreeSet::new() },
        );
        Self {
            store: Arc::new(Mutex::new(Store {
                nodes,
                watches: HashMap::new(),
                next_zxid: 1,
                connected: true,
            })),
        }
    }

    /// Marks the session down; subsequent client calls fail.
    pub fn disconnect(&self) {
        self.store.lock().connected = false;
    }

    /// Marks the session live again.
    pub fn reconnect(&self) {
        self.store.lock().connected = true;
    }

    /// Creates a node. The parent must already exist.
    pub fn create(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<(), ClientError> {
        let data = data.into();
        paths::validate(path)?;
        if path == "/" {
            return Err(ClientError::NodeExists);
        }
        let mut store = self.store.lock();
        let parent_path = match paths::parent(path) {
            Some(parent) => parent.to_string(),
            None => return Err(ClientError::BadPath(path.to_string())),
        };
        if !store.nodes.contains_key(parent_path.as_str()) {
            return Err(ClientError::NoNode);
        }
        if store.nodes.contains_key(path) {
            return Err(ClientError::NodeExists);
        }
        let zxid = store.bump_zxid();
        let stat = Stat {
            czxid: zxid,
            mzxid: zxid,
            ctime: zxid,
            mtime: zxid,
            data_length: data.len() as i32,
            ..Stat::default()
        };
        tracing::debug!(path, zxid, "create");
        store.nodes.insert(path.to_string(), Znode { data, stat, children: BTreeSet::new() });
        let name = paths::base(path).to_string();
        if let Some(parent) = store.nodes.get_mut(parent_path.as_str()) {
            parent.children.insert(name);
            parent.stat.cversion += 1;
            parent.stat.num_children += 1;
        }
        store.fire_exists(path, WatchEventType::NodeCreated);
        store.fire_children(&parent_path, WatchEventType::NodeChildrenChanged);
        Ok(())
    }

    /// Replaces a node's data, bumping its `mzxid` and version.
    pub fn set_data(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<(), ClientError> {
        let data = data.into();
        let mut store = self.store.lock();
        if !store.nodes.contains_key(path) {
            return Err(ClientError::NoNode);
        }
        let zxid = store.bump_zxid();
        tracing::debug!(path, zxid, "set_data");
        if let Some(node) = store.nodes.get_mut(path) {
            node.stat.mzxid = zxid;
            node.stat.mtime = zxid;
            node.stat.version += 1;
            node.stat.data_length = data.len() as i32;
            node.data = data;
        }
        store.fire_data(path, WatchEventType::NodeDataChanged);
        store.fire_exists(path, WatchEventType::NodeDataChanged);
        Ok(())
    }

    /// Deletes a childless node.
    pub fn delete(&self, path: &str) -> Result<(), ClientError> {
        if path == "/" {
            return Err(ClientError::BadPath("cannot delete the root".to_string()));
        }
        let mut store = self.store.lock();
        match store.nodes.get(path) {
            None => return Err(ClientError::NoNode),
            Some(node) if !node.children.is_empty() => return Err(ClientError::NotEmpty),
            Some(_) => {}
        }
        store.bump_zxid();
        tracing::debug!(path, "delete");
        store.nodes.remove(path);
        let parent_path = paths::parent(path).unwrap_or("/").to_string();
        let name = paths::base(path).to_string();
        if let Some(parent) = store.nodes.get_mut(parent_path.as_str()) {
            parent.children.remove(name.as_str());
            parent.stat.cversion += 1;
            parent.stat.num_children -= 1;
        }
        store.fire_data(path, WatchEventType::NodeDeleted);
        store.fire_children(path, WatchEventType::NodeDeleted);
        store.fire_exists(path, WatchEventType::NodeDeleted);
        store.fire_children(&parent_path, WatchEventType::NodeChildrenChanged);
        Ok(())
    }

    /// Deletes a subtree, children before parents.
    pub fn delete_recursive(&self, path: &str) -> Result<(), ClientError> {
        let children = {
            let store = self.store.lock();
            match store.nodes.get(path) {
                None => return Err(ClientError::NoNode),
                Some(node) => {
                    node.children.iter().map(|name| paths::join(path, name)).collect::<Vec<_>>()
                }
            }
        };
        for child in children {
            self.delete_recursive(&child)?;
        }
        self.delete(path)
    }

    /// Whether a node currently exists.
    pub fn exists(&self, path: &str) -> bool {
        self.store.lock().nodes.contains_key(path)
    }

    /// Current data of a node, if present.
    pub fn get_data(&self, path: &str) -> Option<Vec<u8>> {
        self.store.lock().nodes.get(path).map(|node| node.data.clone())
    }

    /// Current stat of a node, if present.
    pub fn stat(&self, path: &str) -> Option<Stat> {
        self.store.lock().nodes.get(path).map(|node| node.stat)
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Coordinator for MemoryCluster {
    fn is_connected(&self) -> bool {
        self.store.lock().connected
    }

    async fn block_until_connected(&self, _timeout: Duration) -> bool {
        self.is_connected()
    }

    async fn create_with_parents(&self, path: &str) -> Result<(), ClientError> {
        paths::validate(path)?;
        if path == "/" {
            return Err(ClientError::NodeExists);
        }
        let segs: Vec<&str> = paths::segments(path).collect();
        let mut prefix = String::new();
        for (idx, seg) in segs.iter().enumerate() {
            prefix.push('/');
            prefix.push_str(seg);
            match self.create(&prefix, Vec::new()) {
                Ok(()) => {}
                Err(ClientError::NodeExists) if idx + 1 < segs.len() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn get_children_w(
        &self,
        path: &str,
    ) -> (Result<ChildrenReply, ClientError>, EventWatch) {
        let mut store = self.store.lock();
        if !store.connected {
            return (Err(ClientError::ConnectionLoss), closed_watch());
        }
        let reply = match store.nodes.get(path) {
            None => return (Err(ClientError::NoNode), closed_watch()),
            Some(node) => ChildrenReply {
                path: path.to_string(),
                children: node.children.iter().cloned().collect(),
                stat: node.stat,
            },
        };
        let watch = store.arm_children(path);
        (Ok(reply), watch)
    }

    async fn get_data_w(&self, path: &str) -> (Result<DataReply, ClientError>, EventWatch) {
        let mut store = self.store.lock();
        if !store.connected {
            return (Err(ClientError::ConnectionLoss), closed_watch());
        }
        let reply = match store.nodes.get(path) {
            None => return (Err(ClientError::NoNode), closed_watch()),
            Some(node) => {
                DataReply { path: path.to_string(), data: node.data.clone(), stat: node.stat }
            }
        };
        let watch = store.arm_data(path);
        (Ok(reply), watch)
    }

    async fn exists_w(&self, path: &str) -> (Result<ExistReply, ClientError>, EventWatch) {
        let mut store = self.store.lock();
        if !store.connected {
            return (Err(ClientError::ConnectionLoss), closed_watch());
        }
        let reply = match store.nodes.get(path) {
            Some(node) => {
                ExistReply { path: path.to_string(), exists: true, stat: Some(node.stat) }
            }
            None => ExistReply { path: path.to_string(), exists: false, stat: None },
        };
        let watch = store.arm_exists(path);
        (Ok(reply), watch)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
