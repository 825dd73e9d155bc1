// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener registries with concurrent broadcast

use crate::error::CacheError;
use crate::event::CacheEvent;
use futures_util::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;

/// Listener for cache change events.
pub type CacheListener = Listener<CacheEvent>;

/// Listener for background errors.
pub type ErrorListener = Listener<CacheError>;

type Callback<P> = Arc<dyn Fn(P) + Send + Sync>;

/// A registered callback.
///
/// Clones share identity: [`Listeners::del`] removes by the identity of the
/// underlying callback, so the handle used to register must be kept (or a
/// clone of it) to unregister later.
pub struct Listener<P> {
    callback: Callback<P>,
}

impl<P> Listener<P> {
    pub fn new(callback: impl Fn(P) + Send + Sync + 'static) -> Self {
        Self { callback: Arc::new(callback) }
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self { callback: Arc::clone(&self.callback) }
    }
}

/// An insertion-ordered set of listeners sharing one payload type.
pub struct Listeners<P> {
    entries: Arc<RwLock<Vec<Listener<P>>>>,
}

impl<P> Clone for Listeners<P> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<P> Default for Listeners<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Listeners<P> {
    pub fn new() -> Self {
        Self { entries: Arc::new(RwLock::new(Vec::new())) }
    }

    pub fn add(&self, listener: &Listener<P>) {
        self.entries.write().push(listener.clone());
    }

    /// Removes the first occurrence of `listener`; no-op if absent.
    pub fn del(&self, listener: &Listener<P>) {
        let mut entries = self.entries.write();
        if let Some(idx) = entries.iter().position(|entry| entry.same(listener)) {
            entries.remove(idx);
        }
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<P: Clone + Send + 'static> Listeners<P> {
    /// Invokes every listener on its own task and waits for all of them.
    ///
    /// The registry is snapshotted up front, so listeners removed while a
    /// broadcast is in flight still receive this payload. One slow listener
    /// does not delay the others, but the call returns only after every
    /// listener has run.
    pub async fn broadcast(&self, payload: P) {
        let snapshot: Vec<Listener<P>> = self.entries.read().clone();
        let tasks = snapshot.into_iter().map(|listener| {
            let payload = payload.clone();
            tokio::spawn(async move { (listener.callback)(payload) })
        });
        join_all(tasks).await;
    }
}

#[cfg(test)]
#[path = "listeners_tests.rs"]
mod tests;
