// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic state words for nodes and the cache.
//!
//! State transitions are CAS/swap operations on a 32-bit word and are never
//! guarded by the per-node lock: the lock protects the child and data
//! collections only, and transitions must stay possible while readers hold
//! it.

use std::sync::atomic::{AtomicU32, Ordering};

/// Lifecycle of a single mirrored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NodeState {
    /// Created locally; the data fetch has not answered yet.
    Pending = 0,
    /// Data present and visible to readers.
    Live = 1,
    /// Observed deleted. A non-root node never leaves this state; the root
    /// re-enters Pending through its existence watch instead.
    Dead = 2,
}

fn node_state(raw: u32) -> NodeState {
    match raw {
        0 => NodeState::Pending,
        1 => NodeState::Live,
        _ => NodeState::Dead,
    }
}

pub(crate) struct AtomicNodeState(AtomicU32);

impl AtomicNodeState {
    pub fn new(state: NodeState) -> Self {
        Self(AtomicU32::new(state as u32))
    }

    pub fn value(&self) -> NodeState {
        node_state(self.0.load(Ordering::SeqCst))
    }

    /// Stores `new`, returning the previous state.
    pub fn swap(&self, new: NodeState) -> NodeState {
        node_state(self.0.swap(new as u32, Ordering::SeqCst))
    }

    /// Transitions `old → new`; returns whether this call made the change.
    pub fn compare_exchange(&self, old: NodeState, new: NodeState) -> bool {
        self.0
            .compare_exchange(old as u32, new as u32, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Lifecycle of the cache itself. Transitions Latent → Started → Stopped,
/// each taken at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CacheState {
    /// `start` has not been called.
    Latent = 0,
    /// `start` has been called.
    Started = 1,
    /// `stop` has been called.
    Stopped = 2,
}

fn cache_state(raw: u32) -> CacheState {
    match raw {
        0 => CacheState::Latent,
        1 => CacheState::Started,
        _ => CacheState::Stopped,
    }
}

pub(crate) struct AtomicCacheState(AtomicU32);

impl AtomicCacheState {
    pub fn new(state: CacheState) -> Self {
        Self(AtomicU32::new(state as u32))
    }

    pub fn value(&self) -> CacheState {
        cache_state(self.0.load(Ordering::SeqCst))
    }

    /// Transitions `old → new`; returns whether this call made the change.
    pub fn compare_exchange(&self, old: CacheState, new: CacheState) -> bool {
        self.0
            .compare_exchange(old as u32, new as u32, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
