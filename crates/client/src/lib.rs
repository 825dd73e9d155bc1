// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zc-client: the coordination-service client boundary for zoocache.
//!
//! Defines the [`Coordinator`] trait the tree cache is written against and
//! the wire-adjacent data types (stats, replies, watch events). Behind the
//! `test-support` feature it also carries an in-memory cluster plus a TOML
//! tree fixture for driving the cache in tests.

pub mod client;
pub mod error;
pub mod event;
pub mod paths;
pub mod stat;

#[cfg(any(test, feature = "test-support"))]
pub mod fixture;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use client::{ChildrenReply, Coordinator, DataReply, EventWatch, ExistReply};
pub use error::ClientError;
pub use event::{ConnectionState, WatchEventType, WatchedEvent};
#[cfg(any(test, feature = "test-support"))]
pub use fixture::Fixture;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryCluster;
pub use stat::Stat;
