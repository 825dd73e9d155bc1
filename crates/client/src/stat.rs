// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Znode metadata records

use serde::{Deserialize, Serialize};

/// Metadata attached to every znode.
///
/// `mzxid` is the modification transaction id: a 64-bit integer bumped on
/// every modification of the node, monotonic across the whole cluster.
/// Consumers compare `mzxid` values to decide whether two observations of
/// a node describe the same version of its data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    /// Transaction id of the creation.
    pub czxid: i64,
    /// Transaction id of the last modification.
    pub mzxid: i64,
    /// Creation time, epoch milliseconds.
    pub ctime: i64,
    /// Last-modification time, epoch milliseconds.
    pub mtime: i64,
    /// Number of data changes.
    pub version: i32,
    /// Number of child-list changes.
    pub cversion: i32,
    /// Current child count.
    pub num_children: i32,
    /// Length of the data payload in bytes.
    pub data_length: i32,
}
