// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached znode snapshots

use zc_client::Stat;

/// The cached view of one znode: path, metadata, and payload.
///
/// `data` is `None` when the cache was configured not to retain payloads;
/// events still carry the full payload in that mode, only queries see the
/// suppressed copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildData {
    path: String,
    stat: Stat,
    data: Option<Vec<u8>>,
}

impl ChildData {
    pub fn new(path: impl Into<String>, stat: Stat, data: Option<Vec<u8>>) -> Self {
        Self { path: path.into(), stat, data }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Replaces the metadata without touching the payload.
    pub(crate) fn set_stat(&mut self, stat: Stat) {
        self.stat = stat;
    }

    /// Copy of this entry with the payload suppressed.
    pub(crate) fn without_data(&self) -> Self {
        Self { path: self.path.clone(), stat: self.stat, data: None }
    }
}
