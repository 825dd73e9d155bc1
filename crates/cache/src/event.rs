// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache change events

use crate::child_data::ChildData;
use std::fmt;

/// The kind of change a [`CacheEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventType {
    /// A node joined the local view.
    NodeAdded,
    /// A node's data changed.
    NodeUpdated,
    /// A node left the local view.
    NodeRemoved,
    /// The session to the coordination service was suspended.
    ConnSuspended,
    /// The session recovered and watches were re-armed.
    ConnReconnected,
    /// The session was lost.
    ConnLost,
    /// The initial snapshot has quiesced. Published at most once per
    /// initialization.
    Initialized,
}

impl fmt::Display for CacheEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NodeAdded => "NodeAdded",
            Self::NodeUpdated => "NodeUpdated",
            Self::NodeRemoved => "NodeRemoved",
            Self::ConnSuspended => "ConnSuspended",
            Self::ConnReconnected => "ConnReconnected",
            Self::ConnLost => "ConnLost",
            Self::Initialized => "Initialized",
        };
        f.write_str(name)
    }
}

/// A change notification delivered to event listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub event_type: CacheEventType,
    /// The affected node, for the node-scoped event types.
    pub data: Option<ChildData>,
}

impl CacheEvent {
    pub(crate) fn new(event_type: CacheEventType, data: Option<ChildData>) -> Self {
        Self { event_type, data }
    }

    /// Path of the affected node, when the event carries one.
    pub fn path(&self) -> Option<&str> {
        self.data.as_ref().map(ChildData::path)
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path().unwrap_or("");
        let data = self
            .data
            .as_ref()
            .and_then(ChildData::data)
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        write!(f, "CacheEvent{{{} {} '{}'}}", self.event_type, path, data)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
