// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error sentinels shared by every `Coordinator` implementation

use thiserror::Error;

/// Errors a coordination-service operation can report.
///
/// `NoNode` and `NodeExists` are sentinels callers match on: the tree cache
/// treats `NoNode` as a deletion signal and `NodeExists` as a benign
/// outcome of parent creation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("node does not exist")]
    NoNode,

    #[error("node already exists")]
    NodeExists,

    #[error("node has children")]
    NotEmpty,

    #[error("invalid path: {0}")]
    BadPath(String),

    #[error("connection to the coordination service was lost")]
    ConnectionLoss,

    #[error("client is closed")]
    Closed,
}
