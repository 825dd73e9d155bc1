// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the tree cache

use thiserror::Error;
use zc_client::ClientError;

/// Errors returned to callers or routed to error listeners.
///
/// `AlreadyStarted` through `CreateParents` are returned synchronously from
/// cache operations. The remaining variants surface asynchronously through
/// the error-listener registry; they never abort the cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache already started or stopped")]
    AlreadyStarted,

    #[error("client not connected")]
    NotConnected,

    #[error("root path not match")]
    RootNotMatch,

    #[error("node not found")]
    NodeNotFound,

    #[error("node state is not LIVE")]
    NodeNotLive,

    #[error("failed to create parents: {0}")]
    CreateParents(ClientError),

    #[error("coordination service error: {0}")]
    Client(#[from] ClientError),

    #[error("unexpected NodeCreated on non-root node {path}")]
    NonRootCreated { path: String },

    #[error("unexpected existence reply on non-root node {path}")]
    NonRootExists { path: String },
}
