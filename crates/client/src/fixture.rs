// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML tree fixtures for seeding a cluster before a test.
//!
//! A fixture document maps top-level names to nodes; each node carries an
//! optional string value and nested children:
//!
//! ```toml
//! [a]
//! value = "1"
//!
//! [a.children.b]
//! value = "2"
//! ```

use crate::error::ClientError;
use crate::memory::MemoryCluster;
use crate::paths;
use serde::Deserialize;
use std::collections::BTreeMap;

/// One node in a fixture document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureNode {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub children: BTreeMap<String, FixtureNode>,
}

impl FixtureNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A whole fixture: top-level name → node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Fixture {
    pub roots: BTreeMap<String, FixtureNode>,
}

impl Fixture {
    pub fn parse(doc: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(doc)
    }

    /// Creates every node on the cluster, parents before children.
    pub fn apply(&self, cluster: &MemoryCluster) -> Result<(), ClientError> {
        for (name, node) in &self.roots {
            apply_node(cluster, &paths::join("/", name), node)?;
        }
        Ok(())
    }
}

fn apply_node(
    cluster: &MemoryCluster,
    path: &str,
    node: &FixtureNode,
) -> Result<(), ClientError> {
    let value = node.value.as_deref().unwrap_or("");
    cluster.create(path, value.as_bytes().to_vec())?;
    for (name, child) in &node.children {
        apply_node(cluster, &paths::join(path, name), child)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "fixture_tests.rs"]
mod tests;
