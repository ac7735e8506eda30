// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compilation errors.

use thiserror::Error;

use crate::dataflow::NodeId;

/// Errors returned while building transform nodes or rewiring the dataflow arena.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An authored transform did not have the expected structure.
    #[error("invalid window transform: {0}")]
    InvalidTransform(serde_json::Error),
    /// A facet mapping did not have the expected structure.
    #[error("invalid facet mapping: {0}")]
    InvalidFacet(serde_json::Error),
    /// A node id does not refer to a node in the arena.
    #[error("unknown dataflow node {0:?}")]
    UnknownNode(NodeId),
    /// Rewiring would make a node its own ancestor.
    #[error("setting {parent:?} as parent of {node:?} would create a cycle")]
    Cycle {
        /// The node being rewired.
        node: NodeId,
        /// The requested parent.
        parent: NodeId,
    },
}
