// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The capability set shared by every transform-compiling node.

extern crate alloc;

use alloc::string::String;

use hashbrown::HashSet;
use serde_json::Value;

use crate::window::WindowTransformNode;

/// A set of field names.
pub type FieldSet = HashSet<String>;

/// Contract every dataflow node kind implements.
///
/// A node's identity is its normalized configuration; it carries no graph edges (those live in
/// [`Dataflow`](crate::Dataflow)), so a `clone` is always a detached copy.
pub trait DataflowNode: Clone {
    /// Content-addressed identifier: a kind tag plus a digest of the normalized configuration.
    fn hash(&self) -> &str;

    /// Fields this node reads.
    fn dependent_fields(&self) -> FieldSet;

    /// Fields guaranteed present on rows after this node runs.
    fn produced_fields(&self) -> FieldSet;

    /// Serializes the node into an execution-ready transform object.
    fn assemble(&self) -> Value;
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformNode {
    /// A `window` transform.
    Window(WindowTransformNode),
}

impl TransformNode {
    /// Returns the window node, if this is one.
    pub fn as_window(&self) -> Option<&WindowTransformNode> {
        match self {
            Self::Window(w) => Some(w),
        }
    }
}

impl From<WindowTransformNode> for TransformNode {
    fn from(node: WindowTransformNode) -> Self {
        Self::Window(node)
    }
}

impl DataflowNode for TransformNode {
    fn hash(&self) -> &str {
        match self {
            Self::Window(w) => w.hash(),
        }
    }

    fn dependent_fields(&self) -> FieldSet {
        match self {
            Self::Window(w) => w.dependent_fields(),
        }
    }

    fn produced_fields(&self) -> FieldSet {
        match self {
            Self::Window(w) => w.produced_fields(),
        }
    }

    fn assemble(&self) -> Value {
        match self {
            Self::Window(w) => w.assemble(),
        }
    }
}
