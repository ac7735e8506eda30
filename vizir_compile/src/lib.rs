// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vega-Lite-ish transform compilation for VizIR.
//!
//! This crate turns authored data transforms into dataflow nodes, and nodes into
//! execution-ready Vega transform objects:
//! - [`DataflowNode`] is the contract every node kind implements (structural hash, field
//!   dependencies, assembly); [`TransformNode`] is the closed set of kinds.
//! - [`WindowTransformNode`] compiles `window` transforms (ranking, running aggregates, `lag`,
//!   `ntile`, ...).
//! - [`make_window_from_facet`] derives the window nodes needed to order facet cells by an
//!   aggregate.
//! - [`Dataflow`] stores nodes in an index-addressed arena with parent/child edges.
//!
//! Node hashes are content-addressed and stable across runs, so identical work requested by
//! independent views can be merged.

#![no_std]

extern crate alloc;

mod dataflow;
mod de;
mod error;
mod facet;
mod hash;
mod node;
mod transform;
mod window;

pub use dataflow::{Dataflow, NodeId};
pub use error::CompileError;
pub use facet::{
    DEFAULT_SORT_OP, FacetFieldDef, FacetMapping, FacetSort, FacetSortField, FieldType,
    make_window_from_facet, window_nodes_from_facet,
};
pub use hash::{hash_str, hash_value, stable_stringify};
pub use node::{DataflowNode, FieldSet, TransformNode};
pub use transform::{Frame, SortField, SortOrder, WindowFieldDef, WindowTransform};
pub use window::{VgWindowSort, VgWindowTransform, WINDOW_TAG, WindowTransformNode};
