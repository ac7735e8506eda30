// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index-addressed dataflow arena.
//!
//! Nodes hold only their configuration; parent/child edges are stored here as [`NodeId`]s. An
//! optimizer rewires edges through [`Dataflow::set_parent`] and [`Dataflow::remove`], and can
//! branch the graph with [`Dataflow::clone_detached`] without aliasing any node state.

extern crate alloc;

use alloc::vec::Vec;

use serde_json::Value;
use smallvec::SmallVec;
use tracing::trace;

use crate::error::CompileError;
use crate::node::{DataflowNode, FieldSet, TransformNode};

/// Identifier of a node in a [`Dataflow`]. Ids are never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Slot {
    node: TransformNode,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 2]>,
}

/// A forest of transform nodes.
#[derive(Debug, Default, Clone)]
pub struct Dataflow {
    slots: Vec<Option<Slot>>,
}

impl Dataflow {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Returns `true` if there are no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `node`, wired under `parent` when given.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        node: TransformNode,
    ) -> Result<NodeId, CompileError> {
        if let Some(p) = parent {
            self.slot(p)?;
        }
        let id = NodeId(self.slots.len());
        trace!(?id, ?parent, hash = node.hash(), "insert dataflow node");
        self.slots.push(Some(Slot {
            node,
            parent,
            children: SmallVec::new(),
        }));
        if let Some(p) = parent {
            self.slot_mut(p)?.children.push(id);
        }
        Ok(id)
    }

    /// Returns the node for `id`, if live.
    pub fn node(&self, id: NodeId) -> Option<&TransformNode> {
        self.slot(id).ok().map(|s| &s.node)
    }

    /// Returns the parent of `id`, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).ok().and_then(|s| s.parent)
    }

    /// Returns the children of `id`, in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.slot(id) {
            Ok(s) => &s.children,
            Err(_) => &[],
        }
    }

    /// Live nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.live().filter(|(_, s)| s.parent.is_none()).map(|(id, _)| id)
    }

    /// Live nodes whose hash equals `hash`.
    pub fn find_by_hash<'a>(&'a self, hash: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.live()
            .filter(move |(_, s)| s.node.hash() == hash)
            .map(|(id, _)| id)
    }

    /// Moves `id` under `parent` (or makes it a root).
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), CompileError> {
        self.slot(id)?;
        if let Some(p) = parent {
            self.slot(p)?;
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == id {
                    return Err(CompileError::Cycle { node: id, parent: p });
                }
                cursor = self.parent(c);
            }
        }
        trace!(?id, ?parent, "rewire dataflow node");
        self.detach(id)?;
        self.slot_mut(id)?.parent = parent;
        if let Some(p) = parent {
            self.slot_mut(p)?.children.push(id);
        }
        Ok(())
    }

    /// Removes `id`, handing its children to its parent.
    pub fn remove(&mut self, id: NodeId) -> Result<TransformNode, CompileError> {
        let parent = self.slot(id)?.parent;
        self.detach(id)?;
        let slot = self.slots[id.0].take().ok_or(CompileError::UnknownNode(id))?;
        for &child in &slot.children {
            self.slot_mut(child)?.parent = parent;
        }
        if let Some(p) = parent {
            self.slot_mut(p)?.children.extend(slot.children.iter().copied());
        }
        trace!(?id, ?parent, "removed dataflow node");
        Ok(slot.node)
    }

    /// Inserts a copy of `id`'s node with no edges.
    pub fn clone_detached(&mut self, id: NodeId) -> Result<NodeId, CompileError> {
        let node = self.slot(id)?.node.clone();
        self.insert(None, node)
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path_to_root(&self, id: NodeId) -> Result<Vec<NodeId>, CompileError> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            cursor = self.slot(c)?.parent;
            path.push(c);
        }
        path.reverse();
        Ok(path)
    }

    /// Assembled transforms along the path from the root to `id`, in execution order.
    pub fn assemble_path(&self, id: NodeId) -> Result<Vec<Value>, CompileError> {
        self.path_to_root(id)?
            .into_iter()
            .map(|n| Ok(self.slot(n)?.node.assemble()))
            .collect()
    }

    /// Fields produced by any node on the path from the root to `id`.
    pub fn produced_fields_upto(&self, id: NodeId) -> Result<FieldSet, CompileError> {
        let mut out = FieldSet::new();
        for n in self.path_to_root(id)? {
            out.extend(self.slot(n)?.node.produced_fields());
        }
        Ok(out)
    }

    fn live(&self) -> impl Iterator<Item = (NodeId, &Slot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (NodeId(i), s)))
    }

    fn detach(&mut self, id: NodeId) -> Result<(), CompileError> {
        if let Some(p) = self.slot(id)?.parent {
            self.slot_mut(p)?.children.retain(|c| *c != id);
        }
        Ok(())
    }

    fn slot(&self, id: NodeId) -> Result<&Slot, CompileError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(CompileError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot, CompileError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(CompileError::UnknownNode(id))
    }
}
