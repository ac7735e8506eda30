// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window transform nodes.
//!
//! A [`WindowTransformNode`] compiles one authored `window` transform into the runtime's
//! parallel-array encoding: entry `i` of `ops`, `fields`, `params`, and `as` all describe the
//! same computed field.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::de::object;
use crate::error::CompileError;
use crate::hash::hash_value;
use crate::node::{DataflowNode, FieldSet};
use crate::transform::{Frame, SortOrder, WindowTransform};

/// The `type` tag of assembled window transforms.
pub const WINDOW_TAG: &str = "window";

/// Kind tag prefixed to window node hashes.
const HASH_TAG: &str = "WindowTransform";

/// Partition ordering in assembled form: parallel `field`/`order` arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VgWindowSort {
    /// Sort fields.
    pub field: Vec<String>,
    /// Sort orders, aligned to `field`.
    pub order: Vec<SortOrder>,
}

/// An execution-ready window transform.
///
/// `groupby` and `ignore_peers` are omitted from the JSON form when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgWindowTransform {
    /// Always [`WINDOW_TAG`].
    pub kind: &'static str,
    /// Op per computed field.
    pub ops: Vec<String>,
    /// Input field per computed field, `None` for ops that take none.
    pub fields: Vec<Option<String>>,
    /// Parameter per computed field.
    pub params: Vec<Option<Number>>,
    /// Output name per computed field.
    pub outputs: Vec<String>,
    /// Partition ordering, empty arrays when unsorted.
    pub sort: VgWindowSort,
    /// Frame bounds, as authored.
    pub frame: Frame,
    /// Partition fields, present only when non-empty.
    pub groupby: Option<Vec<String>>,
    /// Present only when the author set it.
    pub ignore_peers: Option<bool>,
}

impl VgWindowTransform {
    /// JSON form, omitting absent optional members.
    ///
    /// This is the only serialized form; `Serialize` delegates here so assembly stays infallible.
    pub fn to_json(&self) -> Value {
        let mut m = Map::new();
        m.insert("type".into(), Value::from(self.kind));
        m.insert(
            "ops".into(),
            self.ops.iter().map(|o| Value::from(o.as_str())).collect(),
        );
        m.insert(
            "fields".into(),
            self.fields
                .iter()
                .map(|f| Value::from(f.as_deref()))
                .collect(),
        );
        m.insert(
            "params".into(),
            self.params
                .iter()
                .map(|p| p.clone().map_or(Value::Null, Value::Number))
                .collect(),
        );
        m.insert(
            "as".into(),
            self.outputs.iter().map(|o| Value::from(o.as_str())).collect(),
        );
        let mut sort = Map::new();
        sort.insert(
            "field".into(),
            self.sort.field.iter().map(|f| Value::from(f.as_str())).collect(),
        );
        sort.insert(
            "order".into(),
            self.sort.order.iter().map(|o| Value::from(o.as_str())).collect(),
        );
        m.insert("sort".into(), Value::Object(sort));
        m.insert("frame".into(), self.frame.to_json());
        if let Some(groupby) = &self.groupby {
            m.insert(
                "groupby".into(),
                groupby.iter().map(|g| Value::from(g.as_str())).collect(),
            );
        }
        if let Some(ignore_peers) = self.ignore_peers {
            m.insert("ignorePeers".into(), Value::Bool(ignore_peers));
        }
        Value::Object(m)
    }
}

impl Serialize for VgWindowTransform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A dataflow node compiling one `window` transform.
///
/// The transform is normalized at construction (every entry gets an `as`) and never changes
/// afterwards, so the hash is computed once up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTransformNode {
    transform: WindowTransform,
    hash: String,
}

impl WindowTransformNode {
    /// Builds a node from an authored transform.
    pub fn new(transform: WindowTransform) -> Self {
        let transform = transform.normalized();
        let hash = format!("{HASH_TAG} {}", hash_value(&transform.to_json()));
        debug!(
            hash = %hash,
            entries = transform.window.len(),
            "built window node"
        );
        Self { transform, hash }
    }

    /// Builds a node from the authored JSON shape, which must be an object.
    pub fn from_json(value: &Value) -> Result<Self, CompileError> {
        let transform: WindowTransform = object(value).map_err(CompileError::InvalidTransform)?;
        Ok(Self::new(transform))
    }

    /// The normalized transform.
    pub fn transform(&self) -> &WindowTransform {
        &self.transform
    }

    /// Returns a node whose partition also includes `fields`.
    ///
    /// Existing groupby order is kept; new fields are appended unless already present.
    pub fn with_dimensions<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transform = self.transform.clone();
        let mut groupby = transform.groupby.take().unwrap_or_default();
        for field in fields {
            let field = field.into();
            if !groupby.contains(&field) {
                groupby.push(field);
            }
        }
        if !groupby.is_empty() || self.transform.groupby.is_some() {
            transform.groupby = Some(groupby);
        }
        Self::new(transform)
    }

    /// Serializes into the typed execution-ready record.
    pub fn assemble_vg(&self) -> VgWindowTransform {
        let t = &self.transform;
        let n = t.window.len();
        let mut ops = Vec::with_capacity(n);
        let mut fields = Vec::with_capacity(n);
        let mut params = Vec::with_capacity(n);
        let mut outputs = Vec::with_capacity(n);
        for def in &t.window {
            ops.push(def.op.clone());
            fields.push(def.field.clone());
            params.push(def.param.clone());
            outputs.push(String::from(def.resolved_output()));
        }

        let sort = VgWindowSort {
            field: t.sort_fields().iter().map(|s| s.field.clone()).collect(),
            order: t.sort_fields().iter().map(|s| s.order).collect(),
        };

        let groupby = t.groupby.clone().filter(|g| !g.is_empty());

        VgWindowTransform {
            kind: WINDOW_TAG,
            ops,
            fields,
            params,
            outputs,
            sort,
            frame: t.frame,
            groupby,
            ignore_peers: t.ignore_peers,
        }
    }
}

impl DataflowNode for WindowTransformNode {
    fn hash(&self) -> &str {
        &self.hash
    }

    fn dependent_fields(&self) -> FieldSet {
        let t = &self.transform;
        let mut out = FieldSet::new();
        out.extend(t.window.iter().filter_map(|d| d.field.clone()));
        out.extend(t.groupby_fields().iter().cloned());
        out.extend(t.sort_fields().iter().map(|s| s.field.clone()));
        out
    }

    fn produced_fields(&self) -> FieldSet {
        let t = &self.transform;
        let mut out = FieldSet::new();
        out.extend(t.window.iter().map(|d| String::from(d.resolved_output())));
        out.extend(t.groupby_fields().iter().cloned());
        out
    }

    fn assemble(&self) -> Value {
        self.assemble_vg().to_json()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use serde_json::json;

    use super::*;
    use crate::transform::{SortField, WindowFieldDef};

    fn fields(names: &[&str]) -> FieldSet {
        names.iter().map(|n| String::from(*n)).collect()
    }

    fn ordered_row_number(output: Option<&str>) -> WindowTransform {
        let mut def = WindowFieldDef::new("row_number");
        def.output = output.map(String::from);
        WindowTransform {
            window: vec![def],
            ignore_peers: Some(false),
            sort: Some(vec![SortField::new("f", SortOrder::Ascending)]),
            groupby: Some(vec![String::from("f")]),
            frame: Frame::CUMULATIVE,
        }
    }

    #[test]
    fn assembles_runtime_transform() {
        let node = WindowTransformNode::new(ordered_row_number(Some("ordered_row_number")));
        assert_eq!(
            node.assemble(),
            json!({
                "type": "window",
                "ops": ["row_number"],
                "fields": [null],
                "params": [null],
                "sort": {"field": ["f"], "order": ["ascending"]},
                "ignorePeers": false,
                "as": ["ordered_row_number"],
                "frame": [null, 0],
                "groupby": ["f"]
            })
        );
    }

    #[test]
    fn missing_as_defaults_to_op() {
        let node = WindowTransformNode::new(ordered_row_number(None));
        assert_eq!(
            node.assemble(),
            json!({
                "type": "window",
                "ops": ["row_number"],
                "fields": [null],
                "params": [null],
                "sort": {"field": ["f"], "order": ["ascending"]},
                "ignorePeers": false,
                "as": ["row_number"],
                "frame": [null, 0],
                "groupby": ["f"]
            })
        );
    }

    #[test]
    fn optional_members_are_omitted() {
        let node = WindowTransformNode::from_json(&json!({
            "window": [
                {"op": "lag", "field": "price", "param": 1, "as": "prev"},
                {"op": "rank"}
            ],
            "groupby": [],
            "frame": [-2, 2]
        }))
        .unwrap();
        assert_eq!(
            node.assemble(),
            json!({
                "type": "window",
                "ops": ["lag", "rank"],
                "fields": ["price", null],
                "params": [1, null],
                "as": ["prev", "rank"],
                "sort": {"field": [], "order": []},
                "frame": [-2, 2]
            })
        );
    }

    #[test]
    fn typed_record_serializes_to_assembled_form() {
        let node = WindowTransformNode::from_json(&json!({
            "window": [{"op": "ntile", "param": 4, "as": "q"}],
            "sort": [{"field": "v", "order": "descending"}],
            "frame": [null, null]
        }))
        .unwrap();
        assert_eq!(serde_json::to_value(node.assemble_vg()).unwrap(), node.assemble());
        let text = serde_json::to_string(&node.assemble_vg()).unwrap();
        assert!(!text.contains("groupby"));
        assert!(!text.contains("ignorePeers"));
    }

    #[test]
    fn malformed_input_is_reported() {
        let err = WindowTransformNode::from_json(&json!({"window": "rank", "frame": [null, 0]}))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidTransform(_)));
    }

    #[test]
    fn positional_transforms_are_rejected() {
        let whole = WindowTransformNode::from_json(&json!([
            [{"op": "rank"}],
            null,
            null,
            null,
            [null, null]
        ]));
        assert!(matches!(whole, Err(CompileError::InvalidTransform(_))));

        let entry = WindowTransformNode::from_json(&json!({
            "window": [["rank", "x"]],
            "frame": [null, null]
        }));
        assert!(matches!(entry, Err(CompileError::InvalidTransform(_))));
    }

    #[test]
    fn whole_float_param_dedupes_with_integer_param() {
        let float_param = WindowTransformNode::from_json(&json!({
            "window": [{"op": "lag", "field": "x", "param": 2.0}],
            "frame": [null, null]
        }))
        .unwrap();
        let int_param = WindowTransformNode::from_json(&json!({
            "window": [{"op": "lag", "field": "x", "param": 2}],
            "frame": [null, null]
        }))
        .unwrap();
        assert_eq!(float_param.hash(), int_param.hash());
        assert_eq!(float_param.assemble()["params"], json!([2]));
    }

    #[test]
    fn produced_fields_include_outputs_and_groupby() {
        let t = WindowTransform {
            window: vec![
                WindowFieldDef::new("row_number").output("ordered_row_number"),
                WindowFieldDef::new("count").output("count_field"),
                WindowFieldDef::new("sum").output("sum_field"),
            ],
            ignore_peers: Some(false),
            sort: Some(vec![SortField::new("f", SortOrder::Ascending)]),
            groupby: Some(vec![String::from("g")]),
            frame: Frame::CUMULATIVE,
        };
        let node = WindowTransformNode::new(t);
        assert_eq!(
            node.produced_fields(),
            fields(&["ordered_row_number", "count_field", "sum_field", "g"])
        );
        assert_eq!(node.dependent_fields(), fields(&["g", "f"]));
    }

    #[test]
    fn dependent_fields_include_value_fields() {
        let mut t = WindowTransform::new(
            vec![
                WindowFieldDef::new("sum").field("amount"),
                WindowFieldDef::new("row_number"),
            ],
            Frame::UNBOUNDED,
        );
        t.sort = Some(vec![SortField::new("date", SortOrder::Ascending)]);
        t.groupby = Some(vec![String::from("region")]);
        let node = WindowTransformNode::new(t);
        assert_eq!(node.dependent_fields(), fields(&["amount", "date", "region"]));
        assert_eq!(node.produced_fields(), fields(&["sum", "row_number", "region"]));
    }

    #[test]
    fn clone_is_structurally_equal() {
        let node = WindowTransformNode::new(ordered_row_number(Some("ordered_row_number")));
        let copy = node.clone();
        assert_eq!(copy, node);
        assert_eq!(copy.assemble(), node.assemble());
    }

    #[test]
    fn hash_matches_known_digest() {
        let node = WindowTransformNode::new(ordered_row_number(Some("ordered_row_number")));
        assert_eq!(node.hash(), "WindowTransform 1103660051");
        assert_eq!(node.hash(), node.hash());
    }

    #[test]
    fn hash_depends_on_configuration_only() {
        let a = WindowTransformNode::new(ordered_row_number(Some("n")));
        let b = WindowTransformNode::from_json(&json!({
            "frame": [null, 0],
            "groupby": ["f"],
            "sort": [{"order": "ascending", "field": "f"}],
            "ignorePeers": false,
            "window": [{"as": "n", "op": "row_number"}]
        }))
        .unwrap();
        assert_eq!(a.hash(), b.hash());

        let c = WindowTransformNode::new(ordered_row_number(Some("m")));
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn explicit_default_name_hashes_like_omitted_name() {
        let implicit = WindowTransformNode::new(ordered_row_number(None));
        let explicit = WindowTransformNode::new(ordered_row_number(Some("row_number")));
        assert_eq!(implicit.hash(), explicit.hash());
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn with_dimensions_extends_partition() {
        let node = WindowTransformNode::new(ordered_row_number(Some("n")));
        let wider = node.with_dimensions(["f", "g"]);
        assert_eq!(
            wider.transform().groupby_fields(),
            &[String::from("f"), String::from("g")]
        );
        assert_ne!(wider.hash(), node.hash());
        // The source node keeps its configuration.
        assert_eq!(node.transform().groupby_fields(), &[String::from("f")]);

        let mut t = ordered_row_number(Some("n"));
        t.groupby = None;
        let ungrouped = WindowTransformNode::new(t);
        assert_eq!(
            ungrouped.with_dimensions(core::iter::empty::<String>()),
            ungrouped
        );
    }
}
