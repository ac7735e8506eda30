// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Implicit window nodes for facet channels sorted by an aggregate.
//!
//! Ordering facet cells by, say, the median of `x` per column needs that median on every row
//! before the facet is laid out. Authors never write that window transform; it is derived here
//! from the facet mapping.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, trace};

use crate::dataflow::{Dataflow, NodeId};
use crate::de::{object, optional_object};
use crate::error::CompileError;
use crate::transform::{Frame, SortOrder, WindowFieldDef, WindowTransform};
use crate::window::WindowTransformNode;

/// Aggregate op used when a structured facet sort names none.
pub const DEFAULT_SORT_OP: &str = "min";

/// Measurement type of a facet channel's field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Unordered categories.
    Nominal,
    /// Ordered categories.
    Ordinal,
    /// Numbers.
    Quantitative,
    /// Dates and times.
    Temporal,
}

/// A structured sort: order facet cells by `op(field)`.
///
/// Only read from a JSON object; see [`FacetSort`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FacetSortField {
    /// Aggregate op, [`DEFAULT_SORT_OP`] when absent.
    #[serde(default)]
    pub op: Option<String>,
    /// Field to aggregate.
    #[serde(default)]
    pub field: Option<String>,
    /// Cell order; applied by the facet layout, not by the window node.
    #[serde(default)]
    pub order: Option<SortOrder>,
}

impl FacetSortField {
    /// Creates a sort by `op(field)`.
    pub fn new(op: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            op: Some(op.into()),
            field: Some(field.into()),
            order: None,
        }
    }

    /// The aggregate op to compute.
    pub fn op(&self) -> &str {
        self.op.as_deref().unwrap_or(DEFAULT_SORT_OP)
    }

    /// Whether this sort needs an aggregate computed: it names a field, or it counts rows.
    pub fn is_aggregate(&self) -> bool {
        self.field.is_some() || self.op() == "count"
    }

    /// Output name of the derived window field for a channel over `channel_field`.
    ///
    /// `<op>_<field>_by_<channel_field>`, or `<op>_by_<channel_field>` when no field is named.
    pub fn output_name(&self, channel_field: &str) -> String {
        match &self.field {
            Some(field) => format!("{}_{field}_by_{channel_field}", self.op()),
            None => format!("{}_by_{channel_field}", self.op()),
        }
    }
}

/// Sort of a facet channel.
///
/// JSON strings read as [`FacetSort::Order`], arrays as [`FacetSort::Custom`], and objects as
/// [`FacetSort::Field`]. Anything else is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetSort {
    /// `"ascending"` / `"descending"` on the raw field value.
    Order(SortOrder),
    /// Explicit order of field values; cells not listed follow in their natural order.
    Custom(Vec<Value>),
    /// Order by an aggregate.
    Field(FacetSortField),
}

impl<'de> Deserialize<'de> for FacetSort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => SortOrder::deserialize(Value::String(s))
                .map(Self::Order)
                .map_err(D::Error::custom),
            Value::Array(values) => Ok(Self::Custom(values)),
            Value::Object(map) => serde_json::from_value(Value::Object(map))
                .map(Self::Field)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format_args!(
                "expected a sort order, a list of values, or a sort object, found `{other}`"
            ))),
        }
    }
}

impl FacetSort {
    /// Returns the structured sort when it requests an aggregate.
    pub fn as_aggregate(&self) -> Option<&FacetSortField> {
        match self {
            Self::Field(f) if f.is_aggregate() => Some(f),
            _ => None,
        }
    }
}

/// Definition of one facet channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FacetFieldDef {
    /// Field the channel splits on.
    pub field: String,
    /// Measurement type.
    #[serde(rename = "type")]
    pub kind: FieldType,
    /// Optional cell ordering.
    #[serde(default)]
    pub sort: Option<FacetSort>,
}

impl FacetFieldDef {
    /// Creates an unsorted channel definition.
    pub fn new(field: impl Into<String>, kind: FieldType) -> Self {
        Self {
            field: field.into(),
            kind,
            sort: None,
        }
    }

    /// Sets the channel sort.
    pub fn sort(mut self, sort: FacetSort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Facet channels of a faceted view. Each channel must be a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FacetMapping {
    /// Row channel.
    #[serde(default, deserialize_with = "optional_object")]
    pub row: Option<FacetFieldDef>,
    /// Column channel.
    #[serde(default, deserialize_with = "optional_object")]
    pub column: Option<FacetFieldDef>,
    /// Wrapped facet channel.
    #[serde(default, deserialize_with = "optional_object")]
    pub facet: Option<FacetFieldDef>,
}

impl FacetMapping {
    /// Parses the authored JSON shape, which must be an object.
    pub fn from_json(value: &Value) -> Result<Self, CompileError> {
        object(value).map_err(CompileError::InvalidFacet)
    }

    /// Defined channels as `(name, def)`, in `row`, `column`, `facet` order.
    pub fn channels(&self) -> impl Iterator<Item = (&'static str, &FacetFieldDef)> + '_ {
        [
            ("row", self.row.as_ref()),
            ("column", self.column.as_ref()),
            ("facet", self.facet.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, def)| def.map(|d| (name, d)))
    }
}

/// Builds one window node per channel sorted by an aggregate, in channel order.
///
/// Each node computes the channel's aggregate over the whole partition of its own channel
/// field. Channels with plain or no sort contribute nothing.
pub fn window_nodes_from_facet(facet: &FacetMapping) -> Vec<WindowTransformNode> {
    let mut out = Vec::new();
    for (channel, def) in facet.channels() {
        let Some(sort) = def.sort.as_ref().and_then(FacetSort::as_aggregate) else {
            trace!(channel, "facet channel needs no sort window");
            continue;
        };
        let mut entry = WindowFieldDef::new(sort.op()).output(sort.output_name(&def.field));
        entry.field = sort.field.clone();
        let mut transform = WindowTransform::new(vec![entry], Frame::UNBOUNDED);
        transform.groupby = Some(vec![def.field.clone()]);
        trace!(channel, field = %def.field, op = sort.op(), "deriving facet sort window");
        out.push(WindowTransformNode::new(transform));
    }
    out
}

/// Inserts the facet-sort windows under `parent`, chained in channel order.
///
/// Returns the last inserted node, or `None` when no channel sorts by an aggregate.
pub fn make_window_from_facet(
    graph: &mut Dataflow,
    parent: Option<NodeId>,
    facet: &FacetMapping,
) -> Result<Option<NodeId>, CompileError> {
    let nodes = window_nodes_from_facet(facet);
    debug!(count = nodes.len(), "facet sort windows");
    let mut last = None;
    let mut parent = parent;
    for node in nodes {
        let id = graph.insert(parent, node.into())?;
        parent = Some(id);
        last = Some(id);
    }
    Ok(last)
}
