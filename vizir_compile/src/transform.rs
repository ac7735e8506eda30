// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Authored transform records.
//!
//! These mirror the JSON a chart author writes. They are immutable inputs: node construction
//! copies and normalizes them, and never writes back.

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::de::{object_list, optional_object_list};

/// Largest integer a JSON runtime represents exactly (`2^53 - 1`).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Sorting order for a [`SortField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl SortOrder {
    /// The keyword used in assembled output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// One entry of a partition's internal ordering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortField {
    /// Field to order by.
    pub field: String,
    /// Sort order.
    pub order: SortOrder,
}

impl SortField {
    /// Creates a sort entry.
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// The relative row range `[start, end]` a windowed op considers.
///
/// `None` means unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Frame(pub Option<i64>, pub Option<i64>);

impl Frame {
    /// `[null, null]`: the whole partition.
    pub const UNBOUNDED: Self = Self(None, None);

    /// `[null, 0]`: everything up to and including the current row.
    pub const CUMULATIVE: Self = Self(None, Some(0));

    /// JSON form: a two-element array with `null` for unbounded ends.
    pub fn to_json(self) -> Value {
        Value::Array(vec![Value::from(self.0), Value::from(self.1)])
    }
}

/// One computed field of a window transform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowFieldDef {
    /// Ranking, aggregate, or analytic op name (`row_number`, `rank`, `sum`, `lag`, ...).
    pub op: String,
    /// Input field. Ops like `row_number` take none.
    #[serde(default)]
    pub field: Option<String>,
    /// Output field name. Defaults to `op` once the transform is normalized.
    #[serde(rename = "as", default)]
    pub output: Option<String>,
    /// Numeric argument, e.g. the bucket count of `ntile` or the offset of `lag`.
    ///
    /// Whole-valued floats are stored as integers once normalized, so `1.0` and `1` agree.
    #[serde(default)]
    pub param: Option<Number>,
}

impl WindowFieldDef {
    /// Creates an entry with only an op.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            field: None,
            output: None,
            param: None,
        }
    }

    /// Sets the input field.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Sets the output name.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.output = Some(name.into());
        self
    }

    /// Sets the numeric argument.
    pub fn param(mut self, param: impl Into<Number>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// JSON form, omitting absent members.
    pub fn to_json(&self) -> Value {
        let mut m = Map::new();
        m.insert("op".into(), Value::from(self.op.as_str()));
        if let Some(field) = &self.field {
            m.insert("field".into(), Value::from(field.as_str()));
        }
        if let Some(name) = &self.output {
            m.insert("as".into(), Value::from(name.as_str()));
        }
        if let Some(param) = &self.param {
            m.insert("param".into(), Value::Number(param.clone()));
        }
        Value::Object(m)
    }

    /// The resolved output name: the explicit `as`, or the op name.
    ///
    /// Two entries sharing an op and both omitting `as` resolve to the same name.
    pub fn resolved_output(&self) -> &str {
        self.output.as_deref().unwrap_or(&self.op)
    }
}

/// An authored `window` transform.
///
/// `ignore_peers`, `sort`, and `groupby` keep their presence exactly as authored: absent
/// members stay absent through hashing and assembly.
///
/// Window and sort entries must be JSON objects. The transform itself is read through
/// [`WindowTransformNode::from_json`](crate::WindowTransformNode::from_json), which also
/// requires an object; deserializing this type directly accepts the positional array form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowTransform {
    /// Computed fields, in authoring order.
    #[serde(deserialize_with = "object_list")]
    pub window: Vec<WindowFieldDef>,
    /// Whether peer rows (equal sort keys) are ignored when framing.
    #[serde(default)]
    pub ignore_peers: Option<bool>,
    /// Ordering within each partition.
    #[serde(default, deserialize_with = "optional_object_list")]
    pub sort: Option<Vec<SortField>>,
    /// Partition fields.
    #[serde(default)]
    pub groupby: Option<Vec<String>>,
    /// Frame bounds.
    pub frame: Frame,
}

impl WindowTransform {
    /// Creates an unsorted, ungrouped transform.
    pub fn new(window: Vec<WindowFieldDef>, frame: Frame) -> Self {
        Self {
            window,
            ignore_peers: None,
            sort: None,
            groupby: None,
            frame,
        }
    }

    /// Sort entries, empty when none were authored.
    pub fn sort_fields(&self) -> &[SortField] {
        self.sort.as_deref().unwrap_or(&[])
    }

    /// Partition fields, empty when none were authored.
    pub fn groupby_fields(&self) -> &[String] {
        self.groupby.as_deref().unwrap_or(&[])
    }

    /// JSON form, omitting members that were not authored.
    ///
    /// This is the only serialized form; `Serialize` delegates here so hashing and assembly stay
    /// infallible.
    pub fn to_json(&self) -> Value {
        let mut m = Map::new();
        m.insert(
            "window".into(),
            self.window.iter().map(WindowFieldDef::to_json).collect(),
        );
        if let Some(ignore_peers) = self.ignore_peers {
            m.insert("ignorePeers".into(), Value::Bool(ignore_peers));
        }
        if let Some(sort) = &self.sort {
            let entries = sort
                .iter()
                .map(|s| {
                    let mut e = Map::new();
                    e.insert("field".into(), Value::from(s.field.as_str()));
                    e.insert("order".into(), Value::from(s.order.as_str()));
                    Value::Object(e)
                })
                .collect();
            m.insert("sort".into(), entries);
        }
        if let Some(groupby) = &self.groupby {
            m.insert(
                "groupby".into(),
                groupby.iter().map(|g| Value::from(g.as_str())).collect(),
            );
        }
        m.insert("frame".into(), self.frame.to_json());
        Value::Object(m)
    }

    /// Returns a copy with every entry's `as` filled in and every param in canonical form.
    pub(crate) fn normalized(mut self) -> Self {
        for def in &mut self.window {
            if def.output.is_none() {
                def.output = Some(def.op.clone());
            }
            def.param = def.param.take().map(canonical_number);
        }
        self
    }
}

impl Serialize for WindowTransform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Rewrites a whole-valued float within the safe integer range as an integer.
fn canonical_number(n: Number) -> Number {
    let Some(f) = n.as_f64().filter(|_| n.is_f64()) else {
        return n;
    };
    if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&f) {
        return n;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "range checked above, fraction checked below"
    )]
    let i = f as i64;
    if i as f64 == f { Number::from(i) } else { n }
}
