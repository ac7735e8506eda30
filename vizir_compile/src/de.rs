// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object-only deserialization.
//!
//! Derived struct impls also accept a positional JSON array (`["rank", "x"]` as
//! `{op, field}`). Authored records are always objects, so every nested record is read through
//! these helpers, which reject anything but a map.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

struct Object<T>(T);

impl<'de, T: DeserializeOwned> Deserialize<'de> for Object<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        serde_json::from_value(Value::Object(map))
            .map(Object)
            .map_err(D::Error::custom)
    }
}

/// Reads a `T` that must be a JSON object.
pub(crate) fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Object::deserialize(deserializer).map(|o| o.0)
}

/// Reads an array whose elements must be JSON objects.
pub(crate) fn object_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Vec::<Object<T>>::deserialize(deserializer)?;
    Ok(items.into_iter().map(|o| o.0).collect())
}

/// Like [`object`], with `null` read as `None`.
pub(crate) fn optional_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let item = Option::<Object<T>>::deserialize(deserializer)?;
    Ok(item.map(|o| o.0))
}

/// Like [`object_list`], with `null` read as `None`.
pub(crate) fn optional_object_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Option::<Vec<Object<T>>>::deserialize(deserializer)?;
    Ok(items.map(|v| v.into_iter().map(|o| o.0).collect()))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use serde_json::json;

    use super::*;
    use crate::transform::SortField;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "optional_object_list")]
        sort: Option<Vec<SortField>>,
    }

    #[test]
    fn objects_pass_and_arrays_fail() {
        let ok: Holder =
            serde_json::from_value(json!({"sort": [{"field": "f", "order": "ascending"}]}))
                .unwrap();
        assert_eq!(ok.sort.map(|s| s.len()), Some(1));

        let missing: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(missing.sort.is_none());

        let positional = serde_json::from_value::<Holder>(json!({"sort": [["f", "ascending"]]}));
        assert!(positional.is_err());
    }
}
