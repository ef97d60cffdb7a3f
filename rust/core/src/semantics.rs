// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic and material resolution
//!
//! Semantic `values` and material `values` share the nesting of the boundary
//! they describe. Both are flattened with [`flatten_values`] so that position
//! *i* lines up with ring set *i* of the flattened boundary.

use serde_json::{Map, Value};

use crate::document::{Attributes, RawSemantics};

/// Marker for "no value" in a flattened values list
pub const NO_VALUE: i64 = -1;

/// Flatten arbitrarily nested values to exactly `target` entries
///
/// Arrays are recursed into, integers are kept and anything else (null
/// included) becomes [`NO_VALUE`]. The result is padded with [`NO_VALUE`] or
/// truncated so ragged input still aligns with the ring sets.
pub fn flatten_values(node: &Value, target: usize) -> Vec<i64> {
    let mut flat = flatten(node);
    if flat.len() != target {
        tracing::warn!(
            found = flat.len(),
            expected = target,
            "values array does not match ring set count"
        );
        flat.resize(target, NO_VALUE);
    }
    flat
}

fn flatten(node: &Value) -> Vec<i64> {
    match node {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        Value::Number(n) => vec![n.as_i64().unwrap_or(NO_VALUE)],
        _ => vec![NO_VALUE],
    }
}

#[inline]
fn as_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

/// Semantic surfaces of one geometry plus the per-ring-set type values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticTable {
    pub surfaces: Vec<Attributes>,
    pub values: Vec<i64>,
}

impl SemanticTable {
    /// Resolve `semantics` against `ring_sets` flattened ring sets
    ///
    /// Without semantics every ring set points at index 0 of an empty table.
    pub fn resolve(semantics: Option<&RawSemantics>, ring_sets: usize) -> Self {
        match semantics {
            Some(raw) => Self {
                surfaces: raw.surfaces.clone(),
                values: flatten_values(&raw.values, ring_sets),
            },
            None => Self {
                surfaces: Vec::new(),
                values: vec![0; ring_sets],
            },
        }
    }

    /// Attribute dictionary of ring set `i`, if any
    pub fn attributes_for(&self, ring_set: usize) -> Option<&Attributes> {
        let idx = as_index(*self.values.get(ring_set)?)?;
        self.surfaces.get(idx)
    }

    /// Every key used by any semantic surface
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.surfaces.iter().flat_map(|s| s.keys())
    }
}

/// Source of material names
pub trait MaterialPalette {
    /// Name of material `index`, `None` if it has none
    fn material_name(&self, index: usize) -> Option<String>;
}

impl MaterialPalette for [Map<String, Value>] {
    fn material_name(&self, index: usize) -> Option<String> {
        match self.get(index)?.get("name")? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl MaterialPalette for Vec<Map<String, Value>> {
    fn material_name(&self, index: usize) -> Option<String> {
        self.as_slice().material_name(index)
    }
}

/// Material assignment of one theme
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTheme {
    pub theme: String,
    /// Material index per ring set
    pub indices: Vec<Option<usize>>,
    /// Display name per ring set; the index when the material is unnamed
    pub names: Vec<Option<String>>,
}

impl MaterialTheme {
    /// Resolve one theme entry (`{"value": n}` or `{"values": [...]}`)
    pub fn resolve(
        theme: &str,
        entry: &Value,
        ring_sets: usize,
        palette: &(impl MaterialPalette + ?Sized),
    ) -> Self {
        let indices: Vec<Option<usize>> = if let Some(single) = entry.get("value") {
            let idx = single.as_i64().and_then(as_index);
            vec![idx; ring_sets]
        } else if let Some(values) = entry.get("values") {
            flatten_values(values, ring_sets)
                .into_iter()
                .map(as_index)
                .collect()
        } else {
            vec![None; ring_sets]
        };

        let names = indices
            .iter()
            .map(|idx| {
                idx.map(|i| palette.material_name(i).unwrap_or_else(|| i.to_string()))
            })
            .collect();

        Self {
            theme: theme.to_string(),
            indices,
            names,
        }
    }

    pub fn name_for(&self, ring_set: usize) -> Option<&str> {
        self.names.get(ring_set)?.as_deref()
    }
}

/// Resolve every theme of a geometry's `material` member, in document order
pub fn resolve_materials(
    material: Option<&Map<String, Value>>,
    ring_sets: usize,
    palette: &(impl MaterialPalette + ?Sized),
) -> Vec<MaterialTheme> {
    material
        .map(|themes| {
            themes
                .iter()
                .map(|(theme, entry)| MaterialTheme::resolve(theme, entry, ring_sets, palette))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn palette() -> Vec<Map<String, Value>> {
        let materials = json!([{ "name": "brick" }, { "diffuseColor": [1, 0, 0] }]);
        serde_json::from_value(materials).unwrap()
    }

    #[test]
    fn flatten_is_idempotent_on_flat_input() {
        let flat = flatten_values(&json!([0, 1, -1, 2]), 4);
        assert_eq!(flat, vec![0, 1, -1, 2]);
        let again = flatten_values(&json!(flat), 4);
        assert_eq!(again, flat);
    }

    #[test]
    fn nested_and_null_values() {
        let values = json!([[0, null, 1], [[2]]]);
        assert_eq!(flatten_values(&values, 4), vec![0, -1, 1, 2]);
    }

    #[test]
    fn ragged_values_are_padded_or_truncated() {
        assert_eq!(flatten_values(&json!([0]), 3), vec![0, -1, -1]);
        assert_eq!(flatten_values(&json!([0, 1, 2, 3]), 2), vec![0, 1]);
    }

    #[test]
    fn semantics_lookup() {
        let raw = RawSemantics {
            surfaces: vec![
                serde_json::from_value(json!({ "type": "RoofSurface" })).unwrap(),
                serde_json::from_value(json!({ "type": "WallSurface", "slope": 90 })).unwrap(),
            ],
            values: json!([[1, 0, null]]),
        };
        let table = SemanticTable::resolve(Some(&raw), 3);
        assert_eq!(table.attributes_for(0).unwrap()["type"], "WallSurface");
        assert_eq!(table.attributes_for(1).unwrap()["type"], "RoofSurface");
        assert!(table.attributes_for(2).is_none());
        assert!(table.attributes_for(7).is_none());
        assert_eq!(table.keys().filter(|k| *k == "type").count(), 2);
    }

    #[test]
    fn absent_semantics_resolve_to_nothing() {
        let table = SemanticTable::resolve(None, 2);
        assert_eq!(table.values, vec![0, 0]);
        assert!(table.attributes_for(0).is_none());
    }

    #[test]
    fn single_material_value_applies_everywhere() {
        let theme = MaterialTheme::resolve("irradiation", &json!({ "value": 0 }), 3, &palette());
        assert_eq!(theme.indices, vec![Some(0); 3]);
        assert_eq!(theme.name_for(2), Some("brick"));
    }

    #[test]
    fn unnamed_material_falls_back_to_index() {
        let theme = MaterialTheme::resolve(
            "visual",
            &json!({ "values": [[1, null, 0]] }),
            3,
            &palette(),
        );
        assert_eq!(theme.indices, vec![Some(1), None, Some(0)]);
        assert_eq!(theme.name_for(0), Some("1"));
        assert_eq!(theme.name_for(1), None);
        assert_eq!(theme.name_for(2), Some("brick"));
    }

    #[test]
    fn themes_keep_document_order() {
        let material: Map<String, Value> = serde_json::from_value(json!({
            "winter": { "value": 0 },
            "summer": { "values": [1] }
        }))
        .unwrap();
        let themes = resolve_materials(Some(&material), 1, &palette());
        let names: Vec<&str> = themes.iter().map(|t| t.theme.as_str()).collect();
        assert_eq!(names, vec!["winter", "summer"]);
    }
}
