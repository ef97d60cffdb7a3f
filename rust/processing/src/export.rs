// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flat key/value tables for objects and surfaces.
//!
//! Every row has one cell per key. `None` marks an absent value and a trailing
//! `*` marks a value inherited from a parent.

use cityjson_lite_core::{CityObject, GeoObject, TemplateObject};
use serde::Serialize;
use serde_json::Value;

use crate::pipeline::{BatchResult, Issue};

/// Cell text of an absent value
pub const ABSENT: &str = "None";
/// Suffix of an inherited value
pub const INHERITED_SUFFIX: &str = "*";
/// Prefix of material columns in the surface table
pub const MATERIAL_PREFIX: &str = "Material ";

/// Prefix of attribute columns whose key is already a column
pub const ATTRIBUTE_PREFIX: &str = "Attribute ";
/// Prefix of semantic columns whose key is already a column
pub const SEMANTIC_PREFIX: &str = "Semantic ";

pub const OBJECT_COLUMNS: [&str; 6] =
    ["Name", "Object Type", "Parents", "Children", "Template", "Anchor"];
pub const SURFACE_COLUMNS: [&str; 5] =
    ["Name", "Geometry Type", "Geometry Index", "LoD", "Degraded"];

/// Uniform-width string table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTable {
    pub keys: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlatTable {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            rows: Vec::new(),
        }
    }

    pub fn column(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Cell of `row` under `key`
    pub fn get(&self, row: usize, key: &str) -> Option<&str> {
        let col = self.column(key)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Both tables plus the objects skipped for broken references
#[derive(Debug, Clone, Default)]
pub struct FlatExport {
    pub objects: FlatTable,
    pub surfaces: FlatTable,
    pub issues: Vec<Issue>,
}

/// Text of a JSON value; strings unquoted, null absent
pub fn value_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => ABSENT.to_string(),
        other => other.to_string(),
    }
}

fn names_cell(names: &[String]) -> String {
    if names.is_empty() {
        ABSENT.to_string()
    } else {
        names.join(", ")
    }
}

/// Column name for `key`, prefixed until it no longer clashes with `taken`
fn unique_column(taken: &[String], key: &str, prefix: &str) -> String {
    let mut name = key.to_string();
    while taken.contains(&name) {
        name = format!("{}{}", prefix, name);
    }
    name
}

fn anchor_cell(template: Option<&TemplateObject>) -> String {
    match template {
        Some(t) => format!("{}, {}, {}", t.anchor.x, t.anchor.y, t.anchor.z),
        None => ABSENT.to_string(),
    }
}

/// Turns a read batch into flat tables
pub struct FlattenExporter<'a> {
    batch: &'a BatchResult,
}

impl<'a> FlattenExporter<'a> {
    pub fn new(batch: &'a BatchResult) -> Self {
        Self { batch }
    }

    /// Objects that get rows, in collection order, and the issues of those that don't
    pub fn exportable(&self) -> (Vec<&'a CityObject>, Vec<Issue>) {
        let mut kept = Vec::new();
        let mut issues = Vec::new();
        for object in self.batch.collection.iter().filter(|o| !o.is_filtered_out) {
            match self.batch.collection.check_references(&object.name) {
                Ok(()) => kept.push(object),
                Err(e) => {
                    tracing::warn!(object = %object.name, error = %e, "Object not exported");
                    issues.push(Issue::new(None, Some(object.name.as_str()), &e));
                }
            }
        }
        (kept, issues)
    }

    pub fn object_table(&self) -> FlatTable {
        self.object_rows(&self.exportable().0)
    }

    pub fn surface_table(&self) -> FlatTable {
        self.surface_rows(&self.exportable().0)
    }

    pub fn export(&self) -> FlatExport {
        let (objects, issues) = self.exportable();
        FlatExport {
            objects: self.object_rows(&objects),
            surfaces: self.surface_rows(&objects),
            issues,
        }
    }

    fn object_rows(&self, objects: &[&CityObject]) -> FlatTable {
        let attribute_keys = &self.batch.keys.attribute_keys;
        let mut keys: Vec<String> = OBJECT_COLUMNS.iter().map(|k| k.to_string()).collect();
        for key in attribute_keys {
            let column = unique_column(&keys, key, ATTRIBUTE_PREFIX);
            keys.push(column);
        }
        let mut table = FlatTable::new(keys);

        for object in objects {
            // references were checked in `exportable`
            let inherited = self
                .batch
                .collection
                .inherited_attributes(&object.name)
                .unwrap_or_default();

            let mut row = Vec::with_capacity(table.keys.len());
            row.push(object.name.clone());
            row.push(object.object_type.clone());
            row.push(names_cell(&object.parents));
            row.push(names_cell(&object.children));
            row.push(
                object
                    .template()
                    .map_or_else(|| ABSENT.to_string(), |t| t.template.to_string()),
            );
            row.push(anchor_cell(object.template()));

            for key in attribute_keys {
                let cell = match (object.attributes.get(key), inherited.get(key)) {
                    (Some(own), _) => value_cell(own),
                    (None, Some(from_parent)) => {
                        format!("{}{}", value_cell(from_parent), INHERITED_SUFFIX)
                    }
                    (None, None) => ABSENT.to_string(),
                };
                row.push(cell);
            }
            table.rows.push(row);
        }
        table
    }

    fn surface_rows(&self, objects: &[&CityObject]) -> FlatTable {
        let semantic_keys = &self.batch.keys.semantic_keys;
        let themes = &self.batch.keys.material_themes;
        let material_columns: Vec<String> = themes
            .iter()
            .map(|t| format!("{}{}", MATERIAL_PREFIX, t))
            .collect();

        let mut keys: Vec<String> = SURFACE_COLUMNS.iter().map(|k| k.to_string()).collect();
        for key in semantic_keys {
            let mut taken = keys.clone();
            taken.extend(material_columns.iter().cloned());
            keys.push(unique_column(&taken, key, SEMANTIC_PREFIX));
        }
        keys.extend(material_columns);
        let mut table = FlatTable::new(keys);

        for object in objects {
            for (index, geo) in self.batch.geometry_of(object).into_iter().enumerate() {
                let mut built = geo.surfaces.iter().peekable();
                for ring_set in 0..geo.ring_set_count {
                    // a failed ring set still gets its row
                    if geo.failed_ring_sets.contains(&ring_set) {
                        table.rows.push(self.surface_row(object, index, geo, ring_set));
                    }
                    while built.next_if(|s| s.semantic_index == ring_set).is_some() {
                        table.rows.push(self.surface_row(object, index, geo, ring_set));
                    }
                }
            }
        }
        table
    }

    fn surface_row(
        &self,
        object: &CityObject,
        index: usize,
        geo: &GeoObject,
        ring_set: usize,
    ) -> Vec<String> {
        let keys = &self.batch.keys;
        let attributes = geo.semantics.attributes_for(ring_set);

        let mut row = Vec::with_capacity(
            SURFACE_COLUMNS.len() + keys.semantic_keys.len() + keys.material_themes.len(),
        );
        row.push(object.name.clone());
        row.push(geo.geometry_type.as_str().to_string());
        row.push(index.to_string());
        row.push(geo.lod.clone().unwrap_or_else(|| ABSENT.to_string()));
        row.push(geo.degraded.to_string());

        for key in &keys.semantic_keys {
            row.push(
                attributes
                    .and_then(|a| a.get(key))
                    .map_or_else(|| ABSENT.to_string(), value_cell),
            );
        }
        for theme in &keys.material_themes {
            row.push(
                geo.ring_set_material(ring_set, theme)
                    .map_or_else(|| ABSENT.to_string(), str::to_string),
            );
        }
        row
    }
}
