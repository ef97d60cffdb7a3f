// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object selection by attribute value

use cityjson_lite_core::{CityObject, Result as CoreResult};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::export::{value_cell, FlatTable};
use crate::pipeline::{BatchResult, Issue};

/// Keeps objects whose own or inherited `key` matches one of `values`
///
/// Values are compared as table cells, so `12` matches `"12"` and a JSON
/// string matches without quotes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeFilter {
    key: Option<String>,
    values: Vec<String>,
}

impl AttributeFilter {
    /// A key needs values and values need a key; neither gives a filter that keeps everything
    pub fn new(key: Option<String>, values: Vec<String>) -> Result<Self> {
        let key = key.filter(|k| !k.is_empty());
        match (&key, values.is_empty()) {
            (Some(k), true) => Err(Error::FilterInputMismatch(format!(
                "key \"{}\" given without values",
                k
            ))),
            (None, false) => Err(Error::FilterInputMismatch(format!(
                "{} values given without a key",
                values.len()
            ))),
            _ => Ok(Self { key, values }),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.key.is_some()
    }

    /// Whether an object with intact references matches
    fn matches(&self, batch: &BatchResult, object: &CityObject) -> CoreResult<bool> {
        let Some(key) = self.key.as_deref() else {
            return Ok(true);
        };
        batch.collection.check_references(&object.name)?;
        Ok(match batch.collection.resolved_attribute(&object.name, key)? {
            Some((value, _)) => {
                let cell = value_cell(&value);
                self.values.iter().any(|v| *v == cell)
            }
            None => false,
        })
    }

    /// Selected objects in collection order, plus issues for objects that could not be judged
    ///
    /// Filtered-out objects never match. An object with broken references is
    /// neither selected nor silently dropped: it is reported, as in
    /// [`FlattenExporter::exportable`](crate::export::FlattenExporter::exportable).
    pub fn select<'a>(&self, batch: &'a BatchResult) -> (Vec<&'a CityObject>, Vec<Issue>) {
        let objects: Vec<(usize, &CityObject)> = batch
            .collection
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_filtered_out)
            .collect();
        let mut judged: Vec<(usize, &CityObject, CoreResult<bool>)> = objects
            .into_par_iter()
            .map(|(i, o)| (i, o, self.matches(batch, o)))
            .filter(|(_, _, r)| !matches!(r, Ok(false)))
            .collect();
        judged.sort_unstable_by_key(|(i, _, _)| *i);

        let mut selected = Vec::new();
        let mut issues = Vec::new();
        for (_, object, result) in judged {
            match result {
                Ok(_) => selected.push(object),
                Err(e) => {
                    tracing::warn!(object = %object.name, error = %e, "Object not filtered");
                    issues.push(Issue::new(None, Some(object.name.as_str()), &e));
                }
            }
        }
        (selected, issues)
    }

    /// Rows of `table` whose `Name` belongs to a selected object
    pub fn filter_table(&self, batch: &BatchResult, table: &FlatTable) -> FlatTable {
        if !self.is_active() {
            return table.clone();
        }
        let (selected, _) = self.select(batch);
        let names: FxHashSet<&str> = selected.into_iter().map(|o| o.name.as_str()).collect();
        let Some(col) = table.column("Name") else {
            return FlatTable::new(table.keys.clone());
        };

        let mut filtered = FlatTable::new(table.keys.clone());
        filtered.rows = table
            .rows
            .iter()
            .filter(|row| row.get(col).is_some_and(|n| names.contains(n.as_str())))
            .cloned()
            .collect();
        filtered
    }
}
