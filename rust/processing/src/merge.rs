// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object information copied onto surface rows.

use rustc_hash::FxHashMap;

use crate::export::{FlatTable, ABSENT};

/// Surface table extended with the columns of the owning object
///
/// Surface keys come first, then every object key not already present. Rows are
/// joined on `Name`; a surface without an object row gets `None` cells.
pub fn merge_object_info(objects: &FlatTable, surfaces: &FlatTable) -> FlatTable {
    let extra: Vec<(usize, &String)> = objects
        .keys
        .iter()
        .enumerate()
        .filter(|(_, k)| !surfaces.keys.contains(k))
        .collect();

    let object_rows: FxHashMap<&str, &Vec<String>> = match objects.column("Name") {
        Some(col) => objects
            .rows
            .iter()
            .filter_map(|row| Some((row.get(col)?.as_str(), row)))
            .collect(),
        None => FxHashMap::default(),
    };
    let surface_name = surfaces.column("Name");

    let keys = surfaces
        .keys
        .iter()
        .cloned()
        .chain(extra.iter().map(|(_, k)| (*k).clone()))
        .collect();
    let mut merged = FlatTable::new(keys);

    for row in &surfaces.rows {
        let owner = surface_name
            .and_then(|col| row.get(col))
            .and_then(|name| object_rows.get(name.as_str()));

        let mut out = row.clone();
        out.extend(extra.iter().map(|(col, _)| {
            owner
                .and_then(|o| o.get(*col))
                .cloned()
                .unwrap_or_else(|| ABSENT.to_string())
        }));
        merged.rows.push(out);
    }
    merged
}
