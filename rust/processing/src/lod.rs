// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LoD discovery across a batch

use std::collections::BTreeSet;

use cityjson_lite_core::{CityJsonDocument, RawCityObject};

use crate::error::Result;

/// Sorted, deduplicated LoDs of every city object geometry in the batch
///
/// Any invalid document fails the whole call. Geometry without a `lod` is
/// ignored, as are objects without geometry.
pub fn collect_lods<S: AsRef<str>>(contents: &[S]) -> Result<Vec<String>> {
    let mut lods = BTreeSet::new();
    for content in contents {
        let doc = CityJsonDocument::parse_validated(content.as_ref())?;
        for (_, value) in doc.city_object_entries() {
            let object = RawCityObject::from_value(value)?;
            let Some(geometry) = object.geometry.as_ref() else {
                continue;
            };
            lods.extend(geometry.iter().filter_map(|g| g.lod_string()));
        }
    }
    tracing::debug!(lods = ?lods, "LoDs collected");
    Ok(lods.into_iter().collect())
}
