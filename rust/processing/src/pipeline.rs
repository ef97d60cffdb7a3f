// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-file reading pipeline with parallel object decoding.

use std::collections::{BTreeMap, BTreeSet};

use cityjson_lite_core::{
    decode_template_vertices, decode_vertices, instantiate, CityCollection, CityJsonDocument,
    CityObject, DecodeContext, Error as CoreError, ErrorKind, FloatingOrigin, GeoObject,
    TemplateLibrary, VertexTransform,
};
use cityjson_lite_geometry::{Mesh, PlanarSurfaceBuilder};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::export::ABSENT;
use crate::settings::{ReaderSettings, SettingsWarning};

/// A problem recorded while reading; the batch carries on
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    /// Position of the file in the batch, when known
    pub file: Option<usize>,
    /// Object the issue belongs to; `None` when the whole file was dropped
    pub object: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl Issue {
    pub fn new(file: Option<usize>, object: Option<&str>, error: &CoreError) -> Self {
        Self {
            file,
            object: object.map(str::to_string),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Column keys found in a batch, each set sorted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyDiscovery {
    pub attribute_keys: BTreeSet<String>,
    pub semantic_keys: BTreeSet<String>,
    pub material_themes: BTreeSet<String>,
}

impl KeyDiscovery {
    /// Keys of one object; geometry only counts when the object is kept
    pub fn of_object(object: &CityObject, instance: Option<&GeoObject>) -> Self {
        let mut keys = KeyDiscovery {
            attribute_keys: object.attributes.keys().cloned().collect(),
            ..Default::default()
        };
        if object.is_filtered_out {
            return keys;
        }
        for geo in object.geo_objects().iter().chain(instance) {
            keys.semantic_keys.extend(geo.semantics.keys().cloned());
            keys.material_themes
                .extend(geo.materials.iter().map(|m| m.theme.clone()));
        }
        keys
    }

    /// Set union
    pub fn merge(mut self, other: KeyDiscovery) -> KeyDiscovery {
        self.attribute_keys.extend(other.attribute_keys);
        self.semantic_keys.extend(other.semantic_keys);
        self.material_themes.extend(other.material_themes);
        self
    }
}

/// Everything read from a batch of documents
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub collection: CityCollection,
    /// Placed template geometry of instance objects, by object name
    pub instances: FxHashMap<String, GeoObject>,
    pub keys: KeyDiscovery,
    pub issues: Vec<Issue>,
    pub warnings: Vec<SettingsWarning>,
    /// Translate of the first file, unless files keep their own translate
    pub floating_origin: Option<[f64; 3]>,
}

impl BatchResult {
    /// Geometry of an object: owned, or its placed template
    pub fn geometry_of<'a>(&'a self, object: &'a CityObject) -> Vec<&'a GeoObject> {
        match object.template() {
            Some(_) => self.instances.get(&object.name).into_iter().collect(),
            None => object.geo_objects().iter().collect(),
        }
    }

    /// All constructed faces merged into one mesh per LoD
    ///
    /// Filtered-out objects are left out; geometry without a LoD goes under "None".
    pub fn meshes_by_lod(&self) -> BTreeMap<String, Mesh> {
        let mut meshes: BTreeMap<String, Mesh> = BTreeMap::new();
        for object in self.collection.iter().filter(|o| !o.is_filtered_out) {
            for geo in self.geometry_of(object) {
                let lod = geo.lod.clone().unwrap_or_else(|| ABSENT.to_string());
                meshes
                    .entry(lod)
                    .or_default()
                    .merge(&Mesh::from_geo_object(geo));
            }
        }
        meshes
    }
}

struct DecodedObject {
    object: CityObject,
    instance: Option<std::result::Result<GeoObject, CoreError>>,
}

/// Read a batch of CityJSON documents in order
///
/// The first successfully validated file fixes the floating origin. A file
/// that fails validation, or holds a structurally invalid object, is dropped
/// and recorded; other failures only drop the object concerned.
pub fn read_batch<S: AsRef<str>>(
    contents: &[S],
    settings: &ReaderSettings,
) -> Result<BatchResult> {
    let warnings = settings.validate()?;
    for warning in &warnings {
        tracing::warn!(?warning, "Reader settings warning");
    }

    let mut batch = BatchResult {
        warnings,
        ..Default::default()
    };
    let mut origin = FloatingOrigin::new();
    let builder = PlanarSurfaceBuilder::default();
    let lods = settings.active_lods();
    let placement = settings.placement();

    tracing::info!(
        files = contents.len(),
        lods = ?lods,
        translate = settings.translate,
        "Starting batch"
    );

    for (file, content) in contents.iter().enumerate() {
        let start = std::time::Instant::now();
        let content = content.as_ref();

        let doc = match CityJsonDocument::parse_validated(content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(file, error = %e, "File dropped");
                batch.issues.push(Issue::new(Some(file), None, &e));
                continue;
            }
        };

        let was_first = origin.is_first();
        let transform = VertexTransform::for_document(&doc, &placement, &mut origin);
        if was_first && !origin.is_first() {
            tracing::debug!(file, origin = ?origin.global(), "Floating origin set");
        }
        let vertices = decode_vertices(&doc, &transform);

        let library = decode_templates(&doc, settings, &builder, file, &mut batch.issues);

        let ctx = DecodeContext {
            vertices: &vertices,
            builder: &builder,
            tolerance: settings.tolerance,
            materials: doc.materials(),
        };

        let entries: Vec<(&String, &serde_json::Value)> = doc.city_object_entries().collect();
        let decoded: Vec<(&String, std::result::Result<DecodedObject, CoreError>)> = entries
            .par_iter()
            .map(|(name, value)| (*name, decode_object(name, value, &ctx, &lods, &library)))
            .collect();

        if let Some((name, Err(e))) = decoded
            .iter()
            .find(|(_, r)| matches!(r, Err(e) if e.is_fatal()))
        {
            tracing::warn!(file, object = %name, error = %e, "File dropped");
            batch.issues.push(Issue::new(Some(file), Some(name.as_str()), e));
            continue;
        }

        // merged only for objects that make it into the collection
        let keys: Vec<Option<KeyDiscovery>> = decoded
            .par_iter()
            .map(|(_, r)| {
                r.as_ref().ok().map(|d| {
                    let instance = d.instance.as_ref().and_then(|i| i.as_ref().ok());
                    KeyDiscovery::of_object(&d.object, instance)
                })
            })
            .collect();

        let mut inserted = 0usize;
        let mut filtered = 0usize;
        for ((name, result), object_keys) in decoded.into_iter().zip(keys) {
            let decoded = match result {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(file, object = %name, error = %e, "Object dropped");
                    batch.issues.push(Issue::new(Some(file), Some(name.as_str()), &e));
                    continue;
                }
            };
            let object_name = decoded.object.name.clone();
            if decoded.object.is_filtered_out {
                filtered += 1;
            }
            if let Err(e) = batch.collection.insert(decoded.object) {
                tracing::warn!(file, object = %object_name, error = %e, "Object dropped");
                batch.issues.push(Issue::new(Some(file), Some(object_name.as_str()), &e));
                continue;
            }
            if let Some(object_keys) = object_keys {
                batch.keys = std::mem::take(&mut batch.keys).merge(object_keys);
            }
            match decoded.instance {
                Some(Ok(geo)) => {
                    batch.instances.insert(object_name, geo);
                }
                Some(Err(e)) => {
                    tracing::warn!(file, object = %object_name, error = %e, "Instance not placed");
                    batch.issues.push(Issue::new(Some(file), Some(object_name.as_str()), &e));
                }
                None => {}
            }
            inserted += 1;
        }

        tracing::info!(
            file,
            objects = inserted,
            filtered_out = filtered,
            templates = library.len(),
            vertices = vertices.len(),
            time_ms = start.elapsed().as_millis(),
            "File read"
        );
    }

    batch.floating_origin = origin.global();
    tracing::info!(
        objects = batch.collection.len(),
        issues = batch.issues.len(),
        "Batch complete"
    );
    Ok(batch)
}

fn decode_templates(
    doc: &CityJsonDocument,
    settings: &ReaderSettings,
    builder: &PlanarSurfaceBuilder,
    file: usize,
    issues: &mut Vec<Issue>,
) -> TemplateLibrary {
    let Some(templates) = doc.geometry_templates.as_ref() else {
        return TemplateLibrary::new();
    };
    let vertices = decode_template_vertices(doc, settings.unit_scale);

    let results: Vec<(usize, cityjson_lite_core::Result<GeoObject>)> = templates
        .templates
        .par_iter()
        .enumerate()
        .map(|(index, raw)| {
            let geo =
                GeoObject::build(raw, &vertices, builder, settings.tolerance, doc.materials());
            (index, geo)
        })
        .collect();

    let mut library = TemplateLibrary::new();
    for (index, result) in results {
        match result {
            Ok(geo) => library.insert(index, geo),
            Err(e) => {
                tracing::warn!(file, template = index, error = %e, "Template dropped");
                issues.push(Issue::new(Some(file), None, &e));
            }
        }
    }
    tracing::debug!(file, templates = library.len(), "Templates decoded");
    library
}

fn decode_object(
    name: &str,
    value: &serde_json::Value,
    ctx: &DecodeContext<'_>,
    lods: &[String],
    library: &TemplateLibrary,
) -> std::result::Result<DecodedObject, CoreError> {
    let mut object = CityObject::decode(name, value, ctx)?;
    let had_geometry = object.has_geometry();
    object.retain_lods(lods, library);
    if had_geometry && object.is_filtered_out {
        tracing::debug!(object = %object.name, "Filtered out by LoD");
    }

    let instance = match object.template() {
        Some(t) if !object.is_filtered_out => Some(instantiate(t, library)),
        _ => None,
    };
    Ok(DecodedObject { object, instance })
}
