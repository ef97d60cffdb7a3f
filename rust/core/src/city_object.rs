// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! City objects and the object graph
//!
//! Objects are kept in a [`CityCollection`] keyed by their sanitized name and
//! refer to each other only by name. Attribute inheritance is one level deep:
//! an object sees its own attributes plus those of its parents, the first
//! parent in declaration order winning.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::boundary::{Boundary, GeometryType};
use crate::document::{Attributes, RawCityObject};
use crate::error::{Error, MissingReference, Result, ValidityIssue};
use crate::surface::{GeoObject, SurfaceBuilder};
use crate::template::{TemplateLibrary, TemplateObject};
use crate::vertex::Vertex;

/// Strip characters that are not allowed in host object names
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '{' | '}' | '?' | '@' | '/' | '\\') && !c.is_control())
        .collect()
}

/// Geometry held by a city object
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ObjectGeometry {
    #[default]
    None,
    Owned(Vec<GeoObject>),
    Instance(TemplateObject),
}

/// Everything a city object needs from its document while decoding
pub struct DecodeContext<'a> {
    pub vertices: &'a [Vertex],
    pub builder: &'a dyn SurfaceBuilder,
    pub tolerance: f64,
    pub materials: &'a [Attributes],
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityObject {
    pub name: String,
    pub object_type: String,
    pub attributes: Attributes,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub geometry: ObjectGeometry,
    pub is_filtered_out: bool,
}

impl CityObject {
    pub fn new(name: &str, raw: RawCityObject, geometry: ObjectGeometry) -> Self {
        let sanitize_all = |names: Option<Vec<String>>| {
            names
                .unwrap_or_default()
                .iter()
                .map(|n| sanitize_name(n))
                .collect()
        };
        let is_filtered_out = geometry == ObjectGeometry::None;
        Self {
            name: sanitize_name(name),
            object_type: raw.object_type,
            attributes: raw.attributes.unwrap_or_default(),
            parents: sanitize_all(raw.parents),
            children: sanitize_all(raw.children),
            geometry,
            is_filtered_out,
        }
    }

    /// Decode one `CityObjects` entry and build its surfaces
    ///
    /// A GeometryInstance makes the whole object an instance; any other
    /// geometry next to it is ignored. MultiPoint and MultiLineString entries
    /// carry no surfaces and are skipped.
    pub fn decode(name: &str, value: &Value, ctx: &DecodeContext<'_>) -> Result<Self> {
        let mut raw = RawCityObject::from_value(value)?;
        let entries = raw.geometry.take().unwrap_or_default();

        let instance = entries
            .iter()
            .find(|g| g.geometry_type == GeometryType::GeometryInstance.as_str());

        let geometry = if let Some(g) = instance {
            if entries.len() > 1 {
                tracing::warn!(object = name, "geometry next to a GeometryInstance ignored");
            }
            let template = g.template.ok_or(Error::StructuralInvalid(
                ValidityIssue::MissingField("template"),
            ))?;
            let anchor_index =
                match Boundary::decode(GeometryType::GeometryInstance, &g.boundaries)? {
                    Boundary::Instance { anchor } => anchor,
                    _ => return Err(Error::malformed_boundary("GeometryInstance without anchor")),
                };
            let instance = TemplateObject::resolve(template, anchor_index, ctx.vertices)?;
            ObjectGeometry::Instance(instance)
        } else {
            let mut owned = Vec::with_capacity(entries.len());
            for g in &entries {
                if !GeometryType::parse(&g.geometry_type)?.has_surfaces() {
                    tracing::debug!(
                        object = name,
                        geometry_type = %g.geometry_type,
                        "geometry skipped"
                    );
                    continue;
                }
                owned.push(GeoObject::build(
                    g,
                    ctx.vertices,
                    ctx.builder,
                    ctx.tolerance,
                    ctx.materials,
                )?);
            }
            if owned.is_empty() {
                ObjectGeometry::None
            } else {
                ObjectGeometry::Owned(owned)
            }
        };

        Ok(Self::new(name, raw, geometry))
    }

    #[inline]
    pub fn has_geometry(&self) -> bool {
        !matches!(self.geometry, ObjectGeometry::None)
    }

    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.children.is_empty()
    }

    #[inline]
    pub fn is_child(&self) -> bool {
        !self.parents.is_empty()
    }

    pub fn template(&self) -> Option<&TemplateObject> {
        match &self.geometry {
            ObjectGeometry::Instance(t) => Some(t),
            _ => None,
        }
    }

    pub fn geo_objects(&self) -> &[GeoObject] {
        match &self.geometry {
            ObjectGeometry::Owned(g) => g,
            _ => &[],
        }
    }

    /// Keep only geometry whose LoD is in `lods`; an empty list keeps everything
    ///
    /// Instances are judged by their template's LoD; an instance of a template
    /// missing from the library is kept. The object is flagged filtered out
    /// when nothing remains.
    pub fn retain_lods(&mut self, lods: &[String], library: &TemplateLibrary) {
        if lods.is_empty() {
            return;
        }
        let wanted = |lod: Option<&str>| lod.is_some_and(|l| lods.iter().any(|w| w == l));

        match &mut self.geometry {
            ObjectGeometry::None => {}
            ObjectGeometry::Owned(geos) => {
                geos.retain(|g| wanted(g.lod.as_deref()));
                if geos.is_empty() {
                    self.geometry = ObjectGeometry::None;
                }
            }
            // a missing template is left for instancing to report
            ObjectGeometry::Instance(t) if library.get(t.template).is_some() => {
                if !wanted(library.lod_of(t.template)) {
                    self.is_filtered_out = true;
                }
            }
            ObjectGeometry::Instance(_) => {}
        }
        if !self.has_geometry() {
            self.is_filtered_out = true;
        }
    }
}

/// Name-keyed object store preserving insertion order
#[derive(Debug, Clone, Default)]
pub struct CityCollection {
    objects: Vec<CityObject>,
    by_name: FxHashMap<String, usize>,
}

impl CityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; a name already present is rejected
    pub fn insert(&mut self, object: CityObject) -> Result<()> {
        if self.by_name.contains_key(&object.name) {
            return Err(Error::DuplicateObject(object.name));
        }
        self.by_name.insert(object.name.clone(), self.objects.len());
        self.objects.push(object);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CityObject> {
        self.by_name.get(name).map(|&i| &self.objects[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CityObject> {
        self.objects.iter()
    }

    fn require(&self, name: &str) -> Result<&CityObject> {
        self.get(name)
            .ok_or_else(|| Error::ReferentialMissing(MissingReference::Object(name.to_string())))
    }

    /// Attributes an object inherits from its parents
    ///
    /// Only keys the object does not define itself are returned. Parents are
    /// consulted in order and the first one to define a key wins. Grandparents
    /// are not consulted.
    pub fn inherited_attributes(&self, name: &str) -> Result<Attributes> {
        let object = self.require(name)?;
        let mut inherited = Attributes::new();
        for parent_name in &object.parents {
            let parent = self.get(parent_name).ok_or_else(|| {
                Error::ReferentialMissing(MissingReference::Parent {
                    object: object.name.clone(),
                    parent: parent_name.clone(),
                })
            })?;
            for (key, value) in &parent.attributes {
                if !object.attributes.contains_key(key) && !inherited.contains_key(key) {
                    inherited.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(inherited)
    }

    /// Own value of `key`, else the inherited one; the flag tells which
    pub fn resolved_attribute(&self, name: &str, key: &str) -> Result<Option<(Value, bool)>> {
        let object = self.require(name)?;
        if let Some(own) = object.attributes.get(key) {
            return Ok(Some((own.clone(), false)));
        }
        Ok(self
            .inherited_attributes(name)?
            .remove(key)
            .map(|v| (v, true)))
    }

    /// Every parent and child of the object must be in the collection
    pub fn check_references(&self, name: &str) -> Result<()> {
        let object = self.require(name)?;
        if let Some(parent) = object.parents.iter().find(|p| !self.contains(p)) {
            return Err(Error::ReferentialMissing(MissingReference::Parent {
                object: object.name.clone(),
                parent: parent.clone(),
            }));
        }
        if let Some(child) = object.children.iter().find(|c| !self.contains(c)) {
            return Err(Error::ReferentialMissing(MissingReference::Child {
                object: object.name.clone(),
                child: child.clone(),
            }));
        }
        Ok(())
    }
}
