// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CityJSON document model
//!
//! Only the members the decoder needs are typed. Boundaries, semantic values and
//! attributes stay as [`serde_json::Value`] because their nesting depends on the
//! geometry type; [`crate::boundary`] and [`crate::semantics`] give them shape.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result, ValidityIssue};

/// Attribute dictionary, copied verbatim from the document
pub type Attributes = Map<String, Value>;

/// Versions accepted by [`CityJsonDocument::validate`]
pub const SUPPORTED_VERSIONS: [&str; 2] = ["1.0", "1.1"];

/// Top-level CityJSON document
#[derive(Debug, Clone, Deserialize)]
pub struct CityJsonDocument {
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub version: Option<String>,
    pub transform: Option<Transform>,
    pub vertices: Option<Vec<[f64; 3]>>,
    /// City objects in document order
    #[serde(rename = "CityObjects")]
    pub city_objects: Option<Map<String, Value>>,
    #[serde(rename = "geometry-templates")]
    pub geometry_templates: Option<GeometryTemplates>,
    pub appearance: Option<Appearance>,
}

/// `transform` member
#[derive(Debug, Clone, Deserialize)]
pub struct Transform {
    pub scale: Option<[f64; 3]>,
    pub translate: Option<[f64; 3]>,
}

/// `geometry-templates` member
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeometryTemplates {
    #[serde(default)]
    pub templates: Vec<RawGeometry>,
    #[serde(rename = "vertices-templates")]
    pub vertices_templates: Option<Vec<[f64; 3]>>,
}

/// `appearance` member; only materials are read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Appearance {
    #[serde(default)]
    pub materials: Vec<Map<String, Value>>,
}

/// One entry of `CityObjects`
#[derive(Debug, Clone, Deserialize)]
pub struct RawCityObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub geometry: Option<Vec<RawGeometry>>,
    pub attributes: Option<Attributes>,
    pub parents: Option<Vec<String>>,
    pub children: Option<Vec<String>>,
}

/// One geometry entry (also the shape of a template)
#[derive(Debug, Clone, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    /// String in 1.1, number in 1.0
    pub lod: Option<Value>,
    #[serde(default)]
    pub boundaries: Value,
    pub semantics: Option<RawSemantics>,
    pub material: Option<Map<String, Value>>,
    pub template: Option<usize>,
}

/// `semantics` member of a geometry
#[derive(Debug, Clone, Deserialize)]
pub struct RawSemantics {
    #[serde(default)]
    pub surfaces: Vec<Attributes>,
    #[serde(default)]
    pub values: Value,
}

impl RawGeometry {
    /// LoD as a string; numbers keep their JSON spelling ("2", "2.2")
    pub fn lod_string(&self) -> Option<String> {
        match self.lod.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl RawCityObject {
    /// Decode a `CityObjects` entry
    pub fn from_value(value: &Value) -> Result<Self> {
        RawCityObject::deserialize(value)
            .map_err(|e| Error::StructuralInvalid(ValidityIssue::Malformed(e.to_string())))
    }
}

impl CityJsonDocument {
    /// Parse a document from its full text
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::StructuralInvalid(ValidityIssue::Malformed(e.to_string())))
    }

    /// Parse and validate in one step
    pub fn parse_validated(content: &str) -> Result<Self> {
        let doc = Self::parse(content)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Minimal structural check required before decoding can proceed safely
    pub fn validate(&self) -> Result<()> {
        let invalid = |issue| -> Result<()> { Err(Error::StructuralInvalid(issue)) };

        match self.doc_type.as_deref() {
            Some("CityJSON") => {}
            other => return invalid(ValidityIssue::NotCityJson(other.map(str::to_string))),
        }
        match self.version.as_deref() {
            None => return invalid(ValidityIssue::MissingField("version")),
            Some(v) if !SUPPORTED_VERSIONS.contains(&v) => {
                return invalid(ValidityIssue::UnsupportedVersion(v.to_string()))
            }
            Some(_) => {}
        }
        let transform = match &self.transform {
            Some(t) => t,
            None => return invalid(ValidityIssue::MissingField("transform")),
        };
        if transform.scale.is_none() {
            return invalid(ValidityIssue::MissingField("transform.scale"));
        }
        if transform.translate.is_none() {
            return invalid(ValidityIssue::MissingField("transform.translate"));
        }
        if self.vertices.is_none() {
            return invalid(ValidityIssue::MissingField("vertices"));
        }
        if self.city_objects.is_none() {
            return invalid(ValidityIssue::MissingField("CityObjects"));
        }
        Ok(())
    }

    /// Scale triple, or unit scale when absent
    pub fn scale(&self) -> [f64; 3] {
        self.transform
            .as_ref()
            .and_then(|t| t.scale)
            .unwrap_or([1.0, 1.0, 1.0])
    }

    /// Translate triple, or zero when absent
    pub fn translate(&self) -> [f64; 3] {
        self.transform
            .as_ref()
            .and_then(|t| t.translate)
            .unwrap_or([0.0, 0.0, 0.0])
    }

    /// Iterate over `CityObjects` in document order
    pub fn city_object_entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.city_objects.iter().flat_map(|m| m.iter())
    }

    /// Number of entries in `CityObjects`
    pub fn city_object_count(&self) -> usize {
        self.city_objects.as_ref().map_or(0, |m| m.len())
    }

    /// Materials palette from `appearance`
    pub fn materials(&self) -> &[Map<String, Value>] {
        self.appearance
            .as_ref()
            .map(|a| a.materials.as_slice())
            .unwrap_or(&[])
    }
}
