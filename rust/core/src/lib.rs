// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityJSON-Lite Core
//!
//! Decoding and semantic resolution for CityJSON documents.
//!
//! ## Overview
//!
//! - **Document model**: typed view of the members the decoder needs, plus the
//!   minimal validity check
//! - **Vertices**: dequantization, floating origin across files, world origin
//!   and true-north rotation
//! - **Boundaries**: depth-agnostic flattening of nested boundaries into ring sets
//! - **Semantics**: semantic surface and material resolution per ring set
//! - **City objects**: name-keyed object graph with one-level attribute inheritance
//! - **Templates**: geometry template library and anchor instancing
//!
//! Surface construction goes through the [`SurfaceBuilder`] trait. A planar
//! implementation lives in `cityjson-lite-geometry`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cityjson_lite_core::*;
//!
//! let doc = CityJsonDocument::parse_validated(content)?;
//! let mut origin = FloatingOrigin::new();
//! let transform = VertexTransform::for_document(&doc, &PlacementParams::default(), &mut origin);
//! let vertices = decode_vertices(&doc, &transform);
//!
//! let ctx = DecodeContext {
//!     vertices: &vertices,
//!     builder: &CornerSurfaceBuilder,
//!     tolerance: 1e-6,
//!     materials: doc.materials(),
//! };
//! let mut collection = CityCollection::new();
//! for (name, value) in doc.city_object_entries() {
//!     collection.insert(CityObject::decode(name, value, &ctx)?)?;
//! }
//! ```

pub mod boundary;
pub mod city_object;
pub mod document;
pub mod error;
pub mod semantics;
pub mod surface;
pub mod template;
pub mod vertex;

pub use boundary::{decode_ring_sets, Boundary, ClosedRings, GeometryType, Ring, RingSet};
pub use city_object::{sanitize_name, CityCollection, CityObject, DecodeContext, ObjectGeometry};
pub use document::{
    Attributes, CityJsonDocument, RawCityObject, RawGeometry, RawSemantics, SUPPORTED_VERSIONS,
};
pub use error::{Error, ErrorKind, MissingReference, Result, ValidityIssue};
pub use semantics::{
    flatten_values, resolve_materials, MaterialPalette, MaterialTheme, SemanticTable, NO_VALUE,
};
pub use surface::{
    Construction, CornerSurfaceBuilder, Face, GeoObject, SurfaceBuilder, SurfaceObject,
};
pub use template::{instantiate, TemplateLibrary, TemplateObject};
pub use vertex::{
    decode_template_vertices, decode_vertices, FloatingOrigin, PlacementParams, Vertex,
    VertexTransform,
};
