// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surfaces and geometry objects
//!
//! [`SurfaceBuilder`] is the seam to the surface-fitting backend: it turns one
//! ring set into faces. [`GeoObject::build`] drives a builder over a whole
//! geometry entry and attaches the resolved semantics and materials.

use crate::boundary::{Boundary, ClosedRings, GeometryType, RingSet};
use crate::document::{Attributes, RawGeometry};
use crate::error::{Error, ErrorKind, Result};
use crate::semantics::{resolve_materials, MaterialPalette, MaterialTheme, SemanticTable};
use crate::vertex::Vertex;

/// How a face was constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    /// Directly from the 3 or 4 corner points
    Corners,
    /// General planar polygon, possibly with holes
    Planar,
}

/// A constructed surface
///
/// `triangles` index into [`Face::corner_positions`]: the outer corners
/// followed by the corners of each hole.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub rings: ClosedRings,
    pub triangles: Vec<[u32; 3]>,
    pub construction: Construction,
}

impl Face {
    pub fn new(rings: ClosedRings, triangles: Vec<[u32; 3]>, construction: Construction) -> Self {
        Self {
            rings,
            triangles,
            construction,
        }
    }

    /// Open corner positions in triangle index order
    pub fn corner_positions(&self) -> Vec<Vertex> {
        let mut points = self.rings.outer_corners().to_vec();
        for hole in self.rings.inner_corners() {
            points.extend_from_slice(hole);
        }
        points
    }

    #[inline]
    pub fn outer_len(&self) -> usize {
        self.rings.outer_corners().len()
    }

    #[inline]
    pub fn hole_count(&self) -> usize {
        self.rings.inner.len()
    }

    /// Copy of the face moved by `by`
    pub fn translated(&self, by: &Vertex) -> Face {
        let shift = |ring: &Vec<Vertex>| ring.iter().map(|v| v.translated(by)).collect();
        Face {
            rings: ClosedRings {
                outer: shift(&self.rings.outer),
                inner: self.rings.inner.iter().map(shift).collect(),
            },
            triangles: self.triangles.clone(),
            construction: self.construction,
        }
    }
}

/// Builds faces from ring sets
pub trait SurfaceBuilder: Send + Sync {
    /// Faces for one ring set
    ///
    /// Implementations try [`Construction::Corners`] first when
    /// [`RingSet::is_corner_eligible`] holds and fall back to general polygon
    /// construction only if that fails.
    fn build_surface(
        &self,
        ring_set: &RingSet,
        vertices: &[Vertex],
        tolerance: f64,
    ) -> Result<Vec<Face>>;

    /// One result per ring set, in order
    fn build_all(
        &self,
        ring_sets: &[RingSet],
        vertices: &[Vertex],
        tolerance: f64,
    ) -> Vec<Result<Vec<Face>>> {
        ring_sets
            .iter()
            .map(|rs| self.build_surface(rs, vertices, tolerance))
            .collect()
    }
}

/// A face together with the ring set it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceObject {
    pub face: Face,
    /// Ring-set position; indexes the owning geometry's semantic values
    pub semantic_index: usize,
}

/// One geometry representation of a city object
#[derive(Debug, Clone, PartialEq)]
pub struct GeoObject {
    pub geometry_type: GeometryType,
    pub lod: Option<String>,
    pub surfaces: Vec<SurfaceObject>,
    pub semantics: SemanticTable,
    pub materials: Vec<MaterialTheme>,
    pub ring_set_count: usize,
    /// Some ring sets could not be built
    pub degraded: bool,
    pub failed_ring_sets: Vec<usize>,
}

impl GeoObject {
    /// Decode and build one geometry entry
    ///
    /// Construction failures of single ring sets only degrade the object; any
    /// other error aborts it.
    pub fn build(
        raw: &RawGeometry,
        vertices: &[Vertex],
        builder: &dyn SurfaceBuilder,
        tolerance: f64,
        palette: &(impl MaterialPalette + ?Sized),
    ) -> Result<Self> {
        let geometry_type = GeometryType::parse(&raw.geometry_type)?;
        let ring_sets = Boundary::decode(geometry_type, &raw.boundaries)?.into_ring_sets();
        let ring_set_count = ring_sets.len();

        let mut geo = GeoObject {
            geometry_type,
            lod: raw.lod_string(),
            surfaces: Vec::with_capacity(ring_set_count),
            semantics: SemanticTable::resolve(raw.semantics.as_ref(), ring_set_count),
            materials: resolve_materials(raw.material.as_ref(), ring_set_count, palette),
            ring_set_count,
            degraded: false,
            failed_ring_sets: Vec::new(),
        };

        let results = builder.build_all(&ring_sets, vertices, tolerance);
        for (semantic_index, result) in results.into_iter().enumerate() {
            match result {
                Ok(faces) => geo.surfaces.extend(faces.into_iter().map(|face| SurfaceObject {
                    face,
                    semantic_index,
                })),
                Err(e) if e.kind() == ErrorKind::GeometryConstructionFailed => {
                    tracing::debug!(ring_set = semantic_index, error = %e, "ring set skipped");
                    geo.degraded = true;
                    geo.failed_ring_sets.push(semantic_index);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(geo)
    }

    /// Semantic attributes of a surface of this object
    pub fn surface_attributes(&self, surface: &SurfaceObject) -> Option<&Attributes> {
        self.semantics.attributes_for(surface.semantic_index)
    }

    /// Material name of a surface for `theme`
    pub fn surface_material(&self, surface: &SurfaceObject, theme: &str) -> Option<&str> {
        self.ring_set_material(surface.semantic_index, theme)
    }

    /// Material name of ring set `ring_set` for `theme`, built or not
    pub fn ring_set_material(&self, ring_set: usize, theme: &str) -> Option<&str> {
        self.materials
            .iter()
            .find(|m| m.theme == theme)?
            .name_for(ring_set)
    }

    /// Copy of the object with every face moved by `by`
    pub fn translated(&self, by: &Vertex) -> GeoObject {
        GeoObject {
            geometry_type: self.geometry_type,
            lod: self.lod.clone(),
            surfaces: self
                .surfaces
                .iter()
                .map(|s| SurfaceObject {
                    face: s.face.translated(by),
                    semantic_index: s.semantic_index,
                })
                .collect(),
            semantics: self.semantics.clone(),
            materials: self.materials.clone(),
            ring_set_count: self.ring_set_count,
            degraded: self.degraded,
            failed_ring_sets: self.failed_ring_sets.clone(),
        }
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.face.triangles.len()).sum()
    }
}

/// Corner-only builder; rejects anything that is not a triangle or quad
///
/// Useful where no polygon backend is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CornerSurfaceBuilder;

impl SurfaceBuilder for CornerSurfaceBuilder {
    fn build_surface(
        &self,
        ring_set: &RingSet,
        vertices: &[Vertex],
        _tolerance: f64,
    ) -> Result<Vec<Face>> {
        if !ring_set.is_corner_eligible() {
            return Err(Error::construction(format!(
                "{} corners with {} holes needs a polygon builder",
                ring_set.outer.len(),
                ring_set.hole_count()
            )));
        }
        let rings = ring_set.closed_rings(vertices)?;
        let triangles = match ring_set.outer.len() {
            3 => vec![[0, 1, 2]],
            _ => vec![[0, 1, 2], [0, 2, 3]],
        };
        Ok(vec![Face::new(rings, triangles, Construction::Corners)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Vec<Vertex> {
        vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(1.0, 1.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(2.0, 0.0, 0.0),
        ]
    }

    fn raw(value: serde_json::Value) -> RawGeometry {
        serde_json::from_value(value).unwrap()
    }

    fn build(geometry: &RawGeometry) -> Result<GeoObject> {
        let palette = vec![json!({ "name": "glass" }).as_object().unwrap().clone()];
        GeoObject::build(geometry, &square(), &CornerSurfaceBuilder, 1e-6, &palette)
    }

    fn types(geo: &GeoObject) -> Vec<String> {
        geo.surfaces
            .iter()
            .map(|s| geo.surface_attributes(s).unwrap()["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn corner_builder_triangulates_quads() {
        let faces = CornerSurfaceBuilder
            .build_surface(&RingSet::new(vec![0, 1, 2, 3], []), &square(), 1e-6)
            .unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].triangles.len(), 2);
        assert_eq!(faces[0].outer_len(), 4);
        assert_eq!(faces[0].construction, Construction::Corners);
    }

    #[test]
    fn failed_ring_sets_degrade_the_object() {
        let geometry = raw(json!({
            "type": "MultiSurface",
            "lod": "2",
            "boundaries": [[[0, 1, 2]], [[0, 1, 2, 3, 4]], [[1, 2, 3]]],
            "semantics": {
                "surfaces": [{ "type": "RoofSurface" }],
                "values": [0, 0, null]
            }
        }));
        let geo = build(&geometry).unwrap();

        assert!(geo.degraded);
        assert_eq!(geo.failed_ring_sets, vec![1]);
        assert_eq!(geo.face_count(), 2);
        assert_eq!(geo.ring_set_count, 3);
        let indices: Vec<usize> = geo.surfaces.iter().map(|s| s.semantic_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!(geo.surface_attributes(&geo.surfaces[0]).is_some());
        assert!(geo.surface_attributes(&geo.surfaces[1]).is_none());
    }

    #[test]
    fn bad_vertex_index_aborts_the_object() {
        let geometry = raw(json!({
            "type": "MultiSurface",
            "boundaries": [[[0, 1, 99]]]
        }));
        let err = build(&geometry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferentialMissing);
    }

    #[test]
    fn translated_moves_every_ring_vertex() {
        let geometry = raw(json!({ "type": "MultiSurface", "boundaries": [[[0, 1, 2]]] }));
        let geo = build(&geometry).unwrap();
        let moved = geo.translated(&Vertex::new(10.0, 20.0, 5.0));
        assert_eq!(moved.surfaces[0].face.rings.outer[1], Vertex::new(11.0, 20.0, 5.0));
        assert_eq!(geo.surfaces[0].face.rings.outer[1], Vertex::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn nested_semantic_values_follow_multi_solid_ring_sets() {
        let geometry = raw(json!({
            "type": "MultiSolid",
            "lod": "2",
            "boundaries": [
                [[[[0, 1, 2]], [[1, 2, 3]]]],
                [[[[0, 2, 3]]], [[[0, 1, 3]]]]
            ],
            "semantics": {
                "surfaces": [
                    { "type": "GroundSurface" },
                    { "type": "WallSurface" },
                    { "type": "RoofSurface" },
                    { "type": "ClosureSurface" }
                ],
                "values": [[[0, 1]], [[2], [3]]]
            },
            "material": { "visual": { "values": [[[0, -1]], [[null], [0]]] } }
        }));
        let geo = build(&geometry).unwrap();

        assert_eq!(geo.ring_set_count, 4);
        assert_eq!(
            types(&geo),
            vec!["GroundSurface", "WallSurface", "RoofSurface", "ClosureSurface"]
        );
        let materials: Vec<Option<&str>> = geo
            .surfaces
            .iter()
            .map(|s| geo.surface_material(s, "visual"))
            .collect();
        assert_eq!(materials, vec![Some("glass"), None, None, Some("glass")]);
    }

    #[test]
    fn nested_semantic_values_follow_composite_solid_ring_sets() {
        let geometry = raw(json!({
            "type": "CompositeSolid",
            "boundaries": [
                [[[[0, 1, 2]]], [[[1, 2, 3]]]],
                [[[[0, 2, 3]], [[0, 1, 3]]]]
            ],
            "semantics": {
                "surfaces": [{ "type": "WallSurface" }, { "type": "RoofSurface" }],
                "values": [[[1], [0]], [[0, 1]]]
            }
        }));
        let geo = build(&geometry).unwrap();

        let indices: Vec<usize> = geo.surfaces.iter().map(|s| s.semantic_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(
            types(&geo),
            vec!["RoofSurface", "WallSurface", "WallSurface", "RoofSurface"]
        );
    }
}
