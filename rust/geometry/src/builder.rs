// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar surface builder
//!
//! Triangles and quads without holes are built straight from their corners.
//! Everything else, and any corner face that fails, goes through the general
//! path: Newell normal, planarity check against the tolerance, projection into
//! the plane and earcut.

use cityjson_lite_core::{
    ClosedRings, Construction, Face, GeoObject, MaterialPalette, RawGeometry, RingSet,
    SurfaceBuilder, Vertex,
};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::triangulation::{
    centroid, is_convex, max_plane_deviation, newell_normal, plane_basis,
    project_to_2d_with_basis, to_points, triangulate_polygon_with_holes,
};

/// Geometries with at least this many ring sets are built in parallel
pub const PARALLEL_THRESHOLD: usize = 64;

/// Default [`SurfaceBuilder`]
#[derive(Debug, Clone, Copy)]
pub struct PlanarSurfaceBuilder {
    pub parallel_threshold: usize,
}

impl Default for PlanarSurfaceBuilder {
    fn default() -> Self {
        Self {
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
}

impl PlanarSurfaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Face from the 3 or 4 corners
    pub fn corner_face(rings: &ClosedRings, tolerance: f64) -> Result<Face> {
        if !rings.is_closed() {
            return Err(Error::OpenRing);
        }
        let corners = to_points(rings.outer_corners());
        let normal = newell_normal(&corners)
            .ok_or_else(|| {
                Error::DegenerateRing(format!("{} corners without area", corners.len()))
            })?;

        let triangles = match corners.len() {
            3 => vec![[0, 1, 2]],
            4 => {
                let deviation = max_plane_deviation(&corners, &normal, &centroid(&corners));
                if deviation > tolerance {
                    return Err(Error::NonPlanar {
                        deviation,
                        tolerance,
                    });
                }
                if !is_convex(&corners, &normal) {
                    return Err(Error::DegenerateRing("concave quad".to_string()));
                }
                vec![[0, 1, 2], [0, 2, 3]]
            }
            n => return Err(Error::DegenerateRing(format!("{} corners", n))),
        };

        Ok(Face::new(rings.clone(), triangles, Construction::Corners))
    }

    /// General planar polygon with holes
    pub fn planar_face(rings: &ClosedRings, tolerance: f64) -> Result<Face> {
        if !rings.is_closed() {
            return Err(Error::OpenRing);
        }
        let outer = to_points(rings.outer_corners());
        let holes: Vec<_> = rings.inner_corners().map(to_points).collect();

        let normal = newell_normal(&outer)
            .ok_or_else(|| Error::DegenerateRing(format!("{} points without area", outer.len())))?;
        let origin = centroid(&outer);
        let deviation =
            max_plane_deviation(outer.iter().chain(holes.iter().flatten()), &normal, &origin);
        if deviation > tolerance {
            return Err(Error::NonPlanar {
                deviation,
                tolerance,
            });
        }

        let (u_axis, v_axis) = plane_basis(&normal);
        let outer_2d = project_to_2d_with_basis(&outer, &u_axis, &v_axis, &origin);
        let holes_2d: Vec<_> = holes
            .iter()
            .map(|h| project_to_2d_with_basis(h, &u_axis, &v_axis, &origin))
            .collect();

        let indices = triangulate_polygon_with_holes(&outer_2d, &holes_2d)?;
        let triangles = indices
            .chunks_exact(3)
            .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
            .collect();

        // holes under 3 points are not part of the triangulation
        let kept = ClosedRings {
            outer: rings.outer.clone(),
            inner: rings.inner.iter().filter(|r| r.len() > 3).cloned().collect(),
        };
        Ok(Face::new(kept, triangles, Construction::Planar))
    }
}

impl SurfaceBuilder for PlanarSurfaceBuilder {
    fn build_surface(
        &self,
        ring_set: &RingSet,
        vertices: &[Vertex],
        tolerance: f64,
    ) -> cityjson_lite_core::Result<Vec<Face>> {
        let rings = ring_set.closed_rings(vertices)?;

        if ring_set.is_corner_eligible() {
            match Self::corner_face(&rings, tolerance) {
                Ok(face) => return Ok(vec![face]),
                Err(e) => {
                    tracing::trace!(error = %e, "corner construction failed, using planar path")
                }
            }
        }

        Ok(vec![Self::planar_face(&rings, tolerance)?])
    }

    fn build_all(
        &self,
        ring_sets: &[RingSet],
        vertices: &[Vertex],
        tolerance: f64,
    ) -> Vec<cityjson_lite_core::Result<Vec<Face>>> {
        if ring_sets.len() >= self.parallel_threshold {
            ring_sets
                .par_iter()
                .map(|rs| self.build_surface(rs, vertices, tolerance))
                .collect()
        } else {
            ring_sets
                .iter()
                .map(|rs| self.build_surface(rs, vertices, tolerance))
                .collect()
        }
    }
}

/// Build one geometry entry with the default planar builder
pub fn build_geo_object(
    raw: &RawGeometry,
    vertices: &[Vertex],
    tolerance: f64,
    palette: &(impl MaterialPalette + ?Sized),
) -> cityjson_lite_core::Result<GeoObject> {
    GeoObject::build(raw, vertices, &PlanarSurfaceBuilder::default(), tolerance, palette)
}
