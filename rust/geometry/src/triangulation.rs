// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for planar polygons with holes, plus the plane
//! fitting needed to bring 3D rings into 2D.

use cityjson_lite_core::Vertex;

use crate::{Error, Point2, Point3, Result, Vector3};

/// Normals shorter than this are treated as degenerate
pub const DEGENERATE_EPSILON: f64 = 1e-12;

#[inline]
pub fn to_point(v: &Vertex) -> Point3<f64> {
    Point3::new(v.x, v.y, v.z)
}

pub fn to_points(ring: &[Vertex]) -> Vec<Point3<f64>> {
    ring.iter().map(to_point).collect()
}

/// Unit normal of an open ring by Newell's method
///
/// `None` for rings with fewer than 3 points or no area.
pub fn newell_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    let len = normal.norm();
    (len > DEGENERATE_EPSILON).then(|| normal / len)
}

/// Largest distance of any point from the plane through `origin` along `normal`
pub fn max_plane_deviation<'a>(
    points: impl IntoIterator<Item = &'a Point3<f64>>,
    normal: &Vector3<f64>,
    origin: &Point3<f64>,
) -> f64 {
    points
        .into_iter()
        .map(|p| (p - origin).dot(normal).abs())
        .fold(0.0, f64::max)
}

/// Mean of the points
pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// Check whether a planar ring is convex with respect to its normal
///
/// Collinear corners are ignored.
pub fn is_convex(points: &[Point3<f64>], normal: &Vector3<f64>) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0i8;
    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let dot = (p1 - p0).cross(&(p2 - p1)).dot(normal);
        if dot.abs() > DEGENERATE_EPSILON {
            let current_sign = if dot > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    sign != 0
}

/// Orthonormal basis (u, v) of the plane with the given normal
pub fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // axis least parallel to the normal
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let reference = if ax <= ay && ax <= az {
        Vector3::new(1.0, 0.0, 0.0)
    } else if ay <= az {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    };

    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();
    (u_axis, v_axis)
}

/// Project 3D points into a shared 2D frame
#[inline]
pub fn project_to_2d_with_basis(
    points_3d: &[Point3<f64>],
    u_axis: &Vector3<f64>,
    v_axis: &Vector3<f64>,
    origin: &Point3<f64>,
) -> Vec<Point2<f64>> {
    points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(u_axis), v.dot(v_axis))
        })
        .collect()
}

/// Triangulate a polygon with holes
///
/// Returns triangle indices into the combined point list (outer followed by
/// every hole with at least 3 points).
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    let valid_holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();

    let total_points: usize = outer.len() + valid_holes.iter().map(|h| h.len()).sum::<usize>();
    let mut coords = Vec::with_capacity(total_points * 2);
    for p in outer {
        coords.push(p.x);
        coords.push(p.y);
    }

    let mut hole_indices = Vec::with_capacity(valid_holes.len());
    for hole in valid_holes {
        hole_indices.push(coords.len() / 2);
        for p in hole {
            coords.push(p.x);
            coords.push(p.y);
        }
    }

    let indices = earcutr::earcut(&coords, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    if indices.is_empty() {
        return Err(Error::TriangulationError(
            "earcut produced no triangles".to_string(),
        ));
    }
    Ok(indices)
}
