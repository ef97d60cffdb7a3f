// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CityJSON-Lite Geometry Processing
//!
//! Planar surface construction for decoded ring sets using earcutr
//! triangulation and nalgebra, plus mesh aggregation.

pub mod builder;
pub mod error;
pub mod mesh;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use builder::{build_geo_object, PlanarSurfaceBuilder, PARALLEL_THRESHOLD};
pub use error::{Error, Result};
pub use mesh::Mesh;
pub use triangulation::{newell_normal, triangulate_polygon_with_holes};
