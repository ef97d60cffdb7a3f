// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during surface construction
#[derive(Error, Debug)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Degenerate ring: {0}")]
    DegenerateRing(String),

    #[error("Ring is not planar: deviation {deviation} exceeds tolerance {tolerance}")]
    NonPlanar { deviation: f64, tolerance: f64 },

    #[error("Ring is not closed")]
    OpenRing,

    #[error("Core decoding error: {0}")]
    CoreError(#[from] cityjson_lite_core::Error),
}

/// Geometry failures surface as construction failures of the ring set;
/// wrapped core errors keep their own kind.
impl From<Error> for cityjson_lite_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::CoreError(inner) => inner,
            other => cityjson_lite_core::Error::GeometryConstructionFailed(other.to_string()),
        }
    }
}
