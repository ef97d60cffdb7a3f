// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary decoding
//!
//! A CityJSON boundary is a nested array whose depth depends on the geometry
//! type:
//!
//! - MultiSurface / CompositeSurface: `[surface, ...]`
//! - Solid: `[shell, ...]`, a shell being `[surface, ...]`
//! - CompositeSolid / MultiSolid: `[solid, ...]`
//!
//! where a surface is a ring set `[[outer...], [hole...], ...]`. Everything is
//! eventually flattened into an ordered list of [`RingSet`]s; the position in
//! that list is what semantic and material values are aligned against.

use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{Error, MissingReference, Result, ValidityIssue};
use crate::vertex::Vertex;

/// Vertex indices of one ring, not closed
pub type Ring = Vec<u32>;

/// Geometry type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    MultiPoint,
    MultiLineString,
    MultiSurface,
    CompositeSurface,
    Solid,
    MultiSolid,
    CompositeSolid,
    GeometryInstance,
}

impl GeometryType {
    pub fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "MultiPoint" => GeometryType::MultiPoint,
            "MultiLineString" => GeometryType::MultiLineString,
            "MultiSurface" => GeometryType::MultiSurface,
            "CompositeSurface" => GeometryType::CompositeSurface,
            "Solid" => GeometryType::Solid,
            "MultiSolid" => GeometryType::MultiSolid,
            "CompositeSolid" => GeometryType::CompositeSolid,
            "GeometryInstance" => GeometryType::GeometryInstance,
            other => {
                return Err(Error::StructuralInvalid(ValidityIssue::UnknownGeometryType(
                    other.to_string(),
                )))
            }
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiSurface => "MultiSurface",
            GeometryType::CompositeSurface => "CompositeSurface",
            GeometryType::Solid => "Solid",
            GeometryType::MultiSolid => "MultiSolid",
            GeometryType::CompositeSolid => "CompositeSolid",
            GeometryType::GeometryInstance => "GeometryInstance",
        }
    }

    /// Whether the type describes surfaces at all
    #[inline]
    pub fn has_surfaces(&self) -> bool {
        !matches!(self, GeometryType::MultiPoint | GeometryType::MultiLineString)
    }
}

/// One surface: outer ring plus holes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RingSet {
    pub outer: Ring,
    pub inner: SmallVec<[Ring; 1]>,
}

impl RingSet {
    pub fn new(outer: Ring, inner: impl IntoIterator<Item = Ring>) -> Self {
        Self {
            outer,
            inner: inner.into_iter().collect(),
        }
    }

    #[inline]
    pub fn hole_count(&self) -> usize {
        self.inner.len()
    }

    /// Triangle or quad without holes; may be built directly from its corners
    #[inline]
    pub fn is_corner_eligible(&self) -> bool {
        matches!(self.outer.len(), 3 | 4) && self.inner.is_empty()
    }

    /// Materialize the rings as closed loops of positions
    ///
    /// Every returned loop repeats its first vertex as its last. Empty holes are
    /// dropped; an empty outer ring is a construction failure.
    pub fn closed_rings(&self, vertices: &[Vertex]) -> Result<ClosedRings> {
        if self.outer.is_empty() {
            return Err(Error::construction("outer ring is empty"));
        }
        let outer = close_ring(&self.outer, vertices)?;
        let inner = self
            .inner
            .iter()
            .filter(|ring| !ring.is_empty())
            .map(|ring| close_ring(ring, vertices))
            .collect::<Result<Vec<_>>>()?;
        Ok(ClosedRings { outer, inner })
    }
}

fn close_ring(ring: &[u32], vertices: &[Vertex]) -> Result<Vec<Vertex>> {
    let mut points = Vec::with_capacity(ring.len() + 1);
    for &idx in ring {
        let v = vertices.get(idx as usize).ok_or(Error::ReferentialMissing(
            MissingReference::Vertex {
                index: idx as usize,
            },
        ))?;
        points.push(*v);
    }
    points.push(points[0]);
    Ok(points)
}

/// Ring set resolved to positions, every loop closed
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedRings {
    pub outer: Vec<Vertex>,
    pub inner: Vec<Vec<Vertex>>,
}

impl ClosedRings {
    /// Outer loop without the closing vertex
    #[inline]
    pub fn outer_corners(&self) -> &[Vertex] {
        &self.outer[..self.outer.len().saturating_sub(1)]
    }

    /// All loops without their closing vertex
    pub fn inner_corners(&self) -> impl Iterator<Item = &[Vertex]> {
        self.inner.iter().map(|r| &r[..r.len().saturating_sub(1)])
    }

    /// True if every loop starts and ends on the same vertex
    pub fn is_closed(&self) -> bool {
        std::iter::once(&self.outer)
            .chain(self.inner.iter())
            .all(|r| r.len() >= 2 && r.first() == r.last())
    }
}

/// Typed view of a boundary, discriminated by geometry type
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// MultiPoint; produces no surfaces
    Points,
    /// MultiLineString; produces no surfaces
    Lines,
    /// MultiSurface / CompositeSurface
    Surfaces(Vec<RingSet>),
    /// Solid: shells of surfaces
    Solid(Vec<Vec<RingSet>>),
    /// CompositeSolid: solids of shells
    CompositeSolid(Vec<Vec<Vec<RingSet>>>),
    /// MultiSolid: solids of shells
    MultiSolid(Vec<Vec<Vec<RingSet>>>),
    /// GeometryInstance: a single anchor vertex
    Instance { anchor: usize },
}

impl Boundary {
    /// Decode `boundaries` according to the geometry type
    ///
    /// Ring sets are found by leaf detection, so a boundary nested shallower or
    /// deeper than its type prescribes still decodes. A shallow Solid becomes a
    /// single shell and a shallow MultiSolid a single solid; deeper levels are
    /// flattened into the lowest list the type has.
    pub fn decode(geometry_type: GeometryType, node: &Value) -> Result<Self> {
        match geometry_type {
            GeometryType::MultiPoint => Ok(Boundary::Points),
            GeometryType::MultiLineString => Ok(Boundary::Lines),
            GeometryType::MultiSurface | GeometryType::CompositeSurface => {
                Ok(Boundary::Surfaces(decode_ring_sets(node)?))
            }
            GeometryType::Solid => Ok(Boundary::Solid(decode_shells(node)?)),
            GeometryType::CompositeSolid => Ok(Boundary::CompositeSolid(decode_solids(node)?)),
            GeometryType::MultiSolid => Ok(Boundary::MultiSolid(decode_solids(node)?)),
            GeometryType::GeometryInstance => {
                let anchor = node
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        Error::malformed_boundary("GeometryInstance needs [anchor vertex index]")
                    })?;
                Ok(Boundary::Instance {
                    anchor: anchor as usize,
                })
            }
        }
    }

    /// Flat ordered ring-set list
    pub fn into_ring_sets(self) -> Vec<RingSet> {
        match self {
            Boundary::Points | Boundary::Lines | Boundary::Instance { .. } => Vec::new(),
            Boundary::Surfaces(s) => s,
            Boundary::Solid(shells) => shells.into_iter().flatten().collect(),
            Boundary::CompositeSolid(solids) | Boundary::MultiSolid(solids) => {
                solids.into_iter().flatten().flatten().collect()
            }
        }
    }
}

/// Depth-agnostic flattening of any boundary node into ring sets
///
/// A node whose elements are integer arrays is one ring set; any other array is
/// recursed into and the results are concatenated in order.
pub fn decode_ring_sets(node: &Value) -> Result<Vec<RingSet>> {
    let items = array_of(node, "boundary")?;

    if is_ring_set(items) {
        return Ok(vec![parse_ring_set(items)?]);
    }

    let nested = items
        .iter()
        .map(decode_ring_sets)
        .collect::<Result<Vec<_>>>()?;
    Ok(nested.into_iter().flatten().collect())
}

/// Leaves are integers: the first element is a ring (possibly empty)
#[inline]
fn is_ring_set(items: &[Value]) -> bool {
    match items.first() {
        Some(Value::Array(ring)) => ring.first().map_or(true, Value::is_number),
        _ => false,
    }
}

/// Array levels down to the first vertex index; a ring set is 2 deep
fn depth(node: &Value) -> usize {
    match node {
        Value::Array(items) => 1 + items.first().map_or(0, depth),
        _ => 0,
    }
}

const SURFACE_LIST_DEPTH: usize = 3;
const SHELL_LIST_DEPTH: usize = 4;

fn decode_shells(node: &Value) -> Result<Vec<Vec<RingSet>>> {
    if depth(node) <= SURFACE_LIST_DEPTH {
        tracing::debug!("shell list nested too shallow, read as one shell");
        return Ok(vec![decode_ring_sets(node)?]);
    }
    array_of(node, "shell list")?
        .iter()
        .map(decode_ring_sets)
        .collect()
}

fn decode_solids(node: &Value) -> Result<Vec<Vec<Vec<RingSet>>>> {
    if depth(node) <= SHELL_LIST_DEPTH {
        tracing::debug!("solid list nested too shallow, read as one solid");
        return Ok(vec![decode_shells(node)?]);
    }
    array_of(node, "solid list")?
        .iter()
        .map(decode_shells)
        .collect()
}

fn parse_ring_set(items: &[Value]) -> Result<RingSet> {
    let mut rings = items.iter().map(parse_ring);
    let outer = match rings.next() {
        Some(ring) => ring?,
        None => Ring::new(),
    };
    let inner = rings.collect::<Result<SmallVec<[Ring; 1]>>>()?;
    Ok(RingSet { outer, inner })
}

fn parse_ring(node: &Value) -> Result<Ring> {
    array_of(node, "ring")?
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|i| u32::try_from(i).ok())
                .ok_or_else(|| Error::malformed_boundary(format!("invalid vertex index {}", v)))
        })
        .collect()
}

fn array_of<'a>(node: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    node.as_array().ok_or_else(|| {
        Error::malformed_boundary(format!("{} must be an array, found {}", what, kind(node)))
    })
}

fn kind(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
