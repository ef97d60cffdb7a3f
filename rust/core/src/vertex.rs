// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertex decoding
//!
//! CityJSON stores vertices as integers that are dequantized with the file's
//! `transform.scale` and `transform.translate`. Several files can be merged into
//! one frame: unless the caller asks for absolute coordinates, the first file's
//! translate becomes a floating global origin and every later file is offset by
//! the delta between its translate and that origin.

use crate::document::CityJsonDocument;

/// A 3D point in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Pure translation
    #[inline]
    pub fn translated(&self, by: &Vertex) -> Vertex {
        Vertex::new(self.x + by.x, self.y + by.y, self.z + by.z)
    }
}

/// Translate established by the first file of a batch
#[derive(Debug, Clone, Default)]
pub struct FloatingOrigin {
    global: Option<[f64; 3]>,
}

impl FloatingOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until a file has fixed the origin
    #[inline]
    pub fn is_first(&self) -> bool {
        self.global.is_none()
    }

    pub fn global(&self) -> Option<[f64; 3]> {
        self.global
    }

    /// Offset to add to a file's scaled vertices
    ///
    /// With `use_own_translate` the file's translate is returned unchanged and
    /// the floating origin is left alone. Otherwise the first call fixes the
    /// origin (offset zero) and later calls return `translate - origin`.
    pub fn offset_for(&mut self, translate: [f64; 3], use_own_translate: bool) -> [f64; 3] {
        if use_own_translate {
            return translate;
        }
        match self.global {
            None => {
                self.global = Some(translate);
                [0.0, 0.0, 0.0]
            }
            Some(g) => [
                translate[0] - g[0],
                translate[1] - g[1],
                translate[2] - g[2],
            ],
        }
    }
}

/// Caller-side placement parameters shared by every file of a batch
#[derive(Debug, Clone, Copy)]
pub struct PlacementParams {
    /// Apply each file's own translate instead of the floating origin
    pub translate: bool,
    /// Global unit scale (document units to host units)
    pub unit_scale: f64,
    /// Point that becomes (0, 0, 0)
    pub world_origin: Option<[f64; 3]>,
    /// Rotation about Z in radians
    pub rotation: f64,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            translate: false,
            unit_scale: 1.0,
            world_origin: None,
            rotation: 0.0,
        }
    }
}

/// Fully resolved per-file vertex transformation
#[derive(Debug, Clone, Copy)]
pub struct VertexTransform {
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub unit_scale: f64,
    pub world_origin: [f64; 3],
    cos_r: f64,
    sin_r: f64,
}

impl VertexTransform {
    pub fn new(
        scale: [f64; 3],
        offset: [f64; 3],
        unit_scale: f64,
        world_origin: [f64; 3],
        rotation: f64,
    ) -> Self {
        Self {
            scale,
            offset,
            unit_scale,
            world_origin,
            cos_r: rotation.cos(),
            sin_r: rotation.sin(),
        }
    }

    /// Transformation for one file of a batch; fixes the floating origin on the first file
    pub fn for_document(
        doc: &CityJsonDocument,
        params: &PlacementParams,
        origin: &mut FloatingOrigin,
    ) -> Self {
        let offset = origin.offset_for(doc.translate(), params.translate);
        Self::new(
            doc.scale(),
            offset,
            params.unit_scale,
            params.world_origin.unwrap_or([0.0, 0.0, 0.0]),
            params.rotation,
        )
    }

    /// Template vertices only take the unit scale; placement happens at instancing
    pub fn template(unit_scale: f64) -> Self {
        Self::new([1.0, 1.0, 1.0], [0.0, 0.0, 0.0], unit_scale, [0.0, 0.0, 0.0], 0.0)
    }

    /// Transform one raw vertex
    #[inline]
    pub fn apply(&self, raw: [f64; 3]) -> Vertex {
        let u = self.unit_scale;
        let tx = (raw[0] * self.scale[0] + self.offset[0]) * u - self.world_origin[0];
        let ty = (raw[1] * self.scale[1] + self.offset[1]) * u - self.world_origin[1];
        let tz = (raw[2] * self.scale[2] + self.offset[2]) * u - self.world_origin[2];

        Vertex::new(
            tx * self.cos_r - ty * self.sin_r,
            ty * self.cos_r + tx * self.sin_r,
            tz,
        )
    }

    /// Transform a whole vertex array; output index i is input index i
    pub fn apply_all(&self, raw: &[[f64; 3]]) -> Vec<Vertex> {
        raw.iter().map(|v| self.apply(*v)).collect()
    }
}

/// World-space vertices of a document; empty when `vertices` is absent
pub fn decode_vertices(doc: &CityJsonDocument, transform: &VertexTransform) -> Vec<Vertex> {
    doc.vertices
        .as_deref()
        .map(|raw| transform.apply_all(raw))
        .unwrap_or_default()
}

/// Local-frame template vertices; empty when the document has no templates
pub fn decode_template_vertices(doc: &CityJsonDocument, unit_scale: f64) -> Vec<Vertex> {
    doc.geometry_templates
        .as_ref()
        .and_then(|t| t.vertices_templates.as_deref())
        .map(|raw| VertexTransform::template(unit_scale).apply_all(raw))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn scale_then_offset() {
        let t = VertexTransform::new([0.5, 0.5, 2.0], [10.0, 0.0, 1.0], 1.0, [0.0; 3], 0.0);
        let v = t.apply([2.0, 4.0, 3.0]);
        assert_relative_eq!(v.x, 11.0);
        assert_relative_eq!(v.y, 2.0);
        assert_relative_eq!(v.z, 7.0);
    }

    #[test]
    fn origin_then_rotation() {
        // (2, 1) minus origin (1, 1) = (1, 0); rotate 90° -> (0, 1)
        let t = VertexTransform::new([1.0; 3], [0.0; 3], 1.0, [1.0, 1.0, 0.0], FRAC_PI_2);
        let v = t.apply([2.0, 1.0, 5.0]);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 5.0);
    }

    #[test]
    fn unit_scale_applies_to_offset() {
        let t = VertexTransform::new([1.0; 3], [100.0, 0.0, 0.0], 0.001, [0.0; 3], 0.0);
        let v = t.apply([1000.0, 0.0, 0.0]);
        assert_relative_eq!(v.x, 1.1, epsilon = 1e-12);
    }

    #[test]
    fn template_ignores_rotation_and_origin() {
        let t = VertexTransform::template(2.0);
        let v = t.apply([1.0, 2.0, 3.0]);
        assert_eq!(v, Vertex::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn floating_origin_first_file_wins() {
        let mut origin = FloatingOrigin::new();
        assert!(origin.is_first());
        assert_eq!(origin.offset_for([100.0, 200.0, 0.0], false), [0.0, 0.0, 0.0]);
        assert!(!origin.is_first());
        assert_eq!(origin.offset_for([110.0, 195.0, 1.0], false), [10.0, -5.0, 1.0]);
        assert_eq!(origin.global(), Some([100.0, 200.0, 0.0]));
    }

    #[test]
    fn own_translate_leaves_origin_unset() {
        let mut origin = FloatingOrigin::new();
        assert_eq!(origin.offset_for([1.0, 2.0, 3.0], true), [1.0, 2.0, 3.0]);
        assert!(origin.is_first());
    }

    #[test]
    fn indexing_is_preserved() {
        let t = VertexTransform::new([1.0; 3], [0.0; 3], 1.0, [0.0; 3], 0.0);
        let out = t.apply_all(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        assert_eq!(out.len(), 3);
        for (i, v) in out.iter().enumerate() {
            assert_relative_eq!(v.x, i as f64);
        }
    }
}
