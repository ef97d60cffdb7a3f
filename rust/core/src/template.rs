// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry templates and instancing
//!
//! Templates are decoded once per document in their own local frame. An
//! instance only names a template and an anchor vertex; instancing copies the
//! template and moves it to the anchor.

use rustc_hash::FxHashMap;

use crate::error::{Error, MissingReference, Result};
use crate::surface::GeoObject;
use crate::vertex::Vertex;

/// Reference from a city object to a template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateObject {
    pub template: usize,
    pub anchor_index: usize,
    /// World position of the anchor vertex
    pub anchor: Vertex,
}

impl TemplateObject {
    /// Resolve the anchor vertex against the document vertices
    pub fn resolve(template: usize, anchor_index: usize, vertices: &[Vertex]) -> Result<Self> {
        let anchor = *vertices
            .get(anchor_index)
            .ok_or(Error::ReferentialMissing(MissingReference::Vertex {
                index: anchor_index,
            }))?;
        Ok(Self {
            template,
            anchor_index,
            anchor,
        })
    }
}

/// Decoded templates of one document, keyed by template index
///
/// Templates that failed to decode are simply absent.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: FxHashMap<usize, GeoObject>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, template: GeoObject) {
        self.templates.insert(index, template);
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&GeoObject> {
        self.templates.get(&index)
    }

    /// LoD of a template, used to filter instances
    pub fn lod_of(&self, index: usize) -> Option<&str> {
        self.templates.get(&index)?.lod.as_deref()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<(usize, GeoObject)> for TemplateLibrary {
    fn from_iter<I: IntoIterator<Item = (usize, GeoObject)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

/// Template geometry placed at the instance's anchor
///
/// Pure translation; the library is left untouched.
pub fn instantiate(instance: &TemplateObject, library: &TemplateLibrary) -> Result<GeoObject> {
    let template = library
        .get(instance.template)
        .ok_or(Error::ReferentialMissing(MissingReference::Template {
            index: instance.template,
        }))?;
    Ok(template.translated(&instance.anchor))
}
