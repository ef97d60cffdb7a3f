// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for CityJSON decoding.

use std::fmt;

use thiserror::Error;

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding a CityJSON document
#[derive(Error, Debug)]
pub enum Error {
    /// The document failed the minimal structural check. Fatal for the file.
    #[error("Invalid CityJSON document: {0}")]
    StructuralInvalid(ValidityIssue),

    /// A name, template index or vertex index does not resolve. Fatal for the object.
    #[error("Missing reference: {0}")]
    ReferentialMissing(MissingReference),

    /// A ring set could not be turned into a face.
    #[error("Surface construction failed: {0}")]
    GeometryConstructionFailed(String),

    /// A city object with this (sanitized) name is already in the collection.
    #[error("Duplicate city object name: {0}")]
    DuplicateObject(String),
}

/// Enumerable classification of [`Error`] so a host can decide to warn or abort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StructuralInvalid,
    ReferentialMissing,
    GeometryConstructionFailed,
}

impl Error {
    /// Structural failure with a boundary description
    pub fn malformed_boundary(msg: impl Into<String>) -> Self {
        Error::StructuralInvalid(ValidityIssue::MalformedBoundary(msg.into()))
    }

    /// Surface construction failure
    pub fn construction(msg: impl Into<String>) -> Self {
        Error::GeometryConstructionFailed(msg.into())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StructuralInvalid(_) => ErrorKind::StructuralInvalid,
            Error::ReferentialMissing(_) | Error::DuplicateObject(_) => {
                ErrorKind::ReferentialMissing
            }
            Error::GeometryConstructionFailed(_) => ErrorKind::GeometryConstructionFailed,
        }
    }

    /// True if the whole file has to be abandoned
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::StructuralInvalid
    }
}

/// Reason a document failed the validity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidityIssue {
    /// `type` is absent or not "CityJSON"
    NotCityJson(Option<String>),
    /// `version` is not one of the supported versions
    UnsupportedVersion(String),
    /// A required member is absent
    MissingField(&'static str),
    /// A boundary array has an unexpected shape
    MalformedBoundary(String),
    /// Geometry `type` is not a CityJSON geometry type
    UnknownGeometryType(String),
    /// The JSON itself could not be read into the document model
    Malformed(String),
}

impl fmt::Display for ValidityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityIssue::NotCityJson(Some(t)) => {
                write!(f, "type is \"{}\", expected \"CityJSON\"", t)
            }
            ValidityIssue::NotCityJson(None) => write!(f, "type is missing"),
            ValidityIssue::UnsupportedVersion(v) => write!(f, "unsupported version \"{}\"", v),
            ValidityIssue::MissingField(name) => write!(f, "missing required member \"{}\"", name),
            ValidityIssue::MalformedBoundary(msg) => write!(f, "malformed boundary: {}", msg),
            ValidityIssue::UnknownGeometryType(t) => write!(f, "unknown geometry type \"{}\"", t),
            ValidityIssue::Malformed(msg) => write!(f, "{}", msg),
        }
    }
}

/// A reference that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReference {
    Parent { object: String, parent: String },
    Child { object: String, child: String },
    Template { index: usize },
    Vertex { index: usize },
    Object(String),
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReference::Parent { object, parent } => {
                write!(f, "parent \"{}\" of \"{}\" not found", parent, object)
            }
            MissingReference::Child { object, child } => {
                write!(f, "child \"{}\" of \"{}\" not found", child, object)
            }
            MissingReference::Template { index } => write!(f, "template {} not found", index),
            MissingReference::Vertex { index } => write!(f, "vertex {} out of range", index),
            MissingReference::Object(name) => write!(f, "city object \"{}\" not found", name),
        }
    }
}
