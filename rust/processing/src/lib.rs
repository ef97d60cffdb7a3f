// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityJSON-Lite Processing
//!
//! Batch reading of CityJSON files and export to flat key/value tables.
//!
//! [`read_batch`] decodes every file with a shared floating origin, filters
//! geometry by LoD and places template instances. Objects of one file are
//! decoded in parallel. [`FlattenExporter`] turns the result into an object
//! table and a surface table; [`merge_object_info`] and [`AttributeFilter`]
//! work on those tables.
//!
//! ```rust,ignore
//! use cityjson_lite_processing::*;
//!
//! let settings = ReaderSettings::from_env();
//! let batch = read_batch(&[first, second], &settings)?;
//! let export = FlattenExporter::new(&batch).export();
//! let combined = merge_object_info(&export.objects, &export.surfaces);
//! ```

pub mod error;
pub mod export;
pub mod filter;
pub mod lod;
pub mod merge;
pub mod pipeline;
pub mod settings;

pub use error::{Error, Result, SettingsIssue};
pub use export::{
    value_cell, FlatExport, FlatTable, FlattenExporter, ABSENT, ATTRIBUTE_PREFIX, INHERITED_SUFFIX,
    MATERIAL_PREFIX, SEMANTIC_PREFIX,
};
pub use filter::AttributeFilter;
pub use lod::collect_lods;
pub use merge::merge_object_info;
pub use pipeline::{read_batch, BatchResult, Issue, KeyDiscovery};
pub use settings::{ReaderSettings, SettingsWarning, ACCEPTED_LODS, DEFAULT_TOLERANCE};
