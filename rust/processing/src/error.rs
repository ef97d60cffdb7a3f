// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use thiserror::Error;

/// Result type for reading and export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised around the decoding core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Core decoding error: {0}")]
    CoreError(#[from] cityjson_lite_core::Error),

    /// The attribute filter got a key without values or values without a key
    #[error("Filter input mismatch: {0}")]
    FilterInputMismatch(String),

    #[error("Invalid reader settings: {0}")]
    InvalidSettings(SettingsIssue),
}

/// Reason reader settings were rejected
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsIssue {
    UnknownLod(String),
    NorthWithoutOrigin,
    NonPositiveUnitScale(f64),
    NonPositiveTolerance(f64),
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsIssue::UnknownLod(lod) => write!(f, "invalid LoD \"{}\"", lod),
            SettingsIssue::NorthWithoutOrigin => {
                write!(f, "true north rotation only works with an origin")
            }
            SettingsIssue::NonPositiveUnitScale(s) => {
                write!(f, "unit scale {} must be positive", s)
            }
            SettingsIssue::NonPositiveTolerance(t) => write!(f, "tolerance {} must be positive", t),
        }
    }
}
