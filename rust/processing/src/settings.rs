// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reader settings, loadable from environment variables.

use cityjson_lite_core::PlacementParams;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, SettingsIssue};

/// LoD values understood by the reader
pub const ACCEPTED_LODS: [&str; 20] = [
    "0", "0.0", "0.1", "0.2", "0.3", "1", "1.0", "1.1", "1.2", "1.3", "2", "2.0", "2.1", "2.2",
    "2.3", "3", "3.0", "3.1", "3.2", "3.3",
];

/// Default model tolerance in model units
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Non-fatal findings of [`ReaderSettings::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsWarning {
    /// True north beyond a full turn
    NorthOutOfRange(f64),
}

/// Reader settings shared by every file of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Keep every file's own translate instead of the floating origin.
    pub translate: bool,
    /// World point that becomes (0, 0, 0).
    pub origin: Option<[f64; 3]>,
    /// True north in degrees; needs an origin.
    pub true_north_degrees: f64,
    /// LoDs to keep; empty keeps all.
    pub lods: Vec<String>,
    /// Document units to host units.
    pub unit_scale: f64,
    /// Planarity tolerance for surface construction.
    pub tolerance: f64,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            translate: false,
            origin: None,
            true_north_degrees: 0.0,
            lods: Vec::new(),
            unit_scale: 1.0,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ReaderSettings {
    /// Load settings from environment variables; unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            translate: std::env::var("CITYJSON_TRANSLATE")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.translate),
            origin: std::env::var("CITYJSON_ORIGIN")
                .ok()
                .and_then(|v| parse_triple(&v))
                .or(defaults.origin),
            true_north_degrees: std::env::var("CITYJSON_TRUE_NORTH")
                .unwrap_or_else(|_| "0".into())
                .trim()
                .parse()
                .unwrap_or(defaults.true_north_degrees),
            lods: std::env::var("CITYJSON_LODS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            unit_scale: std::env::var("CITYJSON_UNIT_SCALE")
                .unwrap_or_else(|_| "1".into())
                .trim()
                .parse()
                .unwrap_or(defaults.unit_scale),
            tolerance: std::env::var("CITYJSON_TOLERANCE")
                .unwrap_or_else(|_| DEFAULT_TOLERANCE.to_string())
                .trim()
                .parse()
                .unwrap_or(defaults.tolerance),
        }
    }

    /// Reject unusable settings; returns warnings for suspicious ones
    pub fn validate(&self) -> Result<Vec<SettingsWarning>> {
        let invalid =
            |issue| -> Result<Vec<SettingsWarning>> { Err(Error::InvalidSettings(issue)) };

        if let Some(lod) = self
            .lods
            .iter()
            .find(|l| !l.is_empty() && !ACCEPTED_LODS.contains(&l.as_str()))
        {
            return invalid(SettingsIssue::UnknownLod(lod.clone()));
        }
        if self.true_north_degrees != 0.0 && self.origin.is_none() {
            return invalid(SettingsIssue::NorthWithoutOrigin);
        }
        if self.unit_scale.is_nan() || self.unit_scale <= 0.0 {
            return invalid(SettingsIssue::NonPositiveUnitScale(self.unit_scale));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return invalid(SettingsIssue::NonPositiveTolerance(self.tolerance));
        }

        let mut warnings = Vec::new();
        if self.true_north_degrees.abs() > 360.0 {
            warnings.push(SettingsWarning::NorthOutOfRange(self.true_north_degrees));
        }
        Ok(warnings)
    }

    #[inline]
    pub fn rotation_radians(&self) -> f64 {
        self.true_north_degrees.to_radians()
    }

    /// LoDs to filter on, blanks dropped
    pub fn active_lods(&self) -> Vec<String> {
        self.lods.iter().filter(|l| !l.is_empty()).cloned().collect()
    }

    pub fn placement(&self) -> PlacementParams {
        PlacementParams {
            translate: self.translate,
            unit_scale: self.unit_scale,
            world_origin: self.origin,
            rotation: self.rotation_radians(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_triple(value: &str) -> Option<[f64; 3]> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|s| s.trim().parse().ok())
        .collect::<Option<Vec<f64>>>()?;
    match parts.as_slice() {
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = ReaderSettings::default();
        assert!(settings.validate().unwrap().is_empty());
        assert!(settings.active_lods().is_empty());
    }

    #[test]
    fn unknown_lod_is_rejected() {
        let settings = ReaderSettings {
            lods: vec!["2.2".into(), "".into(), "4".into()],
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidSettings(SettingsIssue::UnknownLod(ref l))) if l == "4"
        ));
    }

    #[test]
    fn blank_lods_are_ignored() {
        let settings = ReaderSettings {
            lods: vec!["".into(), "1.2".into()],
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.active_lods(), vec!["1.2".to_string()]);
    }

    #[test]
    fn north_needs_origin() {
        let mut settings = ReaderSettings {
            true_north_degrees: 30.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidSettings(SettingsIssue::NorthWithoutOrigin))
        ));

        settings.origin = Some([0.0, 0.0, 0.0]);
        assert!(settings.validate().unwrap().is_empty());

        settings.true_north_degrees = 400.0;
        assert_eq!(
            settings.validate().unwrap(),
            vec![SettingsWarning::NorthOutOfRange(400.0)]
        );
    }

    #[test]
    fn scale_and_tolerance_must_be_positive() {
        let settings = ReaderSettings {
            unit_scale: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        let settings = ReaderSettings {
            tolerance: -1.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn parses_env_style_values() {
        assert_eq!(parse_triple("1, 2.5,-3"), Some([1.0, 2.5, -3.0]));
        assert_eq!(parse_triple("1,2"), None);
        assert_eq!(parse_triple("a,b,c"), None);
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn serde_fills_missing_fields() {
        let settings: ReaderSettings = serde_json::from_str(r#"{ "lods": ["2"] }"#).unwrap();
        assert_eq!(settings.lods, vec!["2".to_string()]);
        assert_eq!(settings.tolerance, DEFAULT_TOLERANCE);
        assert!((settings.placement().rotation).abs() < 1e-12);
    }
}
