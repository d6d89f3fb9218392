// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Version-gated validation behaviour
//!
//! Each feature is switched on over a range of project file versions. The
//! ranges live in [`FEATURE_TABLE`]; code that cares about a feature reads the
//! matching field of [`FeatureFlags`] and never looks at the version itself.

/// Named toggles that change how a project file is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Output paths must be unique across the whole pipeline
    UniqueOutputPath,
    /// The `expectations` section is required
    ExpectationsPopulation,
    /// cohortextractor actions and the `expectations` section are rejected
    RemoveSupportForCohortExtractor,
}

/// Inclusive version range over which a feature is active
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VersionRange {
    pub introduced: f64,
    /// Last version the feature applies to, `None` if still current
    pub deprecated: Option<f64>,
}

impl VersionRange {
    pub fn contains(&self, version: f64) -> bool {
        self.introduced <= version && self.deprecated.map_or(true, |last| version <= last)
    }
}

/// When each feature was introduced and, if retired, the last version it applied to
pub const FEATURE_TABLE: &[(Feature, VersionRange)] = &[
    (
        Feature::UniqueOutputPath,
        VersionRange {
            introduced: 2.0,
            deprecated: None,
        },
    ),
    (
        Feature::ExpectationsPopulation,
        VersionRange {
            introduced: 3.0,
            deprecated: None,
        },
    ),
    (
        Feature::RemoveSupportForCohortExtractor,
        VersionRange {
            introduced: 4.0,
            deprecated: None,
        },
    ),
];

/// Newest project file version this crate understands
pub const LATEST_VERSION: f64 = 4.0;

/// Oldest project file version this crate understands
pub const EARLIEST_VERSION: f64 = 1.0;

/// Feature toggles in effect for one declared version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub unique_output_path: bool,
    pub expectations_population: bool,
    pub remove_support_for_cohort_extractor: bool,
}

impl FeatureFlags {
    /// Resolve the flags for a declared version.
    ///
    /// Callers are expected to have rejected versions outside
    /// `EARLIEST_VERSION..=LATEST_VERSION` already; the result for such
    /// versions is whatever the table says and carries no guarantee.
    pub fn for_version(version: f64) -> Self {
        let mut flags = Self::default();
        for (feature, range) in FEATURE_TABLE {
            flags.set(*feature, range.contains(version));
        }
        flags
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::UniqueOutputPath => self.unique_output_path,
            Feature::ExpectationsPopulation => self.expectations_population,
            Feature::RemoveSupportForCohortExtractor => self.remove_support_for_cohort_extractor,
        }
    }

    fn set(&mut self, feature: Feature, value: bool) {
        match feature {
            Feature::UniqueOutputPath => self.unique_output_path = value,
            Feature::ExpectationsPopulation => self.expectations_population = value,
            Feature::RemoveSupportForCohortExtractor => {
                self.remove_support_for_cohort_extractor = value
            }
        }
    }
}

/// Whether a declared version is one this crate can validate
pub fn is_supported_version(version: f64) -> bool {
    version.is_finite() && (EARLIEST_VERSION..=LATEST_VERSION).contains(&version)
}
