// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Declared action outputs, grouped by sensitivity

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

use crate::errors::{ValidationError, ValidationResult};
use crate::pipeline::patterns::validate_glob_pattern;
use crate::pipeline::validation::{as_mapping, as_str, key_string, present, reject_unknown_keys};

/// How sensitive a group of output files is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    HighlySensitive,
    ModeratelySensitive,
    MinimallySensitive,
}

impl SensitivityLevel {
    /// Every level, in the order groups are reported
    pub const ALL: [SensitivityLevel; 3] = [
        Self::HighlySensitive,
        Self::ModeratelySensitive,
        Self::MinimallySensitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighlySensitive => "highly_sensitive",
            Self::ModeratelySensitive => "moderately_sensitive",
            Self::MinimallySensitive => "minimally_sensitive",
        }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output name to path pattern
pub type OutputGroup = IndexMap<String, String>;

/// The `outputs` section of an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highly_sensitive: Option<OutputGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderately_sensitive: Option<OutputGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimally_sensitive: Option<OutputGroup>,
}

impl Outputs {
    /// Build from the raw `outputs` mapping of an action
    pub fn build(action_id: &str, value: &Value) -> ValidationResult<Self> {
        let loc = format!("`outputs` section for action {}", action_id);
        let mapping = as_mapping(value, &loc).map_err(|e| e.with_action(action_id))?;

        let raw_group = |level: SensitivityLevel| present(mapping.get(level.as_str()));

        if SensitivityLevel::ALL.iter().all(|l| raw_group(*l).is_none()) {
            let names: Vec<&str> = SensitivityLevel::ALL.iter().map(|l| l.as_str()).collect();
            return Err(ValidationError::shape(format!(
                "{} must specify at least one output of: {}",
                loc,
                names.join(", ")
            ))
            .with_action(action_id)
            .with_field("outputs"));
        }

        let allowed: Vec<&str> = SensitivityLevel::ALL.iter().map(|l| l.as_str()).collect();
        reject_unknown_keys(mapping, &allowed, &loc).map_err(|e| e.with_action(action_id))?;

        let mut outputs = Self::default();
        for level in SensitivityLevel::ALL {
            if let Some(raw) = raw_group(level) {
                let group = build_group(action_id, level, raw)?;
                // An empty group declares nothing, so it counts as absent
                if !group.is_empty() {
                    *outputs.slot(level) = Some(group);
                }
            }
        }

        if outputs.is_empty() {
            let names: Vec<&str> = SensitivityLevel::ALL.iter().map(|l| l.as_str()).collect();
            return Err(ValidationError::shape(format!(
                "{} must specify at least one output of: {}",
                loc,
                names.join(", ")
            ))
            .with_action(action_id)
            .with_field("outputs"));
        }

        Ok(outputs)
    }

    /// The group declared at a level, if any
    pub fn get(&self, level: SensitivityLevel) -> Option<&OutputGroup> {
        match level {
            SensitivityLevel::HighlySensitive => self.highly_sensitive.as_ref(),
            SensitivityLevel::ModeratelySensitive => self.moderately_sensitive.as_ref(),
            SensitivityLevel::MinimallySensitive => self.minimally_sensitive.as_ref(),
        }
    }

    fn slot(&mut self, level: SensitivityLevel) -> &mut Option<OutputGroup> {
        match level {
            SensitivityLevel::HighlySensitive => &mut self.highly_sensitive,
            SensitivityLevel::ModeratelySensitive => &mut self.moderately_sensitive,
            SensitivityLevel::MinimallySensitive => &mut self.minimally_sensitive,
        }
    }

    /// Number of sensitivity levels with declared outputs
    pub fn len(&self) -> usize {
        SensitivityLevel::ALL
            .iter()
            .filter(|l| self.get(**l).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every declared output as `(level, name, pattern)`
    pub fn iter(&self) -> impl Iterator<Item = (SensitivityLevel, &str, &str)> {
        SensitivityLevel::ALL.into_iter().flat_map(move |level| {
            self.get(level)
                .into_iter()
                .flat_map(move |group| group.iter().map(move |(n, p)| (level, n.as_str(), p.as_str())))
        })
    }

    /// Every declared path pattern, in declaration order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(_, _, pattern)| pattern)
    }

    pub fn first_output_file(&self) -> Option<&str> {
        self.patterns().next()
    }

    /// Unique directories the outputs are written to, sorted
    pub fn output_dirs(&self) -> Vec<String> {
        super::validation::parent_dirs(self.patterns())
            .into_iter()
            .collect()
    }
}

fn build_group(action_id: &str, level: SensitivityLevel, raw: &Value) -> ValidationResult<OutputGroup> {
    let loc = format!("`{}` section for action {}", level, action_id);
    let mapping = as_mapping(raw, &loc).map_err(|e| e.with_action(action_id).with_field(level.as_str()))?;

    let mut group = OutputGroup::new();
    for (key, value) in mapping {
        let output_id = key_string(key, &loc).map_err(|e| e.with_action(action_id))?;
        let filename = as_str(value, &format!("`{}` output for action {}", output_id, action_id))
            .map_err(|e| e.with_action(action_id).with_field(level.as_str()))?;

        validate_glob_pattern(filename, level).map_err(|e| {
            ValidationError::pattern(format!("Output path {} is invalid: {}", filename, e))
                .with_action(action_id)
                .with_field(level.as_str())
                .with_value(filename)
        })?;

        group.insert(output_id, filename.to_string());
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn build(yaml: &str) -> ValidationResult<Outputs> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Outputs::build("act", &value)
    }

    #[test]
    fn test_build_groups_in_order() {
        let outputs = build(
            "moderately_sensitive:\n  table: out/t.csv\n  plot: out/p.png\nhighly_sensitive:\n  data: out/d.arrow\n",
        )
        .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs.patterns().collect::<Vec<_>>(),
            vec!["out/d.arrow", "out/t.csv", "out/p.png"]
        );
        assert_eq!(outputs.first_output_file(), Some("out/d.arrow"));
        assert_eq!(outputs.output_dirs(), vec!["out"]);
    }

    #[test]
    fn test_requires_one_group() {
        let err = build("highly_sensitive:\n").unwrap_err();
        assert_eq!(
            err.message,
            "`outputs` section for action act must specify at least one output of: highly_sensitive, moderately_sensitive, minimally_sensitive"
        );

        assert!(build("highly_sensitive: {}\n").is_err());
    }

    #[test]
    fn test_empty_group_counts_as_absent() {
        let outputs = build("highly_sensitive: {}\nminimally_sensitive:\n  log: logs/a.log\n").unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs.get(SensitivityLevel::HighlySensitive).is_none());
    }

    #[test]
    fn test_unknown_group_rejected() {
        let err = build("highly_sensitive:\n  a: a.csv\nvery_sensitive:\n  b: b.csv\n").unwrap_err();
        assert_eq!(
            err.message,
            "Unexpected parameters (very_sensitive) in `outputs` section for action act"
        );
    }

    #[test]
    fn test_group_must_be_mapping() {
        let err = build("highly_sensitive: [a.csv]\n").unwrap_err();
        assert_eq!(
            err.message,
            "`highly_sensitive` section for action act must be a dictionary of key/value pairs"
        );
    }

    #[test]
    fn test_filename_must_be_string() {
        let err = build("highly_sensitive:\n  a: [x]\n").unwrap_err();
        assert_eq!(err.message, "`a` output for action act must be a string");
    }

    #[test]
    fn test_invalid_pattern_is_reported_with_path() {
        let err = build("moderately_sensitive:\n  a: out/data.dta\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pattern);
        assert_eq!(
            err.message,
            "Output path out/data.dta is invalid: out/data.dta is not an allowed file type for moderately_sensitive outputs"
        );
        assert_eq!(err.context.value.as_deref(), Some("out/data.dta"));
    }
}
