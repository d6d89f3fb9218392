// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Pipeline definition structures
//!
//! Builds a validated [`Pipeline`] from a parsed `project.yaml` document.
//! Validation stops at the first problem found so that each message points
//! at a single root cause.

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

use crate::errors::{ValidationError, ValidationResult};
use crate::pipeline::action::validate_needs_separators;
use crate::pipeline::features::{is_supported_version, FeatureFlags, LATEST_VERSION};
use crate::pipeline::validation::{as_mapping, key_string, present, reject_unknown_keys};
use crate::pipeline::{Action, Command, DependencyGraph};

/// The magic action name which means "run every action"
pub const RUN_ALL_COMMAND: &str = "run_all";

/// Population size assumed by versions that predate the `expectations` section
pub const DEFAULT_POPULATION_SIZE: i64 = 1000;

const PROJECT_KEYS: &[&str] = &["version", "actions", "expectations"];

/// The `expectations` section of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Expectations {
    pub population_size: i64,
}

impl Expectations {
    pub fn build(value: &Value) -> ValidationResult<Self> {
        let mapping = as_mapping(value, "Project `expectations` section")
            .map_err(|e| e.with_field("expectations"))?;

        if !mapping.contains_key("population_size") {
            return Err(ValidationError::shape(
                "Project `expectations` section must include `population_size` section",
            )
            .with_field("expectations"));
        }
        reject_unknown_keys(mapping, &["population_size"], "project `expectations` section")
            .map_err(|e| e.with_field("expectations"))?;

        let raw = mapping.get("population_size").unwrap_or(&Value::Null);
        let population_size = lenient_int(raw).ok_or_else(|| {
            ValidationError::shape("Project expectations population size must be a number")
                .with_field("population_size")
                .with_value(describe(raw))
        })?;

        Ok(Self { population_size })
    }
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
        }
    }
}

/// A validated pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    /// Declared project file format version
    pub version: f64,
    /// Actions in the order they were declared
    pub actions: IndexMap<String, Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectations: Option<Expectations>,
}

impl Pipeline {
    /// Validate a parsed project document
    pub fn build(document: &Value) -> ValidationResult<Self> {
        let project = as_mapping(document, "Project file")?;
        reject_unknown_keys(project, PROJECT_KEYS, "project")?;

        let version = parse_version(present(project.get("version")))?;
        let flags = FeatureFlags::for_version(version);
        tracing::debug!(version, ?flags, "resolved feature flags");

        let actions = build_actions(present(project.get("actions")))?;
        validate_needs_separators(actions.values())?;

        if flags.remove_support_for_cohort_extractor {
            validate_no_cohortextractor(&actions)?;
        }

        validate_unique_commands(&actions)?;

        if flags.unique_output_path {
            validate_unique_output_paths(&actions)?;
        }

        validate_needs_exist(&actions)?;

        let raw_expectations = present(project.get("expectations"));
        let expectations = if flags.remove_support_for_cohort_extractor {
            if raw_expectations.is_some() {
                return Err(ValidationError::shape(
                    "Project includes `expectations` section, which is not supported in this version",
                )
                .with_field("expectations"));
            }
            None
        } else if flags.expectations_population {
            let raw = raw_expectations.ok_or_else(|| {
                ValidationError::shape("Project must include `expectations` section")
                    .with_field("expectations")
            })?;
            Some(Expectations::build(raw)?)
        } else {
            Some(Expectations::default())
        };

        tracing::debug!(actions = actions.len(), "pipeline is valid");
        Ok(Self {
            version,
            actions,
            expectations,
        })
    }

    /// Get an action by id
    pub fn get_action(&self, action_id: &str) -> Option<&Action> {
        self.actions.get(action_id)
    }

    /// Ids of every runnable action, ignoring a hand-written `run_all`
    pub fn all_actions(&self) -> Vec<&str> {
        self.actions
            .keys()
            .map(String::as_str)
            .filter(|id| *id != RUN_ALL_COMMAND)
            .collect()
    }

    /// Every `image:version` the pipeline uses.
    ///
    /// `latest` has always meant `v1`, so it is reported that way.
    pub fn action_images(&self) -> BTreeSet<String> {
        self.actions
            .values()
            .map(|action| {
                let version = match action.run.version() {
                    "latest" => "v1",
                    other => other,
                };
                format!("{}:{}", action.run.name(), version)
            })
            .collect()
    }

    /// Every declared output pattern, without duplicates, in declaration order
    pub fn output_patterns(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.actions
            .values()
            .flat_map(|a| a.outputs.patterns())
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// Dependency graph over the `needs` of every action
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(self)
    }
}

fn parse_version(raw: Option<&Value>) -> ValidationResult<f64> {
    let raw = raw.ok_or_else(|| {
        ValidationError::shape(format!(
            "Project file must have a `version` attribute specifying which version of the project configuration format it uses (current latest version is {})",
            LATEST_VERSION
        ))
        .with_field("version")
    })?;

    let version = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match version {
        Some(v) if is_supported_version(v) => Ok(v),
        _ => Err(ValidationError::shape(format!(
            "`version` must be a number between 1 and {}",
            LATEST_VERSION
        ))
        .with_field("version")
        .with_value(describe(raw))),
    }
}

fn build_actions(raw: Option<&Value>) -> ValidationResult<IndexMap<String, Action>> {
    let loc = "Project `actions` section";
    let mapping: &Mapping = as_mapping(raw.unwrap_or(&Value::Null), loc)
        .map_err(|e| e.with_field("actions"))?;

    let mut actions = IndexMap::with_capacity(mapping.len());
    for (key, value) in mapping {
        let action_id = key_string(key, loc)?;
        let action = Action::build(&action_id, value)?;
        actions.insert(action_id, action);
    }
    Ok(actions)
}

fn validate_no_cohortextractor(actions: &IndexMap<String, Action>) -> ValidationResult<()> {
    match actions
        .values()
        .find(|a| a.run.image().starts_with("cohortextractor"))
    {
        Some(action) => Err(ValidationError::tool_consistency(format!(
            "Action {} uses cohortextractor actions, which are not supported in this version.",
            action.action_id
        ))
        .with_action(&action.action_id)
        .with_field("run")
        .with_value(action.run.raw())),
        None => Ok(()),
    }
}

fn validate_unique_commands(actions: &IndexMap<String, Action>) -> ValidationResult<()> {
    let mut seen: IndexMap<&Command, Vec<&str>> = IndexMap::new();
    for (id, action) in actions {
        seen.entry(&action.run).or_default().push(id);
    }

    match seen.into_iter().find(|(_, ids)| ids.len() > 1) {
        Some((run, ids)) => Err(ValidationError::uniqueness(format!(
            "Actions {} have the same 'run' command: {}",
            ids.join(", "),
            run.raw()
        ))
        .with_action(ids[1])
        .with_field("run")
        .with_value(run.raw())),
        None => Ok(()),
    }
}

fn validate_unique_output_paths(actions: &IndexMap<String, Action>) -> ValidationResult<()> {
    let mut seen: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for (id, action) in actions {
        for pattern in action.outputs.patterns() {
            seen.entry(pattern).or_default().push(id);
        }
    }

    match seen.into_iter().find(|(_, ids)| ids.len() > 1) {
        Some((path, ids)) => {
            let mut owners: Vec<&str> = ids.clone();
            owners.dedup();
            Err(ValidationError::uniqueness(format!(
                "Output path {} is not unique (declared by {})",
                path,
                owners.join(", ")
            ))
            .with_action(ids[ids.len() - 1])
            .with_field("outputs")
            .with_value(path))
        }
        None => Ok(()),
    }
}

fn validate_needs_exist(actions: &IndexMap<String, Action>) -> ValidationResult<()> {
    let problems: Vec<(&str, Vec<&str>)> = actions
        .values()
        .filter_map(|a| {
            let missing: Vec<&str> = a
                .needs
                .iter()
                .map(String::as_str)
                .filter(|n| !actions.contains_key(*n))
                .collect();
            (!missing.is_empty()).then(|| (a.action_id.as_str(), missing))
        })
        .collect();

    let Some((first_action, first_missing)) = problems.first() else {
        return Ok(());
    };

    let lines: Vec<String> = problems
        .iter()
        .map(|(id, missing)| {
            let noun = if missing.len() == 1 {
                "an unknown action"
            } else {
                "unknown actions"
            };
            format!(
                "Action `{}` references {} in its `needs` list: {}",
                id,
                noun,
                missing.join(", ")
            )
        })
        .collect();

    Err(ValidationError::reference(lines.join("\n"))
        .with_action(first_action)
        .with_field("needs")
        .with_value(first_missing[0]))
}

/// Read an integer the way a user would expect: `1000`, `1000.0` and `"1000"` all work
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .map(f64::trunc)
                .filter(|f| (i64::MIN as f64..i64::MAX as f64).contains(f))
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Short rendering of a raw value for error context
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(_) => "a tagged value".to_string(),
    }
}
