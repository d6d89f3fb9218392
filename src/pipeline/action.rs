// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! A single named action of a pipeline

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

use crate::errors::{ValidationError, ValidationResult};
use crate::pipeline::validation::{
    apply_tool_checks, as_mapping, as_sequence, as_str, present, reject_unknown_keys,
};
use crate::pipeline::{Command, Outputs};

/// Keys an action may declare
const ACTION_KEYS: &[&str] = &["run", "outputs", "needs", "config", "dummy_data_file"];

/// Sub-commands that may touch the database, by image name
enum DatabaseCommands {
    Any,
    Only(&'static [&'static str]),
}

/// Actions get no database access unless their command is listed here
const DATABASE_COMMANDS: &[(&str, DatabaseCommands)] = &[
    (
        "ehrql",
        DatabaseCommands::Only(&["generate-dataset", "generate-measures"]),
    ),
    ("sqlrunner", DatabaseCommands::Any),
    (
        "cohortextractor",
        DatabaseCommands::Only(&["generate_cohort", "generate_codelist_report"]),
    ),
    ("databuilder", DatabaseCommands::Only(&["generate-dataset"])),
];

/// One unit of work: a versioned command, its outputs and what it needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub action_id: String,
    pub run: Command,
    pub needs: Vec<String>,
    pub outputs: Outputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dummy_data_file: Option<PathBuf>,
}

impl Action {
    /// Build an action from its raw entry in the `actions` section
    pub fn build(action_id: &str, value: &Value) -> ValidationResult<Self> {
        let in_action = |e: ValidationError| e.with_action(action_id);

        let raw = as_mapping(value, &format!("Configuration for action {}", action_id))
            .map_err(in_action)?;

        for key in ["run", "outputs"] {
            if !raw.contains_key(key) {
                return Err(ValidationError::shape(format!(
                    "Action {} must contain a configuration for '{}'",
                    action_id, key
                ))
                .with_action(action_id)
                .with_field(key));
            }
        }

        reject_unknown_keys(raw, ACTION_KEYS, &format!("action {}", action_id)).map_err(in_action)?;

        let section = |key: &str| format!("`{}` section for action {}", key, action_id);

        let raw_outputs = raw.get("outputs").unwrap_or(&Value::Null);
        as_mapping(raw_outputs, &section("outputs")).map_err(|e| in_action(e).with_field("outputs"))?;

        let raw_run = raw.get("run").unwrap_or(&Value::Null);
        let run = as_str(raw_run, &section("run")).map_err(|e| in_action(e).with_field("run"))?;

        let raw_needs = present(raw.get("needs"))
            .map(|v| as_sequence(v, &section("needs")))
            .transpose()
            .map_err(|e| in_action(e).with_field("needs"))?;

        let config = present(raw.get("config"))
            .map(|v| as_mapping(v, &section("config")).cloned())
            .transpose()
            .map_err(|e| in_action(e).with_field("config"))?;

        let dummy_data_file = present(raw.get("dummy_data_file"))
            .map(|v| as_str(v, &section("dummy_data_file")).map(PathBuf::from))
            .transpose()
            .map_err(|e| in_action(e).with_field("dummy_data_file"))?;

        let outputs = Outputs::build(action_id, raw_outputs)?;
        let run = Command::parse(run, action_id)?;

        let needs = raw_needs
            .unwrap_or_default()
            .iter()
            .map(|n| {
                as_str(n, &format!("Each entry of the `needs` section for action {}", action_id))
                    .map(str::to_string)
                    .map_err(|e| in_action(e).with_field("needs"))
            })
            .collect::<ValidationResult<Vec<_>>>()?;

        let action = Self {
            action_id: action_id.to_string(),
            run,
            needs,
            outputs,
            config,
            dummy_data_file,
        };

        apply_tool_checks(&action)?;

        tracing::trace!(action = action_id, image = action.run.image(), "built action");
        Ok(action)
    }

    /// Whether this action's command is trusted with database access
    pub fn is_database_action(&self) -> bool {
        let Some((_, commands)) = DATABASE_COMMANDS
            .iter()
            .find(|(image, _)| *image == self.run.name())
        else {
            return false;
        };

        match commands {
            DatabaseCommands::Any => true,
            DatabaseCommands::Only(allowed) => self
                .run
                .subcommand()
                .map_or(false, |sub| allowed.contains(&sub)),
        }
    }
}

/// Reject `needs` entries that hold several action ids separated by spaces.
///
/// Every offending entry across all actions is listed, since authors usually
/// make this mistake the same way throughout a file.
pub fn validate_needs_separators<'a>(
    actions: impl IntoIterator<Item = &'a Action>,
) -> ValidationResult<()> {
    let offenders: Vec<(&str, &str)> = actions
        .into_iter()
        .flat_map(|a| {
            a.needs
                .iter()
                .filter(|n| n.chars().any(char::is_whitespace))
                .map(move |n| (a.action_id.as_str(), n.as_str()))
        })
        .collect();

    let Some((first_action, first_need)) = offenders.first().copied() else {
        return Ok(());
    };

    let listing: Vec<String> = offenders
        .iter()
        .map(|(action, need)| format!("{} needs `{}`", action, need))
        .collect();

    Err(ValidationError::shape(format!(
        "`needs` actions should be separated with commas, but {}",
        listing.join(", ")
    ))
    .with_action(first_action)
    .with_field("needs")
    .with_value(first_need))
}
