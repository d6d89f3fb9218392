// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Shape checks over the parsed document, and tool-specific rules
//!
//! Some tools write their outputs to paths given on the command line, so the
//! declared `outputs` of those actions have to agree with their `run`
//! command. Those rules are listed in [`TOOL_CHECKS`] and applied to every
//! action once it has been built.

use glob::Pattern;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

use crate::errors::{ValidationError, ValidationResult};
use crate::pipeline::{Action, Command, SensitivityLevel};

/// Treat an explicit YAML `null` the same as a missing key
pub(crate) fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

pub(crate) fn as_mapping<'a>(value: &'a Value, loc: &str) -> ValidationResult<&'a Mapping> {
    value.as_mapping().ok_or_else(|| {
        ValidationError::shape(format!("{} must be a dictionary of key/value pairs", loc))
    })
}

pub(crate) fn as_str<'a>(value: &'a Value, loc: &str) -> ValidationResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::shape(format!("{} must be a string", loc)))
}

pub(crate) fn as_sequence<'a>(value: &'a Value, loc: &str) -> ValidationResult<&'a [Value]> {
    value
        .as_sequence()
        .map(Vec::as_slice)
        .ok_or_else(|| ValidationError::shape(format!("{} must be a list", loc)))
}

/// Render a scalar mapping key as a string
pub(crate) fn key_string(key: &Value, loc: &str) -> ValidationResult<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ValidationError::shape(format!(
            "{} must only use plain names as keys",
            loc
        ))),
    }
}

/// Fail on any key of `mapping` not listed in `allowed`
pub(crate) fn reject_unknown_keys(
    mapping: &Mapping,
    allowed: &[&str],
    loc: &str,
) -> ValidationResult<()> {
    let unexpected: Vec<String> = mapping
        .keys()
        .map(|k| key_string(k, loc))
        .collect::<ValidationResult<Vec<_>>>()?
        .into_iter()
        .filter(|k| !allowed.contains(&k.as_str()))
        .collect();

    if unexpected.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::shape(format!(
            "Unexpected parameters ({}) in {}",
            unexpected.join(", "),
            loc
        )))
    }
}

/// A rule that applies to actions whose command matches
pub struct ToolCheck {
    pub name: &'static str,
    pub matches: fn(&Command) -> bool,
    pub check: fn(&Action) -> ValidationResult<()>,
}

/// Tool-specific rules, evaluated in order against every built action
pub const TOOL_CHECKS: &[ToolCheck] = &[
    ToolCheck {
        name: "cohortextractor generate_cohort",
        matches: is_generate_cohort,
        check: validate_cohortextractor_outputs,
    },
    ToolCheck {
        name: "ehrql generate-dataset",
        matches: is_generate_dataset,
        check: validate_ehrql_outputs,
    },
];

/// Apply every matching entry of [`TOOL_CHECKS`] to an action
pub fn apply_tool_checks(action: &Action) -> ValidationResult<()> {
    for tool in TOOL_CHECKS.iter().filter(|t| (t.matches)(&action.run)) {
        tracing::trace!(action = %action.action_id, check = tool.name, "applying tool check");
        (tool.check)(action)?;
    }
    Ok(())
}

fn is_generate_cohort(run: &Command) -> bool {
    run.name() == "cohortextractor" && run.subcommand() == Some("generate_cohort")
}

fn is_generate_dataset(run: &Command) -> bool {
    matches!(run.name(), "ehrql" | "databuilder")
        && matches!(
            run.subcommand(),
            Some("generate-dataset") | Some("generate_dataset")
        )
}

fn validate_cohortextractor_outputs(action: &Action) -> ValidationResult<()> {
    let id = &action.action_id;

    let num_levels = action.outputs.len();
    if num_levels != 1 {
        return Err(ValidationError::tool_consistency(format!(
            "A `generate_cohort` action must have exactly one output; {} had {}",
            id, num_levels
        ))
        .with_action(id)
        .with_field("outputs"));
    }

    let output_dirs = action.outputs.output_dirs();
    if output_dirs.len() == 1 {
        return Ok(());
    }

    // An explicit output directory means the author has chosen where files go
    if action.run.has_flag("--output-dir") {
        return Ok(());
    }

    let listing: Vec<String> = output_dirs.iter().map(|d| format!(" - {}/", d)).collect();
    Err(ValidationError::tool_consistency(format!(
        "generate_cohort command in action {} should produce output in only one directory, found {}:\n{}",
        id,
        output_dirs.len(),
        listing.join("\n")
    ))
    .with_action(id)
    .with_field("outputs"))
}

fn validate_ehrql_outputs(action: &Action) -> ValidationResult<()> {
    let id = &action.action_id;
    let outputs = &action.outputs;

    if outputs.get(SensitivityLevel::ModeratelySensitive).is_some()
        || outputs.get(SensitivityLevel::MinimallySensitive).is_some()
    {
        return Err(ValidationError::tool_consistency(format!(
            "`{}` action uses `generate-dataset` and so all outputs must be labelled `highly_sensitive`",
            id
        ))
        .with_action(id)
        .with_field("outputs"));
    }

    let output_spec = match action.run.flag_value("--output") {
        Some(spec) if !spec.is_empty() => spec,
        _ => {
            return Err(ValidationError::tool_consistency(format!(
                "`{}` action does not provide an `--output` argument specifying where the results of `generate-dataset` should be stored",
                id
            ))
            .with_action(id)
            .with_field("run"))
        }
    };

    let patterns: Vec<&str> = outputs
        .get(SensitivityLevel::HighlySensitive)
        .map(|group| group.values().map(String::as_str).collect())
        .unwrap_or_default();

    if !output_patterns_match_spec(output_spec, &patterns) {
        let declared: Vec<String> = patterns.iter().map(|p| format!("`{}`", p)).collect();
        return Err(ValidationError::tool_consistency(format!(
            "--output in run command and outputs must match: `{}` action has --output `{}` but declares outputs {}",
            id,
            output_spec,
            declared.join(", ")
        ))
        .with_action(id)
        .with_field("run")
        .with_value(output_spec));
    }

    Ok(())
}

/// Whether the declared output patterns agree with an `--output` argument.
///
/// An argument of the form `<dir>:<ext>` (or `<dir>/<name>:<ext>`) describes a
/// directory of files, so every pattern must fall under `<dir>/*.<ext>`.
/// Anything else names a single file, which must be declared verbatim.
pub fn output_patterns_match_spec(spec: &str, patterns: &[&str]) -> bool {
    match split_directory_and_extension(spec) {
        (directory, Some(extension)) => {
            let glob = format!(
                "{}/*{}",
                Pattern::escape(&directory),
                Pattern::escape(&extension)
            );
            match Pattern::new(&glob) {
                Ok(glob) => patterns.iter().all(|p| glob.matches(p)),
                Err(_) => false,
            }
        }
        (_, None) => patterns.contains(&spec),
    }
}

/// Split `outputs/data:csv` into `("outputs/data", Some(".csv"))` and
/// `outputs/:csv` into `("outputs", Some(".csv"))`.
pub fn split_directory_and_extension(spec: &str) -> (String, Option<String>) {
    let trimmed = spec.trim_end_matches('/');
    let (parent, file_name) = match trimmed.rsplit_once('/') {
        Some((parent, name)) => (Some(parent), name),
        None => (None, trimmed),
    };

    let Some((name, extension)) = file_name.rsplit_once(':') else {
        return (trimmed.to_string(), None);
    };
    let extension = format!(".{}", extension);

    let directory = match (parent, name.is_empty()) {
        (Some(parent), true) => parent.to_string(),
        (None, true) => ".".to_string(),
        (Some(parent), false) => format!("{}/{}", parent, name),
        (None, false) => name.to_string(),
    };
    (directory, Some(extension))
}

/// Unique parent directories of a set of patterns, sorted
pub fn parent_dirs<'a>(patterns: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    patterns
        .into_iter()
        .map(|p| match p.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => ".".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_directory_and_extension() {
        assert_eq!(
            split_directory_and_extension("outputs/:csv"),
            ("outputs".to_string(), Some(".csv".to_string()))
        );
        assert_eq!(
            split_directory_and_extension("outputs/data:arrow"),
            ("outputs/data".to_string(), Some(".arrow".to_string()))
        );
        assert_eq!(
            split_directory_and_extension("outputs/dataset.csv"),
            ("outputs/dataset.csv".to_string(), None)
        );
        assert_eq!(
            split_directory_and_extension(":csv"),
            (".".to_string(), Some(".csv".to_string()))
        );
    }

    #[test]
    fn test_single_file_spec_needs_exact_match() {
        assert!(output_patterns_match_spec("outputs/dataset.csv", &["outputs/dataset.csv"]));
        assert!(!output_patterns_match_spec("outputs/dataset.csv", &["outputs/other.csv"]));
    }

    #[test]
    fn test_directory_spec_matches_every_pattern() {
        assert!(output_patterns_match_spec(
            "outputs/data:csv",
            &["outputs/data/patients.csv", "outputs/data/events.csv"]
        ));
        assert!(output_patterns_match_spec("outputs/data:csv", &["outputs/data/*.csv"]));
        assert!(!output_patterns_match_spec(
            "outputs/data:csv",
            &["outputs/data/patients.csv", "outputs/data/events.arrow"]
        ));
        assert!(!output_patterns_match_spec("outputs/data:csv", &["elsewhere/patients.csv"]));
    }

    #[test]
    fn test_parent_dirs() {
        let dirs = parent_dirs(["b/x.csv", "a/y.csv", "b/z.csv", "top.csv"]);
        assert_eq!(dirs.into_iter().collect::<Vec<_>>(), vec![".", "a", "b"]);
    }

    #[test]
    fn test_reject_unknown_keys_lists_all() {
        let mapping: Mapping = serde_yaml::from_str("run: x\nrn: y\nneeds2: z\n").unwrap();
        let err = reject_unknown_keys(&mapping, &["run"], "action a").unwrap_err();
        assert_eq!(err.message, "Unexpected parameters (rn, needs2) in action a");
    }

    #[test]
    fn test_type_messages() {
        let value = Value::Bool(true);
        assert_eq!(
            as_mapping(&value, "`outputs` section for action a").unwrap_err().message,
            "`outputs` section for action a must be a dictionary of key/value pairs"
        );
        assert_eq!(as_str(&value, "x").unwrap_err().message, "x must be a string");
        assert_eq!(as_sequence(&value, "x").unwrap_err().message, "x must be a list");
    }
}
