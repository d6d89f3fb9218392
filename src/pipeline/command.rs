// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Action `run` commands
//!
//! A run string looks like `tool:v2 sub-command --flag value`. The first token
//! names the container image and its version; the rest is passed through.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::hash::{Hash, Hasher};

use crate::errors::{ValidationError, ValidationResult};

/// Versions an image may be pinned to. `dev` is for local testing.
static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((v[\d.]+)|dev|latest)$").expect("version regex is valid"));

/// A parsed `run` command
///
/// Equality and hashing use the raw text only, which is what the pipeline
/// compares when looking for duplicate commands.
#[derive(Debug, Clone)]
pub struct Command {
    raw: String,
    parts: Vec<String>,
}

impl Command {
    /// Parse the `run` string of an action
    pub fn parse(raw: &str, action_id: &str) -> ValidationResult<Self> {
        let empty = || {
            ValidationError::shape(format!(
                "run must have a value, {} has an empty run key",
                action_id
            ))
            .with_action(action_id)
            .with_field("run")
        };

        if raw.trim().is_empty() {
            return Err(empty());
        }

        let parts = shlex::split(raw).ok_or_else(|| {
            ValidationError::shape(format!(
                "`run` command for action {} could not be parsed: no closing quotation",
                action_id
            ))
            .with_action(action_id)
            .with_field("run")
            .with_value(raw)
        })?;
        let first = parts.first().ok_or_else(empty)?;

        let (name, version) = split_image(first);
        if !VERSION_REGEX.is_match(version) {
            return Err(ValidationError::shape(format!(
                "Action {} command {} must have a version specified in the form :vN (e.g. {}:v2)",
                action_id, name, name
            ))
            .with_action(action_id)
            .with_field("run")
            .with_value(first.as_str()));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// The command exactly as written
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Shell-style tokens of the command
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Image name, the first token with the version split off
    pub fn name(&self) -> &str {
        split_image(&self.parts[0]).0
    }

    /// Image version, the part of the first token after the colon
    pub fn version(&self) -> &str {
        split_image(&self.parts[0]).1
    }

    /// Sub-command, if any
    pub fn subcommand(&self) -> Option<&str> {
        self.parts.get(1).map(String::as_str)
    }

    /// Everything after the image, re-joined with single spaces
    pub fn args(&self) -> String {
        self.parts[1..].join(" ")
    }

    /// `name:version` as written in the command
    pub fn image(&self) -> &str {
        &self.parts[0]
    }

    /// Whether any token is `flag` or `flag=...`
    pub fn has_flag(&self, flag: &str) -> bool {
        self.parts.iter().any(|arg| {
            arg == flag
                || arg
                    .strip_prefix(flag)
                    .map_or(false, |rest| rest.starts_with('='))
        })
    }

    /// Value given to `flag`, either as `flag value` or `flag=value`
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        let mut args = self.parts.iter().map(String::as_str).peekable();
        while let Some(arg) = args.next() {
            if arg == flag {
                return Some(args.peek().copied().unwrap_or(""));
            }
            if let Some(value) = arg.strip_prefix(flag).and_then(|r| r.strip_prefix('=')) {
                return Some(value);
            }
        }
        None
    }
}

fn split_image(token: &str) -> (&str, &str) {
    token.split_once(':').unwrap_or((token, ""))
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versioned_command() {
        let cmd = Command::parse("tool:v2 subcommand --flag 'a b'", "act").unwrap();
        assert_eq!(cmd.name(), "tool");
        assert_eq!(cmd.version(), "v2");
        assert_eq!(cmd.subcommand(), Some("subcommand"));
        assert_eq!(cmd.parts(), &["tool:v2", "subcommand", "--flag", "a b"]);
        assert_eq!(cmd.args(), "subcommand --flag a b");
        assert_eq!(cmd.image(), "tool:v2");
    }

    #[test]
    fn test_accepted_versions() {
        for run in ["tool:latest", "tool:dev", "tool:v1.2.3", "python:v2 script.py"] {
            assert!(Command::parse(run, "act").is_ok(), "{}", run);
        }
    }

    #[test]
    fn test_missing_v_prefix_rejected() {
        let err = Command::parse("tool:2", "act").unwrap_err();
        assert_eq!(
            err.message,
            "Action act command tool must have a version specified in the form :vN (e.g. tool:v2)"
        );
        assert_eq!(err.context.action_id.as_deref(), Some("act"));
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = Command::parse("tool", "act").unwrap_err();
        assert!(err.message.contains("e.g. tool:v2"));
        assert!(Command::parse("tool: run", "act").is_err());
    }

    #[test]
    fn test_empty_run_rejected() {
        let err = Command::parse("", "act").unwrap_err();
        assert_eq!(err.message, "run must have a value, act has an empty run key");
        assert!(Command::parse("   ", "act").is_err());
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        let err = Command::parse("tool:v1 'oops", "act").unwrap_err();
        assert!(err.message.contains("could not be parsed"));
    }

    #[test]
    fn test_equality_uses_raw_text() {
        let a = Command::parse("tool:v1 run", "a").unwrap();
        let b = Command::parse("tool:v1 run", "b").unwrap();
        let c = Command::parse("tool:v1  run", "c").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_flags() {
        let cmd = Command::parse("ehrql:v1 generate-dataset --output=out/a.csv --output-dir x", "a").unwrap();
        assert!(cmd.has_flag("--output-dir"));
        assert!(cmd.has_flag("--output"));
        assert!(!cmd.has_flag("--out"));
        assert_eq!(cmd.flag_value("--output"), Some("out/a.csv"));
        assert_eq!(cmd.flag_value("--output-dir"), Some("x"));
        assert_eq!(cmd.flag_value("--missing"), None);

        let trailing = Command::parse("ehrql:v1 generate-dataset --output", "a").unwrap();
        assert_eq!(trailing.flag_value("--output"), Some(""));
    }
}
