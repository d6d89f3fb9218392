// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Turning project text into a generic YAML document
//!
//! Large project files are often machine-generated JSON, which the JSON
//! parser reads much faster than the YAML one. The fast path is only ever an
//! optimisation: if it fails for any reason the text is parsed again as YAML,
//! and only that parser's errors (which carry line and column) are reported.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

use crate::errors::SyntaxError;

/// Location suffix the YAML parser appends to its messages
static LOCATION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?: at line \d+ column \d+| at position \d+)$").expect("location regex is valid")
});

/// How project text is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Try the JSON parser first when the text looks like JSON
    pub fast_path: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { fast_path: true }
    }
}

/// Parse project text into a generic document, keeping key order.
///
/// `filename` is only used to label errors.
pub fn parse_yaml(
    text: &str,
    filename: Option<&str>,
    options: &LoadOptions,
) -> Result<Value, SyntaxError> {
    if options.fast_path {
        if let Some(document) = fast_parse(text) {
            tracing::trace!("parsed project with the fast path");
            return Ok(document);
        }
    }

    serde_yaml::from_str::<Value>(text).map_err(|e| syntax_error(&e, filename))
}

fn fast_parse(text: &str) -> Option<Value> {
    if !text.trim_start().starts_with('{') {
        return None;
    }
    // Errors here are discarded; the YAML parser will report them properly
    serde_json::from_str::<Value>(text).ok()
}

fn syntax_error(err: &serde_yaml::Error, filename: Option<&str>) -> SyntaxError {
    let location = err.location();
    let message = err.to_string();
    let message = if location.is_some() {
        LOCATION_SUFFIX.replace(&message, "").into_owned()
    } else {
        message
    };

    SyntaxError {
        message,
        line: location.as_ref().map(|l| l.line()),
        column: location.as_ref().map(|l| l.column()),
        filename: filename.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UNNAMED_SOURCE;

    #[test]
    fn test_parse_keeps_key_order() {
        let doc = parse_yaml("b: 1\na: 2\nc: 3\n", None, &LoadOptions::default()).unwrap();
        let keys: Vec<&str> = doc
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_fast_path_and_yaml_agree() {
        let text = r#"{"version": 2, "actions": {"b": {}, "a": {"run": "x:v1"}}}"#;
        let fast = parse_yaml(text, None, &LoadOptions { fast_path: true }).unwrap();
        let slow = parse_yaml(text, None, &LoadOptions { fast_path: false }).unwrap();
        assert_eq!(fast, slow);
    }

    #[test]
    fn test_syntax_error_reports_location_and_filename() {
        let text = "version: 2\nactions:\n  a: [\n";
        let err = parse_yaml(text, Some("project.yaml"), &LoadOptions::default()).unwrap_err();

        assert!(err.line.is_some());
        assert_eq!(err.filename.as_deref(), Some("project.yaml"));
        assert!(!err.message.contains(" at line "));

        let rendered = err.to_string();
        assert!(rendered.contains("in \"project.yaml\", line"));
        assert!(!rendered.contains(UNNAMED_SOURCE));
    }

    #[test]
    fn test_invalid_json_falls_back_to_yaml_errors() {
        let text = "{\"version\": 2,\n \"actions\": {\n";
        let err = parse_yaml(text, None, &LoadOptions::default()).unwrap_err();
        assert!(err.line.is_some());
        assert!(err.to_string().contains(UNNAMED_SOURCE));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let err = parse_yaml("a: 1\na: 2\n", None, &LoadOptions::default()).unwrap_err();
        assert!(err.message.contains("duplicate"));
    }
}
