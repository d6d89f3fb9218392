// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Output path pattern rules
//!
//! Output patterns are later turned into file matchers by the job runner, so
//! they are restricted to plain relative paths with the bare `*` wildcard.

use crate::errors::InvalidPatternError;
use crate::pipeline::SensitivityLevel;

/// File types that may be released as moderately sensitive outputs
pub const MODERATELY_SENSITIVE_FILE_TYPES: &[&str] = &[
    // tables
    ".csv",
    // images
    ".jpg", ".jpeg", ".png", ".svg", ".svgz",
    // reports
    ".html", ".pdf", ".txt", ".log", ".json", ".md",
];

/// Directory the job runner keeps its own bookkeeping in
pub const METADATA_DIR: &str = "metadata";

/// Check a single output pattern declared at the given sensitivity level.
///
/// The first rule the pattern breaks is reported.
pub fn validate_glob_pattern(
    pattern: &str,
    level: SensitivityLevel,
) -> Result<(), InvalidPatternError> {
    if pattern.contains('\\') {
        return Err(InvalidPatternError::new(
            "contains back slashes (use forward slashes only)",
        ));
    }

    for expr in ["**", "?", "["] {
        if pattern.contains(expr) {
            return Err(InvalidPatternError::new(format!(
                "contains '{}' (only the * wildcard character is supported)",
                expr
            )));
        }
    }

    let suffix = path_suffix(pattern);
    if suffix.is_empty() || suffix.ends_with('*') {
        return Err(InvalidPatternError::new(
            "output paths must have a file type extension at the end",
        ));
    }

    if level == SensitivityLevel::ModeratelySensitive
        && !MODERATELY_SENSITIVE_FILE_TYPES.contains(&suffix)
    {
        return Err(InvalidPatternError::new(format!(
            "{} is not an allowed file type for moderately_sensitive outputs",
            pattern
        )));
    }

    if normalize_posix(pattern) != pattern {
        return Err(InvalidPatternError::new(
            "is not in standard form (contains double slashes or '..' elements)",
        ));
    }

    if pattern == METADATA_DIR || pattern.starts_with(&format!("{}/", METADATA_DIR)) {
        return Err(InvalidPatternError::new(
            "should not include the metadata directory",
        ));
    }

    // Authors may write paths on either platform, so reject both notions of absolute
    if is_posix_absolute(pattern) || is_windows_absolute(pattern) {
        return Err(InvalidPatternError::new("is an absolute path"));
    }

    Ok(())
}

/// Extension of the final path component, including the leading dot.
///
/// Follows the usual path-library rule: a leading dot (hidden file) or a
/// trailing dot does not start an extension.
pub fn path_suffix(path: &str) -> &str {
    let name = path
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .last()
        .unwrap_or("");

    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => &name[i..],
        _ => "",
    }
}

/// Lexically normalise a POSIX path: collapse repeated slashes, drop `.`
/// components and fold `..` into its parent where possible.
pub fn normalize_posix(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    // Exactly two leading slashes are significant on POSIX; three or more collapse to one
    let leading = if path.starts_with("//") && !path.starts_with("///") {
        2
    } else if path.starts_with('/') {
        1
    } else {
        0
    };

    let mut parts: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        if comp.is_empty() || comp == "." {
            continue;
        }
        let keep = comp != ".."
            || (leading == 0 && parts.is_empty())
            || parts.last() == Some(&"..");
        if keep {
            parts.push(comp);
        } else {
            parts.pop();
        }
    }

    let joined = format!("{}{}", "/".repeat(leading), parts.join("/"));
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn is_posix_absolute(path: &str) -> bool {
    path.starts_with('/')
}

fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive_root = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'/' | b'\\');
    let unc = path.starts_with("//") || path.starts_with("\\\\");
    drive_root || unc
}
