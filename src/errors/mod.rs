// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Error types for project validation
//!
//! Every failure that leaves the crate is a [`ProjectValidationError`]. Inside
//! the validator, semantic failures are [`ValidationError`] values tagged with
//! an [`ErrorKind`] and a small context payload, so callers can branch on the
//! class of problem without parsing message text.

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Result type used while building a pipeline
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for the public loading entrypoints
pub type PipelineResult<T> = Result<T, ProjectValidationError>;

/// Broad classification of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The text is not well-formed YAML
    Syntax,
    /// A field is missing, unexpected, or has the wrong type
    Shape,
    /// An output path pattern breaks one of the glob rules
    Pattern,
    /// Two actions share a command, or two outputs share a path
    Uniqueness,
    /// A `needs` entry does not resolve to an action
    Reference,
    /// A tool-specific rule linking `run` and `outputs` is broken
    ToolConsistency,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Shape => write!(f, "shape"),
            Self::Pattern => write!(f, "pattern"),
            Self::Uniqueness => write!(f, "uniqueness"),
            Self::Reference => write!(f, "reference"),
            Self::ToolConsistency => write!(f, "tool-consistency"),
        }
    }
}

/// Where in the document a failure was found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub action_id: Option<String>,
    pub field: Option<String>,
    pub value: Option<String>,
}

/// A semantic failure raised while turning the parsed document into a pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shape, message)
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Pattern, message)
    }

    pub fn uniqueness(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Uniqueness, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    pub fn tool_consistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolConsistency, message)
    }

    /// Attach the id of the offending action
    pub fn with_action(mut self, action_id: &str) -> Self {
        self.context.action_id = Some(action_id.to_string());
        self
    }

    /// Attach the name of the offending field
    pub fn with_field(mut self, field: &str) -> Self {
        self.context.field = Some(field.to_string());
        self
    }

    /// Attach the offending value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.context.value = Some(value.into());
        self
    }
}

/// An output path pattern that breaks one of the glob rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct InvalidPatternError {
    pub reason: String,
}

impl InvalidPatternError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Name the YAML parser would give a document that has no filename
pub const UNNAMED_SOURCE: &str = "<unicode string>";

/// The project text could not be parsed as YAML
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// 1-based line of the problem, when the parser reported one
    pub line: Option<usize>,
    /// 1-based column of the problem, when the parser reported one
    pub column: Option<usize>,
    pub filename: Option<String>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(line) = self.line {
            let name = self.filename.as_deref().unwrap_or(UNNAMED_SOURCE);
            write!(f, "\n  in \"{}\", line {}", name, line)?;
            if let Some(column) = self.column {
                write!(f, ", column {}", column)?;
            }
        } else if let Some(ref name) = self.filename {
            write!(f, "\n  in \"{}\"", name)?;
        }
        Ok(())
    }
}

/// The single error type returned by the loading entrypoints
#[derive(Error, Debug, Diagnostic)]
pub enum ProjectValidationError {
    #[error("{0}")]
    #[diagnostic(
        code(pipecheck::yaml_error),
        help("Check indentation (spaces, not tabs), missing colons after keys, and unquoted special characters")
    )]
    Syntax(SyntaxError),

    #[error("Invalid project: {}\n{error}", .filename.as_deref().unwrap_or(""))]
    #[diagnostic(
        code(pipecheck::invalid_project),
        help("Fix the reported action or section and validate the project again")
    )]
    Invalid {
        filename: Option<String>,
        error: ValidationError,
    },
}

impl From<SyntaxError> for ProjectValidationError {
    fn from(e: SyntaxError) -> Self {
        Self::Syntax(e)
    }
}

impl ProjectValidationError {
    /// Wrap a semantic failure, recording the file it came from
    pub fn invalid(filename: Option<&str>, error: ValidationError) -> Self {
        Self::Invalid {
            filename: filename.map(str::to_string),
            error,
        }
    }

    /// Classification of the underlying failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::Invalid { error, .. } => error.kind,
        }
    }

    /// The semantic failure, if this is not a syntax error
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::Syntax(_) => None,
            Self::Invalid { error, .. } => Some(error),
        }
    }

    /// Context payload of the underlying failure
    pub fn context(&self) -> Option<&ErrorContext> {
        self.validation_error().map(|e| &e.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_project_message_includes_filename() {
        let err = ProjectValidationError::invalid(
            Some("project.yaml"),
            ValidationError::shape("Project `actions` section must be a dictionary of key/value pairs"),
        );

        assert_eq!(
            err.to_string(),
            "Invalid project: project.yaml\nProject `actions` section must be a dictionary of key/value pairs"
        );
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_every_variant_has_code_and_help() {
        let syntax = ProjectValidationError::from(SyntaxError {
            message: "did not find expected node content".to_string(),
            line: Some(2),
            column: Some(10),
            filename: None,
        });
        let invalid = ProjectValidationError::invalid(None, ValidationError::shape("bad"));

        for err in [syntax, invalid] {
            assert!(err.code().is_some(), "{:?}", err);
            assert!(err.help().is_some(), "{:?}", err);
        }
    }

    #[test]
    fn test_invalid_project_message_without_filename() {
        let err = ProjectValidationError::invalid(None, ValidationError::reference("boom"));
        assert_eq!(err.to_string(), "Invalid project: \nboom");
        assert_eq!(err.kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_context_builders() {
        let err = ValidationError::pattern("bad")
            .with_action("analyse")
            .with_field("outputs")
            .with_value("a//b.csv");

        assert_eq!(err.context.action_id.as_deref(), Some("analyse"));
        assert_eq!(err.context.field.as_deref(), Some("outputs"));
        assert_eq!(err.context.value.as_deref(), Some("a//b.csv"));
    }

    #[test]
    fn test_syntax_error_uses_unnamed_label_without_filename() {
        let err = SyntaxError {
            message: "did not find expected key".into(),
            line: Some(3),
            column: Some(5),
            filename: None,
        };
        assert_eq!(
            err.to_string(),
            "did not find expected key\n  in \"<unicode string>\", line 3, column 5"
        );

        let named = SyntaxError {
            filename: Some("project.yaml".into()),
            ..err
        };
        assert!(named.to_string().contains("in \"project.yaml\", line 3"));
        assert!(!named.to_string().contains(UNNAMED_SOURCE));
    }
}
