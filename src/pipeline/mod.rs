// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Project file validation
//!
//! A project file is parsed into a generic YAML document first, then built
//! into a typed [`Pipeline`]. Building stops at the first problem found.

mod action;
mod command;
mod dag;
mod definition;
mod features;
mod loading;
mod outputs;
mod patterns;
mod validation;

pub use action::Action;
pub use command::Command;
pub use dag::DependencyGraph;
pub use definition::{Expectations, Pipeline, DEFAULT_POPULATION_SIZE, RUN_ALL_COMMAND};
pub use features::{
    is_supported_version, Feature, FeatureFlags, VersionRange, EARLIEST_VERSION, FEATURE_TABLE,
    LATEST_VERSION,
};
pub use loading::{parse_yaml, LoadOptions};
pub use outputs::{OutputGroup, Outputs, SensitivityLevel};
pub use patterns::{validate_glob_pattern, METADATA_DIR, MODERATELY_SENSITIVE_FILE_TYPES};
pub use validation::{apply_tool_checks, ToolCheck, TOOL_CHECKS};

use crate::errors::{PipelineResult, ProjectValidationError};

/// Validate project text and build a [`Pipeline`] with default options.
///
/// `filename` only labels error messages.
pub fn load_pipeline(text: &str, filename: Option<&str>) -> PipelineResult<Pipeline> {
    load_pipeline_with(text, filename, &LoadOptions::default())
}

/// Validate project text and build a [`Pipeline`]
pub fn load_pipeline_with(
    text: &str,
    filename: Option<&str>,
    options: &LoadOptions,
) -> PipelineResult<Pipeline> {
    let document = parse_yaml(text, filename, options)?;

    let pipeline = Pipeline::build(&document)
        .map_err(|e| ProjectValidationError::invalid(filename, e))?;

    tracing::debug!(
        file = filename.unwrap_or(crate::errors::UNNAMED_SOURCE),
        actions = pipeline.actions.len(),
        "project is valid"
    );
    Ok(pipeline)
}
