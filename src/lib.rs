// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! # pipecheck - research pipeline project validation
//!
//! `pipecheck` reads a `project.yaml` describing a pipeline of containerised
//! actions and either returns a validated [`Pipeline`] or a single error
//! explaining the first problem found.
//!
//! ## Features
//!
//! - **Versioned format** - behaviour is switched on the project's `version`
//! - **Output policy** - path, extension and uniqueness rules for outputs
//! - **Tool checks** - `run` commands and declared outputs must agree
//! - **Dependency graph** - execution order over `needs`
//!
//! ## Quick Start
//!
//! ```no_run
//! let text = std::fs::read_to_string("project.yaml").unwrap();
//! let pipeline = pipecheck::load_pipeline(&text, Some("project.yaml")).unwrap();
//! for image in pipeline.action_images() {
//!     println!("{}", image);
//! }
//! ```

pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use errors::{ErrorKind, PipelineResult, ProjectValidationError, ValidationError};
pub use pipeline::{load_pipeline, load_pipeline_with, Action, LoadOptions, Pipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
