// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! CLI command definitions and handlers

pub mod graph;
pub mod images;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::pipeline::{load_pipeline, Pipeline};

/// Research pipeline project checker
#[derive(Parser, Debug)]
#[clap(
    name = "pipecheck",
    version,
    about = "Validate research pipeline project files",
    long_about = None,
    after_help = "Examples:\n\
        pipecheck validate                   Validate ./project.yaml\n\
        pipecheck validate a.yaml b.yaml     Validate several files\n\
        pipecheck images                     List the images the project uses\n\
        pipecheck graph --format mermaid     Show the dependency graph\n\n\
        See 'pipecheck <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate project files
    Validate {
        /// Project files to validate
        #[clap(env = "PIPECHECK_PROJECT", default_value = "project.yaml")]
        files: Vec<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the images used by a project's actions
    Images {
        /// Project file
        #[clap(env = "PIPECHECK_PROJECT", default_value = "project.yaml")]
        project: PathBuf,
    },

    /// Show a project's actions as a dependency graph
    Graph {
        /// Project file
        #[clap(env = "PIPECHECK_PROJECT", default_value = "project.yaml")]
        project: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value = "text")]
        format: GraphFormat,
    },
}

/// Output format for the validate command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Read and validate a project file, turning failures into diagnostics
pub(crate) fn read_project(path: &Path) -> Result<Pipeline> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        miette::miette!("Failed to read project file '{}': {}", path.display(), e)
    })?;

    let filename = path.display().to_string();
    load_pipeline(&text, Some(&filename)).map_err(miette::Report::new)
}
