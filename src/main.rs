// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! pipecheck - research pipeline project validation
//!
//! Validate project files and inspect the pipelines they describe.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipecheck::cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipecheck=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    match cli.command {
        Commands::Validate { files, format } => {
            pipecheck::cli::validate::run(files, format, cli.verbose)
        }
        Commands::Images { project } => pipecheck::cli::images::run(project, cli.verbose),
        Commands::Graph { project, format } => {
            pipecheck::cli::graph::run(project, format, cli.verbose)
        }
    }
}
