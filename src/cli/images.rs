// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Images command - list the images a project's actions run in

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::read_project;

/// Run the images command
pub fn run(project: PathBuf, verbose: bool) -> Result<()> {
    let pipeline = read_project(&project)?;

    for image in pipeline.action_images() {
        println!("{}", image);
    }

    if verbose {
        let database: Vec<&str> = pipeline
            .actions
            .values()
            .filter(|a| a.is_database_action())
            .map(|a| a.action_id.as_str())
            .collect();
        if !database.is_empty() {
            eprintln!("{} {}", "database access:".dimmed(), database.join(", "));
        }
    }

    Ok(())
}
