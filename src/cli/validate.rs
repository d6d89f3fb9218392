// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Validate command - check project files

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{read_project, OutputFormat};
use crate::pipeline::Pipeline;
use crate::utils::{needs_suffix, print_invalid, print_section, print_valid};

/// Run the validate command
pub fn run(files: Vec<PathBuf>, format: OutputFormat, verbose: bool) -> Result<()> {
    // A lone file reports its diagnostic directly
    if let [path] = files.as_slice() {
        let pipeline = read_project(path)?;
        return report(&pipeline, &path.display().to_string(), format, verbose);
    }

    let mut failed = 0;
    for path in &files {
        match read_project(path) {
            Ok(pipeline) => report(&pipeline, &path.display().to_string(), format, verbose)?,
            Err(e) => {
                failed += 1;
                print_invalid(&path.display().to_string());
                eprintln!("{:?}", e);
            }
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} project files are invalid",
            failed,
            files.len()
        ));
    }
    Ok(())
}

fn report(pipeline: &Pipeline, name: &str, format: OutputFormat, verbose: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(pipeline)
                .map_err(|e| miette::miette!("Failed to serialize project: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let detail = format!(
                "(version {}, {} actions)",
                pipeline.version,
                pipeline.actions.len()
            );
            print_valid(name, &detail);
            if verbose {
                print_summary(pipeline);
            }
        }
    }
    Ok(())
}

fn print_summary(pipeline: &Pipeline) {
    print_section("Actions");
    for action in pipeline.actions.values() {
        println!(
            "    - {} ({}){}",
            action.action_id,
            action.run.image(),
            needs_suffix(&action.needs)
        );
        for (level, name, pattern) in action.outputs.iter() {
            println!("        {} {}: {}", level.to_string().dimmed(), name, pattern);
        }
    }

    if let Some(expectations) = &pipeline.expectations {
        print_section("Expectations");
        println!("    population_size: {}", expectations.population_size);
    }
    println!();
}
