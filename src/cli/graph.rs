// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Graph command - show a project's actions as a graph

use miette::Result;
use std::path::PathBuf;

use super::{read_project, GraphFormat};

/// Run the graph command
pub fn run(project: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let pipeline = read_project(&project)?;
    let graph = pipeline.dependency_graph();

    let output = match format {
        GraphFormat::Text => graph
            .to_text(&pipeline)
            .map_err(|e| miette::miette!("{}", e))?,
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
