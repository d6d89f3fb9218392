// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Dependency graph over action `needs`
//!
//! Validation only guarantees that every `needs` entry names a real action.
//! Anything that runs actions also needs an order, which is where cycles
//! surface.

use indexmap::IndexMap;
use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::errors::{ValidationError, ValidationResult};
use crate::pipeline::Pipeline;

/// Directed graph with an edge from each needed action to the action needing it
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: IndexMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph of a validated pipeline
    pub fn build(pipeline: &Pipeline) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = IndexMap::with_capacity(pipeline.actions.len());

        for action_id in pipeline.actions.keys() {
            let node = graph.add_node(action_id.clone());
            nodes.insert(action_id.clone(), node);
        }

        for (action_id, action) in &pipeline.actions {
            let to = nodes[action_id];
            for need in &action.needs {
                // Unknown needs are rejected when the pipeline is built
                if let Some(from) = nodes.get(need) {
                    if !graph.contains_edge(*from, to) {
                        graph.add_edge(*from, to, ());
                    }
                }
            }
        }

        Self { graph, nodes }
    }

    /// Action ids in an order where every action follows the actions it needs
    pub fn execution_order(&self) -> ValidationResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|n| self.graph[n].clone()).collect())
            .map_err(|cycle| {
                let members = self.cycle_members(cycle.node_id());
                ValidationError::reference(format!(
                    "Circular dependency between actions: {}",
                    members.join(" -> ")
                ))
                .with_action(&self.graph[cycle.node_id()])
                .with_field("needs")
            })
    }

    /// Actions in the strongly connected component containing `start`, in
    /// declaration order, with the first repeated to close the loop
    fn cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let component = tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.contains(&start))
            .unwrap_or_else(|| vec![start]);

        let mut members: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| component.contains(node))
            .map(|(id, _)| id.clone())
            .collect();
        if let Some(first) = members.first().cloned() {
            members.push(first);
        }
        members
    }

    /// Actions directly needed by `action_id`
    pub fn dependencies(&self, action_id: &str) -> Option<Vec<String>> {
        self.neighbours(action_id, Direction::Incoming)
    }

    /// Actions that directly need `action_id`
    pub fn dependents(&self, action_id: &str) -> Option<Vec<String>> {
        self.neighbours(action_id, Direction::Outgoing)
    }

    fn neighbours(&self, action_id: &str, direction: Direction) -> Option<Vec<String>> {
        let node = self.nodes.get(action_id)?;
        let mut found: Vec<String> = self
            .graph
            .neighbors_directed(*node, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        // petgraph yields neighbours newest-edge first
        found.reverse();
        Some(found)
    }

    /// Whether `action` needs `other`, directly or through other actions
    pub fn depends_on(&self, action: &str, other: &str) -> bool {
        match (self.nodes.get(action), self.nodes.get(other)) {
            (Some(a), Some(b)) if a != b => has_path_connecting(&self.graph, *b, *a, None),
            _ => false,
        }
    }

    /// Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        for action_id in self.nodes.keys() {
            out.push_str(&format!("    {}[{}]\n", action_id, action_id));
        }
        for edge in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge) {
                out.push_str(&format!("    {} --> {}\n", self.graph[from], self.graph[to]));
            }
        }
        out
    }

    /// Graphviz digraph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge) {
                out.push_str(&format!(
                    "    \"{}\" -> \"{}\";\n",
                    self.graph[from], self.graph[to]
                ));
            }
        }

        for (action_id, node) in &self.nodes {
            if self.graph.neighbors_undirected(*node).next().is_none() {
                out.push_str(&format!("    \"{}\";\n", action_id));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Numbered execution order with each action's direct needs
    pub fn to_text(&self, pipeline: &Pipeline) -> ValidationResult<String> {
        let mut out = String::new();

        for (i, action_id) in self.execution_order()?.iter().enumerate() {
            let image = pipeline
                .get_action(action_id)
                .map(|a| a.run.image().to_string())
                .unwrap_or_default();
            out.push_str(&format!("{}. {} ({})", i + 1, action_id, image));

            let needs = self.dependencies(action_id).unwrap_or_default();
            if !needs.is_empty() {
                out.push_str(&format!(" [needs: {}]", needs.join(", ")));
            }
            out.push('\n');
        }

        Ok(out)
    }
}
