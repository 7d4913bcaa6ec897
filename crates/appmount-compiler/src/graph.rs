//! Cross-component mount reference graph using `petgraph`.
//!
//! Parses every component of an application, records which components
//! borrow host paths from which, and resolves a creation order in which
//! every referenced component exists before the components that mount it.

use appmount_common::error::{MountError, Result};
use appmount_common::types::AppSpec;
use petgraph::graph::NodeIndex;

use crate::parser::{component_references, parse_container_data};

/// Mount references between the components of one application.
#[derive(Debug)]
pub struct MountGraph {
    /// Node weights are component names. An edge points from the referenced
    /// component to the component that mounts it.
    graph: petgraph::Graph<String, ()>,
    nodes: Vec<NodeIndex>,
}

impl MountGraph {
    /// Parses every component's containerData and builds the reference graph.
    ///
    /// # Errors
    ///
    /// Returns an error if any containerData fails to parse, or if a
    /// reference is out of range or does not point at an earlier component.
    pub fn from_app_spec(app: &AppSpec) -> Result<Self> {
        tracing::info!(app = %app.name, version = app.version, "building mount reference graph");
        let mut graph = petgraph::Graph::new();

        if !app.is_composed() {
            let container_data = app.container_data.as_deref().unwrap_or_default();
            let parsed = parse_container_data(container_data)?;
            if let Some(&index) = component_references(&parsed).iter().find(|&&i| i != 0) {
                return Err(MountError::LegacyReference { index });
            }
            let node = graph.add_node(app.name.clone());
            return Ok(Self {
                graph,
                nodes: vec![node],
            });
        }

        let nodes: Vec<NodeIndex> = app
            .compose
            .iter()
            .map(|c| graph.add_node(c.name.clone()))
            .collect();
        let count = nodes.len();

        for (current, component) in app.compose.iter().enumerate() {
            let parsed = parse_container_data(&component.container_data)?;
            for referenced in component_references(&parsed) {
                if referenced >= count {
                    return Err(MountError::ReferenceOutOfRange {
                        index: referenced,
                        count,
                    });
                }
                if referenced >= current {
                    return Err(MountError::ReferenceOrder {
                        current,
                        referenced,
                    });
                }
                let _ = graph.update_edge(nodes[referenced], nodes[current], ());
            }
        }

        Ok(Self { graph, nodes })
    }

    /// Indexes of the components whose host paths the component at `index` mounts.
    pub fn dependencies_of(&self, index: usize) -> Vec<usize> {
        let Some(&node) = self.nodes.get(index) else {
            return Vec::new();
        };
        let mut deps: Vec<usize> = self
            .graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .map(NodeIndex::index)
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Number of components in the graph.
    pub fn component_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns component names in an order where every referenced component
    /// precedes the components that mount it.
    ///
    /// [`MountGraph::from_app_spec`] only adds edges from a lower index to a
    /// higher one, so a built graph is acyclic and this never fails in practice.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::Config`] if the graph contains a cycle.
    pub fn creation_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_cycle) => Err(MountError::Config {
                message: "cyclic mount reference detected between components".into(),
            }),
        }
    }
}

/// Parses and cross-checks the mounts of every component of `app`.
///
/// # Errors
///
/// Returns the first parse or reference error found.
pub fn validate_app_mounts(app: &AppSpec) -> Result<()> {
    let graph = MountGraph::from_app_spec(app)?;
    let order = graph.creation_order()?;
    tracing::debug!(app = %app.name, ?order, "mount references resolved");
    Ok(())
}
