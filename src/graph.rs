use anyhow::Result;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use std::collections::HashMap;
use std::ops::Index;

use crate::message::MessageSignature;
use crate::registry::Domain;
use crate::types::{FeatureId, FeatureKind};

/// Snapshot of a domain as a graph: mixins and messages are nodes, a mixin
/// implementing a message and a `Dependent` rule requiring a mixin are edges.
pub struct DomainGraph {
    graph: DiGraph<Node, Edge>,
    node_map: HashMap<FeatureId, NodeIndex>,
}

impl DomainGraph {
    pub fn build(domain: &Domain) -> Self {
        let mut graph = DiGraph::<Node, Edge>::new();
        let mut node_map = HashMap::<FeatureId, NodeIndex>::new();

        for feature in domain.features() {
            let node = match (feature.kind, feature.signature) {
                (FeatureKind::Message, Some(signature)) => Node::Message {
                    id: feature.id,
                    name: feature.name,
                    signature,
                    has_default: feature.has_default,
                },
                _ => Node::Mixin {
                    id: feature.id,
                    name: feature.name,
                },
            };
            let index = graph.add_node(node);
            node_map.insert(feature.id, index);
        }

        for mixin in domain.mixins() {
            let Some(&source_index) = node_map.get(&mixin.id()) else {
                continue;
            };
            for (message, priority) in mixin.messages() {
                if let Some(&target_index) = node_map.get(&message) {
                    graph.update_edge(source_index, target_index, Edge::Implements(priority));
                }
            }
        }

        // Edges point from the required mixin to the one depending on it.
        for rule in domain.rules() {
            for (required, dependent) in rule.requirements() {
                match (node_map.get(&required), node_map.get(&dependent)) {
                    (Some(&required_index), Some(&dependent_index)) => {
                        graph.update_edge(required_index, dependent_index, Edge::Requires);
                    }
                    _ => tracing::warn!(
                        "Rule '{}' refers to a feature that is not registered",
                        rule.describe()
                    ),
                }
            }
        }

        Self { graph, node_map }
    }

    /// Mixins ordered so every mixin comes after the mixins it requires.
    pub fn dependency_order(&self) -> Result<Vec<FeatureId>> {
        let requires = EdgeFiltered::from_fn(&self.graph, |edge| {
            matches!(edge.weight(), Edge::Requires)
        });
        let order = petgraph::algo::toposort(&requires, None).map_err(|cycle| {
            anyhow::anyhow!(
                "Circular mixin dependency detected involving '{}'",
                self.graph[cycle.node_id()].name()
            )
        })?;
        Ok(order
            .into_iter()
            .filter_map(|index| match &self.graph[index] {
                Node::Mixin { id, .. } => Some(*id),
                Node::Message { .. } => None,
            })
            .collect())
    }

    /// Names of the mixins implementing `message`, highest priority first.
    pub fn implementers(&self, message: FeatureId) -> Vec<(&str, i32)> {
        let Some(&index) = self.node_map.get(&message) else {
            return Vec::new();
        };
        let mut implementers: Vec<_> = self
            .graph
            .edges_directed(index, petgraph::Direction::Incoming)
            .filter_map(|edge| match edge.weight() {
                Edge::Implements(priority) => Some((self.graph[edge.source()].name(), *priority)),
                Edge::Requires => None,
            })
            .collect();
        implementers.sort_by(|a, b| b.1.cmp(&a.1));
        implementers
    }

    /// Write the graph to a DOT file
    pub fn write_dot_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let dot_content = self.dot();
        std::fs::write(path, dot_content)
            .map_err(|e| anyhow::anyhow!("Failed to write DOT file: {e}"))?;
        Ok(())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &petgraph::graph::Node<Node>> {
        self.graph.raw_nodes().iter()
    }

    pub fn get_node_index(&self, id: FeatureId) -> Option<NodeIndex> {
        self.node_map.get(&id).copied()
    }

    pub fn dot(&self) -> String {
        let mut output = String::from("digraph DomainGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [fontname=\"Arial\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Arial\", fontsize=9];\n");

        for node_index in self.graph.node_indices() {
            let node_attrs = match &self.graph[node_index] {
                Node::Mixin { name, .. } => format!(
                    "[label=\"{name}\", shape=box, fillcolor=lightblue, style=\"rounded,filled\"]"
                ),
                Node::Message {
                    name,
                    signature,
                    has_default,
                    ..
                } => {
                    let color = if *has_default { "lightgreen" } else { "orange" };
                    let kind = format!("{:?}, {:?}", signature.constness, signature.cardinality)
                        .to_lowercase();
                    let label = format!("{name}\\n({kind})");
                    format!(
                        "[label=\"{label}\", shape=ellipse, fillcolor={color}, style=\"filled\"]"
                    )
                }
            };
            output.push_str(&format!("  {} {};\n", node_index.index(), node_attrs));
        }

        for edge_ref in self.graph.edge_references() {
            let edge_attrs = match edge_ref.weight() {
                Edge::Implements(0) => "[color=blue, style=solid]".to_string(),
                Edge::Implements(priority) => {
                    format!("[color=blue, style=solid, label=\"priority: {priority}\"]")
                }
                Edge::Requires => "[color=red, style=dashed, label=\"requires\"]".to_string(),
            };
            output.push_str(&format!(
                "  {} -> {} {};\n",
                edge_ref.source().index(),
                edge_ref.target().index(),
                edge_attrs
            ));
        }

        output.push_str("}\n");
        output
    }
}

impl std::fmt::Debug for DomainGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug_struct = f.debug_struct("DomainGraph");

        let nodes: Vec<_> = self.graph.raw_nodes().iter().map(|n| &n.weight).collect();
        debug_struct.field("nodes", &nodes);

        let edges: Vec<String> = self
            .graph
            .edge_references()
            .map(|edge| {
                format!(
                    "{} -> {} ({:?})",
                    self.graph[edge.source()].name(),
                    self.graph[edge.target()].name(),
                    edge.weight()
                )
            })
            .collect();
        debug_struct.field("edges", &edges);
        debug_struct.finish()
    }
}

impl Index<NodeIndex> for DomainGraph {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.graph[index]
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Mixin {
        id: FeatureId,
        name: String,
    },
    Message {
        id: FeatureId,
        name: String,
        signature: MessageSignature,
        has_default: bool,
    },
}

impl Node {
    pub fn id(&self) -> FeatureId {
        match self {
            Node::Mixin { id, .. } | Node::Message { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Mixin { name, .. } | Node::Message { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Edge {
    Implements(i32), // Priority
    Requires,
}
