mod common;
use composable_mixins::graph::Node;
use composable_mixins::{Dependent, DomainGraph, FeatureId, Mandatory};

#[test]
fn test_graph_nodes_and_implementers() {
    let shapes = common::shapes();
    let graph = DomainGraph::build(&shapes.domain);

    assert_eq!(graph.nodes().count(), 9);

    let index = graph.get_node_index(shapes.area.id()).unwrap();
    assert!(matches!(&graph[index], Node::Message { name, .. } if name == "area"));
    let index = graph.get_node_index(shapes.ticker.id()).unwrap();
    assert!(matches!(&graph[index], Node::Mixin { name, .. } if name == "ticker"));

    let mut implementers: Vec<&str> = graph
        .implementers(shapes.on_tick.id())
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    implementers.sort();
    assert_eq!(implementers, vec!["circle", "square", "ticker"]);
    assert!(graph.implementers(shapes.circle.id()).is_empty());
}

#[test]
fn test_dependency_order() {
    let shapes = common::shapes();
    shapes
        .domain
        .add_rule(Dependent::new(shapes.circle.id(), [shapes.logger.id()]));
    shapes
        .domain
        .add_rule(Dependent::new(shapes.logger.id(), [shapes.ticker.id()]));
    shapes.domain.add_rule(Mandatory(shapes.square.id()));

    let graph = DomainGraph::build(&shapes.domain);
    let order = graph.dependency_order().unwrap();
    assert_eq!(order.len(), 4);

    let position = |id: FeatureId| order.iter().position(|&other| other == id).unwrap();
    assert!(position(shapes.ticker.id()) < position(shapes.logger.id()));
    assert!(position(shapes.logger.id()) < position(shapes.circle.id()));
}

#[test]
#[should_panic(expected = "Circular mixin dependency detected")]
fn test_circular_dependency() {
    let shapes = common::shapes();
    shapes
        .domain
        .add_rule(Dependent::new(shapes.circle.id(), [shapes.logger.id()]));
    shapes
        .domain
        .add_rule(Dependent::new(shapes.logger.id(), [shapes.circle.id()]));

    DomainGraph::build(&shapes.domain)
        .dependency_order()
        .unwrap();
}

#[test]
fn test_dot_export() {
    let shapes = common::shapes();
    shapes
        .domain
        .add_rule(Dependent::new(shapes.ticker.id(), [shapes.logger.id()]));
    let graph = DomainGraph::build(&shapes.domain);

    let dot = graph.dot();
    assert!(dot.starts_with("digraph DomainGraph {"));
    assert!(dot.contains("label=\"circle\""));
    assert!(dot.contains("area\\n(const, unicast)"));
    assert!(dot.contains("label=\"requires\""));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.dot");
    graph.write_dot_file(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), dot);
}

#[test]
fn test_debug_output_lists_edges() {
    let shapes = common::shapes();
    let graph = DomainGraph::build(&shapes.domain);

    let debug = format!("{graph:?}");
    assert!(debug.contains("circle -> area (Implements(0))"));
    assert!(debug.contains("logger -> log (Implements(0))"));
}
