//! Graph session: the narrow interface the utilities need from the rendering
//! engine, plus an in-memory implementation used by the loader, the CLI and tests.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};

use crate::ports::PortOrdering;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A connection point on a node. Offsets are in percent of the node size,
/// relative to its center, so ±50 lies on the border.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuxSide {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AuxUnitKind {
    StateVariable {
        value: Option<String>,
        variable: Option<String>,
    },
    UnitOfInformation {
        label: Option<String>,
    },
}

/// State variable or unit of information decorating a node border.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxUnit {
    pub kind: AuxUnitKind,
    pub side: AuxSide,
}

impl AuxUnit {
    pub fn state_variable(value: Option<&str>, variable: Option<&str>) -> Self {
        Self {
            kind: AuxUnitKind::StateVariable {
                value: value.map(str::to_string),
                variable: variable.map(str::to_string),
            },
            side: AuxSide::Top,
        }
    }

    pub fn unit_of_information(label: Option<&str>) -> Self {
        Self {
            kind: AuxUnitKind::UnitOfInformation {
                label: label.map(str::to_string),
            },
            side: AuxSide::Top,
        }
    }

    pub fn on(mut self, side: AuxSide) -> Self {
        self.side = side;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub class: String,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub parent: Option<String>,
    pub label: Option<String>,
    pub ports: Vec<Port>,
    pub ports_ordering: Option<PortOrdering>,
    pub aux_units: Vec<AuxUnit>,
    pub data: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            position: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            parent: None,
            label: None,
            ports: Vec::new(),
            ports_ordering: None,
            aux_units: Vec::new(),
            data: BTreeMap::new(),
            style: BTreeMap::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_aux_unit(mut self, unit: AuxUnit) -> Self {
        self.aux_units.push(unit);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn style(&self, key: &str) -> Option<&str> {
        self.style.get(key).map(String::as_str)
    }

    pub fn has_clone_marker(&self) -> bool {
        self.data("clonemarker") == Some("true")
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref().filter(|label| !label.is_empty())
    }

    pub fn half_extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width / 2.0,
            Axis::Y => self.height / 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: String,
    pub class: String,
    pub source: String,
    pub target: String,
    pub port_source: Option<String>,
    pub port_target: Option<String>,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        class: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            source: source.into(),
            target: target.into(),
            port_source: None,
            port_target: None,
        }
    }

    /// The node at the other end of this edge, seen from `node_id`.
    pub fn other_end(&self, node_id: &str) -> &str {
        if self.source == node_id {
            &self.target
        } else {
            &self.source
        }
    }
}

/// What the utilities consume from the host rendering engine.
pub trait GraphSession {
    fn node(&self, id: &str) -> Option<&Node>;
    fn edge(&self, id: &str) -> Option<&Edge>;
    fn node_ids(&self) -> Vec<String>;
    fn edge_ids(&self) -> Vec<String>;
    /// Edges incident to the node, in insertion order; a self loop is listed once.
    fn connected_edges(&self, node_id: &str) -> Vec<&Edge>;
    fn children(&self, node_id: &str) -> Vec<&Node>;

    fn set_position(&mut self, node_id: &str, position: Point);
    fn set_ports(&mut self, node_id: &str, ports: Vec<Port>);
    fn set_ports_ordering(&mut self, node_id: &str, ordering: Option<PortOrdering>);
    fn set_port_source(&mut self, edge_id: &str, port: Option<String>);
    fn set_port_target(&mut self, edge_id: &str, port: Option<String>);
    fn set_node_data(&mut self, node_id: &str, key: &str, value: Option<String>);
    fn set_node_style(&mut self, node_id: &str, property: &str, value: String);

    fn start_batch(&mut self);
    fn end_batch(&mut self);
    fn update_style(&mut self);

    fn position(&self, node_id: &str) -> Option<Point> {
        self.node(node_id).map(|node| node.position)
    }

    fn class_of(&self, id: &str) -> Option<&str> {
        self.node(id)
            .map(|node| node.class.as_str())
            .or_else(|| self.edge(id).map(|edge| edge.class.as_str()))
    }

    fn degree(&self, node_id: &str) -> usize {
        self.connected_edges(node_id).len()
    }

    fn incoming_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.connected_edges(node_id)
            .into_iter()
            .filter(|edge| edge.target == node_id)
            .collect()
    }

    fn outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.connected_edges(node_id)
            .into_iter()
            .filter(|edge| edge.source == node_id)
            .collect()
    }

    fn parent_of(&self, node_id: &str) -> Option<&str> {
        self.node(node_id).and_then(|node| node.parent.as_deref())
    }
}

/// Scope that coalesces mutations into one engine batch; the batch ends on drop.
pub struct Batch<'a, G: GraphSession + ?Sized> {
    graph: &'a mut G,
}

pub fn batch<G: GraphSession + ?Sized>(graph: &mut G) -> Batch<'_, G> {
    graph.start_batch();
    Batch { graph }
}

impl<G: GraphSession + ?Sized> Deref for Batch<'_, G> {
    type Target = G;

    fn deref(&self) -> &G {
        self.graph
    }
}

impl<G: GraphSession + ?Sized> DerefMut for Batch<'_, G> {
    fn deref_mut(&mut self) -> &mut G {
        self.graph
    }
}

impl<G: GraphSession + ?Sized> Drop for Batch<'_, G> {
    fn drop(&mut self) {
        self.graph.end_batch();
    }
}

/// Insertion-ordered in-memory graph.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_index: HashMap<String, usize>,
    // parent id to child positions in `nodes`, ascending
    child_index: HashMap<String, Vec<usize>>,
    batch_depth: usize,
    batches_started: usize,
    style_updates: usize,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, replacing any node with the same id.
    pub fn add_node(&mut self, node: Node) {
        let parent = node.parent.clone();
        let index = match self.node_index.get(&node.id) {
            Some(&index) => {
                let previous = self.nodes[index].parent.take();
                self.unlink_child(index, previous.as_deref());
                self.nodes[index] = node;
                index
            }
            None => {
                let index = self.nodes.len();
                self.node_index.insert(node.id.clone(), index);
                self.nodes.push(node);
                index
            }
        };
        self.link_child(index, parent.as_deref());
    }

    /// Moves a node under `parent`, or to the top level.
    pub fn set_parent(&mut self, id: &str, parent: Option<String>) {
        let Some(&index) = self.node_index.get(id) else {
            return;
        };
        let previous = std::mem::replace(&mut self.nodes[index].parent, parent.clone());
        self.unlink_child(index, previous.as_deref());
        self.link_child(index, parent.as_deref());
    }

    fn link_child(&mut self, index: usize, parent: Option<&str>) {
        if let Some(parent) = parent {
            let children = self.child_index.entry(parent.to_string()).or_default();
            if let Err(position) = children.binary_search(&index) {
                children.insert(position, index);
            }
        }
    }

    fn unlink_child(&mut self, index: usize, parent: Option<&str>) {
        if let Some(children) = parent.and_then(|parent| self.child_index.get_mut(parent)) {
            children.retain(|&child| child != index);
        }
    }

    pub fn add_edge(&mut self, edge: Edge) {
        match self.edge_index.get(&edge.id) {
            Some(&index) => self.edges[index] = edge,
            None => {
                self.edge_index.insert(edge.id.clone(), self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Mutable access to a node; parent changes go through [`Self::set_parent`].
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let index = *self.node_index.get(id)?;
        self.nodes.get_mut(index)
    }

    fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        let index = *self.edge_index.get(id)?;
        self.edges.get_mut(index)
    }

    pub fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    pub fn batches_started(&self) -> usize {
        self.batches_started
    }

    pub fn style_updates(&self) -> usize {
        self.style_updates
    }
}

impl GraphSession for MemoryGraph {
    fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&index| &self.nodes[index])
    }

    fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&index| &self.edges[index])
    }

    fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    fn edge_ids(&self) -> Vec<String> {
        self.edges.iter().map(|edge| edge.id.clone()).collect()
    }

    fn connected_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|edge| edge.source == node_id || edge.target == node_id)
            .collect()
    }

    fn children(&self, node_id: &str) -> Vec<&Node> {
        self.child_index
            .get(node_id)
            .map(|children| children.iter().map(|&index| &self.nodes[index]).collect())
            .unwrap_or_default()
    }

    fn set_position(&mut self, node_id: &str, position: Point) {
        if let Some(node) = self.node_mut(node_id) {
            node.position = position;
        }
    }

    fn set_ports(&mut self, node_id: &str, ports: Vec<Port>) {
        if let Some(node) = self.node_mut(node_id) {
            node.ports = ports;
        }
    }

    fn set_ports_ordering(&mut self, node_id: &str, ordering: Option<PortOrdering>) {
        if let Some(node) = self.node_mut(node_id) {
            node.ports_ordering = ordering;
        }
    }

    fn set_port_source(&mut self, edge_id: &str, port: Option<String>) {
        if let Some(edge) = self.edge_mut(edge_id) {
            edge.port_source = port;
        }
    }

    fn set_port_target(&mut self, edge_id: &str, port: Option<String>) {
        if let Some(edge) = self.edge_mut(edge_id) {
            edge.port_target = port;
        }
    }

    fn set_node_data(&mut self, node_id: &str, key: &str, value: Option<String>) {
        if let Some(node) = self.node_mut(node_id) {
            match value {
                Some(value) => {
                    node.data.insert(key.to_string(), value);
                }
                None => {
                    node.data.remove(key);
                }
            }
        }
    }

    fn set_node_style(&mut self, node_id: &str, property: &str, value: String) {
        if let Some(node) = self.node_mut(node_id) {
            node.style.insert(property.to_string(), value);
        }
    }

    fn start_batch(&mut self) {
        self.batch_depth += 1;
        self.batches_started += 1;
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
    }

    fn update_style(&mut self) {
        self.style_updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("c1", "compartment").at(0.0, 0.0).sized(200.0, 200.0));
        graph.add_node(Node::new("m1", "macromolecule").at(10.0, 10.0).with_parent("c1"));
        graph.add_node(Node::new("p1", "process").at(50.0, 10.0));
        graph.add_edge(Edge::new("e1", "consumption", "m1", "p1"));
        graph
    }

    #[test]
    fn connected_edges_follow_both_directions() {
        let graph = sample();
        assert_eq!(graph.degree("m1"), 1);
        assert_eq!(graph.incoming_edges("p1").len(), 1);
        assert!(graph.outgoing_edges("p1").is_empty());
        assert_eq!(graph.connected_edges("p1")[0].other_end("p1"), "m1");
    }

    #[test]
    fn children_and_parent_are_consistent() {
        let graph = sample();
        let children = graph.children("c1");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "m1");
        assert_eq!(graph.parent_of("m1"), Some("c1"));
        assert_eq!(graph.parent_of("p1"), None);
    }

    #[test]
    fn children_follow_reparenting_and_replacement() {
        let mut graph = sample();
        graph.add_node(Node::new("m2", "macromolecule").with_parent("c1"));
        graph.add_node(Node::new("c2", "compartment"));
        let ids = |graph: &MemoryGraph, parent: &str| -> Vec<String> {
            graph.children(parent).iter().map(|node| node.id.clone()).collect()
        };
        assert_eq!(ids(&graph, "c1"), ["m1", "m2"]);

        graph.set_parent("m1", Some("c2".to_string()));
        assert_eq!(ids(&graph, "c1"), ["m2"]);
        assert_eq!(ids(&graph, "c2"), ["m1"]);
        assert_eq!(graph.parent_of("m1"), Some("c2"));

        graph.add_node(Node::new("m2", "macromolecule"));
        assert!(graph.children("c1").is_empty());
        graph.set_parent("m2", Some("c1".to_string()));
        graph.set_parent("m1", Some("c1".to_string()));
        assert_eq!(ids(&graph, "c1"), ["m1", "m2"]);
        graph.set_parent("m1", None);
        assert_eq!(ids(&graph, "c1"), ["m2"]);
    }

    #[test]
    fn batch_guard_closes_on_drop() {
        let mut graph = sample();
        {
            let mut scoped = batch(&mut graph);
            scoped.set_position("m1", Point::new(1.0, 2.0));
            assert_eq!(scoped.batch_depth(), 1);
        }
        assert_eq!(graph.batch_depth(), 0);
        assert_eq!(graph.batches_started(), 1);
        assert_eq!(graph.position("m1"), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn class_of_resolves_nodes_and_edges() {
        let graph = sample();
        assert_eq!(graph.class_of("p1"), Some("process"));
        assert_eq!(graph.class_of("e1"), Some("consumption"));
        assert_eq!(graph.class_of("missing"), None);
    }
}
