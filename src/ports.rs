//! Port ordering of process and logical operator nodes.

use std::fmt;
use std::str::FromStr;

use crate::classes::is_modulation_arc_class;
use crate::error::Error;
use crate::graph::{batch, Edge, GraphSession, Node, Point, Port};

/// Distance of freshly added ports from the node center, in percent of node size.
pub const DEFAULT_PORT_DISTANCE: f64 = 70.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortOrdering {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    None,
}

impl PortOrdering {
    /// Scoring order of the four directional orderings; ties favour the first.
    pub const DIRECTIONAL: [PortOrdering; 4] = [
        PortOrdering::LeftToRight,
        PortOrdering::RightToLeft,
        PortOrdering::TopToBottom,
        PortOrdering::BottomToTop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PortOrdering::LeftToRight => "L-to-R",
            PortOrdering::RightToLeft => "R-to-L",
            PortOrdering::TopToBottom => "T-to-B",
            PortOrdering::BottomToTop => "B-to-T",
            PortOrdering::None => "none",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, PortOrdering::LeftToRight | PortOrdering::RightToLeft)
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, PortOrdering::TopToBottom | PortOrdering::BottomToTop)
    }

    /// Input port on the left or on top.
    fn starts_left_or_top(&self) -> bool {
        matches!(self, PortOrdering::LeftToRight | PortOrdering::TopToBottom)
    }
}

impl fmt::Display for PortOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortOrdering {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "L-to-R" => Ok(PortOrdering::LeftToRight),
            "R-to-L" => Ok(PortOrdering::RightToLeft),
            "T-to-B" => Ok(PortOrdering::TopToBottom),
            "B-to-T" => Ok(PortOrdering::BottomToTop),
            "none" => Ok(PortOrdering::None),
            _ => Err(Error::InvalidOptionValue {
                key: "ports-ordering".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

fn is_port_target_of_any(edges: &[Edge], port_id: &str) -> bool {
    edges.iter().any(|edge| edge.port_target.as_deref() == Some(port_id))
}

fn is_port_source_of_any(edges: &[Edge], port_id: &str) -> bool {
    edges.iter().any(|edge| edge.port_source.as_deref() == Some(port_id))
}

fn owned_edges<G: GraphSession + ?Sized>(graph: &G, node_id: &str) -> Vec<Edge> {
    graph.connected_edges(node_id).into_iter().cloned().collect()
}

/// Ordering of a node's ports, from its cached value when present.
///
/// Nodes with a port count other than two are `none`. Otherwise the port on
/// the left (or top) decides: if any connected edge targets it the ordering
/// runs from that side.
pub fn ports_ordering<G: GraphSession + ?Sized>(graph: &G, node_id: &str) -> PortOrdering {
    let Some(node) = graph.node(node_id) else {
        return PortOrdering::None;
    };
    if let Some(cached) = node.ports_ordering {
        return cached;
    }
    if node.ports.len() != 2 {
        return PortOrdering::None;
    }
    let edges = owned_edges(graph, node_id);
    let (first, second) = (&node.ports[0], &node.ports[1]);
    if first.x == 0.0 {
        let top = if first.y < 0.0 { first } else { second };
        if is_port_target_of_any(&edges, &top.id) {
            PortOrdering::TopToBottom
        } else {
            PortOrdering::BottomToTop
        }
    } else {
        let left = if first.x < 0.0 { first } else { second };
        if is_port_target_of_any(&edges, &left.id) {
            PortOrdering::LeftToRight
        } else {
            PortOrdering::RightToLeft
        }
    }
}

/// Change the ordering of every node in `node_ids`, adding or removing ports
/// as needed. Existing ports keep their distance from the center.
pub fn set_ports_ordering<G: GraphSession + ?Sized>(
    graph: &mut G,
    node_ids: &[&str],
    ordering: PortOrdering,
    port_distance: Option<f64>,
) {
    let port_distance = port_distance.unwrap_or(DEFAULT_PORT_DISTANCE);
    let mut scoped = batch(graph);

    for &node_id in node_ids {
        let current = ports_ordering(&*scoped, node_id);
        if ordering == current {
            continue;
        }
        if ordering == PortOrdering::None {
            remove_ports(&mut *scoped, node_id);
        } else if current == PortOrdering::None {
            add_ports(&mut *scoped, node_id, ordering, port_distance);
        } else {
            let Some(mut ports) = scoped
                .node(node_id)
                .map(|node| node.ports.clone())
                .filter(|ports| ports.len() == 2)
            else {
                continue;
            };
            let edges = owned_edges(&*scoped, node_id);
            let distance = match ports[0].x.abs() {
                x if x != 0.0 => x,
                _ => ports[0].y.abs(),
            };
            let (target_index, source_index) = if is_port_target_of_any(&edges, &ports[0].id)
                || is_port_source_of_any(&edges, &ports[1].id)
            {
                (0, 1)
            } else {
                (1, 0)
            };
            let (target_offset, source_offset) = match ordering {
                PortOrdering::LeftToRight => ((-distance, 0.0), (distance, 0.0)),
                PortOrdering::RightToLeft => ((distance, 0.0), (-distance, 0.0)),
                PortOrdering::TopToBottom => ((0.0, -distance), (0.0, distance)),
                _ => ((0.0, distance), (0.0, -distance)),
            };
            (ports[target_index].x, ports[target_index].y) = target_offset;
            (ports[source_index].x, ports[source_index].y) = source_offset;
            scoped.set_ports(node_id, ports);
        }
    }

    for &node_id in node_ids {
        scoped.set_ports_ordering(node_id, Some(ordering));
    }
}

/// Give a node two ports for `ordering`, `port_distance` away from its center,
/// and bind its connected edges to them.
///
/// The first port is the left or top one. Productions and modulation arcs
/// entering the node attach to its body, as do consumptions leaving it.
pub fn add_ports<G: GraphSession + ?Sized>(
    graph: &mut G,
    node_id: &str,
    ordering: PortOrdering,
    port_distance: f64,
) {
    let first_id = format!("{node_id}.1");
    let second_id = format!("{node_id}.2");
    let ports = if ordering.is_horizontal() {
        vec![
            Port { id: first_id.clone(), x: -port_distance, y: 0.0 },
            Port { id: second_id.clone(), x: port_distance, y: 0.0 },
        ]
    } else {
        vec![
            Port { id: first_id.clone(), x: 0.0, y: -port_distance },
            Port { id: second_id.clone(), x: 0.0, y: port_distance },
        ]
    };
    let from_left_or_top = ordering.starts_left_or_top();
    let (input_id, output_id) = if from_left_or_top {
        (first_id, second_id)
    } else {
        (second_id, first_id)
    };
    let edges = owned_edges(graph, node_id);

    let mut scoped = batch(graph);
    scoped.set_ports(node_id, ports);
    scoped.set_ports_ordering(node_id, None);

    for edge in &edges {
        if edge.target == node_id {
            if edge.class == "production" || is_modulation_arc_class(&edge.class) {
                continue;
            }
            scoped.set_port_target(&edge.id, Some(input_id.clone()));
        } else {
            if edge.class == "consumption" {
                continue;
            }
            scoped.set_port_source(&edge.id, Some(output_id.clone()));
        }
    }
}

/// Drop a node's ports and point every connected edge back at the node itself.
pub fn remove_ports<G: GraphSession + ?Sized>(graph: &mut G, node_id: &str) {
    let edges = owned_edges(graph, node_id);
    let mut scoped = batch(graph);
    for edge in &edges {
        if edge.source == node_id {
            scoped.set_port_source(&edge.id, Some(node_id.to_string()));
        } else {
            scoped.set_port_target(&edge.id, Some(node_id.to_string()));
        }
    }
    scoped.set_ports(node_id, Vec::new());
    scoped.set_ports_ordering(node_id, None);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Target,
}

/// Edge end point as `"x% y%"` relative to the end node, or `outside-to-node`
/// when the edge is not bound to a known port.
///
/// Ported shapes are drawn as polygons whose ports sit 50% from the center.
pub fn end_point<G: GraphSession + ?Sized>(
    graph: &G,
    edge: &Edge,
    end: EdgeEnd,
    ports_enabled: bool,
) -> String {
    const OUTSIDE: &str = "outside-to-node";
    let (port_id, node_id) = match end {
        EdgeEnd::Source => (edge.port_source.as_deref(), edge.source.as_str()),
        EdgeEnd::Target => (edge.port_target.as_deref(), edge.target.as_str()),
    };
    let Some(port_id) = port_id.filter(|_| ports_enabled) else {
        return OUTSIDE.to_string();
    };
    let Some(port) = graph
        .node(node_id)
        .and_then(|node| node.ports.iter().find(|port| port.id == port_id))
    else {
        return OUTSIDE.to_string();
    };
    let (x, y) = if port.x != 0.0 {
        (port.x.signum() * 50.0, 0.0)
    } else {
        (0.0, port.y.signum() * 50.0)
    };
    format!("{x}% {y}%")
}

/// Absolute position of a port of `node`.
pub fn port_position(node: &Node, port: &Port) -> Point {
    Point::new(
        node.position.x + port.x / 100.0 * node.width,
        node.position.y + port.y / 100.0 * node.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;

    fn reaction() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("p", "process").at(100.0, 100.0).sized(20.0, 20.0));
        graph.add_node(Node::new("s", "simple chemical").at(50.0, 100.0).sized(30.0, 30.0));
        graph.add_node(Node::new("t", "macromolecule").at(150.0, 100.0).sized(60.0, 30.0));
        graph.add_node(Node::new("k", "macromolecule").at(100.0, 40.0).sized(60.0, 30.0));
        graph.add_edge(Edge::new("in", "consumption", "s", "p"));
        graph.add_edge(Edge::new("out", "production", "p", "t"));
        graph.add_edge(Edge::new("cat", "catalysis", "k", "p"));
        graph
    }

    #[test]
    fn added_ports_are_antisymmetric_on_one_axis() {
        let mut graph = reaction();
        add_ports(&mut graph, "p", PortOrdering::TopToBottom, 70.0);
        let ports = &graph.node("p").unwrap().ports;
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].x, 0.0);
        assert_eq!(ports[1].x, 0.0);
        assert_eq!(ports[0].y, -ports[1].y);
        assert_eq!(graph.batch_depth(), 0);
    }

    #[test]
    fn add_ports_binds_only_port_eligible_edges() {
        let mut graph = reaction();
        add_ports(&mut graph, "p", PortOrdering::RightToLeft, 70.0);
        assert_eq!(graph.edge("in").unwrap().port_target.as_deref(), Some("p.2"));
        assert_eq!(graph.edge("out").unwrap().port_source.as_deref(), Some("p.1"));
        assert_eq!(graph.edge("cat").unwrap().port_target, None);
        assert_eq!(ports_ordering(&graph, "p"), PortOrdering::RightToLeft);
    }

    #[test]
    fn remove_ports_resets_bindings_to_node() {
        let mut graph = reaction();
        add_ports(&mut graph, "p", PortOrdering::LeftToRight, 70.0);
        remove_ports(&mut graph, "p");
        assert!(graph.node("p").unwrap().ports.is_empty());
        assert_eq!(graph.edge("in").unwrap().port_target.as_deref(), Some("p"));
        assert_eq!(graph.edge("out").unwrap().port_source.as_deref(), Some("p"));
        assert_eq!(ports_ordering(&graph, "p"), PortOrdering::None);
    }

    #[test]
    fn reordering_keeps_distance_and_roles() {
        let mut graph = reaction();
        set_ports_ordering(&mut graph, &["p"], PortOrdering::LeftToRight, Some(60.0));
        assert_eq!(ports_ordering(&graph, "p"), PortOrdering::LeftToRight);
        set_ports_ordering(&mut graph, &["p"], PortOrdering::BottomToTop, None);
        let node = graph.node("p").unwrap();
        assert_eq!(node.ports[0].id, "p.1");
        assert_eq!((node.ports[0].x, node.ports[0].y), (0.0, 60.0));
        assert_eq!((node.ports[1].x, node.ports[1].y), (0.0, -60.0));
        assert_eq!(ports_ordering(&graph, "p"), PortOrdering::BottomToTop);
        assert_eq!(graph.batch_depth(), 0);
    }

    #[test]
    fn uncached_ordering_reads_bindings() {
        let mut graph = reaction();
        add_ports(&mut graph, "p", PortOrdering::TopToBottom, 70.0);
        assert_eq!(ports_ordering(&graph, "p"), PortOrdering::TopToBottom);
        graph.node_mut("p").unwrap().ports.pop();
        assert_eq!(ports_ordering(&graph, "p"), PortOrdering::None);
    }

    #[test]
    fn end_points_follow_port_side() {
        let mut graph = reaction();
        add_ports(&mut graph, "p", PortOrdering::LeftToRight, 70.0);
        let consumption = graph.edge("in").unwrap().clone();
        let production = graph.edge("out").unwrap().clone();
        assert_eq!(end_point(&graph, &consumption, EdgeEnd::Target, true), "-50% 0%");
        assert_eq!(end_point(&graph, &production, EdgeEnd::Source, true), "50% 0%");
        assert_eq!(end_point(&graph, &consumption, EdgeEnd::Source, true), "outside-to-node");
        assert_eq!(end_point(&graph, &consumption, EdgeEnd::Target, false), "outside-to-node");
    }

    #[test]
    fn ordering_round_trips_through_text() {
        for ordering in PortOrdering::DIRECTIONAL {
            assert_eq!(ordering.as_str().parse::<PortOrdering>().ok(), Some(ordering));
        }
        assert!("sideways".parse::<PortOrdering>().is_err());
    }
}
