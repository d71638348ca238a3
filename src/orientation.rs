//! Scoring of the four port orientations of a process or logical operator
//! against the current positions of its neighbors.

use crate::classes::{is_modulation_arc_class, is_ported_logical, is_ported_process};
use crate::graph::{Axis, Edge, GraphSession, Node};
use crate::ports::PortOrdering;

const CENTER_COEFFICIENT: f64 = 0.5;
const NEIGHBOR_SCORE: f64 = 2.0;
const LEAF_SCORE: f64 = 1.0;

/// Which port of a ported node an incident edge belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortRole {
    Input,
    Output,
}

/// Role of `edge` relative to the ported node `node`, or `None` when the edge
/// attaches to the node body.
pub fn port_role(node: &Node, edge: &Edge) -> Option<PortRole> {
    let entering = edge.target == node.id;
    let leaving = edge.source == node.id;
    if is_ported_process(&node.class) {
        if entering && edge.class == "consumption" {
            return Some(PortRole::Input);
        }
        if leaving && edge.class == "production" {
            return Some(PortRole::Output);
        }
    } else if is_ported_logical(&node.class) {
        if entering && edge.class == "logic arc" {
            return Some(PortRole::Input);
        }
        if leaving && (edge.class == "logic arc" || is_modulation_arc_class(&edge.class)) {
            return Some(PortRole::Output);
        }
    }
    None
}

/// Accumulated score per directional ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientationScores {
    scores: [f64; 4],
}

impl OrientationScores {
    fn slot(ordering: PortOrdering) -> Option<usize> {
        PortOrdering::DIRECTIONAL
            .iter()
            .position(|candidate| *candidate == ordering)
    }

    pub fn get(&self, ordering: PortOrdering) -> f64 {
        Self::slot(ordering).map_or(0.0, |slot| self.scores[slot])
    }

    fn add(&mut self, ordering: PortOrdering, amount: f64) {
        if let Some(slot) = Self::slot(ordering) {
            self.scores[slot] += amount;
        }
    }

    /// Highest scoring ordering. Starts from `L-to-R` and only a strictly
    /// greater score replaces the current best.
    pub fn best(&self) -> PortOrdering {
        let mut best = PortOrdering::LeftToRight;
        let mut best_score = self.get(best);
        for ordering in PortOrdering::DIRECTIONAL {
            let score = self.get(ordering);
            if score > best_score {
                best = ordering;
                best_score = score;
            }
        }
        best
    }
}

fn centered_ratio(center: f64, neighbor: f64, half: f64) -> f64 {
    if half == 0.0 {
        0.0
    } else {
        (center - neighbor) / half * CENTER_COEFFICIENT
    }
}

/// Add the contribution of `other` on `axis` to `scores`.
///
/// A neighbor before the node favours `first`, one after it favours
/// `opposite`, and one overlapping the node moves both in proportion to its
/// offset from the center. Leaf neighbors weigh half.
pub fn calculate_orientation_score(
    node: &Node,
    other: &Node,
    leaf: bool,
    scores: &mut OrientationScores,
    first: PortOrdering,
    opposite: PortOrdering,
    axis: Axis,
) {
    let unit = if leaf { LEAF_SCORE } else { NEIGHBOR_SCORE };
    let half = node.half_extent(axis);
    let center = node.position.along(axis);
    let neighbor = other.position.along(axis);

    let delta = if neighbor < center - half {
        unit
    } else if neighbor <= center + half {
        centered_ratio(center, neighbor, half)
    } else {
        -unit
    };
    scores.add(first, delta);
    scores.add(opposite, -delta);
}

/// Scores of every orientation of the ported node `node_id`.
pub fn orientation_scores<G: GraphSession + ?Sized>(graph: &G, node_id: &str) -> OrientationScores {
    let mut scores = OrientationScores::default();
    let Some(node) = graph.node(node_id) else {
        return scores;
    };
    for edge in graph.connected_edges(node_id) {
        let Some(role) = port_role(node, edge) else {
            continue;
        };
        let Some(other) = graph.node(edge.other_end(node_id)) else {
            continue;
        };
        let leaf = graph.degree(&other.id) == 1;
        let (horizontal, vertical) = match role {
            PortRole::Input => (
                (PortOrdering::LeftToRight, PortOrdering::RightToLeft),
                (PortOrdering::TopToBottom, PortOrdering::BottomToTop),
            ),
            PortRole::Output => (
                (PortOrdering::RightToLeft, PortOrdering::LeftToRight),
                (PortOrdering::BottomToTop, PortOrdering::TopToBottom),
            ),
        };
        calculate_orientation_score(node, other, leaf, &mut scores, horizontal.0, horizontal.1, Axis::X);
        calculate_orientation_score(node, other, leaf, &mut scores, vertical.0, vertical.1, Axis::Y);
    }
    scores
}

/// Best orientation for a ported node given its neighbors' positions.
pub fn best_orientation<G: GraphSession + ?Sized>(graph: &G, node_id: &str) -> PortOrdering {
    let scores = orientation_scores(graph, node_id);
    let best = scores.best();
    log::debug!(
        "orientation scores for {node_id}: L-to-R {:.3}, R-to-L {:.3}, T-to-B {:.3}, B-to-T {:.3} -> {best}",
        scores.get(PortOrdering::LeftToRight),
        scores.get(PortOrdering::RightToLeft),
        scores.get(PortOrdering::TopToBottom),
        scores.get(PortOrdering::BottomToTop),
    );
    best
}

/// Signed score of `other` for an input under `ordering`; negative means the
/// neighbor sits on the wrong side. `none` scores zero.
pub fn check_negative_orientation_score(node: &Node, other: &Node, ordering: PortOrdering) -> f64 {
    let (axis, sign) = match ordering {
        PortOrdering::LeftToRight => (Axis::X, 1.0),
        PortOrdering::RightToLeft => (Axis::X, -1.0),
        PortOrdering::TopToBottom => (Axis::Y, 1.0),
        PortOrdering::BottomToTop => (Axis::Y, -1.0),
        PortOrdering::None => return 0.0,
    };
    let half = node.half_extent(axis);
    let center = node.position.along(axis);
    let neighbor = other.position.along(axis);

    let score = if neighbor < center - half {
        LEAF_SCORE
    } else if neighbor <= center + half {
        centered_ratio(center, neighbor, half)
    } else {
        -LEAF_SCORE
    };
    sign * score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use rstest::rstest;

    fn process_with(consumed: (f64, f64), produced: (f64, f64)) -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("p", "process").at(100.0, 100.0).sized(20.0, 20.0));
        graph.add_node(Node::new("a", "simple chemical").at(consumed.0, consumed.1).sized(30.0, 30.0));
        graph.add_node(Node::new("b", "simple chemical").at(produced.0, produced.1).sized(30.0, 30.0));
        graph.add_edge(Edge::new("in", "consumption", "a", "p"));
        graph.add_edge(Edge::new("out", "production", "p", "b"));
        graph
    }

    #[rstest]
    #[case((50.0, 100.0), (150.0, 100.0), PortOrdering::LeftToRight)]
    #[case((150.0, 100.0), (50.0, 100.0), PortOrdering::RightToLeft)]
    #[case((100.0, 40.0), (100.0, 160.0), PortOrdering::TopToBottom)]
    #[case((100.0, 160.0), (100.0, 40.0), PortOrdering::BottomToTop)]
    fn leaf_neighbors_pick_the_obvious_orientation(
        #[case] consumed: (f64, f64),
        #[case] produced: (f64, f64),
        #[case] expected: PortOrdering,
    ) {
        let graph = process_with(consumed, produced);
        assert_eq!(best_orientation(&graph, "p"), expected);
    }

    #[test]
    fn leaf_scores_are_halved() {
        let graph = process_with((50.0, 100.0), (150.0, 100.0));
        let scores = orientation_scores(&graph, "p");
        assert_eq!(scores.get(PortOrdering::LeftToRight), 2.0);
        assert_eq!(scores.get(PortOrdering::RightToLeft), -2.0);
        assert_eq!(scores.get(PortOrdering::TopToBottom), 0.0);
    }

    #[test]
    fn ties_default_to_left_to_right() {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("p", "process").at(0.0, 0.0).sized(20.0, 20.0));
        assert_eq!(best_orientation(&graph, "p"), PortOrdering::LeftToRight);
    }

    #[test]
    fn logical_operators_score_logic_and_modulation_arcs() {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("and", "and").at(100.0, 100.0).sized(30.0, 30.0));
        graph.add_node(Node::new("x", "macromolecule").at(100.0, 200.0).sized(60.0, 30.0));
        graph.add_node(Node::new("p", "process").at(100.0, 0.0).sized(20.0, 20.0));
        graph.add_edge(Edge::new("l", "logic arc", "x", "and"));
        graph.add_edge(Edge::new("m", "necessary stimulation", "and", "p"));
        assert_eq!(best_orientation(&graph, "and"), PortOrdering::BottomToTop);
    }

    #[test]
    fn body_edges_do_not_vote() {
        let mut graph = process_with((50.0, 100.0), (150.0, 100.0));
        graph.add_node(Node::new("e", "macromolecule").at(100.0, -500.0).sized(60.0, 30.0));
        graph.add_edge(Edge::new("cat", "catalysis", "e", "p"));
        assert_eq!(
            orientation_scores(&graph, "p").get(PortOrdering::TopToBottom),
            0.0
        );
    }

    #[test]
    fn overlapping_neighbor_scores_proportionally() {
        let node = Node::new("p", "process").at(100.0, 100.0).sized(20.0, 20.0);
        let other = Node::new("a", "macromolecule").at(95.0, 100.0);
        assert_eq!(check_negative_orientation_score(&node, &other, PortOrdering::LeftToRight), 0.25);
        assert_eq!(check_negative_orientation_score(&node, &other, PortOrdering::RightToLeft), -0.25);
        assert_eq!(check_negative_orientation_score(&node, &other, PortOrdering::None), 0.0);
    }
}
