//! Post-layout flow improvement: orient every ported node and move leaf
//! neighbors that ended up on the wrong side of it.

use std::cmp::Ordering;

use crate::classes::{is_ported_logical, is_ported_process};
use crate::graph::{GraphSession, Node};
use crate::options::Options;
use crate::orientation::{best_orientation, check_negative_orientation_score, port_role, PortRole};
use crate::ports::{ports_ordering, set_ports_ordering, PortOrdering};

/// A leaf neighbor considered for a swap, with its orientation score.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapCandidate {
    pub node_id: String,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwapCandidates {
    pub input: Vec<SwapCandidate>,
    pub output: Vec<SwapCandidate>,
    pub not_connected: Vec<SwapCandidate>,
}

/// Exchange the positions of two nodes.
pub fn swap_positions<G: GraphSession + ?Sized>(graph: &mut G, first: &str, second: &str) {
    let (Some(first_position), Some(second_position)) = (graph.position(first), graph.position(second)) else {
        return;
    };
    graph.set_position(first, second_position);
    graph.set_position(second, first_position);
}

fn descending(a: &SwapCandidate, b: &SwapCandidate) -> Ordering {
    b.score.total_cmp(&a.score)
}

/// Bucket the leaf neighbors of `node_id` by the port they attach to.
///
/// Port-attached leaves are kept only when they sit on the wrong side; body
/// attached leaves are always kept, scored by the magnitude of their offset.
/// Port buckets are sorted so that `pop` yields the worst placed leaf first.
pub fn collect_swap_candidates<G: GraphSession + ?Sized>(
    graph: &G,
    node_id: &str,
    ordering: PortOrdering,
) -> SwapCandidates {
    let mut candidates = SwapCandidates::default();
    let Some(node) = graph.node(node_id) else {
        return candidates;
    };
    let edges = graph
        .incoming_edges(node_id)
        .into_iter()
        .chain(graph.outgoing_edges(node_id));

    for edge in edges {
        let Some(other) = graph.node(edge.other_end(node_id)) else {
            continue;
        };
        if graph.degree(&other.id) != 1 {
            continue;
        }
        let check = check_negative_orientation_score(node, other, ordering);
        let (bucket, score) = match port_role(node, edge) {
            Some(PortRole::Input) => (&mut candidates.input, check),
            Some(PortRole::Output) => (&mut candidates.output, -check),
            None => {
                candidates.not_connected.push(SwapCandidate {
                    node_id: other.id.clone(),
                    score: check.abs(),
                });
                continue;
            }
        };
        if score < 0.0 {
            bucket.push(SwapCandidate {
                node_id: other.id.clone(),
                score,
            });
        }
    }

    candidates.input.sort_by(descending);
    candidates.output.sort_by(descending);
    candidates.not_connected.sort_by(|a, b| a.score.total_cmp(&b.score));
    candidates
}

/// Greedily swap misplaced leaves around the ported node `node_id` oriented
/// as `ordering`. Returns the swaps that were kept.
///
/// Input and output leaves on the wrong side are first swapped pairwise. Each
/// remaining output (or, once outputs run out, input) leaf is then offered to
/// the body attached leaves from the highest score down; a trial swap is kept
/// only when it strictly improves the leaf's score, and undone otherwise.
/// Leaves are only ever swapped with leaves of the same parent.
pub fn post_change_ports_orientation<G: GraphSession + ?Sized>(
    graph: &mut G,
    node_id: &str,
    ordering: PortOrdering,
) -> Vec<(String, String)> {
    let mut swaps = Vec::new();
    let Some(node) = graph.node(node_id).cloned() else {
        return swaps;
    };
    let SwapCandidates {
        mut input,
        mut output,
        not_connected,
    } = collect_swap_candidates(graph, node_id, ordering);

    let pairs = input.len().min(output.len());
    for _ in 0..pairs {
        let (Some(from_input), Some(from_output)) = (input.pop(), output.pop()) else {
            break;
        };
        if graph.parent_of(&from_input.node_id) != graph.parent_of(&from_output.node_id) {
            continue;
        }
        swap_positions(graph, &from_input.node_id, &from_output.node_id);
        log::debug!(
            "swapped {} and {} around {node_id}",
            from_input.node_id,
            from_output.node_id
        );
        swaps.push((from_input.node_id, from_output.node_id));
    }

    for effector in not_connected.iter().rev() {
        let (bucket, sign) = if !output.is_empty() {
            (&mut output, -1.0)
        } else if !input.is_empty() {
            (&mut input, 1.0)
        } else {
            continue;
        };
        let Some(candidate) = bucket.last().cloned() else {
            continue;
        };
        if graph.parent_of(&effector.node_id) != graph.parent_of(&candidate.node_id) {
            continue;
        }

        swap_positions(graph, &effector.node_id, &candidate.node_id);
        let new_score = graph
            .node(&candidate.node_id)
            .map(|moved| sign * check_negative_orientation_score(&node, moved, ordering))
            .unwrap_or(candidate.score);
        if new_score > candidate.score {
            bucket.pop();
            log::debug!(
                "swapped effector {} with {} around {node_id} ({:.3} -> {new_score:.3})",
                effector.node_id,
                candidate.node_id,
                candidate.score
            );
            swaps.push((effector.node_id.clone(), candidate.node_id));
        } else {
            swap_positions(graph, &effector.node_id, &candidate.node_id);
        }
    }
    swaps
}

/// Orientation chosen for one ported node and the swaps that followed it.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientationChange {
    pub node_id: String,
    pub previous: PortOrdering,
    pub ordering: PortOrdering,
    pub swaps: Vec<(String, String)>,
}

fn is_reorientable(node: &Node) -> bool {
    is_ported_process(&node.class) || is_ported_logical(&node.class)
}

/// Re-orient every two-port process and logical operator after a layout,
/// optionally improving the flow around it, then refresh the style.
pub fn change_ports_orientation_after_layout<G: GraphSession + ?Sized>(
    graph: &mut G,
    options: &Options,
) -> Vec<OrientationChange> {
    let mut changes = Vec::new();
    for node_id in graph.node_ids() {
        let eligible = graph
            .node(&node_id)
            .is_some_and(|node| is_reorientable(node) && node.ports.len() == 2);
        if !eligible {
            continue;
        }

        let previous = ports_ordering(graph, &node_id);
        let ordering = best_orientation(graph, &node_id);
        set_ports_ordering(graph, &[node_id.as_str()], ordering, None);
        if previous != ordering {
            log::info!("{node_id}: ports {previous} -> {ordering}");
        }
        let swaps = if options.improve_flow {
            post_change_ports_orientation(graph, &node_id, ordering)
        } else {
            Vec::new()
        };
        changes.push(OrientationChange {
            node_id,
            previous,
            ordering,
            swaps,
        });
    }
    graph.update_style();
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, MemoryGraph, Point};
    use crate::ports::add_ports;

    fn reversed_reaction() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("p", "process").at(100.0, 100.0).sized(20.0, 20.0));
        graph.add_node(Node::new("a", "simple chemical").at(150.0, 100.0).sized(30.0, 30.0));
        graph.add_node(Node::new("b", "simple chemical").at(50.0, 100.0).sized(30.0, 30.0));
        graph.add_edge(Edge::new("in", "consumption", "a", "p"));
        graph.add_edge(Edge::new("out", "production", "p", "b"));
        graph
    }

    #[test]
    fn misplaced_input_and_output_are_swapped() {
        let mut graph = reversed_reaction();
        let swaps = post_change_ports_orientation(&mut graph, "p", PortOrdering::LeftToRight);
        assert_eq!(swaps, vec![("a".to_string(), "b".to_string())]);
        assert_eq!(graph.position("a"), Some(Point::new(50.0, 100.0)));
        assert_eq!(graph.position("b"), Some(Point::new(150.0, 100.0)));
    }

    #[test]
    fn different_parents_block_swaps() {
        let mut graph = reversed_reaction();
        graph.add_node(Node::new("c", "compartment").at(150.0, 100.0).sized(100.0, 100.0));
        graph.set_parent("a", Some("c".to_string()));
        let swaps = post_change_ports_orientation(&mut graph, "p", PortOrdering::LeftToRight);
        assert!(swaps.is_empty());
        assert_eq!(graph.position("a"), Some(Point::new(150.0, 100.0)));
    }

    #[test]
    fn candidates_skip_well_placed_and_shared_neighbors() {
        let mut graph = reversed_reaction();
        graph.add_node(Node::new("c", "simple chemical").at(40.0, 100.0).sized(30.0, 30.0));
        graph.add_node(Node::new("q", "process").at(0.0, 100.0).sized(20.0, 20.0));
        graph.add_edge(Edge::new("in2", "consumption", "c", "p"));
        graph.add_edge(Edge::new("in3", "consumption", "c", "q"));
        let candidates = collect_swap_candidates(&graph, "p", PortOrdering::LeftToRight);
        assert_eq!(candidates.input.len(), 1);
        assert_eq!(candidates.input[0].node_id, "a");
        assert_eq!(candidates.output.len(), 1);
        assert!(candidates.not_connected.is_empty());
    }

    #[test]
    fn after_layout_orients_ported_nodes_only() {
        let mut graph = reversed_reaction();
        add_ports(&mut graph, "p", PortOrdering::TopToBottom, 70.0);
        graph.add_node(Node::new("q", "process").at(0.0, 0.0).sized(20.0, 20.0));
        let changes = change_ports_orientation_after_layout(&mut graph, &Options::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, PortOrdering::TopToBottom);
        assert_eq!(changes[0].ordering, PortOrdering::RightToLeft);
        assert!(changes[0].swaps.is_empty());
        assert_eq!(graph.style_updates(), 1);
        assert_eq!(graph.batch_depth(), 0);
    }
}
