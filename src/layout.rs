//! Layout invocation preferences and padding helpers.

use std::collections::BTreeMap;
use std::fmt;

use crate::graph::{batch, GraphSession, Point};
use crate::options::Options;

const MIN_PADDING: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Animate {
    /// Animate only the final positions.
    End,
    /// Animate every iteration.
    During,
    Off,
}

impl fmt::Display for Animate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Animate::End => "end",
            Animate::During => "during",
            Animate::Off => "false",
        })
    }
}

/// Options a named layout is invoked with. `animate` is `None` when the
/// layout's own setting should be kept.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutPreferences {
    pub name: Option<String>,
    pub randomize: bool,
    pub animate: Option<Animate>,
    pub fit: bool,
    pub positions: Option<BTreeMap<String, Point>>,
}

/// Preferences for re-running the current layout after a local change.
///
/// Existing positions are kept and the viewport is left alone. Animation
/// follows `animate-on-drawing-changes`, unless the current layout already
/// animates during the run.
pub fn incremental_layout_preferences(options: &Options, current_animate: Option<Animate>) -> LayoutPreferences {
    let animate = if current_animate == Some(Animate::During) {
        None
    } else if options.animate_on_drawing_changes {
        Some(Animate::End)
    } else {
        Some(Animate::Off)
    };
    LayoutPreferences {
        name: None,
        randomize: false,
        animate,
        fit: false,
        positions: None,
    }
}

/// A `preset` layout that pins every node at its current position.
pub fn preset_layout<G: GraphSession + ?Sized>(graph: &G) -> LayoutPreferences {
    let positions = graph
        .node_ids()
        .into_iter()
        .filter_map(|id| graph.position(&id).map(|position| (id, position)))
        .collect();
    LayoutPreferences {
        name: Some("preset".to_string()),
        randomize: false,
        animate: Some(Animate::Off),
        fit: false,
        positions: Some(positions),
    }
}

/// Move nodes to the positions of a preset layout.
pub fn apply_positions<G: GraphSession + ?Sized>(graph: &mut G, preferences: &LayoutPreferences) {
    let Some(positions) = &preferences.positions else {
        return;
    };
    let mut scoped = batch(graph);
    for (id, position) in positions {
        scoped.set_position(id, *position);
    }
}

/// `percent`% of the average half perimeter of childless nodes, at least 5.
pub fn calculate_paddings<G: GraphSession + ?Sized>(graph: &G, percent: f64) -> f64 {
    let (total, simple_count) = graph
        .node_ids()
        .iter()
        .filter(|id| graph.children(id).is_empty())
        .filter_map(|id| graph.node(id))
        .fold((0.0, 0usize), |(total, count), node| (total + node.width + node.height, count + 1));
    if simple_count == 0 {
        return MIN_PADDING;
    }
    let padding = percent / 100.0 * (total / (2.0 * simple_count as f64)).floor();
    padding.max(MIN_PADDING)
}

/// Vertical and horizontal tiling paddings for the current graph.
pub fn tiling_paddings<G: GraphSession + ?Sized>(graph: &G, options: &Options) -> (f64, f64) {
    (
        calculate_paddings(graph, options.tiling_padding_vertical),
        calculate_paddings(graph, options.tiling_padding_horizontal),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraph, Node};

    #[test]
    fn incremental_layout_keeps_positions() {
        let options = Options::default();
        let preferences = incremental_layout_preferences(&options, None);
        assert!(!preferences.randomize && !preferences.fit);
        assert_eq!(preferences.animate, Some(Animate::End));

        let still = Options {
            animate_on_drawing_changes: false,
            ..Options::default()
        };
        assert_eq!(incremental_layout_preferences(&still, None).animate, Some(Animate::Off));
        assert_eq!(incremental_layout_preferences(&options, Some(Animate::During)).animate, None);
    }

    #[test]
    fn paddings_scale_with_average_node_size() {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("c", "compartment").sized(500.0, 500.0));
        graph.add_node(Node::new("a", "macromolecule").sized(60.0, 30.0).with_parent("c"));
        graph.add_node(Node::new("b", "simple chemical").sized(30.0, 30.0).with_parent("c"));
        // (90 + 60) / 4 = 37.5, floored to 37
        assert_eq!(calculate_paddings(&graph, 20.0), 7.4);
        assert_eq!(calculate_paddings(&graph, 10.0), MIN_PADDING);
        assert_eq!(calculate_paddings(&MemoryGraph::new(), 50.0), MIN_PADDING);
    }

    #[test]
    fn preset_layout_round_trips_positions() {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("a", "macromolecule").at(10.0, 20.0));
        let preset = preset_layout(&graph);
        assert_eq!(preset.name.as_deref(), Some("preset"));
        graph.set_position("a", Point::new(0.0, 0.0));
        apply_positions(&mut graph, &preset);
        assert_eq!(graph.position("a"), Some(Point::new(10.0, 20.0)));
        assert_eq!(graph.batch_depth(), 0);
    }
}
