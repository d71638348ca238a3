//! Semantic class vocabularies and the pure predicates derived from them.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::graph::GraphSession;

pub const LOGICAL_OPERATOR_TYPES: &[&str] = &["and", "or", "not", "delay"];
pub const PROCESS_TYPES: &[&str] = &[
    "process",
    "omitted process",
    "uncertain process",
    "association",
    "dissociation",
    "phenotype",
];
pub const BIOLOGICAL_ACTIVITY_TYPES: &[&str] = &[
    "biological activity",
    "BA plain",
    "BA unspecified entity",
    "BA simple chemical",
    "BA macromolecule",
    "BA nucleic acid feature",
    "BA perturbing agent",
    "BA complex",
];
pub const EPN_TYPES: &[&str] = &[
    "macromolecule",
    "nucleic acid feature",
    "simple chemical",
    "source and sink",
    "unspecified entity",
    "perturbing agent",
    "complex",
];
pub const SIF_TYPES: &[&str] = &["protein", "small molecule"];
pub const OTHER_NODE_TYPES: &[&str] = &["compartment", "tag", "submap"];
pub const COMPOUND_NODE_TYPES: &[&str] = &["complex", "compartment", "submap"];

pub const EDGE_TYPES: &[&str] = &[
    "consumption",
    "production",
    "modulation",
    "stimulation",
    "catalysis",
    "inhibition",
    "necessary stimulation",
    "logic arc",
    "equivalence arc",
    "unknown influence",
    "positive influence",
    "negative influence",
    "controls-state-change-of",
    "controls-transport-of",
    "controls-phosphorylation-of",
    "controls-expression-of",
    "catalysis-precedes",
    "in-complex-with",
    "interacts-with",
    "neighbor-of",
    "consumption-controled-by",
    "controls-production-of",
    "controls-transport-of-chemical",
    "chemical-affects",
    "reacts-with",
    "used-to-produce",
    "activates",
    "inhibits",
    "phosphorylates",
    "dephosphorylates",
    "upregulates-expression",
    "downregulates-expression",
];

/// Process-like classes whose ports follow consumption/production arcs.
pub const PORTED_PROCESS_TYPES: &[&str] = &[
    "process",
    "omitted process",
    "uncertain process",
    "association",
    "dissociation",
];
/// Logical operators whose ports follow logic arcs.
pub const PORTED_LOGICAL_TYPES: &[&str] = &["and", "or", "not"];

lazy_static! {
    pub static ref NODE_TYPES: Vec<&'static str> = EPN_TYPES
        .iter()
        .chain(LOGICAL_OPERATOR_TYPES)
        .chain(PROCESS_TYPES)
        .chain(BIOLOGICAL_ACTIVITY_TYPES)
        .chain(SIF_TYPES)
        .chain(OTHER_NODE_TYPES)
        .copied()
        .collect();
    pub static ref SIMPLE_NODE_TYPES: Vec<&'static str> = NODE_TYPES
        .iter()
        .copied()
        .filter(|class| !COMPOUND_NODE_TYPES.contains(class))
        .collect();
    pub static ref ELEMENT_TYPES: HashSet<&'static str> =
        NODE_TYPES.iter().chain(EDGE_TYPES).copied().collect();
}

/// Either a class string or the id of an element whose class should be looked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassRef<'a> {
    Raw(&'a str),
    Element(&'a str),
}

impl<'a> ClassRef<'a> {
    /// Resolve to a plain class string; unknown element ids resolve to `None`.
    pub fn resolve<G: GraphSession + ?Sized>(self, graph: &'a G) -> Option<&'a str> {
        match self {
            ClassRef::Raw(class) => Some(class),
            ClassRef::Element(id) => graph.class_of(id),
        }
    }
}

impl<'a> From<&'a str> for ClassRef<'a> {
    fn from(class: &'a str) -> Self {
        ClassRef::Raw(class)
    }
}

/// Class without its multimer qualifier.
pub fn pure_class(class: &str) -> &str {
    class.strip_suffix(" multimer").unwrap_or(class)
}

pub fn can_have_sbgn_cardinality(class: &str) -> bool {
    matches!(pure_class(class), "consumption" | "production")
}

pub fn can_have_sbgn_label(class: &str) -> bool {
    let class = pure_class(class);
    !matches!(
        class,
        "and" | "or" | "not" | "delay" | "association" | "dissociation" | "source and sink"
    ) && !class.ends_with("process")
}

pub fn can_have_unit_of_information(class: &str) -> bool {
    let class = pure_class(class);
    matches!(
        class,
        "simple chemical"
            | "macromolecule"
            | "nucleic acid feature"
            | "complex"
            | "compartment"
            | "protein"
            | "small molecule"
    ) || (class.starts_with("BA") && class != "BA plain")
}

pub fn can_have_multiple_unit_of_information(class: &str) -> bool {
    !pure_class(class).starts_with("BA")
}

pub fn can_have_state_variable(class: &str) -> bool {
    matches!(
        pure_class(class),
        "macromolecule" | "nucleic acid feature" | "complex"
    )
}

pub fn must_be_square(class: &str) -> bool {
    let class = pure_class(class);
    class.contains("process")
        || matches!(
            class,
            "source and sink" | "and" | "or" | "not" | "association" | "dissociation" | "delay"
        )
}

pub fn some_must_not_be_square<'a>(classes: impl IntoIterator<Item = &'a str>) -> bool {
    classes.into_iter().any(|class| !must_be_square(class))
}

pub fn can_be_cloned(class: &str) -> bool {
    matches!(
        pure_class(class),
        "unspecified entity"
            | "macromolecule"
            | "complex"
            | "nucleic acid feature"
            | "simple chemical"
            | "perturbing agent"
    )
}

pub fn can_be_multimer(class: &str) -> bool {
    matches!(
        pure_class(class),
        "macromolecule" | "complex" | "nucleic acid feature" | "simple chemical"
    )
}

pub fn is_biological_activity(class: &str) -> bool {
    BIOLOGICAL_ACTIVITY_TYPES.contains(&pure_class(class))
}

pub fn is_sif_node(class: &str) -> bool {
    SIF_TYPES.contains(&pure_class(class))
}

pub fn is_epn_class(class: &str) -> bool {
    EPN_TYPES.contains(&pure_class(class))
}

pub fn is_pn_class(class: &str) -> bool {
    PROCESS_TYPES.contains(&pure_class(class))
}

pub fn is_empty_set_class(class: &str) -> bool {
    pure_class(class) == "source and sink"
}

pub fn is_logical_operator(class: &str) -> bool {
    LOGICAL_OPERATOR_TYPES.contains(&pure_class(class))
}

pub fn convenient_to_equivalence(class: &str) -> bool {
    matches!(pure_class(class), "tag" | "terminal")
}

/// Modulation family of Process Description arcs.
pub fn is_modulation_arc_class(class: &str) -> bool {
    matches!(
        pure_class(class),
        "modulation" | "stimulation" | "catalysis" | "inhibition" | "necessary stimulation"
    )
}

/// Activity Flow arcs other than the logic arc.
pub fn is_af_arc_class(class: &str) -> bool {
    matches!(
        pure_class(class),
        "positive influence" | "negative influence" | "unknown influence" | "necessary stimulation"
    )
}

pub fn can_have_ports(class: &str) -> bool {
    let class = pure_class(class);
    class != "phenotype" && class != "delay" && (is_logical_operator(class) || is_pn_class(class))
}

pub fn is_ported_process(class: &str) -> bool {
    PORTED_PROCESS_TYPES.contains(&class)
}

pub fn is_ported_logical(class: &str) -> bool {
    PORTED_LOGICAL_TYPES.contains(&class)
}

/// Whether a node of `node_class` may live inside a parent of `parent_class`.
///
/// The root, compartments and submaps accept anything. Complexes accept EPNs
/// without edges, or any EPN when the map type is unknown.
pub fn is_valid_parent(
    node_class: &str,
    parent_class: Option<&str>,
    connected_edges: Option<usize>,
    unknown_map_type: bool,
) -> bool {
    match parent_class {
        None | Some("compartment") | Some("submap") => true,
        Some(parent) if parent.starts_with("complex") => {
            let edgeless = connected_edges.map_or(true, |count| count == 0);
            (edgeless || unknown_map_type) && is_epn_class(node_class)
        }
        Some(_) => false,
    }
}

pub fn all_have_the_same_parent<G: GraphSession + ?Sized>(graph: &G, node_ids: &[&str]) -> bool {
    let Some(first) = node_ids.first() else {
        return true;
    };
    let parent = graph.parent_of(first);
    node_ids.iter().all(|id| graph.parent_of(id) == parent)
}

/// Nodes none of whose ancestors are also in `node_ids`.
pub fn top_most_nodes<'a, G: GraphSession + ?Sized>(graph: &G, node_ids: &[&'a str]) -> Vec<&'a str> {
    let selected: HashSet<&str> = node_ids.iter().copied().collect();
    node_ids
        .iter()
        .copied()
        .filter(|id| {
            let mut parent = graph.parent_of(id);
            while let Some(ancestor) = parent {
                if selected.contains(ancestor) {
                    return false;
                }
                parent = graph.parent_of(ancestor);
            }
            true
        })
        .collect()
}
