//! Which node classes may sit at either end of which arc classes, per dialect.
//!
//! Entries absent from a table are not allowed. Tables follow PD level 1 v2.0
//! with these departures: source and sink has no edge limit, logical operators
//! may be both source and target, and a process accepts at most one catalysis
//! and one necessary stimulation. AF follows level 1 v1.2 section 3.3.1.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

use crate::classes::{is_biological_activity, is_epn_class, is_pn_class, is_sif_node, pure_class};
use crate::error::Error;
use crate::graph::GraphSession;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    ProcessDescription,
    ActivityFlow,
    Sif,
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pd" | "process description" => Ok(Dialect::ProcessDescription),
            "af" | "activity flow" => Ok(Dialect::ActivityFlow),
            "sif" => Ok(Dialect::Sif),
            _ => Err(Error::UnknownDialect(value.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::ProcessDescription => "PD",
            Dialect::ActivityFlow => "AF",
            Dialect::Sif => "SIF",
        };
        f.write_str(name)
    }
}

/// Best guess of the dialect a node class belongs to; shared classes such as
/// `phenotype`, `tag` or logical operators give `None`.
pub fn dialect_of_class(class: &str) -> Option<Dialect> {
    if is_sif_node(class) {
        Some(Dialect::Sif)
    } else if is_biological_activity(class) {
        Some(Dialect::ActivityFlow)
    } else if is_epn_class(class) || (is_pn_class(class) && pure_class(class) != "phenotype") {
        Some(Dialect::ProcessDescription)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleRule {
    pub is_allowed: bool,
    pub max_edge: Option<usize>,
    pub max_total: Option<usize>,
}

impl RoleRule {
    const DENIED: RoleRule = RoleRule {
        is_allowed: false,
        max_edge: None,
        max_total: None,
    };
    const ALLOWED: RoleRule = RoleRule {
        is_allowed: true,
        max_edge: None,
        max_total: None,
    };
    const SINGLE: RoleRule = RoleRule {
        is_allowed: true,
        max_edge: Some(1),
        max_total: Some(1),
    };
    const SINGLE_OF_CLASS: RoleRule = RoleRule {
        is_allowed: true,
        max_edge: Some(1),
        max_total: None,
    };

    /// Whether one more edge fits, given the edges already incident in this role.
    pub fn admits(&self, same_class_edges: usize, total_edges: usize) -> bool {
        self.max_edge.map_or(true, |max| same_class_edges < max)
            && self.max_total.map_or(true, |max| total_edges < max)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeRule {
    pub as_source: RoleRule,
    pub as_target: RoleRule,
}

type EdgeRules = HashMap<&'static str, NodeRule>;
type DialectTable = HashMap<&'static str, EdgeRules>;

const NO: RoleRule = RoleRule::DENIED;
const YES: RoleRule = RoleRule::ALLOWED;
const ONE: RoleRule = RoleRule::SINGLE;
const ONE_OF: RoleRule = RoleRule::SINGLE_OF_CLASS;

fn rules(rows: &[(&'static str, RoleRule, RoleRule)]) -> EdgeRules {
    rows.iter()
        .map(|&(class, as_source, as_target)| (class, NodeRule { as_source, as_target }))
        .collect()
}

fn pd_modulation(process_target: RoleRule, nucleic_source: RoleRule, agent_source: RoleRule) -> EdgeRules {
    rules(&[
        ("macromolecule", YES, NO),
        ("simple chemical", YES, NO),
        ("unspecified entity", YES, NO),
        ("complex", YES, NO),
        ("nucleic acid feature", nucleic_source, NO),
        ("source and sink", YES, NO),
        ("perturbing agent", agent_source, NO),
        ("process", NO, process_target),
        ("omitted process", NO, process_target),
        ("uncertain process", NO, process_target),
        ("phenotype", NO, process_target),
        ("and", ONE, NO),
        ("or", ONE, NO),
        ("not", ONE, NO),
    ])
}

fn pd_table() -> DialectTable {
    let mut table = DialectTable::new();
    table.insert(
        "consumption",
        rules(&[
            ("macromolecule", YES, NO),
            ("simple chemical", YES, NO),
            ("unspecified entity", YES, NO),
            ("complex", YES, NO),
            ("nucleic acid feature", YES, NO),
            ("source and sink", YES, NO),
            ("process", NO, YES),
            ("omitted process", NO, YES),
            ("uncertain process", NO, YES),
            ("association", NO, YES),
            ("dissociation", NO, ONE),
        ]),
    );
    table.insert(
        "production",
        rules(&[
            ("macromolecule", NO, YES),
            ("simple chemical", NO, YES),
            ("unspecified entity", NO, YES),
            ("complex", NO, YES),
            ("nucleic acid feature", NO, YES),
            ("source and sink", NO, YES),
            ("process", YES, NO),
            ("omitted process", YES, NO),
            ("uncertain process", YES, NO),
            ("association", ONE, NO),
            ("dissociation", YES, NO),
        ]),
    );
    table.insert("modulation", pd_modulation(YES, YES, YES));
    table.insert("stimulation", pd_modulation(YES, YES, YES));
    table.insert("catalysis", pd_modulation(ONE_OF, NO, NO));
    table.insert("inhibition", pd_modulation(YES, YES, YES));
    table.insert("necessary stimulation", pd_modulation(ONE_OF, YES, YES));
    table.insert(
        "logic arc",
        rules(&[
            ("macromolecule", YES, NO),
            ("simple chemical", YES, NO),
            ("unspecified entity", YES, NO),
            ("complex", YES, NO),
            ("nucleic acid feature", YES, NO),
            ("source and sink", YES, NO),
            ("and", ONE, YES),
            ("or", ONE, YES),
            ("not", ONE, ONE),
        ]),
    );
    table.insert(
        "equivalence arc",
        rules(&[
            ("macromolecule", YES, NO),
            ("simple chemical", YES, NO),
            ("unspecified entity", YES, NO),
            ("complex", YES, NO),
            ("nucleic acid feature", YES, NO),
            ("tag", NO, YES),
            ("submap", NO, YES),
        ]),
    );
    table
}

fn af_influence() -> EdgeRules {
    rules(&[
        ("biological activity", YES, YES),
        ("phenotype", NO, YES),
        ("and", ONE, NO),
        ("or", ONE, NO),
        ("not", ONE, NO),
        ("delay", ONE, NO),
    ])
}

fn af_table() -> DialectTable {
    let mut table = DialectTable::new();
    for class in [
        "positive influence",
        "negative influence",
        "unknown influence",
        "necessary stimulation",
    ] {
        table.insert(class, af_influence());
    }
    table.insert(
        "logic arc",
        rules(&[
            ("biological activity", YES, NO),
            ("and", NO, YES),
            ("or", NO, YES),
            ("not", NO, ONE),
            ("delay", NO, ONE),
        ]),
    );
    table.insert(
        "equivalence arc",
        rules(&[
            ("biological activity", YES, NO),
            ("phenotype", YES, NO),
            ("tag", NO, YES),
            ("submap", NO, YES),
        ]),
    );
    table
}

fn sif_table() -> DialectTable {
    let protein_both = || rules(&[("protein", YES, YES)]);
    let chemical_both = || rules(&[("small molecule", YES, YES)]);
    let protein_to_chemical = || rules(&[("protein", YES, NO), ("small molecule", NO, YES)]);
    let chemical_to_protein = || rules(&[("protein", NO, YES), ("small molecule", YES, NO)]);

    let mut table = DialectTable::new();
    for class in [
        "controls-state-change-of",
        "controls-transport-of",
        "controls-phosphorylation-of",
        "controls-expression-of",
        "catalysis-precedes",
        "in-complex-with",
        "interacts-with",
        "neighbor-of",
        "activates",
        "inhibits",
        "phosphorylates",
        "dephosphorylates",
        "upregulates-expression",
        "downregulates-expression",
    ] {
        table.insert(class, protein_both());
    }
    table.insert("consumption-controled-by", chemical_to_protein());
    table.insert("chemical-affects", chemical_to_protein());
    table.insert("controls-production-of", protein_to_chemical());
    table.insert("controls-transport-of-chemical", protein_to_chemical());
    table.insert("reacts-with", chemical_both());
    table.insert("used-to-produce", chemical_both());
    table
}

lazy_static! {
    static ref PD_CONSTRAINTS: DialectTable = pd_table();
    static ref AF_CONSTRAINTS: DialectTable = af_table();
    static ref SIF_CONSTRAINTS: DialectTable = sif_table();
}

fn table(dialect: Dialect) -> &'static DialectTable {
    match dialect {
        Dialect::ProcessDescription => &PD_CONSTRAINTS,
        Dialect::ActivityFlow => &AF_CONSTRAINTS,
        Dialect::Sif => &SIF_CONSTRAINTS,
    }
}

/// Table key for a node class: multimers share their base entry and every AF
/// activity node uses the `biological activity` row.
fn lookup_class(dialect: Dialect, node_class: &str) -> &str {
    let class = pure_class(node_class);
    if dialect == Dialect::ActivityFlow && is_biological_activity(class) {
        "biological activity"
    } else {
        class
    }
}

/// Rule for `node_class` at either end of `edge_class`; unknown pairs deny both roles.
pub fn rule(dialect: Dialect, edge_class: &str, node_class: &str) -> NodeRule {
    table(dialect)
        .get(edge_class)
        .and_then(|edges| edges.get(lookup_class(dialect, node_class)))
        .copied()
        .unwrap_or_default()
}

/// Edge classes known to a dialect, sorted.
pub fn edge_classes(dialect: Dialect) -> Vec<&'static str> {
    let mut classes: Vec<&'static str> = table(dialect).keys().copied().collect();
    classes.sort_unstable();
    classes
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Source,
    Target,
}

/// One end of a prospective arc and the edges already incident to it in that role.
#[derive(Clone, Copy, Debug)]
pub struct Endpoint<'a> {
    pub class: &'a str,
    pub same_class_edges: usize,
    pub total_edges: usize,
}

impl<'a> Endpoint<'a> {
    pub fn bare(class: &'a str) -> Self {
        Self {
            class,
            same_class_edges: 0,
            total_edges: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid,
    ExceedsLimit { role: Role },
}

pub fn validate_arc(dialect: Dialect, edge_class: &str, source: Endpoint<'_>, target: Endpoint<'_>) -> Validation {
    let source_rule = rule(dialect, edge_class, source.class).as_source;
    let target_rule = rule(dialect, edge_class, target.class).as_target;
    if !source_rule.is_allowed || !target_rule.is_allowed {
        return Validation::Invalid;
    }
    if !source_rule.admits(source.same_class_edges, source.total_edges) {
        return Validation::ExceedsLimit { role: Role::Source };
    }
    if !target_rule.admits(target.same_class_edges, target.total_edges) {
        return Validation::ExceedsLimit { role: Role::Target };
    }
    Validation::Valid
}

/// Validate a new `edge_class` arc between two existing nodes, counting the
/// outgoing edges of the source and the incoming edges of the target.
pub fn validate_arc_in_graph<G: GraphSession + ?Sized>(
    graph: &G,
    dialect: Dialect,
    edge_class: &str,
    source_id: &str,
    target_id: &str,
) -> Validation {
    let (Some(source), Some(target)) = (graph.node(source_id), graph.node(target_id)) else {
        return Validation::Invalid;
    };
    let outgoing = graph.outgoing_edges(source_id);
    let incoming = graph.incoming_edges(target_id);
    let source = Endpoint {
        class: &source.class,
        same_class_edges: outgoing.iter().filter(|edge| edge.class == edge_class).count(),
        total_edges: outgoing.len(),
    };
    let target = Endpoint {
        class: &target.class,
        same_class_edges: incoming.iter().filter(|edge| edge.class == edge_class).count(),
        total_edges: incoming.len(),
    };
    let verdict = validate_arc(dialect, edge_class, source, target);
    log::debug!(
        "{dialect} {edge_class} arc {source_id} -> {target_id}: {verdict:?}"
    );
    verdict
}
