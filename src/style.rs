//! Stylesheet helpers: shapes, arrowheads, label text and sizes, complex
//! spacing, tooltips and per-class defaults.

use std::collections::{HashMap, HashSet};

use crate::classes::{
    can_have_ports, can_have_state_variable, can_have_unit_of_information, is_biological_activity,
    is_sif_node, pure_class, BIOLOGICAL_ACTIVITY_TYPES, COMPOUND_NODE_TYPES, EDGE_TYPES, EPN_TYPES,
    LOGICAL_OPERATOR_TYPES, NODE_TYPES, OTHER_NODE_TYPES, PROCESS_TYPES, SIF_TYPES,
};
use crate::graph::{AuxSide, AuxUnitKind, Edge, GraphSession, Node};
use crate::options::{LabelSize, Options};

/// Width of rendered text, used to fit labels into their nodes.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Fixed advance per character; good enough without a font backend.
#[derive(Clone, Copy, Debug)]
pub struct ApproximateMeasure {
    pub advance: f64,
}

impl Default for ApproximateMeasure {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for ApproximateMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * self.advance
    }
}

const ELLIPSIS: &str = "..";

/// Longest prefix of `text` that fits `width` once an ellipsis is appended.
pub fn truncate_text(text: &str, width: f64, font_size: f64, measure: &dyn TextMeasure) -> String {
    if measure.text_width(text, font_size) <= width {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    for end in (0..chars.len()).rev() {
        let mut candidate: String = chars[..end].iter().collect();
        candidate.push_str(ELLIPSIS);
        if measure.text_width(&candidate, font_size) <= width {
            return candidate;
        }
    }
    String::new()
}

pub fn cy_shape(class: &str, ports_enabled: bool, port_count: usize) -> &'static str {
    match pure_class(class) {
        "compartment" => "compartment",
        "phenotype" => "hexagon",
        "perturbing agent" | "tag" => "polygon",
        class if class.starts_with("BA") => "biological activity",
        "submap" | "topology group" => "rectangle",
        "source and sink" => "source and sink",
        "nucleic acid feature" => "nucleic acid feature",
        "macromolecule" => "macromolecule",
        "simple chemical" => "simple chemical",
        "complex" => "complex",
        "biological activity" => "biological activity",
        "small molecule" => "small molecule",
        "protein" => "protein",
        class if can_have_ports(class) => {
            if ports_enabled && port_count == 2 {
                "polygon"
            } else if matches!(class, "process" | "omitted process" | "uncertain process") {
                "rectangle"
            } else {
                "ellipse"
            }
        }
        _ => "ellipse",
    }
}

pub fn node_shape(node: &Node, options: &Options) -> &'static str {
    cy_shape(&node.class, options.ports_enabled, node.ports.len())
}

pub fn arrow_shape(edge_class: &str) -> &'static str {
    match edge_class {
        "necessary stimulation" => "triangle-cross",
        "inhibition" | "negative influence" | "inhibits" | "downregulates-expression"
        | "dephosphorylates" => "tee",
        "catalysis" => "circle",
        "stimulation"
        | "production"
        | "positive influence"
        | "activates"
        | "phosphorylates"
        | "upregulates-expression"
        | "controls-state-change-of"
        | "chemical-affects"
        | "controls-transport-of"
        | "controls-phosphorylation-of"
        | "controls-expression-of"
        | "catalysis-precedes"
        | "consumption-controled-by"
        | "controls-production-of"
        | "controls-transport-of-chemical"
        | "used-to-produce" => "triangle",
        "modulation" | "unknown influence" => "diamond",
        _ => "none",
    }
}

pub fn line_style(edge_class: &str) -> &'static str {
    match edge_class {
        "controls-expression-of" | "upregulates-expression" | "downregulates-expression" => "dashed",
        _ => "solid",
    }
}

/// Label text of a node before any fitting.
pub fn raw_element_content<G: GraphSession + ?Sized>(graph: &G, node: &Node, options: &Options) -> String {
    let class = pure_class(&node.class);
    let own_label = || node.label().unwrap_or_default().to_string();
    match class {
        "macromolecule" | "simple chemical" | "phenotype" | "unspecified entity"
        | "nucleic acid feature" | "perturbing agent" | "tag" | "biological activity" | "submap"
        | "compartment" => own_label(),
        class if class.starts_with("BA") => own_label(),
        "complex" => {
            if graph.children(&node.id).is_empty() || options.show_complex_name {
                node.label()
                    .or_else(|| node.data("infoLabel").filter(|label| !label.is_empty()))
                    .unwrap_or_default()
                    .to_string()
            } else {
                String::new()
            }
        }
        "and" => "AND".to_string(),
        "or" => "OR".to_string(),
        "not" => "NOT".to_string(),
        "omitted process" => "\\\\".to_string(),
        "uncertain process" => "?".to_string(),
        "dissociation" => "o".to_string(),
        "delay" => "\u{03C4}".to_string(),
        _ => String::new(),
    }
}

/// Label text of a node, truncated to its width when labels are fitted.
pub fn element_content<G: GraphSession + ?Sized>(
    graph: &G,
    node: &Node,
    options: &Options,
    measure: &dyn TextMeasure,
) -> String {
    let content = raw_element_content(graph, node, options);
    if !options.fit_labels_to_nodes {
        return content;
    }
    let width = if pure_class(&node.class) == "perturbing agent" {
        node.width / 2.0
    } else {
        node.width
    };
    truncate_text(&content, width, drawn_label_size(node, options), measure)
}

/// Size a label is drawn at: the `font-size` style when set, otherwise the
/// size derived from the node's height.
pub fn drawn_label_size(node: &Node, options: &Options) -> f64 {
    style_font_size(node).unwrap_or_else(|| label_text_size(node, options))
}

fn style_font_size(node: &Node) -> Option<f64> {
    node.style("font-size")
        .and_then(|size| size.trim_end_matches("px").trim().parse::<f64>().ok())
}

/// Font size of a node, from its style when set (`"14px"` or `14`).
pub fn font_size(node: &Node) -> f64 {
    style_font_size(node)
        .or_else(|| match default_properties(&node.class) {
            Some(ElementDefaults::Node(defaults)) => defaults.font.map(|font| font.size),
            _ => None,
        })
        .unwrap_or(DEFAULT_FONT.size)
}

pub fn label_text_size(node: &Node, options: &Options) -> f64 {
    let class = node.class.as_str();
    if class == "association" {
        return 20.0;
    }
    if can_have_ports(class) {
        let mut coefficient = if class == "dissociation" {
            2.0
        } else if class.ends_with("process") {
            1.5
        } else {
            1.0
        };
        if options.ports_enabled && node.ports.len() == 2 {
            let port = &node.ports[0];
            let offset = if port.x == 0.0 { port.y.abs() } else { port.x.abs() };
            let ratio = offset / 50.0;
            if ratio > 0.0 {
                coefficient /= ratio;
            }
        }
        return dynamic_label_text_size(node, options, Some(coefficient));
    }
    if class == "delay" {
        return dynamic_label_text_size(node, options, Some(2.0));
    }
    dynamic_label_text_size(node, options, None)
}

/// `trunc(height / 2.45) * coefficient`. Without a coefficient, complexes,
/// compartments and submaps get a fixed size for the configured label size.
pub fn dynamic_label_text_size(node: &Node, options: &Options, coefficient: Option<f64>) -> f64 {
    let coefficient = match coefficient {
        Some(coefficient) => coefficient,
        None => {
            let is_complex = node.class.starts_with("complex");
            let is_container = matches!(node.class.as_str(), "compartment" | "submap");
            let (complex, container, scale) = match options.dynamic_label_size {
                LabelSize::Small => (10.0, 12.0, 0.75),
                LabelSize::Regular => (11.0, 14.0, 1.0),
                LabelSize::Large => (12.0, 16.0, 1.25),
            };
            if is_complex {
                return complex;
            }
            if is_container {
                return container;
            }
            scale
        }
    };
    (node.height / 2.45).trunc() * coefficient
}

fn has_bottom_units(node: &Node) -> bool {
    node.aux_units.iter().any(|unit| unit.side == AuxSide::Bottom)
}

pub fn complex_padding<G: GraphSession + ?Sized>(graph: &G, node: &Node, options: &Options) -> f64 {
    let mut padding = options.compound_padding;
    if options.show_complex_name && !raw_element_content(graph, node, options).is_empty() {
        padding += options.extra_complex_padding * 0.5;
        if has_bottom_units(node) {
            padding += options.extra_complex_padding * 0.5;
        }
    } else if !node.aux_units.is_empty() {
        padding += 2.0;
    }
    padding
}

pub fn complex_margin<G: GraphSession + ?Sized>(graph: &G, node: &Node, options: &Options) -> f64 {
    let mut margin = -options.extra_complex_padding;
    if options.show_complex_name
        && !raw_element_content(graph, node, options).is_empty()
        && has_bottom_units(node)
    {
        margin -= options.extra_complex_padding * 0.5;
    }
    if font_size(node) == 14.0 {
        margin -= 2.0;
    }
    margin
}

pub fn state_var_shape_options(class: &str) -> Option<&'static str> {
    can_have_state_variable(class).then_some("stadium")
}

const SIF_UNIT_SHAPES: &[&str] = &["rectangle", "stadium"];
const PLAIN_UNIT_SHAPES: &[&str] = &["rectangle"];

pub fn unit_of_info_shape_options(class: &str) -> Option<&'static [&'static str]> {
    let class = pure_class(class);
    if !can_have_unit_of_information(class) {
        return None;
    }
    if is_sif_node(class) {
        return Some(SIF_UNIT_SHAPES);
    }
    if is_biological_activity(class) {
        let shapes: &'static [&'static str] = match class {
            "BA macromolecule" => &["roundrectangle"],
            "BA nucleic acid feature" => &["bottomroundrectangle"],
            "BA unspecified entity" => &["ellipse"],
            "BA complex" => &["complex"],
            "BA perturbing agent" => &["perturbing agent"],
            "BA simple chemical" => &["stadium"],
            _ => return None,
        };
        return Some(shapes);
    }
    Some(PLAIN_UNIT_SHAPES)
}

/// Distance of cardinality labels from the edge source.
pub fn cardinality_distance<G: GraphSession + ?Sized>(graph: &G, edge: &Edge) -> f64 {
    match (graph.position(&edge.source), graph.position(&edge.target)) {
        (Some(source), Some(target)) => source.distance(target) * 0.15,
        _ => 0.0,
    }
}

/// Label summarising a node: collapsed nodes keep their stored info label,
/// leaves use their label, and compounds join the info labels of their
/// children with `:`.
pub fn info_label<G: GraphSession + ?Sized>(graph: &G, node_id: &str) -> Option<String> {
    let mut resolved: HashMap<String, Option<String>> = HashMap::new();
    let mut entered: HashSet<String> = HashSet::new();
    let mut stack = vec![(node_id.to_string(), false)];

    while let Some((id, expanded)) = stack.pop() {
        let Some(node) = graph.node(&id) else {
            resolved.insert(id, None);
            continue;
        };
        if node.data.contains_key("collapsedChildren") {
            let stored = node.data("infoLabel").map(str::to_string);
            resolved.insert(id, stored);
            continue;
        }
        let children = graph.children(&id);
        if children.is_empty() {
            resolved.insert(id, node.label.clone());
            continue;
        }
        if expanded {
            let joined = children
                .iter()
                .filter_map(|child| resolved.get(&child.id).cloned().flatten())
                .filter(|label| !label.is_empty())
                .collect::<Vec<_>>()
                .join(":");
            resolved.insert(id, Some(joined));
        } else if entered.insert(id.clone()) {
            stack.push((id, true));
            stack.extend(children.iter().rev().map(|child| (child.id.clone(), false)));
        } else {
            // parent cycle
            resolved.insert(id, None);
        }
    }
    resolved.remove(node_id).flatten()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Tooltip markup for a node, or `None` when it has neither label nor info label.
pub fn qtip_content<G: GraphSession + ?Sized>(graph: &G, node_id: &str) -> Option<String> {
    let node = graph.node(node_id)?;
    let label = match node.label() {
        Some(label) => label.to_string(),
        None => info_label(graph, node_id).filter(|label| !label.is_empty())?,
    };

    let mut html = format!(
        "<b style='text-align:center;font-size:16px;'>{}</b>",
        escape_html(&label)
    );
    for unit in &node.aux_units {
        let text = match &unit.kind {
            AuxUnitKind::StateVariable { value, variable } => match (value, variable) {
                (Some(value), Some(variable)) => format!("{value}@{variable}"),
                (None, Some(variable)) => format!("@{variable}"),
                (value, None) => value.clone().unwrap_or_default(),
            },
            AuxUnitKind::UnitOfInformation { label } => label.clone().unwrap_or_default(),
        };
        html.push_str("<div style='text-align:center;font-size:14px;'>");
        html.push_str(&escape_html(&text));
        html.push_str("</div>");
    }
    Some(html)
}

const CLONE_MARKER_IMAGE: &str = "data:image/svg+xml;utf8,%3Csvg%20width%3D%22100%22%20height%3D%22100%22%20viewBox%3D%220%200%20100%20100%22%20style%3D%22fill%3Anone%3Bstroke%3Ablack%3Bstroke-width%3A0%3B%22%20xmlns%3D%22http%3A//www.w3.org/2000/svg%22%20%3E%3Crect%20x%3D%220%22%20y%3D%220%22%20width%3D%22100%22%20height%3D%22100%22%20style%3D%22fill%3A%23a9a9a9%22/%3E%20%3C/svg%3E";

const BACKGROUND_KEYS: [&str; 7] = [
    "background-image",
    "background-position-x",
    "background-position-y",
    "background-width",
    "background-height",
    "background-fit",
    "background-image-opacity",
];

/// Mark or unmark a node as cloned. Unspecified entities and perturbing
/// agents also carry the marker as a background layer, made transparent
/// rather than removed when the marker goes away.
pub fn set_clone_marker_status<G: GraphSession + ?Sized>(graph: &mut G, node_id: &str, status: bool) {
    let value = status.then(|| "true".to_string());
    graph.set_node_data(node_id, "clonemarker", value);

    let Some(node) = graph.node(node_id) else {
        return;
    };
    if !matches!(node.class.as_str(), "unspecified entity" | "perturbing agent") {
        return;
    }
    let opacity = node
        .style("background-opacity")
        .unwrap_or("1")
        .to_string();
    let mut layers: Vec<Vec<String>> = BACKGROUND_KEYS
        .iter()
        .map(|key| {
            node.data(key)
                .map(|list| list.split(' ').filter(|item| !item.is_empty()).map(str::to_string).collect())
                .unwrap_or_default()
        })
        .collect();

    let index = layers[0].iter().position(|image| image == CLONE_MARKER_IMAGE);
    match (status, index) {
        (true, Some(index)) => set_layer(&mut layers[6], index, opacity),
        (true, None) => {
            let layer = [CLONE_MARKER_IMAGE, "50%", "100%", "100%", "25%", "none"];
            for (list, value) in layers.iter_mut().zip(layer) {
                list.push(value.to_string());
            }
            layers[6].push(opacity);
        }
        (false, Some(index)) => set_layer(&mut layers[6], index, "0".to_string()),
        (false, None) => {}
    }

    for (key, list) in BACKGROUND_KEYS.iter().zip(layers) {
        graph.set_node_data(node_id, key, Some(list.join(" ")));
    }
}

fn set_layer(list: &mut Vec<String>, index: usize, value: String) {
    if list.len() <= index {
        list.resize(index + 1, String::new());
    }
    list[index] = value;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontDefaults {
    pub size: f64,
    pub family: &'static str,
    pub style: &'static str,
    pub weight: &'static str,
    pub color: &'static str,
}

pub const DEFAULT_FONT: FontDefaults = FontDefaults {
    size: 11.0,
    family: "Helvetica",
    style: "normal",
    weight: "normal",
    color: "#000",
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfoboxDefaults {
    pub font: FontDefaults,
    pub border_width: f64,
    pub border_color: &'static str,
    pub background_color: &'static str,
}

pub const DEFAULT_INFOBOX: InfoboxDefaults = InfoboxDefaults {
    font: FontDefaults {
        size: 9.0,
        family: "Arial",
        style: "normal",
        weight: "normal",
        color: "#0f0f0f",
    },
    border_width: 2.25,
    border_color: "#555",
    background_color: "#ffffff",
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeDefaults {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub border_width: f64,
    pub border_color: &'static str,
    pub background_color: &'static str,
    pub background_opacity: f64,
    pub text_wrap: &'static str,
    pub font: Option<FontDefaults>,
    pub state_variable: Option<InfoboxDefaults>,
    pub unit_of_information: Option<InfoboxDefaults>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeDefaults {
    pub line_color: &'static str,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ElementDefaults {
    Node(NodeDefaults),
    Edge(EdgeDefaults),
}

/// Default width and height of a new node of `class`.
pub fn default_size(class: &str) -> Option<(f64, f64)> {
    let class = pure_class(class);
    let size = match class {
        "macromolecule" | "nucleic acid feature" | "phenotype" | "unspecified entity"
        | "perturbing agent" | "protein" => (60.0, 30.0),
        "simple chemical" => (30.0, 30.0),
        "source and sink" => (22.0, 22.0),
        "complex" => (44.0, 44.0),
        "compartment" | "submap" => (80.0, 80.0),
        "tag" => (35.0, 35.0),
        "small molecule" => (48.0, 24.0),
        _ if PROCESS_TYPES.contains(&class) => (20.0, 20.0),
        _ if LOGICAL_OPERATOR_TYPES.contains(&class) => (30.0, 30.0),
        _ if BIOLOGICAL_ACTIVITY_TYPES.contains(&class) => (60.0, 30.0),
        _ => return None,
    };
    Some(size)
}

/// Default stylesheet properties of `class`; `None` for unknown classes.
pub fn default_properties(class: &str) -> Option<ElementDefaults> {
    let class = pure_class(class);
    if EDGE_TYPES.contains(&class) {
        return Some(ElementDefaults::Edge(EdgeDefaults {
            line_color: "#555",
            width: 1.25,
        }));
    }
    if !NODE_TYPES.contains(&class) {
        return None;
    }

    let size = default_size(class);
    let has_font = EPN_TYPES.contains(&class)
        || SIF_TYPES.contains(&class)
        || OTHER_NODE_TYPES.contains(&class)
        || class == "phenotype";
    let mut defaults = NodeDefaults {
        width: size.map(|(width, _)| width),
        height: size.map(|(_, height)| height),
        border_width: 1.25,
        border_color: "#555",
        background_color: "#ffffff",
        background_opacity: 1.0,
        text_wrap: "wrap",
        font: has_font.then_some(DEFAULT_FONT),
        state_variable: can_have_state_variable(class).then_some(DEFAULT_INFOBOX),
        unit_of_information: can_have_unit_of_information(class).then_some(DEFAULT_INFOBOX),
    };
    if COMPOUND_NODE_TYPES.contains(&class) {
        defaults.background_opacity = 0.5;
    }
    match class {
        "association" => defaults.background_color = "#707070",
        "submap" => {
            defaults.border_width = 2.25;
            defaults.font = defaults.font.map(|font| FontDefaults { size: 14.0, ..font });
        }
        "compartment" => {
            defaults.border_width = 3.25;
            defaults.font = defaults.font.map(|font| FontDefaults { size: 14.0, ..font });
        }
        _ => {}
    }
    Some(ElementDefaults::Node(defaults))
}
