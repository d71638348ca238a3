//! Experimental data overlay: per-gene values drawn as a strip of colored
//! cells on gene nodes.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::classes::pure_class;
use crate::graph::{batch, GraphSession, Node};

pub const DEFAULT_VISIBLE_GENOMIC_DATA_COUNT: usize = 3;
pub const MAX_VISIBLE_GENOMIC_DATA_COUNT: usize = 6;

const BASE_WIDTH: f64 = 150.0;
const EXTRA_CELL_WIDTH: f64 = 35.0;
const CELL_STRIP_HEIGHT: f64 = 25.0;
const LABEL_SHIFT: f64 = -15.0;
const MISSING_FILL: &str = "rgb(210,210,210)";
const ZERO_FILL: &str = "rgb(255,255,255)";
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
/// Background image that draws nothing.
pub const EMPTY_DATA_URI: &str = "data:image/svg+xml;utf8,";

/// Category name to raw value, for one gene.
pub type GeneData = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedGenomicData {
    pub genomic_data: BTreeMap<String, GeneData>,
    pub visibility: BTreeMap<String, bool>,
}

/// Receives a call after overlay data changes.
pub trait Listener {
    fn notify(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// Split a tab separated table into categories and rows. Values beyond the
/// known categories are dropped with a warning.
fn parse_table(text: &str) -> (Vec<String>, Vec<(String, Vec<(String, String)>)>) {
    let mut lines = text.split('\n').map(|line| line.trim_end_matches('\r'));
    let categories: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split('\t')
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let mut cells = line.split('\t');
        let gene = cells.next().unwrap_or_default().to_string();
        let values: Vec<&str> = cells.collect();
        if values.len() > categories.len() {
            log::warn!(
                "row for {gene} has {} values but only {} categories; extra values ignored",
                values.len(),
                categories.len()
            );
        }
        let entries = categories
            .iter()
            .cloned()
            .zip(values.into_iter().map(str::to_string))
            .collect();
        rows.push((gene, entries));
    }
    (categories, rows)
}

fn initial_visibility(index: usize) -> bool {
    index < DEFAULT_VISIBLE_GENOMIC_DATA_COUNT
}

/// Width a gene node needs to show `count` cells.
pub fn required_width_for_genomic_data(count: usize) -> f64 {
    BASE_WIDTH + count.saturating_sub(DEFAULT_VISIBLE_GENOMIC_DATA_COUNT) as f64 * EXTRA_CELL_WIDTH
}

/// Fill of a cell holding `value`: white for zero, shades of red for positive
/// and blue for negative values, gray when missing or not a number.
/// Portal values keep two decimals.
fn portal_value(value: f64) -> String {
    format!("{value:.2}")
}

pub fn cell_color(value: Option<&str>) -> String {
    let Some(number) = value
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|number| number.is_finite())
    else {
        return MISSING_FILL.to_string();
    };
    if number == 0.0 {
        return ZERO_FILL.to_string();
    }
    let mut magnitude = number.abs();
    if magnitude < 0.5 || magnitude == 1.0 {
        magnitude = 2.0;
    }
    // fitted through (0,0), (25,140), (50,220), (100,255)
    let shade = (255.0 - (-7.118 + 53.9765 * magnitude.ln())).round().clamp(0.0, 255.0) as u8;
    if number < 0.0 {
        format!("rgb({shade},{shade},255)")
    } else {
        format!("rgb(255,{shade},{shade})")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BadgeCell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
}

/// Strip of cells drawn as the background of a gene node.
#[derive(Clone, Debug, PartialEq)]
pub struct Badge {
    pub width: f64,
    pub height: f64,
    pub cells: Vec<BadgeCell>,
}

impl Badge {
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg width="{}" height="{}" xmlns="{SVG_NAMESPACE}">"#,
            self.width, self.height
        );
        for cell in &self.cells {
            let _ = write!(
                svg,
                r#"<rect x="{}" y="{}" width="{}" height="{}" style="stroke-width:1;stroke:rgb(0,0,0);opacity:1;fill:{};"/>"#,
                cell.x, cell.y, cell.width, cell.height, cell.fill
            );
        }
        svg.push_str("</svg>");
        svg
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:image/svg+xml;base64,{}",
            BASE64_STANDARD.encode(self.to_svg())
        )
    }
}

pub fn is_gene(node: &Node) -> bool {
    node.data("type") == Some("GENE")
}

/// Tag labelled macromolecules and nucleic acid features as gene nodes so an
/// overlay can find them. Returns how many nodes were tagged.
pub fn mark_gene_nodes<G: GraphSession + ?Sized>(graph: &mut G) -> usize {
    let genes: Vec<String> = graph
        .node_ids()
        .into_iter()
        .filter(|id| {
            graph.node(id).is_some_and(|node| {
                matches!(pure_class(&node.class), "macromolecule" | "nucleic acid feature")
                    && node.label().is_some()
                    && !is_gene(node)
            })
        })
        .collect();
    {
        let mut scoped = batch(graph);
        for id in &genes {
            scoped.set_node_data(id, "type", Some("GENE".to_string()));
        }
    }
    genes.len()
}

/// Name a gene node is looked up by in the overlay data.
pub fn gene_name(node: &Node) -> Option<&str> {
    node.data("name").or_else(|| node.label())
}

#[derive(Default)]
pub struct OverlayStore {
    genomic_data: BTreeMap<String, GeneData>,
    visibility: BTreeMap<String, bool>,
    groups: BTreeMap<usize, Vec<String>>,
    group_counter: usize,
    listeners: Vec<(ListenerId, Rc<dyn Listener>)>,
    next_listener: usize,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn genomic_data(&self) -> &BTreeMap<String, GeneData> {
        &self.genomic_data
    }

    pub fn visibility(&self) -> &BTreeMap<String, bool> {
        &self.visibility
    }

    pub fn groups(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.groups
    }

    /// Forget all data, visibility and groups. Listeners stay registered.
    pub fn clear_all_genomic_data(&mut self) {
        self.genomic_data.clear();
        self.visibility.clear();
        self.groups.clear();
        self.group_counter = 0;
    }

    /// Next unused group id.
    pub fn empty_group_id(&mut self) -> usize {
        let id = self.group_counter;
        self.group_counter += 1;
        id
    }

    pub fn add_genomic_data(&mut self, data: BTreeMap<String, GeneData>) {
        self.genomic_data = data;
    }

    pub fn add_genomic_data_with_gene_symbol(&mut self, gene: &str, data: GeneData) {
        self.genomic_data.insert(gene.to_string(), data);
    }

    pub fn remove_genomic_data(&mut self) {
        self.genomic_data.clear();
    }

    pub fn remove_genomic_data_with_gene_symbol(&mut self, gene: &str) {
        self.genomic_data.insert(gene.to_string(), GeneData::new());
    }

    pub fn add_genomic_vis_data(&mut self, category: &str, visible: bool) {
        self.visibility.insert(category.to_string(), visible);
    }

    pub fn remove_genomic_vis_data(&mut self) {
        self.visibility.clear();
    }

    pub fn add_genomic_group_data(&mut self, group_id: usize, categories: Vec<String>) {
        self.groups.insert(group_id, categories);
    }

    /// Parse a table without touching the store.
    pub fn prepare_genomic_data(text: &str) -> PreparedGenomicData {
        let (categories, rows) = parse_table(text);
        let mut prepared = PreparedGenomicData::default();
        for (index, category) in categories.into_iter().enumerate() {
            prepared.visibility.insert(category, initial_visibility(index));
        }
        for (gene, entries) in rows {
            prepared.genomic_data.entry(gene).or_default().extend(entries);
        }
        prepared
    }

    /// Regroup study → gene → value data by gene; every study is visible.
    pub fn prepare_portal_genomic_data(data: &BTreeMap<String, BTreeMap<String, f64>>) -> PreparedGenomicData {
        let mut prepared = PreparedGenomicData::default();
        for (study, genes) in data {
            for (gene, value) in genes {
                prepared
                    .genomic_data
                    .entry(gene.clone())
                    .or_default()
                    .insert(study.clone(), portal_value(*value));
            }
            prepared.visibility.insert(study.clone(), true);
        }
        prepared
    }

    /// Merge a tab separated table into the store under `group_id`.
    ///
    /// The first row names the categories after an ignored first cell; only
    /// the first few start out visible. Each following row is a gene and its
    /// values, up to the first empty line.
    pub fn parse_genomic_data(&mut self, text: &str, group_id: usize) {
        let (categories, rows) = parse_table(text);
        for (index, category) in categories.iter().enumerate() {
            self.visibility.insert(category.clone(), initial_visibility(index));
            self.groups.entry(group_id).or_default().push(category.clone());
        }
        for (gene, entries) in rows {
            self.genomic_data.entry(gene).or_default().extend(entries);
        }
        log::debug!(
            "overlay group {group_id}: {} categories, {} genes total",
            categories.len(),
            self.genomic_data.len()
        );
    }

    /// Parse, show and notify.
    pub fn add_genomic_data_locally<G: GraphSession + ?Sized>(&mut self, graph: &mut G, text: &str, group_id: usize) {
        self.parse_genomic_data(text, group_id);
        self.show_genomic_data(graph);
        self.notify_listeners();
    }

    /// Add study → gene → value data under `group_id`, then show and notify.
    pub fn add_portal_genomic_data<G: GraphSession + ?Sized>(
        &mut self,
        graph: &mut G,
        data: &BTreeMap<String, BTreeMap<String, f64>>,
        group_id: usize,
    ) {
        for (study, genes) in data {
            self.visibility.insert(study.clone(), true);
            self.groups.entry(group_id).or_default().push(study.clone());
            for (gene, value) in genes {
                self.genomic_data
                    .entry(gene.clone())
                    .or_default()
                    .insert(study.clone(), portal_value(*value));
            }
        }
        self.show_genomic_data(graph);
        self.notify_listeners();
    }

    /// Change the visibility of a known category; unknown ones are ignored.
    pub fn update_genomic_data_visibility(&mut self, category: &str, visible: bool) {
        if let Some(current) = self.visibility.get_mut(category) {
            *current = visible;
        }
    }

    /// Change the visibility of every category of a group.
    pub fn set_group_visibility(&mut self, group_id: usize, visible: bool) {
        let Some(categories) = self.groups.get(&group_id) else {
            return;
        };
        for category in categories {
            if let Some(current) = self.visibility.get_mut(category) {
                *current = visible;
            }
        }
    }

    pub fn count_visible_genomic_data_by_type(&self) -> usize {
        self.visibility.values().filter(|visible| **visible).count()
    }

    /// Badge for `gene` on a node `node_height` tall, or `None` when the gene has no data.
    pub fn generate_badge(&self, gene: &str, node_height: f64) -> Option<Badge> {
        let values = self.genomic_data.get(gene)?;
        let visible = self.count_visible_genomic_data_by_type();
        let width = required_width_for_genomic_data(visible);
        let strip_width = width - 10.0;
        let strip_x = width / 2.0 - strip_width / 2.0;
        let strip_y = node_height / 2.0 + CELL_STRIP_HEIGHT / 2.0 - 18.0;
        let cell_width = if visible == 0 { 0.0 } else { strip_width / visible as f64 };

        let cells = self
            .groups
            .values()
            .flatten()
            .filter(|category| self.visibility.get(*category).copied().unwrap_or(false))
            .enumerate()
            .map(|(index, category)| BadgeCell {
                x: strip_x + index as f64 * cell_width,
                y: strip_y,
                width: cell_width,
                height: CELL_STRIP_HEIGHT,
                fill: cell_color(values.get(category).map(String::as_str)),
            })
            .collect();

        Some(Badge {
            width,
            height: node_height,
            cells,
        })
    }

    /// Resize gene nodes and set their badges as background images.
    pub fn show_genomic_data<G: GraphSession + ?Sized>(&self, graph: &mut G) {
        let visible = self.count_visible_genomic_data_by_type();
        if visible < 1 {
            self.hide_genomic_data(graph);
            return;
        }
        let width = required_width_for_genomic_data(visible);
        let genes: Vec<(String, Option<Badge>)> = graph
            .node_ids()
            .iter()
            .filter_map(|id| graph.node(id))
            .filter(|node| is_gene(node))
            .map(|node| {
                let badge = gene_name(node).and_then(|name| self.generate_badge(name, node.height));
                (node.id.clone(), badge)
            })
            .collect();

        {
            let mut scoped = batch(graph);
            for (id, badge) in &genes {
                let shift = if badge.is_some() { LABEL_SHIFT } else { 0.0 };
                let image = badge.as_ref().map_or_else(|| EMPTY_DATA_URI.to_string(), Badge::data_uri);
                scoped.set_node_style(id, "width", width.to_string());
                scoped.set_node_style(id, "text-margin-y", shift.to_string());
                scoped.set_node_style(id, "background-fit", "contain".to_string());
                scoped.set_node_style(id, "background-image", image);
            }
        }
        log::info!("overlay shown on {} gene nodes ({visible} visible categories)", genes.len());
        graph.update_style();
    }

    /// Restore gene nodes to their plain look.
    pub fn hide_genomic_data<G: GraphSession + ?Sized>(&self, graph: &mut G) {
        let genes: Vec<String> = graph
            .node_ids()
            .into_iter()
            .filter(|id| graph.node(id).is_some_and(is_gene))
            .collect();
        {
            let mut scoped = batch(graph);
            for id in &genes {
                scoped.set_node_style(id, "text-margin-y", "0".to_string());
                scoped.set_node_style(id, "width", BASE_WIDTH.to_string());
                scoped.set_node_style(id, "background-image", EMPTY_DATA_URI.to_string());
            }
        }
        graph.update_style();
    }

    pub fn register_listener(&mut self, listener: Rc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns whether the listener was registered.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(registered, _)| *registered != id);
        self.listeners.len() != before
    }

    /// Notify listeners in registration order.
    pub fn notify_listeners(&self) {
        for (_, listener) in &self.listeners {
            listener.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use std::cell::RefCell;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Listener for Recorder {
        fn notify(&self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    fn gene(id: &str, name: &str) -> Node {
        Node::new(id, "macromolecule")
            .sized(60.0, 40.0)
            .with_data("type", "GENE")
            .with_data("name", name)
    }

    #[test]
    fn first_three_categories_start_visible() {
        let mut store = OverlayStore::new();
        store.parse_genomic_data("\tA\tB\tC\tD\ng\t1\t2\t3\t4\n", 0);
        let visible: Vec<bool> = ["A", "B", "C", "D"].iter().map(|key| store.visibility()[*key]).collect();
        assert_eq!(visible, vec![true, true, true, false]);
        assert_eq!(store.groups()[&0], vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn parsing_stops_at_first_empty_line() {
        let prepared = OverlayStore::prepare_genomic_data("\tA\ng1\t1\n\ng2\t2\n");
        assert!(prepared.genomic_data.contains_key("g1"));
        assert!(!prepared.genomic_data.contains_key("g2"));
    }

    #[test]
    fn extra_values_are_dropped() {
        let prepared = OverlayStore::prepare_genomic_data("\tA\ng1\t1\t2\t3\n");
        assert_eq!(prepared.genomic_data["g1"].len(), 1);
        assert_eq!(prepared.genomic_data["g1"]["A"], "1");
    }

    #[test]
    fn group_ids_are_sequential() {
        let mut store = OverlayStore::new();
        assert_eq!(store.empty_group_id(), 0);
        assert_eq!(store.empty_group_id(), 1);
        store.clear_all_genomic_data();
        assert_eq!(store.empty_group_id(), 0);
    }

    #[test]
    fn visibility_updates_ignore_unknown_categories() {
        let mut store = OverlayStore::new();
        store.parse_genomic_data("\tA\tB\n", 3);
        store.update_genomic_data_visibility("A", false);
        store.update_genomic_data_visibility("Z", true);
        assert_eq!(store.count_visible_genomic_data_by_type(), 1);
        assert!(!store.visibility().contains_key("Z"));
        store.set_group_visibility(3, false);
        assert_eq!(store.count_visible_genomic_data_by_type(), 0);
    }

    #[test]
    fn required_width_grows_past_three() {
        assert_eq!(required_width_for_genomic_data(0), 150.0);
        assert_eq!(required_width_for_genomic_data(3), 150.0);
        assert_eq!(required_width_for_genomic_data(5), 220.0);
    }

    #[test]
    fn colors_follow_sign_and_magnitude() {
        assert_eq!(cell_color(Some("0")), "rgb(255,255,255)");
        assert_eq!(cell_color(None), "rgb(210,210,210)");
        assert_eq!(cell_color(Some("n/a")), "rgb(210,210,210)");
        // |v| < 0.5 and |v| == 1 are treated as 2
        assert_eq!(cell_color(Some("0.3")), cell_color(Some("2")));
        assert_eq!(cell_color(Some("-1")), "rgb(225,225,255)");
        assert_eq!(cell_color(Some("25")), "rgb(255,88,88)");
    }

    #[test]
    fn badge_cells_follow_group_order_and_visibility() {
        let mut store = OverlayStore::new();
        store.parse_genomic_data("\tA\tB\nTP53\t10\t-20\n", 0);
        store.parse_genomic_data("\tC\nTP53\t5\n", 1);
        store.update_genomic_data_visibility("B", false);

        let badge = store.generate_badge("TP53", 40.0).unwrap();
        assert_eq!(badge.width, 150.0);
        assert_eq!(badge.height, 40.0);
        assert_eq!(badge.cells.len(), 2);
        assert_eq!(badge.cells[0].x, 5.0);
        assert_eq!(badge.cells[0].width, 70.0);
        assert_eq!(badge.cells[1].x, 75.0);
        assert_eq!(badge.cells[0].y, 14.5);
        assert_eq!(badge.cells[1].fill, cell_color(Some("5")));
        assert!(store.generate_badge("MDM2", 40.0).is_none());

        let svg = badge.to_svg();
        assert!(svg.starts_with(r#"<svg width="150" height="40" xmlns="http://www.w3.org/2000/svg">"#));
        assert!(badge.data_uri().starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn show_and_hide_style_gene_nodes() {
        let mut graph = MemoryGraph::new();
        graph.add_node(gene("n1", "TP53"));
        graph.add_node(gene("n2", "MDM2"));
        graph.add_node(Node::new("n3", "macromolecule").with_label("TP53"));
        let mut store = OverlayStore::new();
        store.add_genomic_data_locally(&mut graph, "\tA\tB\tC\tD\nTP53\t1\t2\t3\t4\n", 0);

        let with_data = graph.node("n1").unwrap();
        assert_eq!(with_data.style("width"), Some("150"));
        assert_eq!(with_data.style("text-margin-y"), Some("-15"));
        assert_eq!(with_data.style("background-fit"), Some("contain"));
        assert!(with_data.style("background-image").unwrap().contains("base64,"));
        let without_data = graph.node("n2").unwrap();
        assert_eq!(without_data.style("text-margin-y"), Some("0"));
        assert_eq!(without_data.style("background-image"), Some(EMPTY_DATA_URI));
        assert!(graph.node("n3").unwrap().style.is_empty());
        assert_eq!(graph.batch_depth(), 0);

        for category in ["A", "B", "C"] {
            store.update_genomic_data_visibility(category, false);
        }
        store.show_genomic_data(&mut graph);
        assert_eq!(graph.node("n1").unwrap().style("background-image"), Some(EMPTY_DATA_URI));
        assert_eq!(graph.style_updates(), 2);
    }

    #[test]
    fn listeners_are_notified_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = OverlayStore::new();
        let first = store.register_listener(Rc::new(Recorder { name: "first", log: log.clone() }));
        store.register_listener(Rc::new(Recorder { name: "second", log: log.clone() }));
        let mut graph = MemoryGraph::new();
        store.add_genomic_data_locally(&mut graph, "\tA\ng\t1\n", 0);
        assert!(store.unregister_listener(first));
        assert!(!store.unregister_listener(first));
        let mut studies = BTreeMap::new();
        studies.insert("study".to_string(), BTreeMap::from([("g".to_string(), 0.256)]));
        store.add_portal_genomic_data(&mut graph, &studies, 1);
        assert_eq!(*log.borrow(), vec!["first", "second", "second"]);
        assert_eq!(store.genomic_data()["g"]["study"], "0.26");
    }

    #[test]
    fn portal_data_is_regrouped_by_gene() {
        let data = BTreeMap::from([
            ("brca".to_string(), BTreeMap::from([("TP53".to_string(), 0.5), ("MDM2".to_string(), -1.234)])),
            ("gbm".to_string(), BTreeMap::from([("TP53".to_string(), 2.0)])),
        ]);
        let prepared = OverlayStore::prepare_portal_genomic_data(&data);
        assert_eq!(
            prepared.genomic_data["TP53"],
            BTreeMap::from([("brca".to_string(), "0.50".to_string()), ("gbm".to_string(), "2.00".to_string())])
        );
        assert_eq!(prepared.genomic_data["MDM2"], BTreeMap::from([("brca".to_string(), "-1.23".to_string())]));
        assert_eq!(
            prepared.visibility,
            BTreeMap::from([("brca".to_string(), true), ("gbm".to_string(), true)])
        );

        let mut graph = MemoryGraph::new();
        let mut store = OverlayStore::new();
        let group = store.empty_group_id();
        store.add_portal_genomic_data(&mut graph, &data, group);
        assert_eq!(store.genomic_data(), &prepared.genomic_data);
    }

    #[test]
    fn labelled_gene_products_are_tagged() {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("p", "macromolecule multimer").with_label("TP53"));
        graph.add_node(Node::new("r", "nucleic acid feature").with_label("MDM2"));
        graph.add_node(Node::new("x", "macromolecule"));
        graph.add_node(Node::new("c", "simple chemical").with_label("ATP"));
        assert_eq!(mark_gene_nodes(&mut graph), 2);
        assert!(is_gene(graph.node("p").unwrap()));
        assert!(!is_gene(graph.node("x").unwrap()));
        assert!(!is_gene(graph.node("c").unwrap()));
        assert_eq!(mark_gene_nodes(&mut graph), 0);
    }
}
