use std::collections::BTreeMap;

use sbgn_editor::overlay::{cell_color, mark_gene_nodes, EMPTY_DATA_URI};
use sbgn_editor::ports::{ports_ordering, set_ports_ordering};
use sbgn_editor::sbgnml::parse_str;
use sbgn_editor::style::{element_content, label_text_size, ApproximateMeasure};
use sbgn_editor::{
    change_ports_orientation_after_layout, validate_arc_in_graph, Dialect, GraphSession, Options,
    OverlayStore, PortOrdering, Validation,
};

// Drawn top to bottom with the product above the process.
const GLYCOLYSIS_STEP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbgn xmlns="http://sbgn.org/libsbgn/0.3">
  <map id="m" language="process description">
    <glyph id="glc" class="simple chemical">
      <label text="glucose"/>
      <bbox x="185" y="285" w="30" h="30"/>
    </glyph>
    <glyph id="g6p" class="simple chemical">
      <label text="glucose-6P"/>
      <bbox x="185" y="-15" w="30" h="30"/>
    </glyph>
    <glyph id="hk" class="macromolecule">
      <label text="HK1"/>
      <bbox x="270" y="85" w="60" h="30"/>
    </glyph>
    <glyph id="pr" class="process">
      <bbox x="190" y="90" w="20" h="20"/>
      <port id="pr.1" x="200" y="86"/>
      <port id="pr.2" x="200" y="114"/>
    </glyph>
    <arc id="a1" class="consumption" source="glc" target="pr.2"/>
    <arc id="a2" class="production" source="pr.1" target="g6p"/>
    <arc id="a3" class="catalysis" source="hk" target="pr"/>
  </map>
</sbgn>"#;

#[test]
fn loaded_ports_report_their_ordering() {
    let document = parse_str(GLYCOLYSIS_STEP).unwrap();
    let process = document.graph.node("pr").unwrap();
    assert_eq!((process.ports[0].x, process.ports[0].y), (0.0, -70.0));
    assert_eq!(ports_ordering(&document.graph, "pr"), PortOrdering::BottomToTop);
}

#[test]
fn orientation_follows_the_drawing() {
    let mut document = parse_str(GLYCOLYSIS_STEP).unwrap();
    let changes = change_ports_orientation_after_layout(&mut document.graph, &Options::default());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].previous, PortOrdering::BottomToTop);
    assert_eq!(changes[0].ordering, PortOrdering::BottomToTop);

    // Flip the drawing: the substrate now sits above the process.
    {
        let graph = &mut document.graph;
        let (glucose, product) = (graph.position("glc").unwrap(), graph.position("g6p").unwrap());
        graph.set_position("glc", product);
        graph.set_position("g6p", glucose);
    }
    let changes = change_ports_orientation_after_layout(&mut document.graph, &Options::default());
    assert_eq!(changes[0].ordering, PortOrdering::TopToBottom);
    let ports = &document.graph.node("pr").unwrap().ports;
    let input = ports.iter().find(|port| port.id == "pr.2").unwrap();
    assert_eq!((input.x, input.y), (0.0, -70.0));
}

#[test]
fn port_removal_rebinds_edges_to_the_node() {
    let mut document = parse_str(GLYCOLYSIS_STEP).unwrap();
    set_ports_ordering(&mut document.graph, &["pr"], PortOrdering::None, None);
    let graph = &document.graph;
    assert!(graph.node("pr").unwrap().ports.is_empty());
    assert_eq!(graph.edge("a1").unwrap().port_target.as_deref(), Some("pr"));
    assert_eq!(graph.edge("a2").unwrap().port_source.as_deref(), Some("pr"));
    assert_eq!(ports_ordering(graph, "pr"), PortOrdering::None);
}

#[test]
fn second_catalysis_exceeds_the_process_limit() {
    let document = parse_str(GLYCOLYSIS_STEP).unwrap();
    let dialect = document.dialect.unwrap();
    assert_eq!(dialect, Dialect::ProcessDescription);
    assert!(matches!(
        validate_arc_in_graph(&document.graph, dialect, "catalysis", "hk", "pr"),
        Validation::ExceedsLimit { .. }
    ));
    assert_eq!(
        validate_arc_in_graph(&document.graph, dialect, "inhibition", "hk", "pr"),
        Validation::Valid
    );
}

#[test]
fn labels_of_loaded_glyphs() {
    let document = parse_str(GLYCOLYSIS_STEP).unwrap();
    let options = Options {
        fit_labels_to_nodes: true,
        ..Options::default()
    };
    let product = document.graph.node("g6p").unwrap();
    let measure = ApproximateMeasure::default();
    let label = element_content(&document.graph, product, &options, &measure);
    assert!(label.ends_with(".."));
    assert!(label.len() < "glucose-6P".len());
    // ports at 70% shrink the process coefficient of 1.5 by 70 / 50
    let process = document.graph.node("pr").unwrap();
    assert_eq!(label_text_size(process, &options), 8.0 * (1.5 / (70.0 / 50.0)));
}

#[test]
fn overlay_table_parses_genes_and_categories() {
    let mut store = OverlayStore::new();
    let group = store.empty_group_id();
    store.parse_genomic_data("\tA\tB\ngene1\t10\t-20\n", group);

    let expected = BTreeMap::from([(
        "gene1".to_string(),
        BTreeMap::from([("A".to_string(), "10".to_string()), ("B".to_string(), "-20".to_string())]),
    )]);
    assert_eq!(store.genomic_data(), &expected);
    assert_eq!(
        store.visibility(),
        &BTreeMap::from([("A".to_string(), true), ("B".to_string(), true)])
    );
}

#[test]
fn overlay_table_is_shown_on_gene_nodes() {
    let mut document = parse_str(GLYCOLYSIS_STEP).unwrap();
    assert_eq!(mark_gene_nodes(&mut document.graph), 1);

    let mut store = OverlayStore::new();
    let group = store.empty_group_id();
    store.add_genomic_data_locally(&mut document.graph, "\tA\tB\nHK1\t10\t-20\n", group);
    assert_eq!(
        store.visibility(),
        &BTreeMap::from([("A".to_string(), true), ("B".to_string(), true)])
    );

    let hexokinase = document.graph.node("hk").unwrap();
    assert_ne!(hexokinase.style("background-image"), Some(EMPTY_DATA_URI));
    let badge = store.generate_badge("HK1", hexokinase.height).unwrap();
    assert_eq!(badge.cells[0].fill, cell_color(Some("10")));
    assert!(badge.cells[1].fill.ends_with(",255)"));
}
