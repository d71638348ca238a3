//! SBGN-ML loading into a [`MemoryGraph`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use roxmltree::Document;

use crate::connectivity::Dialect;
use crate::error::{Error, Result};
use crate::graph::{AuxSide, AuxUnit, Edge, GraphSession, MemoryGraph, Node, Port};
use crate::style::default_size;

#[derive(Clone, Copy, Debug, PartialEq)]
struct BBox {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl BBox {
    fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// A loaded map and the dialect declared by its `language` attribute.
#[derive(Debug)]
pub struct SbgnDocument {
    pub graph: MemoryGraph,
    pub dialect: Option<Dialect>,
}

pub fn load_file(path: &Path) -> Result<SbgnDocument> {
    let xml = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&xml)
}

/// Parse SBGN-ML text.
///
/// Node positions are bbox centers and port offsets become percentages of
/// the node size. State variables and units of information are attached to
/// their parent glyph instead of becoming nodes. Arcs that reference a port
/// are attached to the port's node and bound to the port.
pub fn parse_str(xml: &str) -> Result<SbgnDocument> {
    let doc = Document::parse(xml)?;
    let map_node = doc
        .descendants()
        .find(|node| node.has_tag_name("map"))
        .ok_or(Error::MissingMap)?;
    let dialect = map_node
        .attribute("language")
        .and_then(|language| language.parse::<Dialect>().ok());

    let mut graph = MemoryGraph::new();
    let mut port_owners = HashMap::new();
    for glyph in map_node.children().filter(|node| node.has_tag_name("glyph")) {
        parse_glyph_node(&glyph, None, &mut graph, &mut port_owners);
    }

    for arc in map_node.descendants().filter(|node| node.has_tag_name("arc")) {
        let id = arc.attribute("id").unwrap_or_default().to_string();
        let class = arc.attribute("class").unwrap_or_default().to_string();
        let source_ref = arc.attribute("source").ok_or_else(|| Error::InvalidArc {
            id: id.clone(),
            end: "source",
        })?;
        let target_ref = arc.attribute("target").ok_or_else(|| Error::InvalidArc {
            id: id.clone(),
            end: "target",
        })?;

        let resolve = |reference: &str| -> Option<(String, Option<String>)> {
            if let Some(owner) = port_owners.get(reference) {
                Some((owner.clone(), Some(reference.to_string())))
            } else if graph.node(reference).is_some() {
                Some((reference.to_string(), None))
            } else {
                None
            }
        };
        let (Some((source, port_source)), Some((target, port_target))) =
            (resolve(source_ref), resolve(target_ref))
        else {
            log::warn!("skipping arc {id}: {source_ref} -> {target_ref} does not join two glyphs");
            continue;
        };

        let mut edge = Edge::new(id, class, source, target);
        edge.port_source = port_source;
        edge.port_target = port_target;
        graph.add_edge(edge);
    }

    log::debug!(
        "loaded {} nodes and {} edges ({})",
        graph.nodes().len(),
        graph.edges().len(),
        dialect.map_or_else(|| "unknown language".to_string(), |dialect| dialect.to_string())
    );
    Ok(SbgnDocument { graph, dialect })
}

fn parse_glyph_node(
    glyph: &roxmltree::Node,
    parent: Option<(&str, Option<BBox>)>,
    graph: &mut MemoryGraph,
    port_owners: &mut HashMap<String, String>,
) {
    let id = glyph.attribute("id").unwrap_or_default().to_string();
    let class = glyph.attribute("class").unwrap_or_default().to_string();
    let label = glyph
        .children()
        .find(|node| node.has_tag_name("label"))
        .and_then(|node| node.attribute("text"))
        .map(|text| text.replace('\r', ""));
    let bbox = glyph
        .children()
        .find(|node| node.has_tag_name("bbox"))
        .and_then(|node| parse_bbox(&node));

    if let Some((parent_id, parent_bbox)) = parent {
        let side = match (parent_bbox, bbox) {
            (Some(outer), Some(inner)) => aux_side(&outer, &inner),
            _ => AuxSide::Top,
        };
        let unit = match class.as_str() {
            "state variable" => {
                let state = glyph.children().find(|node| node.has_tag_name("state"));
                Some(AuxUnit::state_variable(
                    state.and_then(|node| node.attribute("value")),
                    state.and_then(|node| node.attribute("variable")),
                ))
            }
            "unit of information" => Some(AuxUnit::unit_of_information(label.as_deref())),
            _ => None,
        };
        if let Some(unit) = unit {
            if let Some(node) = graph.node_mut(parent_id) {
                node.aux_units.push(unit.on(side));
            }
            return;
        }
    }

    let (width, height) = match bbox {
        Some(bbox) => (bbox.w, bbox.h),
        None => default_size(&class).unwrap_or((0.0, 0.0)),
    };
    let (cx, cy) = bbox.map_or((0.0, 0.0), |bbox| bbox.center());

    let ports = glyph
        .children()
        .filter(|node| node.has_tag_name("port"))
        .filter_map(|node| {
            let port_id = node.attribute("id")?.to_string();
            let x = parse_f64(node.attribute("x"))?;
            let y = parse_f64(node.attribute("y"))?;
            Some(Port {
                id: port_id,
                x: percent_offset(x - cx, width),
                y: percent_offset(y - cy, height),
            })
        })
        .collect::<Vec<_>>();
    for port in &ports {
        port_owners.insert(port.id.clone(), id.clone());
    }

    let mut node = Node::new(id.clone(), class).at(cx, cy).sized(width, height).with_ports(ports);
    node.label = label;
    node.parent = parent
        .map(|(parent_id, _)| parent_id.to_string())
        .or_else(|| glyph.attribute("compartmentRef").map(str::to_string));
    if glyph.children().any(|child| child.has_tag_name("clone")) {
        node.data.insert("clonemarker".to_string(), "true".to_string());
    }
    graph.add_node(node);

    for child in glyph.children().filter(|node| node.has_tag_name("glyph")) {
        parse_glyph_node(&child, Some((id.as_str(), bbox)), graph, port_owners);
    }
}

fn percent_offset(delta: f64, size: f64) -> f64 {
    if size == 0.0 {
        0.0
    } else {
        delta * 100.0 / size
    }
}

/// Border of `outer` closest to the center of `inner`.
fn aux_side(outer: &BBox, inner: &BBox) -> AuxSide {
    let (x, y) = inner.center();
    [
        (AuxSide::Top, (y - outer.y).abs()),
        (AuxSide::Bottom, (y - (outer.y + outer.h)).abs()),
        (AuxSide::Left, (x - outer.x).abs()),
        (AuxSide::Right, (x - (outer.x + outer.w)).abs()),
    ]
    .into_iter()
    .min_by(|a, b| a.1.total_cmp(&b.1))
    .map_or(AuxSide::Top, |(side, _)| side)
}

fn parse_bbox(node: &roxmltree::Node) -> Option<BBox> {
    Some(BBox {
        x: parse_f64(node.attribute("x"))?,
        y: parse_f64(node.attribute("y"))?,
        w: parse_f64(node.attribute("w"))?,
        h: parse_f64(node.attribute("h"))?,
    })
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AuxUnitKind, Point};

    const REACTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbgn xmlns="http://sbgn.org/libsbgn/0.2">
  <map language="process description">
    <glyph id="comp" class="compartment">
      <label text="cytosol"/>
      <bbox x="0" y="0" w="400" h="200"/>
    </glyph>
    <glyph id="glc" class="simple chemical" compartmentRef="comp">
      <label text="glucose"/>
      <bbox x="35" y="85" w="30" h="30"/>
      <clone/>
    </glyph>
    <glyph id="hk" class="macromolecule" compartmentRef="comp">
      <label text="HK&#13;1"/>
      <bbox x="170" y="10" w="60" h="30"/>
      <glyph id="hk.sv" class="state variable">
        <state value="P" variable="S12"/>
        <bbox x="180" y="0" w="20" h="10"/>
      </glyph>
      <glyph id="hk.ui" class="unit of information">
        <label text="mt:prot"/>
        <bbox x="190" y="35" w="20" h="10"/>
      </glyph>
    </glyph>
    <glyph id="g6p" class="simple chemical" compartmentRef="comp">
      <label text="G6P"/>
      <bbox x="335" y="85" w="30" h="30"/>
    </glyph>
    <glyph id="pr" class="process">
      <bbox x="190" y="90" w="20" h="20"/>
      <port id="pr.1" x="180" y="100"/>
      <port id="pr.2" x="220" y="100"/>
    </glyph>
    <arc id="a1" class="consumption" source="glc" target="pr.1">
      <start x="65" y="100"/><end x="180" y="100"/>
    </arc>
    <arc id="a2" class="production" source="pr.2" target="g6p">
      <start x="220" y="100"/><end x="335" y="100"/>
    </arc>
    <arc id="a3" class="catalysis" source="hk" target="pr">
      <start x="200" y="40"/><end x="200" y="90"/>
    </arc>
  </map>
</sbgn>"#;

    #[test]
    fn glyphs_become_centered_nodes() {
        let doc = parse_str(REACTION).unwrap();
        assert_eq!(doc.dialect, Some(Dialect::ProcessDescription));
        let glucose = doc.graph.node("glc").unwrap();
        assert_eq!(glucose.position, Point::new(50.0, 100.0));
        assert_eq!((glucose.width, glucose.height), (30.0, 30.0));
        assert_eq!(glucose.parent.as_deref(), Some("comp"));
        assert!(glucose.has_clone_marker());
        assert_eq!(doc.graph.node("hk").unwrap().label(), Some("HK1"));
        assert!(doc.graph.node("hk.sv").is_none());
    }

    #[test]
    fn aux_units_attach_to_the_nearest_side() {
        let doc = parse_str(REACTION).unwrap();
        let units = &doc.graph.node("hk").unwrap().aux_units;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].side, AuxSide::Top);
        assert_eq!(
            units[0].kind,
            AuxUnitKind::StateVariable {
                value: Some("P".into()),
                variable: Some("S12".into())
            }
        );
        assert_eq!(units[1].side, AuxSide::Bottom);
    }

    #[test]
    fn port_references_resolve_to_their_node() {
        let doc = parse_str(REACTION).unwrap();
        let process = doc.graph.node("pr").unwrap();
        assert_eq!((process.ports[0].x, process.ports[0].y), (-100.0, 0.0));
        assert_eq!(process.ports[1].x, 100.0);
        let consumption = doc.graph.edge("a1").unwrap();
        assert_eq!(consumption.target, "pr");
        assert_eq!(consumption.port_target.as_deref(), Some("pr.1"));
        let production = doc.graph.edge("a2").unwrap();
        assert_eq!(production.source, "pr");
        assert_eq!(production.port_source.as_deref(), Some("pr.2"));
        assert_eq!(doc.graph.edge("a3").unwrap().port_target, None);
        assert_eq!(doc.graph.degree("pr"), 3);
    }

    #[test]
    fn missing_map_and_arc_ends_are_errors() {
        assert!(matches!(parse_str("<sbgn/>"), Err(Error::MissingMap)));
        let broken = r#"<sbgn><map><arc id="x" class="production" target="a"/></map></sbgn>"#;
        assert!(matches!(
            parse_str(broken),
            Err(Error::InvalidArc { end: "source", .. })
        ));
        assert!(matches!(parse_str("<sbgn>"), Err(Error::Xml(_))));
    }

    #[test]
    fn dangling_arcs_are_skipped() {
        let xml = r#"<sbgn><map language="activity flow">
            <glyph id="a" class="BA plain"><bbox x="0" y="0" w="60" h="30"/></glyph>
            <arc id="x" class="positive influence" source="a" target="ghost"/>
        </map></sbgn>"#;
        let doc = parse_str(xml).unwrap();
        assert_eq!(doc.dialect, Some(Dialect::ActivityFlow));
        assert!(doc.graph.edges().is_empty());
    }
}
