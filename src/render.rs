//! Cairo rendering of a graph session to PNG and SVG.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cairo::{Context as CairoContext, Format, ImageSurface, LineCap, SvgSurface};
use pango::{Alignment, FontDescription};
use pangocairo::functions as pangocairo;

use crate::classes::{is_logical_operator, pure_class};
use crate::error::{Error, Result};
use crate::graph::{AuxSide, AuxUnit, AuxUnitKind, Edge, GraphSession, Node, Point};
use crate::options::Options;
use crate::overlay::{gene_name, is_gene, OverlayStore};
use crate::ports::port_position;
use crate::style::{
    arrow_shape, default_properties, drawn_label_size, element_content, line_style, node_shape,
    ElementDefaults, TextMeasure, DEFAULT_FONT, DEFAULT_INFOBOX,
};

const DEFAULT_LINE_WIDTH: f64 = 1.25;
const TEXT_OUTLINE_WIDTH: f64 = 0.75;
const ARROW_SIZE: f64 = 10.0;
const BAR_LENGTH: f64 = 14.0;
const BAR_OFFSET: f64 = 3.0;
const CATALYSIS_OVERLAP_RATIO: f64 = 0.5;
const AUX_HEIGHT: f64 = 12.0;
const AUX_MIN_WIDTH: f64 = 12.0;
const AUX_TEXT_PADDING: f64 = 6.0;
const BORDER_COLOR: (f64, f64, f64) = (0x55 as f64 / 255.0, 0x55 as f64 / 255.0, 0x55 as f64 / 255.0);
const CELL_BORDER_COLOR: (f64, f64, f64) = (0.0, 0.0, 0.0);
const AUX_LINE_COLOR: (f64, f64, f64) = (0x6A as f64 / 255.0, 0x6A as f64 / 255.0, 0x6A as f64 / 255.0);
const CLONE_MARKER_HEIGHT_RATIO: f64 = 0.25;
const CLONE_MARKER_FILL_COLOR: (f64, f64, f64) = (0.82, 0.82, 0.82);

/// Canvas settings independent of the editor options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    pub padding: f64,
    pub scale: f64,
    pub clone_markers: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            padding: 10.0,
            scale: 1.0,
            clone_markers: true,
        }
    }
}

/// Text measured with Pango, matching what the renderer draws.
pub struct PangoMeasure {
    ctx: CairoContext,
}

impl PangoMeasure {
    pub fn new() -> Result<Self> {
        let surface = ImageSurface::create(Format::ARgb32, 1, 1)?;
        Ok(Self {
            ctx: CairoContext::new(&surface)?,
        })
    }

    fn from_context(ctx: &CairoContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl TextMeasure for PangoMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let layout = text_layout(&self.ctx, text, font_size);
        let (width, _) = layout.pixel_size();
        width as f64
    }
}

#[derive(Clone, Copy, Debug)]
struct PixelRect {
    x0: f64,
    y0: f64,
    width: f64,
    height: f64,
    center: Point,
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

#[derive(Clone, Copy, Debug)]
struct Transform {
    min_x: f64,
    min_y: f64,
    scale: f64,
}

impl Transform {
    fn map_point(&self, point: Point) -> Point {
        Point::new((point.x - self.min_x) * self.scale, (point.y - self.min_y) * self.scale)
    }

    fn scale_scalar(&self, value: f64) -> f64 {
        value * self.scale
    }

    fn node_rect(&self, node: &Node) -> PixelRect {
        let center = self.map_point(node.position);
        let width = self.scale_scalar(rendered_width(node));
        let height = self.scale_scalar(node.height);
        PixelRect {
            x0: center.x - width / 2.0,
            y0: center.y - height / 2.0,
            width,
            height,
            center,
        }
    }
}

/// Node width, including a width override set through its style.
fn rendered_width(node: &Node) -> f64 {
    node.style("width")
        .and_then(|width| width.parse::<f64>().ok())
        .unwrap_or(node.width)
}

pub fn render_png<G: GraphSession + ?Sized>(
    graph: &G,
    options: &Options,
    overlay: Option<&OverlayStore>,
    settings: &RenderSettings,
    output: &Path,
) -> Result<()> {
    let (transform, width, height) = transform_with_padding(compute_bounds(graph)?, settings);
    let (surface, ctx) = create_png_surface(width.ceil() as i32, height.ceil() as i32)?;
    render_graph(&ctx, &transform, graph, options, overlay, settings)?;
    drop(ctx);

    let mut file = fs::File::create(output).map_err(|source| Error::Io {
        path: output.display().to_string(),
        source,
    })?;
    surface.write_to_png(&mut file)?;
    log::info!("wrote {} ({width:.0}x{height:.0})", output.display());
    Ok(())
}

pub fn render_svg<G: GraphSession + ?Sized>(
    graph: &G,
    options: &Options,
    overlay: Option<&OverlayStore>,
    settings: &RenderSettings,
    output: &Path,
) -> Result<()> {
    let (transform, width, height) = transform_with_padding(compute_bounds(graph)?, settings);
    let surface = SvgSurface::new(width, height, Some(output))?;
    let ctx = CairoContext::new(&surface)?;
    setup_context(&ctx)?;
    render_graph(&ctx, &transform, graph, options, overlay, settings)?;
    drop(ctx);
    surface.finish();
    log::info!("wrote {}", output.display());
    Ok(())
}

fn setup_context(ctx: &CairoContext) -> Result<()> {
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.paint()?;
    set_color(ctx, BORDER_COLOR);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    ctx.set_line_cap(LineCap::Square);
    Ok(())
}

fn create_png_surface(width: i32, height: i32) -> Result<(ImageSurface, CairoContext)> {
    let surface = ImageSurface::create(Format::ARgb32, width.max(1), height.max(1))?;
    let ctx = CairoContext::new(&surface)?;
    setup_context(&ctx)?;
    Ok((surface, ctx))
}

fn compute_bounds<G: GraphSession + ?Sized>(graph: &G) -> Result<Bounds> {
    let mut bounds: Option<Bounds> = None;
    let mut include = |x: f64, y: f64| {
        let b = bounds.get_or_insert(Bounds {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        });
        b.min_x = b.min_x.min(x);
        b.max_x = b.max_x.max(x);
        b.min_y = b.min_y.min(y);
        b.max_y = b.max_y.max(y);
    };
    for node in graph.node_ids().iter().filter_map(|id| graph.node(id)) {
        let half_width = rendered_width(node) / 2.0;
        let half_height = node.height / 2.0;
        include(node.position.x - half_width, node.position.y - half_height);
        include(node.position.x + half_width, node.position.y + half_height);
        for port in &node.ports {
            let point = port_position(node, port);
            include(point.x, point.y);
        }
    }
    bounds.ok_or(Error::EmptyGraph)
}

/// Padded transform and canvas size for the data bounds.
fn transform_with_padding(bounds: Bounds, settings: &RenderSettings) -> (Transform, f64, f64) {
    let scale = if settings.scale > 0.0 { settings.scale } else { 1.0 };
    let min_x = bounds.min_x - settings.padding;
    let min_y = bounds.min_y - settings.padding;
    let width = ((bounds.max_x + settings.padding - min_x) * scale).max(1.0);
    let height = ((bounds.max_y + settings.padding - min_y) * scale).max(1.0);
    (Transform { min_x, min_y, scale }, width, height)
}

fn depth_of<G: GraphSession + ?Sized>(graph: &G, node_id: &str, limit: usize) -> usize {
    let mut depth = 0;
    let mut current = graph.parent_of(node_id);
    while let Some(parent) = current {
        depth += 1;
        if depth >= limit {
            break;
        }
        current = graph.parent_of(parent);
    }
    depth
}

/// Compounds outermost first, then edges, then every other node on top.
fn render_graph<G: GraphSession + ?Sized>(
    ctx: &CairoContext,
    transform: &Transform,
    graph: &G,
    options: &Options,
    overlay: Option<&OverlayStore>,
    settings: &RenderSettings,
) -> Result<()> {
    let measure = PangoMeasure::from_context(ctx);
    let nodes: Vec<&Node> = graph.node_ids().iter().filter_map(|id| graph.node(id)).collect();
    let limit = nodes.len();
    let depths: HashMap<&str, usize> = nodes
        .iter()
        .map(|node| (node.id.as_str(), depth_of(graph, &node.id, limit)))
        .collect();
    let (mut compounds, leaves): (Vec<&Node>, Vec<&Node>) =
        nodes.iter().copied().partition(|node| !graph.children(&node.id).is_empty());
    compounds.sort_by_key(|node| depths.get(node.id.as_str()).copied().unwrap_or_default());

    for node in compounds {
        draw_node(ctx, transform, graph, node, options, overlay, settings, &measure)?;
    }
    for edge in graph.edge_ids().iter().filter_map(|id| graph.edge(id)) {
        draw_edge(ctx, transform, graph, edge, options)?;
    }
    for node in leaves {
        draw_node(ctx, transform, graph, node, options, overlay, settings, &measure)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_node<G: GraphSession + ?Sized>(
    ctx: &CairoContext,
    transform: &Transform,
    graph: &G,
    node: &Node,
    options: &Options,
    overlay: Option<&OverlayStore>,
    settings: &RenderSettings,
    measure: &PangoMeasure,
) -> Result<()> {
    if node.height <= 0.0 || rendered_width(node) <= 0.0 {
        return Ok(());
    }
    let rect = transform.node_rect(node);
    let class = pure_class(&node.class);
    let shape = node_shape(node, options);
    let defaults = match default_properties(&node.class) {
        Some(ElementDefaults::Node(defaults)) => Some(defaults),
        _ => None,
    };
    let fill = node
        .style("background-color")
        .or(defaults.map(|defaults| defaults.background_color))
        .and_then(parse_color)
        .unwrap_or((1.0, 1.0, 1.0));
    let border_width = transform.scale_scalar(defaults.map_or(DEFAULT_LINE_WIDTH, |defaults| defaults.border_width));

    if shape == "polygon" && node.ports.len() == 2 {
        draw_port_connectors(ctx, transform, node, rect)?;
    }

    let path_fn = |ctx: &CairoContext, rect: PixelRect| -> Result<()> {
        match shape {
            "compartment" => path_round_rect(ctx, rect, rect.width.min(rect.height) * 0.1),
            "macromolecule" | "biological activity" | "protein" => path_round_rect(ctx, rect, rect.height * 0.2),
            "nucleic acid feature" => path_bottom_round_rect(ctx, rect, rect.height * 0.25),
            "complex" => path_cut_rect(ctx, rect, rect.width.min(rect.height) * 0.2),
            "hexagon" => path_hexagon(ctx, rect),
            "rectangle" => path_rect(ctx, rect),
            "polygon" => match class {
                "perturbing agent" => path_concave_hexagon(ctx, rect),
                "tag" => path_tag(ctx, rect),
                class if is_logical_operator(class) || matches!(class, "association" | "dissociation") => {
                    path_ellipse(ctx, rect)
                }
                _ => path_rect(ctx, rect),
            },
            _ => path_ellipse(ctx, rect),
        }
    };
    let has_clone = settings.clone_markers && node.has_clone_marker();
    draw_shape_with_clone(ctx, rect, has_clone, border_width, fill, path_fn)?;

    match class {
        "source and sink" => {
            ctx.move_to(rect.x0 + rect.width, rect.y0);
            ctx.line_to(rect.x0, rect.y0 + rect.height);
            ctx.stroke()?;
        }
        "dissociation" => {
            let inner = PixelRect {
                x0: rect.center.x - rect.width * 0.3,
                y0: rect.center.y - rect.height * 0.3,
                width: rect.width * 0.6,
                height: rect.height * 0.6,
                center: rect.center,
            };
            path_ellipse(ctx, inner)?;
            ctx.stroke()?;
        }
        _ => {}
    }

    if let Some(overlay) = overlay.filter(|_| is_gene(node)) {
        if let Some(badge) = gene_name(node).and_then(|gene| overlay.generate_badge(gene, node.height)) {
            let origin_x = rect.center.x - transform.scale_scalar(badge.width) / 2.0;
            ctx.set_line_width(1.0);
            for cell in &badge.cells {
                ctx.rectangle(
                    origin_x + transform.scale_scalar(cell.x),
                    rect.y0 + transform.scale_scalar(cell.y),
                    transform.scale_scalar(cell.width),
                    transform.scale_scalar(cell.height),
                );
                set_color(ctx, parse_color(&cell.fill).unwrap_or((1.0, 1.0, 1.0)));
                ctx.fill_preserve()?;
                set_color(ctx, CELL_BORDER_COLOR);
                ctx.stroke()?;
            }
            set_color(ctx, BORDER_COLOR);
            ctx.set_line_width(DEFAULT_LINE_WIDTH);
        }
    }

    let label = element_content(graph, node, options, measure);
    let font_px = transform.scale_scalar(drawn_label_size(node, options));
    if matches!(class, "compartment" | "complex" | "submap") && !graph.children(&node.id).is_empty() {
        draw_text_bottom_centered(ctx, rect, &label, font_px)?;
    } else {
        let shift = node
            .style("text-margin-y")
            .and_then(|shift| shift.parse::<f64>().ok())
            .unwrap_or(0.0);
        let center = Point::new(rect.center.x, rect.center.y + transform.scale_scalar(shift));
        draw_text_centered(ctx, center, &label, font_px)?;
    }

    draw_aux_units(ctx, transform, node, rect, measure)
}

/// Lines from the node border out to each port.
fn draw_port_connectors(ctx: &CairoContext, transform: &Transform, node: &Node, rect: PixelRect) -> Result<()> {
    for port in &node.ports {
        let end = transform.map_point(port_position(node, port));
        let start = if port.x != 0.0 {
            Point::new(rect.center.x + port.x.signum() * rect.width / 2.0, rect.center.y)
        } else {
            Point::new(rect.center.x, rect.center.y + port.y.signum() * rect.height / 2.0)
        };
        ctx.move_to(start.x, start.y);
        ctx.line_to(end.x, end.y);
        ctx.stroke()?;
    }
    Ok(())
}

fn aux_text(unit: &AuxUnit) -> String {
    match &unit.kind {
        AuxUnitKind::StateVariable { value, variable } => match (value.as_deref(), variable.as_deref()) {
            (Some(value), Some(variable)) if !variable.is_empty() => format!("{value}@{variable}"),
            (Some(value), _) => value.to_string(),
            (None, Some(variable)) if !variable.is_empty() => format!("@{variable}"),
            _ => String::new(),
        },
        AuxUnitKind::UnitOfInformation { label } => label.clone().unwrap_or_default(),
    }
}

/// Units spread evenly along their side of the node border.
fn draw_aux_units(
    ctx: &CairoContext,
    transform: &Transform,
    node: &Node,
    rect: PixelRect,
    measure: &PangoMeasure,
) -> Result<()> {
    let font_size = DEFAULT_INFOBOX.font.size;
    let height = transform.scale_scalar(AUX_HEIGHT);
    for side in [AuxSide::Top, AuxSide::Bottom, AuxSide::Left, AuxSide::Right] {
        let units: Vec<&AuxUnit> = node.aux_units.iter().filter(|unit| unit.side == side).collect();
        let count = units.len() as f64;
        for (index, unit) in units.iter().enumerate() {
            let text = aux_text(unit);
            let width = transform.scale_scalar(
                (measure.text_width(&text, font_size) + AUX_TEXT_PADDING).max(AUX_MIN_WIDTH),
            );
            let fraction = (index as f64 + 1.0) / (count + 1.0);
            let center = match side {
                AuxSide::Top => Point::new(rect.x0 + rect.width * fraction, rect.y0),
                AuxSide::Bottom => Point::new(rect.x0 + rect.width * fraction, rect.y0 + rect.height),
                AuxSide::Left => Point::new(rect.x0, rect.y0 + rect.height * fraction),
                AuxSide::Right => Point::new(rect.x0 + rect.width, rect.y0 + rect.height * fraction),
            };
            let unit_rect = PixelRect {
                x0: center.x - width / 2.0,
                y0: center.y - height / 2.0,
                width,
                height,
                center,
            };
            match unit.kind {
                AuxUnitKind::StateVariable { .. } => path_round_rect(ctx, unit_rect, height / 2.0)?,
                AuxUnitKind::UnitOfInformation { .. } => path_rect(ctx, unit_rect)?,
            }
            ctx.set_source_rgb(1.0, 1.0, 1.0);
            ctx.fill_preserve()?;
            set_color(ctx, AUX_LINE_COLOR);
            ctx.set_line_width(transform.scale_scalar(1.0));
            ctx.stroke()?;
            draw_text_centered(ctx, center, &text, transform.scale_scalar(font_size))?;
        }
    }
    set_color(ctx, BORDER_COLOR);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    Ok(())
}

/// Where an edge meets `node`: its bound port, or the border of the node box
/// on the line towards `toward`.
fn edge_end<G: GraphSession + ?Sized>(
    graph: &G,
    node_id: &str,
    port_id: Option<&str>,
    toward: Point,
    ports_enabled: bool,
) -> Option<Point> {
    let node = graph.node(node_id)?;
    if let Some(port) = port_id
        .filter(|_| ports_enabled)
        .and_then(|port_id| node.ports.iter().find(|port| port.id == port_id))
    {
        return Some(port_position(node, port));
    }
    let center = node.position;
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    if dx == 0.0 && dy == 0.0 {
        return Some(center);
    }
    let half_width = rendered_width(node) / 2.0;
    let half_height = node.height / 2.0;
    let tx = if dx == 0.0 { f64::INFINITY } else { half_width / dx.abs() };
    let ty = if dy == 0.0 { f64::INFINITY } else { half_height / dy.abs() };
    let t = tx.min(ty).min(1.0);
    Some(Point::new(center.x + dx * t, center.y + dy * t))
}

fn draw_edge<G: GraphSession + ?Sized>(
    ctx: &CairoContext,
    transform: &Transform,
    graph: &G,
    edge: &Edge,
    options: &Options,
) -> Result<()> {
    let (Some(source_center), Some(target_center)) = (graph.position(&edge.source), graph.position(&edge.target))
    else {
        return Ok(());
    };
    let ports_enabled = options.ports_enabled;
    let (Some(start), Some(end)) = (
        edge_end(graph, &edge.source, edge.port_source.as_deref(), target_center, ports_enabled),
        edge_end(graph, &edge.target, edge.port_target.as_deref(), source_center, ports_enabled),
    ) else {
        return Ok(());
    };
    let start = transform.map_point(start);
    let end = transform.map_point(end);

    let width = match default_properties(&edge.class) {
        Some(ElementDefaults::Edge(defaults)) => defaults.width,
        _ => DEFAULT_LINE_WIDTH,
    };
    ctx.set_line_width(transform.scale_scalar(width));
    if line_style(&edge.class) == "dashed" {
        ctx.set_dash(&[transform.scale_scalar(6.0), transform.scale_scalar(4.0)], 0.0);
    }
    ctx.move_to(start.x, start.y);
    ctx.line_to(end.x, end.y);
    ctx.stroke()?;
    ctx.set_dash(&[], 0.0);

    let size = transform.scale_scalar(ARROW_SIZE);
    match arrow_shape(&edge.class) {
        "triangle" if matches!(edge.class.as_str(), "production" | "positive influence") => {
            draw_filled_triangle(ctx, end, start, size)?
        }
        "triangle" => draw_open_triangle(ctx, end, start, size)?,
        "triangle-cross" => {
            draw_open_triangle(ctx, end, start, size)?;
            draw_inhibition_bar(
                ctx,
                end,
                start,
                transform.scale_scalar(BAR_LENGTH),
                size + transform.scale_scalar(BAR_OFFSET),
            )?;
        }
        "tee" => draw_inhibition_bar(ctx, end, start, transform.scale_scalar(BAR_LENGTH), 0.0)?,
        "circle" => draw_filled_circle_tangent(ctx, end, start, size * 0.5)?,
        "diamond" => draw_open_diamond(ctx, end, start, size)?,
        _ => {}
    }
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    Ok(())
}

fn set_color(ctx: &CairoContext, color: (f64, f64, f64)) {
    ctx.set_source_rgb(color.0, color.1, color.2);
}

/// `#rgb`, `#rrggbb` or `rgb(r,g,b)`.
fn parse_color(value: &str) -> Option<(f64, f64, f64)> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let channel = |digits: &str| u8::from_str_radix(digits, 16).ok().map(|c| c as f64 / 255.0);
        return match hex.len() {
            3 => {
                let expand = |index: usize| channel(&hex[index..index + 1].repeat(2));
                Some((expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => None,
        };
    }
    let inner = value.strip_prefix("rgb(")?.strip_suffix(')')?;
    let channels: Vec<f64> = inner
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok().map(|c| c as f64 / 255.0))
        .collect::<Option<_>>()?;
    match channels.as_slice() {
        [r, g, b] => Some((*r, *g, *b)),
        _ => None,
    }
}

fn draw_shape_with_clone<F>(
    ctx: &CairoContext,
    rect: PixelRect,
    has_clone: bool,
    line_width: f64,
    fill_color: (f64, f64, f64),
    path_fn: F,
) -> Result<()>
where
    F: Fn(&CairoContext, PixelRect) -> Result<()>,
{
    ctx.set_line_width(line_width.max(0.5));
    path_fn(ctx, rect)?;
    set_color(ctx, fill_color);
    ctx.fill_preserve()?;
    set_color(ctx, BORDER_COLOR);
    ctx.stroke()?;
    if has_clone {
        draw_clone_marker(ctx, rect, &path_fn)?;
        ctx.set_line_width(line_width.max(0.5));
        path_fn(ctx, rect)?;
        set_color(ctx, BORDER_COLOR);
        ctx.stroke()?;
    }
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    Ok(())
}

fn draw_clone_marker<F>(ctx: &CairoContext, rect: PixelRect, path_fn: &F) -> Result<()>
where
    F: Fn(&CairoContext, PixelRect) -> Result<()>,
{
    let marker_height = (rect.height * CLONE_MARKER_HEIGHT_RATIO).max(1.0);
    ctx.save()?;
    path_fn(ctx, rect)?;
    ctx.clip();
    ctx.new_path();
    ctx.rectangle(rect.x0, rect.y0 + rect.height - marker_height, rect.width, marker_height);
    set_color(ctx, CLONE_MARKER_FILL_COLOR);
    ctx.fill()?;
    ctx.restore()?;
    set_color(ctx, BORDER_COLOR);
    Ok(())
}

fn path_rect(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    ctx.new_path();
    ctx.rectangle(rect.x0, rect.y0, rect.width, rect.height);
    Ok(())
}

fn path_ellipse(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let radius_x = (rect.width / 2.0).max(1.0);
    let radius_y = (rect.height / 2.0).max(1.0);
    ctx.save()?;
    ctx.new_path();
    ctx.translate(rect.center.x, rect.center.y);
    ctx.scale(radius_x, radius_y);
    ctx.arc(0.0, 0.0, 1.0, 0.0, std::f64::consts::TAU);
    ctx.restore()?;
    Ok(())
}

fn path_round_rect(ctx: &CairoContext, rect: PixelRect, radius: f64) -> Result<()> {
    let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let (x0, y0) = (rect.x0, rect.y0);
    let (x1, y1) = (rect.x0 + rect.width, rect.y0 + rect.height);
    let quarter = std::f64::consts::FRAC_PI_2;
    ctx.new_path();
    ctx.arc(x1 - radius, y0 + radius, radius, -quarter, 0.0);
    ctx.arc(x1 - radius, y1 - radius, radius, 0.0, quarter);
    ctx.arc(x0 + radius, y1 - radius, radius, quarter, 2.0 * quarter);
    ctx.arc(x0 + radius, y0 + radius, radius, 2.0 * quarter, 3.0 * quarter);
    ctx.close_path();
    Ok(())
}

fn path_bottom_round_rect(ctx: &CairoContext, rect: PixelRect, radius: f64) -> Result<()> {
    let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let (x0, y0) = (rect.x0, rect.y0);
    let (x1, y1) = (rect.x0 + rect.width, rect.y0 + rect.height);
    let quarter = std::f64::consts::FRAC_PI_2;
    ctx.new_path();
    ctx.move_to(x0, y0);
    ctx.line_to(x1, y0);
    ctx.arc(x1 - radius, y1 - radius, radius, 0.0, quarter);
    ctx.arc(x0 + radius, y1 - radius, radius, quarter, 2.0 * quarter);
    ctx.close_path();
    Ok(())
}

fn path_cut_rect(ctx: &CairoContext, rect: PixelRect, corner: f64) -> Result<()> {
    let (x0, y0) = (rect.x0, rect.y0);
    let (x1, y1) = (rect.x0 + rect.width, rect.y0 + rect.height);
    path_polygon(
        ctx,
        &[
            Point::new(x0, y0 + corner),
            Point::new(x0 + corner, y0),
            Point::new(x1 - corner, y0),
            Point::new(x1, y0 + corner),
            Point::new(x1, y1 - corner),
            Point::new(x1 - corner, y1),
            Point::new(x0 + corner, y1),
            Point::new(x0, y1 - corner),
        ],
    )
}

fn path_hexagon(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let (x0, y0, w, h) = (rect.x0, rect.y0, rect.width, rect.height);
    path_polygon(
        ctx,
        &[
            Point::new(x0, y0 + 0.5 * h),
            Point::new(x0 + 0.25 * w, y0),
            Point::new(x0 + 0.75 * w, y0),
            Point::new(x0 + w, y0 + 0.5 * h),
            Point::new(x0 + 0.75 * w, y0 + h),
            Point::new(x0 + 0.25 * w, y0 + h),
        ],
    )
}

fn path_concave_hexagon(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let (x0, y0, w, h) = (rect.x0, rect.y0, rect.width, rect.height);
    path_polygon(
        ctx,
        &[
            Point::new(x0, y0),
            Point::new(x0 + w, y0),
            Point::new(x0 + 0.8 * w, y0 + 0.5 * h),
            Point::new(x0 + w, y0 + h),
            Point::new(x0, y0 + h),
            Point::new(x0 + 0.2 * w, y0 + 0.5 * h),
        ],
    )
}

fn path_tag(ctx: &CairoContext, rect: PixelRect) -> Result<()> {
    let (x0, y0, w, h) = (rect.x0, rect.y0, rect.width, rect.height);
    path_polygon(
        ctx,
        &[
            Point::new(x0, y0),
            Point::new(x0 + 0.7 * w, y0),
            Point::new(x0 + w, y0 + 0.5 * h),
            Point::new(x0 + 0.7 * w, y0 + h),
            Point::new(x0, y0 + h),
        ],
    )
}

fn path_polygon(ctx: &CairoContext, points: &[Point]) -> Result<()> {
    ctx.new_path();
    for (index, point) in points.iter().enumerate() {
        if index == 0 {
            ctx.move_to(point.x, point.y);
        } else {
            ctx.line_to(point.x, point.y);
        }
    }
    ctx.close_path();
    Ok(())
}

fn unit_vector(end: Point, prev: Point) -> Option<(f64, f64)> {
    let dx = end.x - prev.x;
    let dy = end.y - prev.y;
    let length = (dx * dx + dy * dy).sqrt();
    (length > 0.0).then(|| (dx / length, dy / length))
}

fn triangle_points(end: Point, prev: Point, size: f64) -> Option<[Point; 3]> {
    let (ux, uy) = unit_vector(end, prev)?;
    let base = Point::new(end.x - ux * size, end.y - uy * size);
    let half_width = size * 0.6;
    Some([
        Point::new(base.x - uy * half_width, base.y + ux * half_width),
        Point::new(base.x + uy * half_width, base.y - ux * half_width),
        end,
    ])
}

fn draw_filled_triangle(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some(points) = triangle_points(end, prev, size) else {
        return Ok(());
    };
    path_polygon(ctx, &points)?;
    ctx.fill()?;
    Ok(())
}

fn draw_open_triangle(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some(points) = triangle_points(end, prev, size) else {
        return Ok(());
    };
    path_polygon(ctx, &points)?;
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.fill_preserve()?;
    set_color(ctx, BORDER_COLOR);
    ctx.stroke()?;
    Ok(())
}

fn draw_open_diamond(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some((ux, uy)) = unit_vector(end, prev) else {
        return Ok(());
    };
    let mid = Point::new(end.x - ux * size / 2.0, end.y - uy * size / 2.0);
    let half_width = size * 0.4;
    path_polygon(
        ctx,
        &[
            end,
            Point::new(mid.x - uy * half_width, mid.y + ux * half_width),
            Point::new(end.x - ux * size, end.y - uy * size),
            Point::new(mid.x + uy * half_width, mid.y - ux * half_width),
        ],
    )?;
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.fill_preserve()?;
    set_color(ctx, BORDER_COLOR);
    ctx.stroke()?;
    Ok(())
}

fn draw_filled_circle_tangent(ctx: &CairoContext, end: Point, prev: Point, radius: f64) -> Result<()> {
    let (ux, uy) = unit_vector(end, prev).unwrap_or((0.0, 0.0));
    let offset = (radius - radius * CATALYSIS_OVERLAP_RATIO).max(0.0);
    let center = Point::new(end.x - ux * offset, end.y - uy * offset);
    ctx.new_path();
    ctx.arc(center.x, center.y, radius.max(1.0), 0.0, std::f64::consts::TAU);
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.fill_preserve()?;
    set_color(ctx, BORDER_COLOR);
    ctx.stroke()?;
    Ok(())
}

fn draw_inhibition_bar(ctx: &CairoContext, end: Point, prev: Point, length: f64, offset: f64) -> Result<()> {
    let Some((ux, uy)) = unit_vector(end, prev) else {
        return Ok(());
    };
    let center = Point::new(end.x - ux * offset, end.y - uy * offset);
    let half = length / 2.0;
    ctx.move_to(center.x + uy * half, center.y - ux * half);
    ctx.line_to(center.x - uy * half, center.y + ux * half);
    ctx.stroke()?;
    Ok(())
}

fn text_layout(ctx: &CairoContext, text: &str, font_px: f64) -> pango::Layout {
    let layout = pangocairo::create_layout(ctx);
    let mut font_desc = FontDescription::from_string(DEFAULT_FONT.family);
    font_desc.set_absolute_size(font_px * pango::SCALE as f64);
    layout.set_font_description(Some(&font_desc));
    layout.set_alignment(Alignment::Center);
    layout.set_text(text);
    layout
}

fn draw_text_centered(ctx: &CairoContext, center: Point, text: &str, font_px: f64) -> Result<()> {
    if text.trim().is_empty() || font_px <= 0.0 {
        return Ok(());
    }
    let layout = text_layout(ctx, text, font_px);
    let (width, height) = layout.pixel_size();
    draw_text_at(ctx, center.x - width as f64 / 2.0, center.y - height as f64 / 2.0, &layout)
}

fn draw_text_bottom_centered(ctx: &CairoContext, rect: PixelRect, text: &str, font_px: f64) -> Result<()> {
    if text.trim().is_empty() || font_px <= 0.0 {
        return Ok(());
    }
    let layout = text_layout(ctx, text, font_px);
    let (width, height) = layout.pixel_size();
    let x = rect.center.x - width as f64 / 2.0;
    let y = rect.y0 + rect.height - height as f64 - 2.0;
    draw_text_at(ctx, x, y, &layout)
}

/// Outlined text with its top-left corner at (x, y).
fn draw_text_at(ctx: &CairoContext, x: f64, y: f64, layout: &pango::Layout) -> Result<()> {
    ctx.move_to(x, y);
    pangocairo::layout_path(ctx, layout);
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.set_line_width(TEXT_OUTLINE_WIDTH);
    ctx.stroke_preserve()?;
    set_color(ctx, BORDER_COLOR);
    ctx.fill()?;
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraph, Port};

    #[test]
    fn colors_parse_in_all_stylesheet_forms() {
        assert_eq!(parse_color("#fff"), Some((1.0, 1.0, 1.0)));
        assert_eq!(parse_color("#000000"), Some((0.0, 0.0, 0.0)));
        assert_eq!(parse_color("rgb(255, 0, 0)"), Some((1.0, 0.0, 0.0)));
        assert_eq!(parse_color("rgb(1,2)"), None);
        assert_eq!(parse_color("teal"), None);
    }

    #[test]
    fn bounds_cover_nodes_and_ports() {
        let mut graph = MemoryGraph::new();
        graph.add_node(
            Node::new("p", "process")
                .at(100.0, 100.0)
                .sized(20.0, 20.0)
                .with_ports(vec![
                    Port { id: "p.1".into(), x: -70.0, y: 0.0 },
                    Port { id: "p.2".into(), x: 70.0, y: 0.0 },
                ]),
        );
        graph.add_node(Node::new("m", "macromolecule").at(100.0, 50.0).sized(60.0, 30.0));
        let bounds = compute_bounds(&graph).unwrap();
        assert_eq!((bounds.min_x, bounds.max_x), (70.0, 130.0));
        assert_eq!((bounds.min_y, bounds.max_y), (35.0, 110.0));

        let (transform, width, height) = transform_with_padding(bounds, &RenderSettings::default());
        assert_eq!((width, height), (80.0, 95.0));
        assert_eq!(transform.map_point(Point::new(70.0, 35.0)), Point::new(10.0, 10.0));
    }

    #[test]
    fn empty_graph_has_no_bounds() {
        assert!(matches!(compute_bounds(&MemoryGraph::new()), Err(Error::EmptyGraph)));
    }

    #[test]
    fn unbound_edges_stop_at_the_node_box() {
        let mut graph = MemoryGraph::new();
        graph.add_node(Node::new("a", "macromolecule").at(0.0, 0.0).sized(60.0, 30.0));
        let end = edge_end(&graph, "a", None, Point::new(100.0, 0.0), true).unwrap();
        assert_eq!(end, Point::new(30.0, 0.0));
        let corner = edge_end(&graph, "a", None, Point::new(0.0, -100.0), true).unwrap();
        assert_eq!(corner, Point::new(0.0, -15.0));
    }

    #[test]
    fn bound_edges_use_the_port_only_when_enabled() {
        let mut graph = MemoryGraph::new();
        graph.add_node(
            Node::new("p", "process")
                .sized(20.0, 20.0)
                .with_ports(vec![Port { id: "p.1".into(), x: 0.0, y: -70.0 }]),
        );
        let toward = Point::new(100.0, 0.0);
        assert_eq!(edge_end(&graph, "p", Some("p.1"), toward, true), Some(Point::new(0.0, -14.0)));
        assert_eq!(edge_end(&graph, "p", Some("p.1"), toward, false), Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn state_variables_read_value_at_variable() {
        assert_eq!(aux_text(&AuxUnit::state_variable(Some("P"), Some("S10"))), "P@S10");
        assert_eq!(aux_text(&AuxUnit::state_variable(None, Some("S10"))), "@S10");
        assert_eq!(aux_text(&AuxUnit::state_variable(Some("active"), Some(""))), "active");
        assert_eq!(aux_text(&AuxUnit::unit_of_information(Some("mt:prot"))), "mt:prot");
    }

    #[test]
    fn style_width_overrides_node_width() {
        let node = Node::new("g", "macromolecule").sized(60.0, 30.0).with_style("width", "150");
        assert_eq!(rendered_width(&node), 150.0);
        assert_eq!(rendered_width(&Node::new("h", "macromolecule").sized(60.0, 30.0)), 60.0);
    }
}
