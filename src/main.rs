use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use sbgn_editor::connectivity::{edge_classes, Endpoint};
use sbgn_editor::overlay::mark_gene_nodes;
use sbgn_editor::render::{render_png, render_svg, RenderSettings};
use sbgn_editor::sbgnml::{load_file, SbgnDocument};
use sbgn_editor::{
    change_ports_orientation_after_layout, validate_arc, validate_arc_in_graph, Dialect, Options,
    OverlayStore, Validation,
};

const DEFAULT_PADDING_PX: f64 = 10.0;

#[derive(Parser)]
#[command(author, version, about = "SBGN map editing utilities", long_about = None)]
struct Cli {
    /// Editor option as `key=value`; may be repeated.
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    settings: Vec<String>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether an arc may join two node classes, or two nodes of a map.
    CheckArc {
        #[arg(long)]
        dialect: Option<String>,
        #[arg(long)]
        edge: String,
        /// Source class, or source node id with --input.
        #[arg(long)]
        source: String,
        /// Target class, or target node id with --input.
        #[arg(long)]
        target: String,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// List the arc classes of a dialect.
    ArcClasses {
        #[arg(long, default_value = "pd")]
        dialect: String,
    },
    /// Re-orient the ports of processes and logical operators.
    Orient {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        no_improve_flow: bool,
        /// Also render the result to this PNG (an SVG is written beside it).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Draw experimental data from a tab separated file on gene nodes.
    Overlay {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "overlay.png")]
        output: PathBuf,
        /// Data column to hide; may be repeated.
        #[arg(long)]
        hide: Vec<String>,
    },
    /// Render a map to PNG and SVG.
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "sbgnml.png")]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_PADDING_PX)]
        padding: f64,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        #[arg(long)]
        no_clone_markers: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialise logging")?;

    let mut options = Options::default();
    for setting in &cli.settings {
        options
            .apply(setting)
            .with_context(|| format!("Invalid --set {setting:?}"))?;
    }

    match cli.command {
        Command::CheckArc {
            dialect,
            edge,
            source,
            target,
            input,
        } => check_arc(dialect.as_deref(), &edge, &source, &target, input.as_deref()),
        Command::ArcClasses { dialect } => {
            let dialect: Dialect = dialect.parse()?;
            for class in edge_classes(dialect) {
                println!("{class}");
            }
            Ok(())
        }
        Command::Orient {
            input,
            no_improve_flow,
            output,
        } => {
            if no_improve_flow {
                options.improve_flow = false;
            }
            orient(&input, output.as_deref(), &options)
        }
        Command::Overlay {
            input,
            data,
            output,
            hide,
        } => overlay(&input, &data, &output, &hide, &options),
        Command::Render {
            input,
            output,
            padding,
            scale,
            no_clone_markers,
        } => {
            let document = load(&input)?;
            let settings = RenderSettings {
                padding,
                scale,
                clone_markers: !no_clone_markers,
            };
            draw(&document, &options, None, &settings, &output)
        }
    }
}

fn load(input: &Path) -> Result<SbgnDocument> {
    load_file(input).with_context(|| format!("Failed to load {:?}", input))
}

fn default_svg_output_path(output: &Path) -> PathBuf {
    let mut svg_path = output.to_path_buf();
    svg_path.set_extension("svg");
    svg_path
}

fn draw(
    document: &SbgnDocument,
    options: &Options,
    overlay: Option<&OverlayStore>,
    settings: &RenderSettings,
    output: &Path,
) -> Result<()> {
    render_png(&document.graph, options, overlay, settings, output)
        .with_context(|| format!("Failed to render {:?}", output))?;
    let svg_path = default_svg_output_path(output);
    render_svg(&document.graph, options, overlay, settings, &svg_path)
        .with_context(|| format!("Failed to render {:?}", svg_path))?;
    Ok(())
}

fn check_arc(
    dialect: Option<&str>,
    edge: &str,
    source: &str,
    target: &str,
    input: Option<&Path>,
) -> Result<()> {
    let explicit = dialect.map(str::parse::<Dialect>).transpose()?;
    let verdict = match input {
        Some(input) => {
            let document = load(input)?;
            let dialect = explicit
                .or(document.dialect)
                .ok_or_else(|| anyhow!("{:?} declares no language; pass --dialect", input))?;
            validate_arc_in_graph(&document.graph, dialect, edge, source, target)
        }
        None => {
            let dialect = explicit.ok_or_else(|| anyhow!("--dialect is required without --input"))?;
            validate_arc(dialect, edge, Endpoint::bare(source), Endpoint::bare(target))
        }
    };
    match verdict {
        Validation::Valid => println!("valid"),
        Validation::Invalid => println!("invalid"),
        Validation::ExceedsLimit { role } => println!("invalid: {role:?} has too many edges"),
    }
    Ok(())
}

fn orient(input: &Path, output: Option<&Path>, options: &Options) -> Result<()> {
    let mut document = load(input)?;
    let changes = change_ports_orientation_after_layout(&mut document.graph, options);
    for change in &changes {
        println!("{}\t{}\t{}", change.node_id, change.previous, change.ordering);
        for (moved, with) in &change.swaps {
            println!("\tswapped {moved} <-> {with}");
        }
    }
    log::info!("{} ported nodes checked", changes.len());
    if let Some(output) = output {
        draw(&document, options, None, &RenderSettings::default(), output)?;
    }
    Ok(())
}

fn overlay(input: &Path, data: &Path, output: &Path, hide: &[String], options: &Options) -> Result<()> {
    let mut document = load(input)?;
    let text = fs::read_to_string(data).with_context(|| format!("Failed to read {:?}", data))?;
    let genes = mark_gene_nodes(&mut document.graph);
    log::debug!("{genes} gene nodes");

    let mut store = OverlayStore::new();
    let group = store.empty_group_id();
    store.add_genomic_data_locally(&mut document.graph, &text, group);
    for category in hide {
        store.update_genomic_data_visibility(category, false);
    }
    store.show_genomic_data(&mut document.graph);
    draw(&document, options, Some(&store), &RenderSettings::default(), output)
}
