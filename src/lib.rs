//! Editing utilities for SBGN maps: arc validity rules, port orientation and
//! flow improvement, stylesheet helpers, experimental data overlays, SBGN-ML
//! loading and Cairo rendering.

pub mod classes;
pub mod connectivity;
pub mod error;
pub mod flow;
pub mod graph;
pub mod layout;
pub mod options;
pub mod orientation;
pub mod overlay;
pub mod ports;
pub mod render;
pub mod sbgnml;
pub mod style;

pub use connectivity::{validate_arc, validate_arc_in_graph, Dialect, Endpoint, Validation};
pub use error::{Error, Result};
pub use flow::{change_ports_orientation_after_layout, OrientationChange};
pub use graph::{batch, Edge, GraphSession, MemoryGraph, Node, Point, Port};
pub use options::Options;
pub use overlay::OverlayStore;
pub use ports::PortOrdering;
