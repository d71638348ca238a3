//! Editor options consulted by the style, layout and port utilities.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LabelSize {
    Small,
    #[default]
    Regular,
    Large,
}

impl fmt::Display for LabelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LabelSize::Small => "small",
            LabelSize::Regular => "regular",
            LabelSize::Large => "large",
        })
    }
}

impl FromStr for LabelSize {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "small" => Ok(LabelSize::Small),
            "regular" => Ok(LabelSize::Regular),
            "large" => Ok(LabelSize::Large),
            _ => Err(invalid("dynamic-label-size", value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub animate_on_drawing_changes: bool,
    pub rearrange_after_expand_collapse: bool,
    pub compound_padding: f64,
    pub tiling_padding_vertical: f64,
    pub tiling_padding_horizontal: f64,
    pub dynamic_label_size: LabelSize,
    pub fit_labels_to_nodes: bool,
    pub show_complex_name: bool,
    pub extra_complex_padding: f64,
    pub improve_flow: bool,
    pub ports_enabled: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            animate_on_drawing_changes: true,
            rearrange_after_expand_collapse: true,
            compound_padding: 10.0,
            tiling_padding_vertical: 20.0,
            tiling_padding_horizontal: 20.0,
            dynamic_label_size: LabelSize::Regular,
            fit_labels_to_nodes: false,
            show_complex_name: true,
            extra_complex_padding: 10.0,
            improve_flow: true,
            ports_enabled: true,
        }
    }
}

fn invalid(key: &str, value: &str) -> Error {
    Error::InvalidOptionValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| invalid(key, value))
}

impl Options {
    /// Set one option from its textual name and value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "animate-on-drawing-changes" => self.animate_on_drawing_changes = parse_bool(key, value)?,
            "rearrange-after-expand-collapse" => {
                self.rearrange_after_expand_collapse = parse_bool(key, value)?
            }
            "compound-padding" => self.compound_padding = parse_number(key, value)?,
            "tiling-padding-vertical" => self.tiling_padding_vertical = parse_number(key, value)?,
            "tiling-padding-horizontal" => self.tiling_padding_horizontal = parse_number(key, value)?,
            "dynamic-label-size" => self.dynamic_label_size = value.parse()?,
            "fit-labels-to-nodes" => self.fit_labels_to_nodes = parse_bool(key, value)?,
            "showComplexName" => self.show_complex_name = parse_bool(key, value)?,
            "extraComplexPadding" => self.extra_complex_padding = parse_number(key, value)?,
            "improveFlow" => self.improve_flow = parse_bool(key, value)?,
            "portsEnabled" => self.ports_enabled = parse_bool(key, value)?,
            _ => return Err(Error::UnknownOption(key.to_string())),
        }
        log::debug!("option {key} = {value}");
        Ok(())
    }

    /// Apply a `key=value` assignment.
    pub fn apply(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| invalid(assignment.trim(), ""))?;
        self.set(key.trim(), value)
    }
}
