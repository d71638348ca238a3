use thiserror::Error;

/// Errors raised at the crate's fallible boundaries (files, XML, options, rendering).
///
/// The rule tables, classifier, scorer and optimizer never fail; they degrade to
/// conservative defaults instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse SBGN XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("SBGN file missing map element")]
    MissingMap,
    #[error("arc {id} is missing its {end} reference")]
    InvalidArc { id: String, end: &'static str },
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    #[error("invalid value `{value}` for option `{key}`")]
    InvalidOptionValue { key: String, value: String },
    #[error("unknown dialect `{0}` (expected PD, AF or SIF)")]
    UnknownDialect(String),
    #[error("graph has no drawable nodes")]
    EmptyGraph,
    #[error("cairo error: {0}")]
    Cairo(#[from] cairo::Error),
    #[error("failed to write PNG: {0}")]
    Png(#[from] cairo::IoError),
}

pub type Result<T> = std::result::Result<T, Error>;
