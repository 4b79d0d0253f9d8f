//! Error type shared by every stage of a CSV session.

use crate::dates::DateError;
use crate::transform::Stage;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening, reading, or transforming a CSV stream.
///
/// Reaching the end of the input is never an error: iterators simply return `None`.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown compression codec '{0}'")]
    UnknownCodec(String),

    #[error("setup {codec} decompression: {source}")]
    Decompress {
        codec: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: field #{field} is {size} bytes, larger than the limit of {limit}")]
    FieldTooLarge {
        line: u64,
        field: usize,
        size: usize,
        limit: usize,
    },

    #[error("sampling fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),

    #[error("cannot {stage} field '{field}': no such field")]
    MissingField { field: String, stage: Stage },

    #[error("convert field '{field}' from {value:?}: {source}")]
    Convert {
        field: String,
        value: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("parse field '{field}' value {value:?} with format {format:?}: {source}")]
    ParseDate {
        field: String,
        value: String,
        format: String,
        #[source]
        source: DateError,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReadError> = std::result::Result<T, E>;
