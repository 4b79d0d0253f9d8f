//! # Ironstream
//!
//! Lazy, **sampling CSV record streams** for incremental learning and data exploration.
//! A session reads a delimited file (optionally compressed) one row at a time and
//! yields `(features, target)` pairs without loading the file into memory.
//!
//! ## Key Features
//!
//! - **Pull-based streaming** - each `next()` reads only the rows it needs
//! - **Reproducible down-sampling** - keep each row with a fixed probability, seeded
//! - **Per-field transforms** - drop fields, convert values, parse dates
//! - **Target extraction** - split a label field off every record
//! - **Transparent decompression** - gzip, zip, zstd, bzip2, and xz (feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironstream::{convert, iter_csv, ReadOptions};
//! # fn main() -> ironstream::Result<()> {
//!
//! let options = ReadOptions::default()
//!     .convert("rating", convert::float())
//!     .parse_date("year", "%Y")
//!     .target("rating");
//!
//! for pair in iter_csv("tv_shows.csv.gz", options)? {
//!     let (x, y) = pair?;
//!     println!("{x:?} -> {y:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Session
//!
//! A [`CsvStream`] is one forward pass over one source: it reads the header on the
//! first pull, then emits records until the input runs out. The source is closed
//! when the stream ends, on the first error, or when the stream is dropped.
//!
//! ### Sampling
//!
//! With a fraction below 1, every row is kept by an independent trial against a
//! single RNG owned by the session, so the output is an order-preserving
//! subsequence of the input. Fixing [`ReadOptions::seed`] makes it reproducible.
//!
//! ### Transforms
//!
//! Each record goes through [`TransformPipeline`] in a fixed order:
//! 1. `drop` removes fields,
//! 2. converters rewrite field values,
//! 3. `parse_dates` turns text into [`Value::DateTime`],
//! 4. the target field is split off.
//!
//! ## Feature Flags
//!
//! - `compression-gzip` - `.gz` via `flate2`
//! - `compression-zip` - `.zip` (first file entry) via `zip`
//! - `compression-zstd` - `.zst` via `zstd`
//! - `compression-bzip2` - `.bz2` via `bzip2`
//! - `compression-xz` - `.xz` via `xz2`
//!
//! ## Module Overview
//!
//! - [`stream`] - sessions: [`iter_csv`], [`iter_csv_reader`], [`CsvStream`]
//! - [`io`] - decompression and the sampling record reader
//! - [`transform`] - the per-record transform pipeline
//! - [`convert`] - value converters
//! - [`dates`] - strict date parsing
//! - [`options`] - session configuration
//! - [`testing`] - fixtures for tests

pub mod convert;
pub mod dates;
pub mod error;
pub mod io;
pub mod options;
pub mod record;
pub mod stream;
pub mod testing;
pub mod transform;
pub mod value;

pub use convert::Converter;
pub use error::{ReadError, Result};
pub use io::compression::Compression;
pub use io::csv::{Dialect, Fraction, SamplingReader};
pub use options::ReadOptions;
pub use record::Record;
pub use stream::{CsvStream, iter_csv, iter_csv_reader};
pub use transform::{Labeled, Stage, TransformPipeline};
pub use value::Value;
