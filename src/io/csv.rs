//! Sampling CSV record reader.
//!
//! [`SamplingReader`] turns a delimited byte stream into a lazy sequence of
//! [`Record`]s keyed by the header row:
//! - the first record read is the **header** and is never emitted,
//! - every data row must have exactly as many fields as the header,
//! - every field is checked against a per-session **size limit**,
//! - rows are **sampled** by independent Bernoulli trials against one RNG.
//!
//! # Design notes
//! - Sampling keeps memory constant and emits a strict, order-preserving
//!   subsequence of the input. The output row count is not exact.
//! - At a fraction of 1 the RNG is never consulted.
//! - Rows discarded by sampling are still parsed and validated.
//! - Blank lines are not rows: the `csv` parser skips them, so they are never
//!   emitted, sampled, or counted. A line of bare delimiters is a row and must
//!   match the header length like any other.
//! - The underlying stream is dropped as soon as the reader is exhausted,
//!   fails, or is closed explicitly.

use crate::error::{ReadError, Result};
use crate::record::Record;
use crate::value::Value;
use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, trace};

/// Largest field, in bytes, accepted when no explicit limit is configured.
pub const DEFAULT_FIELD_SIZE_LIMIT: usize = 131_072;

/// Row retention probability, always in `(0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Fraction(f64);

impl Fraction {
    /// Keep every row.
    pub const ALL: Self = Self(1.0);

    /// # Errors
    /// [`ReadError::InvalidFraction`] unless `0 < value <= 1`.
    pub fn new(value: f64) -> Result<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(ReadError::InvalidFraction(value))
        }
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn keeps_all(self) -> bool {
        self.0 >= 1.0
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ALL
    }
}

impl TryFrom<f64> for Fraction {
    type Error = ReadError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

/// Low-level row parsing options, passed straight to the `csv` parser.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    /// When `false`, quote characters are ordinary data.
    pub quoting: bool,
    /// Treat `""` inside a quoted field as one literal quote.
    pub double_quote: bool,
    pub escape: Option<u8>,
    /// Lines starting with this byte are skipped entirely.
    pub comment: Option<u8>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quoting: true,
            double_quote: true,
            escape: None,
            comment: None,
        }
    }
}

impl Dialect {
    /// A `csv` reader over `reader` using this dialect.
    ///
    /// Headers and row lengths are handled by [`SamplingReader`], so the
    /// returned reader treats every record as data and allows ragged rows.
    pub fn reader<R: Read>(&self, reader: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .quoting(self.quoting)
            .double_quote(self.double_quote)
            .escape(self.escape)
            .comment(self.comment)
            .from_reader(reader)
    }
}

/// Where a [`SamplingReader`] is in its single forward pass.
///
/// Accepting or skipping a candidate row happens inside `AwaitRow`, drawing
/// repeatedly from the same RNG until a row is kept or the input runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadState {
    AwaitHeader,
    AwaitRow,
    Exhausted,
}

/// Lazily reads header-keyed records, keeping each row with probability `fraction`.
///
/// Iterates `Result<Record>`; after the last row or the first error it is
/// closed and yields `None` forever.
pub struct SamplingReader<R, G = StdRng> {
    rows: Option<csv::Reader<R>>,
    state: ReadState,
    header: Vec<String>,
    fraction: Fraction,
    rng: G,
    field_size_limit: usize,
    buf: csv::StringRecord,
    rows_read: u64,
    rows_emitted: u64,
}

impl<R: Read, G: Rng> SamplingReader<R, G> {
    pub fn new(rows: csv::Reader<R>, fraction: Fraction, rng: G) -> Self {
        Self {
            rows: Some(rows),
            state: ReadState::AwaitHeader,
            header: Vec::new(),
            fraction,
            rng,
            field_size_limit: DEFAULT_FIELD_SIZE_LIMIT,
            buf: csv::StringRecord::new(),
            rows_read: 0,
            rows_emitted: 0,
        }
    }

    /// Maximum accepted field size in bytes for this reader only.
    #[must_use]
    pub fn with_field_size_limit(mut self, limit: usize) -> Self {
        self.field_size_limit = limit;
        self
    }

    /// The header, reading it first if necessary.
    ///
    /// Returns `Ok(None)` when the input is empty.
    ///
    /// # Errors
    /// A CSV or field-size error in the header row. The reader is closed.
    pub fn header(&mut self) -> Result<Option<&[String]>> {
        if self.state == ReadState::AwaitHeader {
            match self.read_header() {
                Ok(true) => self.state = ReadState::AwaitRow,
                Ok(false) => self.close(),
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
        Ok((!self.header.is_empty()).then_some(self.header.as_slice()))
    }

    /// Data rows consumed so far, including rows discarded by sampling.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.rows_read
    }

    #[must_use]
    pub const fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    /// Drop the underlying stream. Later pulls yield `None`.
    pub fn close(&mut self) {
        self.state = ReadState::Exhausted;
        if self.rows.take().is_some() {
            debug!(
                rows_read = self.rows_read,
                rows_emitted = self.rows_emitted,
                "closed csv source"
            );
        }
    }

    /// Read the next physical record into `buf`; `false` at end of input.
    fn read_raw(&mut self) -> Result<bool> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(false);
        };
        if !rows.read_record(&mut self.buf)? {
            return Ok(false);
        }
        if let Some((field, size)) = self
            .buf
            .iter()
            .map(str::len)
            .enumerate()
            .find(|&(_, size)| size > self.field_size_limit)
        {
            return Err(ReadError::FieldTooLarge {
                line: self.line(),
                field,
                size,
                limit: self.field_size_limit,
            });
        }
        Ok(true)
    }

    fn read_header(&mut self) -> Result<bool> {
        if !self.read_raw()? {
            return Ok(false);
        }
        self.header = self.buf.iter().map(str::to_owned).collect();
        debug!(fields = self.header.len(), "read csv header");
        Ok(true)
    }

    fn read_row(&mut self) -> Result<bool> {
        if !self.read_raw()? {
            return Ok(false);
        }
        self.rows_read += 1;
        if self.buf.len() != self.header.len() {
            return Err(ReadError::MalformedRow {
                line: self.line(),
                expected: self.header.len(),
                found: self.buf.len(),
            });
        }
        Ok(true)
    }

    fn line(&self) -> u64 {
        self.buf.position().map_or(0, csv::Position::line)
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            match self.state {
                ReadState::AwaitHeader => {
                    if !self.read_header()? {
                        return Ok(None);
                    }
                    self.state = ReadState::AwaitRow;
                }
                ReadState::AwaitRow => {
                    if !self.read_row()? {
                        return Ok(None);
                    }
                    if !self.fraction.keeps_all() {
                        while self.rng.random::<f64>() > self.fraction.get() {
                            trace!(line = self.line(), "row skipped by sampling");
                            if !self.read_row()? {
                                return Ok(None);
                            }
                        }
                    }
                    self.rows_emitted += 1;
                    return Ok(Some(self.zip_row()));
                }
                ReadState::Exhausted => return Ok(None),
            }
        }
    }

    fn zip_row(&self) -> Record {
        self.header
            .iter()
            .zip(self.buf.iter())
            .map(|(name, value)| (name.clone(), Value::Text(value.to_owned())))
            .collect()
    }
}

impl<R: Read, G: Rng> Iterator for SamplingReader<R, G> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}
