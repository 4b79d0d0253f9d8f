//! CSV sessions: open a source, sample its rows, and transform each record.

use crate::error::Result;
use crate::io::compression::{open_path, wrap_reader};
use crate::io::csv::SamplingReader;
use crate::options::ReadOptions;
use crate::transform::{Labeled, TransformPipeline};
use rand::rngs::StdRng;
use std::io::Read;
use std::path::Path;

/// One pass over one CSV source, yielding `(features, target)` pairs.
///
/// The session validates its configuration against the header on the first
/// pull. The source is closed when the input runs out, on the first error, on
/// [`close`](Self::close), or when the stream is dropped.
pub struct CsvStream<R> {
    rows: SamplingReader<R, StdRng>,
    pipeline: TransformPipeline,
    checked: bool,
}

impl<R: Read> CsvStream<R> {
    /// Start a session over an already-decompressed reader.
    ///
    /// `options.compression` is ignored here; see [`iter_csv_reader`].
    ///
    /// # Errors
    /// [`ReadError::InvalidFraction`](crate::ReadError::InvalidFraction).
    pub fn new(reader: R, options: &ReadOptions) -> Result<Self> {
        let (fraction, rng) = options.sampling()?;
        let rows = SamplingReader::new(options.dialect.reader(reader), fraction, rng)
            .with_field_size_limit(options.effective_field_size_limit());
        Ok(Self {
            rows,
            pipeline: options.pipeline(),
            checked: false,
        })
    }

    /// # Errors
    /// See [`SamplingReader::header`].
    pub fn header(&mut self) -> Result<Option<&[String]>> {
        self.rows.header()
    }

    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.rows.rows_read()
    }

    #[must_use]
    pub const fn rows_emitted(&self) -> u64 {
        self.rows.rows_emitted()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.rows.is_closed()
    }

    pub fn close(&mut self) {
        self.rows.close();
    }

    fn check_header(&mut self) -> Result<()> {
        self.checked = true;
        let checked = match self.rows.header()? {
            Some(header) => self.pipeline.check_header(header),
            None => Ok(()),
        };
        if checked.is_err() {
            self.rows.close();
        }
        checked
    }
}

impl<R: Read> Iterator for CsvStream<R> {
    type Item = Result<Labeled>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.checked
            && let Err(e) = self.check_header()
        {
            return Some(Err(e));
        }
        let transformed = match self.rows.next()? {
            Ok(record) => self.pipeline.apply(record),
            Err(e) => Err(e),
        };
        if transformed.is_err() {
            self.rows.close();
        }
        Some(transformed)
    }
}

/// Stream `(features, target)` pairs from a CSV file.
///
/// The file is decompressed according to `options.compression`.
///
/// # Errors
/// Opening or decompression failures, or an invalid sampling fraction.
/// Row-level failures are reported by the iterator.
///
/// # Examples
/// ```no_run
/// use ironstream::{convert, iter_csv, ReadOptions};
/// # fn main() -> ironstream::Result<()> {
/// let options = ReadOptions::default()
///     .convert("rating", convert::float())
///     .parse_date("year", "%Y")
///     .target("rating");
/// for pair in iter_csv("tv_shows.csv", options)? {
///     let (x, y) = pair?;
///     println!("{x:?} {y:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub fn iter_csv(path: impl AsRef<Path>, options: ReadOptions) -> Result<CsvStream<Box<dyn Read>>> {
    options.validate()?;
    let source = open_path(path, &options.compression)?;
    CsvStream::new(source, &options)
}

/// Stream `(features, target)` pairs from an open reader.
///
/// With [`Compression::Infer`](crate::Compression::Infer) the first bytes of
/// the stream decide whether it is decompressed.
///
/// # Errors
/// Decompression setup failures, or an invalid sampling fraction.
pub fn iter_csv_reader<R: Read + 'static>(
    reader: R,
    options: ReadOptions,
) -> Result<CsvStream<Box<dyn Read>>> {
    options.validate()?;
    let source = wrap_reader(reader, &options.compression, None)?;
    CsvStream::new(source, &options)
}
