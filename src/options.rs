//! Session configuration.
//!
//! [`ReadOptions`] gathers everything a CSV session needs. The data-only parts
//! deserialize from any serde format (missing keys take their defaults), while
//! converters are code and are attached with [`ReadOptions::convert`].
//!
//! ```
//! use ironstream::{convert, ReadOptions};
//!
//! let options = ReadOptions::default()
//!     .target("rating")
//!     .convert("rating", convert::float())
//!     .parse_date("year", "%Y")
//!     .fraction(0.5)
//!     .seed(42);
//! assert!(options.validate().is_ok());
//! ```

use crate::convert::Converter;
use crate::error::Result;
use crate::io::compression::Compression;
use crate::io::csv::{DEFAULT_FIELD_SIZE_LIMIT, Dialect, Fraction};
use crate::transform::TransformPipeline;
use indexmap::IndexMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Field to split off as the target.
    pub target_name: Option<String>,
    #[serde(skip)]
    pub converters: IndexMap<String, Converter>,
    /// Field name → strftime format.
    pub parse_dates: IndexMap<String, String>,
    /// Fields removed before any other stage.
    pub drop: Vec<String>,
    /// Row retention probability in `(0, 1]`.
    pub fraction: f64,
    /// Seed for reproducible sampling; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub compression: Compression,
    /// Per-session maximum field size in bytes.
    pub field_size_limit: Option<usize>,
    pub dialect: Dialect,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            target_name: None,
            converters: IndexMap::new(),
            parse_dates: IndexMap::new(),
            drop: Vec::new(),
            fraction: 1.0,
            seed: None,
            compression: Compression::Infer,
            field_size_limit: None,
            dialect: Dialect::default(),
        }
    }
}

impl ReadOptions {
    #[must_use]
    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn convert(mut self, field: impl Into<String>, converter: Converter) -> Self {
        self.converters.insert(field.into(), converter);
        self
    }

    #[must_use]
    pub fn parse_date(mut self, field: impl Into<String>, format: impl Into<String>) -> Self {
        self.parse_dates.insert(field.into(), format.into());
        self
    }

    #[must_use]
    pub fn drop_field(mut self, field: impl Into<String>) -> Self {
        self.drop.push(field.into());
        self
    }

    #[must_use]
    pub fn fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: impl Into<Compression>) -> Self {
        self.compression = compression.into();
        self
    }

    #[must_use]
    pub fn field_size_limit(mut self, limit: usize) -> Self {
        self.field_size_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.dialect.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// # Errors
    /// [`ReadError::InvalidFraction`](crate::ReadError::InvalidFraction) if the fraction is outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        Fraction::new(self.fraction).map(|_| ())
    }

    pub(crate) fn sampling(&self) -> Result<(Fraction, StdRng)> {
        let fraction = Fraction::new(self.fraction)?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok((fraction, rng))
    }

    pub(crate) fn effective_field_size_limit(&self) -> usize {
        self.field_size_limit.unwrap_or(DEFAULT_FIELD_SIZE_LIMIT)
    }

    pub(crate) fn pipeline(&self) -> TransformPipeline {
        let mut pipeline = TransformPipeline::new().drop_fields(self.drop.iter().cloned());
        for (field, converter) in &self.converters {
            pipeline = pipeline.convert(field.clone(), converter.clone());
        }
        for (field, format) in &self.parse_dates {
            pipeline = pipeline.parse_date(field.clone(), format.clone());
        }
        match &self.target_name {
            Some(name) => pipeline.target(name.clone()),
            None => pipeline,
        }
    }
}
