//! Per-record transform pipeline: drop → convert → parse dates → split target.

use crate::convert::Converter;
use crate::dates::parse_datetime;
use crate::error::{ReadError, Result};
use crate::record::Record;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// A record's features paired with its target, if one was extracted.
pub type Labeled = (Record, Option<Value>);

/// The pipeline stage that referenced a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Drop,
    Convert,
    ParseDates,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drop => "drop",
            Self::Convert => "convert",
            Self::ParseDates => "parse dates of",
        })
    }
}

/// Turns raw records into `(features, target)` pairs.
///
/// Stages always run in the same order. A field removed by `drop` is invisible to
/// every later stage, so converting or parsing a dropped field is an error and a
/// dropped target yields `None`.
#[derive(Clone, Debug, Default)]
pub struct TransformPipeline {
    drop: Vec<String>,
    converters: IndexMap<String, Converter>,
    parse_dates: IndexMap<String, String>,
    target_name: Option<String>,
}

impl TransformPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn drop_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop.extend(names.into_iter().map(Into::into));
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
    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    /// Check every configured field name against a header.
    ///
    /// Runs before any record is produced so misconfiguration surfaces up front.
    /// A target missing from the header is allowed and simply yields `None`.
    ///
    /// # Errors
    /// [`ReadError::MissingField`] for the first name that `drop`, `convert`, or
    /// `parse_dates` refers to but that is absent or already dropped.
    pub fn check_header(&self, header: &[String]) -> Result<()> {
        let present = |name: &str| header.iter().any(|h| h == name);
        let kept = |name: &str| present(name) && !self.drop.iter().any(|d| d == name);

        if let Some(name) = self.drop.iter().find(|n| !present(n.as_str())) {
            return Err(missing(name, Stage::Drop));
        }
        if let Some(name) = self.converters.keys().find(|n| !kept(n.as_str())) {
            return Err(missing(name, Stage::Convert));
        }
        if let Some(name) = self.parse_dates.keys().find(|n| !kept(n.as_str())) {
            return Err(missing(name, Stage::ParseDates));
        }
        Ok(())
    }

    /// Transform one record.
    ///
    /// # Errors
    /// The first missing field, converter failure, or date mismatch.
    pub fn apply(&self, mut record: Record) -> Result<Labeled> {
        for name in &self.drop {
            if record.remove(name).is_none() {
                return Err(missing(name, Stage::Drop));
            }
        }

        for (name, converter) in &self.converters {
            let slot = record
                .get_mut(name)
                .ok_or_else(|| missing(name, Stage::Convert))?;
            let converted = {
                let text = slot.to_text();
                converter.apply(&text).map_err(|e| ReadError::Convert {
                    field: name.clone(),
                    value: text.into_owned(),
                    source: e.into(),
                })?
            };
            *slot = converted;
        }

        for (name, format) in &self.parse_dates {
            let slot = record
                .get_mut(name)
                .ok_or_else(|| missing(name, Stage::ParseDates))?;
            let parsed = {
                let text = slot.to_text();
                parse_datetime(&text, format).map_err(|e| ReadError::ParseDate {
                    field: name.clone(),
                    value: text.into_owned(),
                    format: format.clone(),
                    source: e,
                })?
            };
            *slot = Value::DateTime(parsed);
        }

        let target = self
            .target_name
            .as_deref()
            .and_then(|name| record.remove(name));
        Ok((record, target))
    }
}

fn missing(name: &str, stage: Stage) -> ReadError {
    ReadError::MissingField {
        field: name.to_owned(),
        stage,
    }
}
