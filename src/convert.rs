//! Per-field value converters.
//!
//! A [`Converter`] turns the raw text of one field into a [`Value`]. Any error it
//! returns aborts the session with [`ReadError::Convert`](crate::ReadError::Convert).
//!
//! ```
//! use ironstream::convert::{self, Converter};
//! use ironstream::Value;
//!
//! let rating = convert::float();
//! assert_eq!(rating.apply("9.5")?, Value::Float(9.5));
//!
//! let upper = Converter::new(|s: &str| Ok(Value::from(s.to_uppercase())));
//! assert_eq!(upper.apply("abc")?, Value::from("ABC"));
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::value::Value;
use anyhow::{Context, bail};
use std::fmt;
use std::sync::Arc;

type ConvertFn = dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync;

/// A shareable unary transform from field text to a [`Value`].
#[derive(Clone)]
pub struct Converter(Arc<ConvertFn>);

impl Converter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the converter on one field value.
    ///
    /// # Errors
    /// Whatever the wrapped function returns.
    pub fn apply(&self, text: &str) -> anyhow::Result<Value> {
        (self.0)(text)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter(..)")
    }
}

/// Parse as `f64`. Surrounding whitespace is ignored; `inf` and `nan` are accepted.
#[must_use]
pub fn float() -> Converter {
    Converter::new(|s| {
        let v = s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("{s:?} is not a number"))?;
        Ok(Value::Float(v))
    })
}

/// Parse as `i64`. Surrounding whitespace is ignored.
#[must_use]
pub fn int() -> Converter {
    Converter::new(|s| {
        let v = s
            .trim()
            .parse::<i64>()
            .with_context(|| format!("{s:?} is not an integer"))?;
        Ok(Value::Int(v))
    })
}

/// Parse `true`/`false`/`1`/`0`/`yes`/`no`, case-insensitively.
#[must_use]
pub fn boolean() -> Converter {
    Converter::new(|s| {
        let v = match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => bail!("{s:?} is not a boolean"),
        };
        Ok(Value::Bool(v))
    })
}

/// Keep the text but strip surrounding whitespace.
#[must_use]
pub fn text() -> Converter {
    Converter::new(|s| Ok(Value::Text(s.trim().to_owned())))
}
