//! Strict, format-driven date parsing.
//!
//! Formats use chrono's strftime syntax. The whole input must match the format.
//! Components the format does not mention are filled in the way C's `strptime`
//! does: year 1900, January, day 1, midnight. Also as in `strptime`, `%Y`
//! takes exactly four digits.

use chrono::format::{Item, Numeric, ParseErrorKind, Parsed, StrftimeItems, parse, parse_and_remainder};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, ParseError, ParseResult};
use std::iter;
use thiserror::Error;

const DEFAULT_YEAR: i64 = 1900;

/// Why a value did not match its date format.
#[derive(Debug, Error)]
pub enum DateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("%Y expects a four-digit year, found {0:?}")]
    YearWidth(String),
}

/// Parse `text` with `format` into a [`NaiveDateTime`].
///
/// # Errors
/// [`DateError::Parse`] if `text` does not match `format`, has trailing input,
/// or names an impossible date; [`DateError::YearWidth`] if a `%Y` field is not
/// four digits.
pub fn parse_datetime(text: &str, format: &str) -> Result<NaiveDateTime, DateError> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, text, StrftimeItems::new(format))?;
    check_year_width(text, format)?;

    // Complete formats (including `%s`) resolve directly.
    if let Ok(dt) = parsed.to_naive_datetime_with_offset(0) {
        return Ok(dt);
    }
    Ok(resolve_date(&parsed)?.and_time(resolve_time(&parsed)?))
}

/// Re-walk a successful parse item by item and measure each `%Y` match.
fn check_year_width(text: &str, format: &str) -> Result<(), DateError> {
    let mut scratch = Parsed::new();
    let mut rest = text;
    for item in StrftimeItems::new(format) {
        let before = rest;
        rest = parse_and_remainder(&mut scratch, rest, iter::once(&item))?;
        if let Item::Numeric(Numeric::Year, _) = item {
            let year = before[..before.len() - rest.len()].trim_start();
            if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DateError::YearWidth(year.to_owned()));
            }
        }
    }
    Ok(())
}

fn resolve_date(parsed: &Parsed) -> ParseResult<NaiveDate> {
    match parsed.to_naive_date() {
        Err(e) if e.kind() == ParseErrorKind::NotEnough => {}
        other => return other,
    }
    // `set_*` only succeeds on unset (or equal) fields, so parsed values win.
    let mut filled = parsed.clone();
    let _ = filled.set_month(1);
    let _ = filled.set_day(1);
    match filled.to_naive_date() {
        Err(e) if e.kind() == ParseErrorKind::NotEnough => {}
        other => return other,
    }
    // Year is defaulted last: `%y` resolves without a full year.
    let _ = filled.set_year(DEFAULT_YEAR);
    filled.to_naive_date()
}

fn resolve_time(parsed: &Parsed) -> ParseResult<NaiveTime> {
    let mut filled = parsed.clone();
    let _ = filled.set_hour(0);
    let _ = filled.set_minute(0);
    let _ = filled.set_second(0);
    filled.to_naive_time()
}
