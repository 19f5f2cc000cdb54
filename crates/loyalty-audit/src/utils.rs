//! Shared utilities for the audit pipeline.
//!
//! Column access, text predicates and the date helpers used by the cleaner,
//! the auditor and the reports.

use crate::error::AuditError;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Column Access
// =============================================================================

/// Look up a column, reporting a missing one as [`AuditError::ColumnNotFound`].
pub fn column_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, AuditError> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| AuditError::ColumnNotFound(name.to_string()))
}

/// Values of a series rendered as text, nulls kept as `None`.
///
/// String columns are read as-is; anything else goes through a cast so
/// `12` and `"12"` print the same way.
pub fn text_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let as_text = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Text Predicates
// =============================================================================

static ALPHABETIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]").expect("Invalid regex: alphabetic"));

/// Check if a value contains at least one ASCII letter.
pub fn has_alphabetic(value: &str) -> bool {
    ALPHABETIC.is_match(value)
}

// =============================================================================
// Date Utilities
// =============================================================================

/// Days between 0001-01-01 and 1970-01-01, the offset between chrono's
/// day numbering and the polars `Date` physical value.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Full timestamp layouts seen in the exports, tried in order.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f Z",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Plain date layouts, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parse a date leniently, keeping only the calendar day.
///
/// Accepts RFC 3339, the `YYYY-MM-DD HH:MM:SS.fff Z` layout of the exports,
/// a handful of plain date layouts and, as a last resort, a leading
/// `YYYY-MM-DD` followed by anything.
pub fn parse_permissive_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    value
        .get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

/// Convert a date to the physical value of a polars `Date`.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert the physical value of a polars `Date` back to a date.
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// Physical day numbers of a `Date` series, nulls kept.
pub fn date_days(series: &Series) -> PolarsResult<Vec<Option<i32>>> {
    let days = series.cast(&DataType::Int32)?;
    Ok(days.i32()?.into_iter().collect())
}

/// Step a date back by whole calendar months.
///
/// A day past the end of the target month rolls forward into the next
/// month, so 2024-08-31 minus 6 months is 2024-03-02.
pub fn months_before(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let clamped = date.checked_sub_months(Months::new(months))?;
    let overflow = date.day() - clamped.day();
    clamped.checked_add_days(Days::new(u64::from(overflow)))
}

/// Step a date back by whole years, Feb 29 clamping to Feb 28.
///
/// `birth <= years_before(date, n)` holds exactly when the n-th anniversary
/// of `birth` falls on or before `date`, with a Feb 29 anniversary landing
/// on Mar 1 in common years.
pub fn years_before(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_sub_months(Months::new(months)))
}

// =============================================================================
// Tests
// =============================================================================
