//! Type conversion functions for data cleaning.
//!
//! Conversions never fail on bad cells: each cell is parsed into a
//! `Result`, failures become nulls and are tallied for the cleaning report.

use crate::types::{DateCoercion, NumericCoercion, TableKind};
use crate::utils::{column_series, date_to_days, is_numeric_dtype, parse_permissive_date};
use anyhow::Result;
use polars::prelude::*;
use thiserror::Error;

/// Number of failing raw values kept per column.
const FAILED_SAMPLE_LIMIT: usize = 5;

/// Why a single cell could not become a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellParseError {
    #[error("empty value")]
    Empty,

    #[error("'{0}' is not a number")]
    Invalid(String),

    #[error("'{0}' is not a finite number")]
    NonFinite(String),
}

/// Parse one text cell as a finite number.
///
/// Surrounding whitespace is ignored; `NaN` and infinities are rejected so
/// they end up as nulls like any other unparseable value.
pub fn parse_cell(raw: &str) -> std::result::Result<f64, CellParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(CellParseError::Empty);
    }

    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        Ok(_) => Err(CellParseError::NonFinite(value.to_string())),
        Err(_) => Err(CellParseError::Invalid(value.to_string())),
    }
}

/// Coerce a column to `Float64`, turning unparseable cells into nulls.
pub(crate) fn coerce_numeric(df: &DataFrame, column: &str) -> Result<(DataFrame, NumericCoercion)> {
    let series = column_series(df, column)?;
    let mut report = NumericCoercion {
        column: column.to_string(),
        already_null: series.null_count(),
        ..Default::default()
    };

    let coerced = if series.dtype() == &DataType::String {
        let mut values: Vec<Option<f64>> = Vec::with_capacity(series.len());
        for cell in series.str()?.into_iter() {
            let Some(raw) = cell else {
                values.push(None);
                continue;
            };
            match parse_cell(raw) {
                Ok(number) => {
                    report.parsed += 1;
                    values.push(Some(number));
                }
                Err(_) => {
                    report.failed += 1;
                    if report.failed_samples.len() < FAILED_SAMPLE_LIMIT {
                        report.failed_samples.push(raw.to_string());
                    }
                    values.push(None);
                }
            }
        }
        Series::new(column.into(), values)
    } else if is_numeric_dtype(series.dtype()) || series.dtype() == &DataType::Null {
        report.parsed = series.len() - report.already_null;
        series.cast(&DataType::Float64)?
    } else {
        anyhow::bail!(
            "column '{}' has type {} and cannot be read as numbers",
            column,
            series.dtype()
        );
    };

    let mut out = df.clone();
    out.replace(column, coerced)?;
    Ok((out, report))
}

/// Parse a column as calendar dates, turning unparseable cells into nulls.
pub(crate) fn parse_dates(
    df: &DataFrame,
    table: TableKind,
    column: &str,
) -> Result<(DataFrame, DateCoercion)> {
    let series = column_series(df, column)?;
    let mut report = DateCoercion {
        table,
        column: column.to_string(),
        parsed: 0,
        already_null: series.null_count(),
        failed: 0,
    };

    if series.dtype() == &DataType::Date {
        report.parsed = series.len() - report.already_null;
        return Ok((df.clone(), report));
    }

    let text = series.cast(&DataType::String)?;
    let mut days: Vec<Option<i32>> = Vec::with_capacity(text.len());
    for cell in text.str()?.into_iter() {
        match cell.map(parse_permissive_date) {
            None => days.push(None),
            Some(Some(date)) => {
                report.parsed += 1;
                days.push(Some(date_to_days(date)));
            }
            Some(None) => {
                report.failed += 1;
                days.push(None);
            }
        }
    }

    let dates = Series::new(column.into(), days).cast(&DataType::Date)?;
    let mut out = df.clone();
    out.replace(column, dates)?;
    Ok((out, report))
}
