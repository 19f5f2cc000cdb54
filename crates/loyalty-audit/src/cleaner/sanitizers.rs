//! Text normalisation applied before numeric parsing.

use crate::utils::column_series;
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Replace every cell exactly equal to `token` with `replacement`.
///
/// Returns the new table and the number of cells replaced. Comparison is
/// exact: `"Zero"` or `" zero"` are left alone.
pub(crate) fn replace_sentinel(
    df: &DataFrame,
    column: &str,
    token: &str,
    replacement: &str,
) -> Result<(DataFrame, usize)> {
    let series = column_series(df, column)?;
    if series.dtype() != &DataType::String {
        debug!("{} is {}, no sentinel to replace", column, series.dtype());
        return Ok((df.clone(), 0));
    }

    let mut replaced = 0;
    let values: Vec<Option<&str>> = series
        .str()?
        .into_iter()
        .map(|value| match value {
            Some(v) if v == token => {
                replaced += 1;
                Some(replacement)
            }
            other => other,
        })
        .collect();

    let mut out = df.clone();
    out.replace(column, Series::new(column.into(), values))?;
    debug!("Replaced {} '{}' cells in {}", replaced, token, column);
    Ok((out, replaced))
}
