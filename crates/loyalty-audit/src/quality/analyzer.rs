use super::keys::{column_keys, row_keys, KeyPart};
use crate::types::{
    columns, CardinalityCheck, CleanedAuditReport, ColumnDtype, ColumnNullCount, DateRange,
    DateRangeCheck, Datasets, DuplicateKeyCheck, NegativeValueCheck, NonNumericCheck,
    RawAuditReport, ReferentialCheck, TableKind, TableProfile,
};
use crate::utils::{column_series, date_days, days_to_date, has_alphabetic, text_values};
use anyhow::Result;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Number of offending values kept as a sample by the non-numeric check.
const NON_NUMERIC_SAMPLE_SIZE: usize = 5;

/// Read-only checks over the loaded and cleaned tables.
///
/// Every check reports what it finds; none of them changes a table.
pub struct QualityAuditor;

impl QualityAuditor {
    /// Checks that only make sense on the tables exactly as loaded.
    pub fn audit_raw(datasets: &Datasets) -> Result<RawAuditReport> {
        let mut profiles = Vec::with_capacity(3);
        for kind in [TableKind::Users, TableKind::Transactions, TableKind::Products] {
            let df = datasets.table(kind);
            profiles.push(TableProfile {
                table: kind,
                rows: df.height(),
                null_counts: Self::count_nulls(df),
                dtypes: Self::column_dtypes(df),
            });
        }

        let key_checks: [(TableKind, &[&str]); 3] = [
            (TableKind::Users, &[columns::ID]),
            (TableKind::Products, &[columns::BARCODE]),
            (
                TableKind::Transactions,
                &[columns::RECEIPT_ID, columns::BARCODE],
            ),
        ];
        let mut duplicate_checks = Vec::with_capacity(key_checks.len());
        for (kind, key_columns) in key_checks {
            let duplicate_count = Self::count_duplicates(datasets.table(kind), key_columns)?;
            debug!(
                "{} duplicate keys over {:?} in {}",
                duplicate_count, key_columns, kind
            );
            duplicate_checks.push(DuplicateKeyCheck {
                table: kind,
                key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
                duplicate_count,
            });
        }

        let alpha_rows =
            Self::find_non_numeric(&datasets.transactions, columns::FINAL_QUANTITY)?;
        let sample = alpha_rows.head(Some(NON_NUMERIC_SAMPLE_SIZE));
        let non_numeric = NonNumericCheck {
            table: TableKind::Transactions,
            column: columns::FINAL_QUANTITY.to_string(),
            row_count: alpha_rows.height(),
            sample_values: text_values(column_series(&sample, columns::FINAL_QUANTITY)?)?,
        };

        Ok(RawAuditReport {
            profiles,
            duplicate_checks,
            non_numeric,
        })
    }

    /// Checks that need numeric and date columns already coerced.
    pub fn audit_cleaned(datasets: &Datasets) -> Result<CleanedAuditReport> {
        let mut negative_values = Vec::with_capacity(2);
        for column in [columns::FINAL_QUANTITY, columns::FINAL_SALE] {
            negative_values.push(NegativeValueCheck {
                column: column.to_string(),
                negative_count: Self::count_negative(&datasets.transactions, column)?,
            });
        }

        let foreign_keys = [
            (TableKind::Users, columns::USER_ID, columns::ID),
            (TableKind::Products, columns::BARCODE, columns::BARCODE),
        ];
        let mut referential = Vec::with_capacity(foreign_keys.len());
        for (parent, fk_column, pk_column) in foreign_keys {
            let unmatched = Self::check_referential(
                &datasets.transactions,
                datasets.table(parent),
                fk_column,
                pk_column,
            )?;
            referential.push(ReferentialCheck {
                child: TableKind::Transactions,
                parent,
                fk_column: fk_column.to_string(),
                pk_column: pk_column.to_string(),
                unmatched_count: unmatched.height(),
            });
        }

        let categorical = [
            (TableKind::Users, columns::STATE),
            (TableKind::Users, columns::LANGUAGE),
            (TableKind::Users, columns::GENDER),
            (TableKind::Products, columns::CATEGORY_1),
        ];
        let mut cardinality = Vec::with_capacity(categorical.len());
        for (table, column) in categorical {
            cardinality.push(CardinalityCheck {
                table,
                column: column.to_string(),
                unique_count: Self::count_unique(datasets.table(table), column)?,
            });
        }

        let date_columns = [
            (TableKind::Users, columns::CREATED_DATE),
            (TableKind::Users, columns::BIRTH_DATE),
            (TableKind::Transactions, columns::PURCHASE_DATE),
            (TableKind::Transactions, columns::SCAN_DATE),
        ];
        let mut date_ranges = Vec::with_capacity(date_columns.len());
        for (table, column) in date_columns {
            date_ranges.push(DateRangeCheck {
                table,
                column: column.to_string(),
                range: Self::date_range(datasets.table(table), column)?,
            });
        }

        Ok(CleanedAuditReport {
            negative_values,
            referential,
            cardinality,
            date_ranges,
        })
    }

    /// Missing values per column, in column order.
    pub fn count_nulls(df: &DataFrame) -> Vec<ColumnNullCount> {
        df.get_columns()
            .iter()
            .map(|col| ColumnNullCount {
                column: col.name().to_string(),
                null_count: col.null_count(),
            })
            .collect()
    }

    /// Data type of every column, in column order.
    pub fn column_dtypes(df: &DataFrame) -> Vec<ColumnDtype> {
        df.get_columns()
            .iter()
            .map(|col| ColumnDtype {
                column: col.name().to_string(),
                dtype: col.dtype().to_string(),
            })
            .collect()
    }

    /// Number of rows whose key repeats the key of an earlier row.
    ///
    /// The first occurrence of a key is never counted; nulls in a key are
    /// equal to each other.
    pub fn count_duplicates(df: &DataFrame, key_columns: &[&str]) -> Result<usize> {
        let series = key_columns
            .iter()
            .map(|name| column_series(df, name))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let keys = row_keys(&series)?;
        let mut seen = HashSet::with_capacity(keys.len());
        let mut duplicates = 0;
        for key in keys {
            if !seen.insert(key) {
                duplicates += 1;
            }
        }
        Ok(duplicates)
    }

    /// Rows whose value in `column`, read as text, contains a letter.
    ///
    /// A null value always counts as non-numeric.
    pub fn find_non_numeric(df: &DataFrame, column: &str) -> Result<DataFrame> {
        let values = text_values(column_series(df, column)?)?;
        let mask: BooleanChunked = values
            .iter()
            .map(|value| value.as_deref().is_none_or(has_alphabetic))
            .collect();
        Ok(df.filter(&mask)?)
    }

    /// Number of values strictly below zero. Nulls never count.
    pub fn count_negative(df: &DataFrame, column: &str) -> Result<usize> {
        let values = column_series(df, column)?.cast(&DataType::Float64)?;
        Ok(values
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| *v < 0.0)
            .count())
    }

    /// Child rows whose `fk_column` value is absent from the parent's `pk_column`.
    ///
    /// A null foreign key is always unmatched.
    pub fn check_referential(
        child: &DataFrame,
        parent: &DataFrame,
        fk_column: &str,
        pk_column: &str,
    ) -> Result<DataFrame> {
        let parent_keys: HashSet<KeyPart> = column_keys(column_series(parent, pk_column)?)?
            .into_iter()
            .filter(|key| !key.is_null())
            .collect();

        let mask: BooleanChunked = column_keys(column_series(child, fk_column)?)?
            .iter()
            .map(|key| key.is_null() || !parent_keys.contains(key))
            .collect();

        Ok(child.filter(&mask)?)
    }

    /// Number of distinct non-null values.
    pub fn count_unique(df: &DataFrame, column: &str) -> Result<usize> {
        Ok(column_series(df, column)?.drop_nulls().n_unique()?)
    }

    /// Earliest and latest date of a parsed date column.
    pub fn date_range(df: &DataFrame, column: &str) -> Result<DateRange> {
        let days = date_days(column_series(df, column)?)?;
        let present = days.iter().flatten().copied();
        Ok(DateRange {
            min: present.clone().min().and_then(days_to_date),
            max: present.max().and_then(days_to_date),
        })
    }
}
