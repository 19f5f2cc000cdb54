//! CSV loading for the three input tables.
//!
//! File names are fixed; only the directory holding them is configurable.
//! Loading is all-or-nothing: a missing or unreadable file aborts the run.

use crate::error::AuditError;
use crate::types::{Datasets, TableKind};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const USERS_FILE: &str = "USER_TAKEHOME.csv";
pub const TRANSACTIONS_FILE: &str = "TRANSACTION_TAKEHOME.csv";
pub const PRODUCTS_FILE: &str = "PRODUCTS_TAKEHOME.csv";

/// Reads the users, transactions and products exports.
pub struct DatasetLoader;

impl DatasetLoader {
    /// File name of a table's export.
    pub fn file_name(kind: TableKind) -> &'static str {
        match kind {
            TableKind::Users => USERS_FILE,
            TableKind::Transactions => TRANSACTIONS_FILE,
            TableKind::Products => PRODUCTS_FILE,
        }
    }

    /// Load all three tables from `data_dir`.
    pub fn load_all(data_dir: &Path) -> Result<Datasets, AuditError> {
        Self::load_all_with(data_dir, |_, _| {})
    }

    /// Load all three tables, calling `on_table` with each table's position
    /// and kind before it is read.
    pub fn load_all_with<F>(data_dir: &Path, mut on_table: F) -> Result<Datasets, AuditError>
    where
        F: FnMut(usize, TableKind),
    {
        let mut load = |idx: usize, kind: TableKind| {
            on_table(idx, kind);
            let df = Self::load_table(&data_dir.join(Self::file_name(kind)), kind)?;
            info!("Loaded {}: {} rows x {} columns", kind, df.height(), df.width());
            Ok::<_, AuditError>(df)
        };

        Ok(Datasets {
            users: load(0, TableKind::Users)?,
            transactions: load(1, TableKind::Transactions)?,
            products: load(2, TableKind::Products)?,
        })
    }

    /// Load one table, reading its key, numeric and date columns as text.
    ///
    /// A second attempt without quote handling is made before giving up.
    pub fn load_table(path: &Path, kind: TableKind) -> Result<DataFrame, AuditError> {
        if !path.exists() {
            return Err(AuditError::FileNotFound(path.to_path_buf()));
        }

        match Self::read_csv(path, kind, Some(b'"')) {
            Ok(df) => return Ok(df),
            Err(e) => debug!("Standard loading of {} failed: {}", path.display(), e),
        }

        Self::read_csv(path, kind, None).map_err(|e| AuditError::LoadFailed {
            table: kind.name().to_string(),
            reason: e.to_string(),
        })
    }

    fn read_csv(path: &Path, kind: TableKind, quote_char: Option<u8>) -> PolarsResult<DataFrame> {
        let overrides = Self::text_column_overrides(path, kind, quote_char)?;

        Self::csv_options(quote_char)
            .with_infer_schema_length(None)
            .with_schema_overwrite(Some(overrides))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()
    }

    /// Schema override for the table's text columns that the file actually has.
    fn text_column_overrides(
        path: &Path,
        kind: TableKind,
        quote_char: Option<u8>,
    ) -> PolarsResult<SchemaRef> {
        // Header plus one row, every column read as text
        let header = Self::csv_options(quote_char)
            .with_n_rows(Some(1))
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()?;
        let present = header.get_column_names();

        let mut schema = Schema::default();
        for column in kind.text_columns() {
            if present.iter().any(|name| name.as_str() == *column) {
                schema.with_column((*column).into(), DataType::String);
            }
        }
        Ok(Arc::new(schema))
    }

    fn csv_options(quote_char: Option<u8>) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(quote_char))
    }
}
