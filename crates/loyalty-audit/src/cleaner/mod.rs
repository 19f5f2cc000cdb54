//! Data cleaning module.
//!
//! This module provides the one-shot cleaning pass over the loaded tables:
//! - Rewriting the literal quantity token (`"zero"`) to `"0"`
//! - Coercing quantity and sale to numbers (unparseable cells become null)
//! - Parsing the four date columns (unparseable cells become null)
//!
//! Cleaning never drops a row and never touches its input; it returns new
//! tables plus a [`CleaningReport`] of what changed.

mod converters;
mod sanitizers;

pub use converters::{parse_cell, CellParseError};

use crate::config::AuditConfig;
use crate::types::{columns, CleaningReport, Datasets, TableKind};
use anyhow::Result;
use tracing::{debug, info};

/// Data cleaner for the users/transactions/products tables.
pub struct DataCleaner;

impl DataCleaner {
    /// Clean all three tables.
    pub fn clean(&self, datasets: &Datasets, config: &AuditConfig) -> Result<(Datasets, CleaningReport)> {
        let mut report = CleaningReport::default();
        info!("Cleaning numeric and date columns...");

        // 1. Sentinel rewrite must precede numeric parsing
        let (transactions, replaced) = sanitizers::replace_sentinel(
            &datasets.transactions,
            columns::FINAL_QUANTITY,
            &config.quantity_sentinel,
            "0",
        )?;
        report.sentinel_replacements = replaced;
        report.actions.push(format!(
            "Replaced {} '{}' values in {} with 0",
            replaced,
            config.quantity_sentinel,
            columns::FINAL_QUANTITY
        ));

        // 2. Numeric coercion
        let mut transactions = transactions;
        for column in [columns::FINAL_QUANTITY, columns::FINAL_SALE] {
            let (coerced, coercion) = converters::coerce_numeric(&transactions, column)?;
            debug!(
                "{}: {} parsed, {} already null, {} unparseable",
                column, coercion.parsed, coercion.already_null, coercion.failed
            );
            report.actions.push(format!(
                "Converted {} to numbers ({} unparseable values set to null)",
                column, coercion.failed
            ));
            report.numeric.push(coercion);
            transactions = coerced;
        }

        // 3. Date parsing
        let mut users = datasets.users.clone();
        for column in [columns::CREATED_DATE, columns::BIRTH_DATE] {
            let (parsed, coercion) = converters::parse_dates(&users, TableKind::Users, column)?;
            report.dates.push(coercion);
            users = parsed;
        }
        for column in [columns::PURCHASE_DATE, columns::SCAN_DATE] {
            let (parsed, coercion) =
                converters::parse_dates(&transactions, TableKind::Transactions, column)?;
            report.dates.push(coercion);
            transactions = parsed;
        }
        for coercion in &report.dates {
            report.actions.push(format!(
                "Parsed {}.{} as dates ({} unparseable values set to null)",
                coercion.table, coercion.column, coercion.failed
            ));
        }

        info!("Cleaning complete: {} actions", report.actions.len());

        Ok((
            Datasets {
                users,
                transactions,
                products: datasets.products.clone(),
            },
            report,
        ))
    }
}
