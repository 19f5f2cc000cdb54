use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Tables
// ============================================================================

/// The three tables of the loyalty program export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Users,
    Transactions,
    Products,
}

impl TableKind {
    /// Name used for log lines and as the table name in the query store.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Transactions => "transactions",
            Self::Products => "products",
        }
    }

    /// Columns read as text regardless of what their values look like.
    ///
    /// Keys have to compare as text on both sides of a join, and the numeric
    /// and date columns are parsed by the cleaner, not the CSV reader.
    pub fn text_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Users => &[columns::ID, columns::BIRTH_DATE, columns::CREATED_DATE],
            Self::Transactions => &[
                columns::RECEIPT_ID,
                columns::BARCODE,
                columns::USER_ID,
                columns::FINAL_QUANTITY,
                columns::FINAL_SALE,
                columns::PURCHASE_DATE,
                columns::SCAN_DATE,
            ],
            Self::Products => &[columns::BARCODE, columns::CATEGORY_1, columns::BRAND],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names the audit relies on.
pub mod columns {
    pub const ID: &str = "ID";
    pub const STATE: &str = "STATE";
    pub const LANGUAGE: &str = "LANGUAGE";
    pub const GENDER: &str = "GENDER";
    pub const BIRTH_DATE: &str = "BIRTH_DATE";
    pub const CREATED_DATE: &str = "CREATED_DATE";

    pub const RECEIPT_ID: &str = "RECEIPT_ID";
    pub const BARCODE: &str = "BARCODE";
    pub const USER_ID: &str = "USER_ID";
    pub const FINAL_QUANTITY: &str = "FINAL_QUANTITY";
    pub const FINAL_SALE: &str = "FINAL_SALE";
    pub const PURCHASE_DATE: &str = "PURCHASE_DATE";
    pub const SCAN_DATE: &str = "SCAN_DATE";

    pub const CATEGORY_1: &str = "CATEGORY_1";
    pub const BRAND: &str = "BRAND";
}

/// The three tables, loaded or cleaned, passed between pipeline stages.
///
/// Polars frames share their buffers, so cloning this is cheap.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub users: DataFrame,
    pub transactions: DataFrame,
    pub products: DataFrame,
}

impl Datasets {
    pub fn table(&self, kind: TableKind) -> &DataFrame {
        match kind {
            TableKind::Users => &self.users,
            TableKind::Transactions => &self.transactions,
            TableKind::Products => &self.products,
        }
    }

    /// (rows, columns) per table, in users/transactions/products order.
    pub fn shapes(&self) -> [(TableKind, (usize, usize)); 3] {
        [
            (TableKind::Users, self.users.shape()),
            (TableKind::Transactions, self.transactions.shape()),
            (TableKind::Products, self.products.shape()),
        ]
    }
}

// ============================================================================
// Audit results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNullCount {
    pub column: String,
    pub null_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDtype {
    pub column: String,
    pub dtype: String,
}

/// Earliest and latest value of a date column; `None` when every value is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

/// Null counts and dtypes of one table as loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProfile {
    pub table: TableKind,
    pub rows: usize,
    pub null_counts: Vec<ColumnNullCount>,
    pub dtypes: Vec<ColumnDtype>,
}

/// Duplicate count for one table and its (possibly composite) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateKeyCheck {
    pub table: TableKind,
    pub key_columns: Vec<String>,
    pub duplicate_count: usize,
}

/// Rows whose text value contains a letter (or is null).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonNumericCheck {
    pub table: TableKind,
    pub column: String,
    pub row_count: usize,
    /// Up to five offending values, `None` for nulls.
    pub sample_values: Vec<Option<String>>,
}

/// Audit run on the tables exactly as loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAuditReport {
    pub profiles: Vec<TableProfile>,
    pub duplicate_checks: Vec<DuplicateKeyCheck>,
    pub non_numeric: NonNumericCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegativeValueCheck {
    pub column: String,
    pub negative_count: usize,
}

/// Child rows whose foreign key is missing from the parent table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferentialCheck {
    pub child: TableKind,
    pub parent: TableKind,
    pub fk_column: String,
    pub pk_column: String,
    pub unmatched_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardinalityCheck {
    pub table: TableKind,
    pub column: String,
    pub unique_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeCheck {
    pub table: TableKind,
    pub column: String,
    pub range: DateRange,
}

/// Audit run after numeric and date coercion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedAuditReport {
    pub negative_values: Vec<NegativeValueCheck>,
    pub referential: Vec<ReferentialCheck>,
    pub cardinality: Vec<CardinalityCheck>,
    pub date_ranges: Vec<DateRangeCheck>,
}

// ============================================================================
// Cleaning results
// ============================================================================

/// Outcome of coercing one text column to numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericCoercion {
    pub column: String,
    pub parsed: usize,
    pub already_null: usize,
    pub failed: usize,
    /// First few raw values that failed to parse.
    pub failed_samples: Vec<String>,
}

impl NumericCoercion {
    /// Nulls the column holds after coercion.
    pub fn null_count(&self) -> usize {
        self.already_null + self.failed
    }
}

/// Outcome of parsing one column as calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCoercion {
    pub table: TableKind,
    pub column: String,
    pub parsed: usize,
    pub already_null: usize,
    pub failed: usize,
}

/// Everything the cleaner changed, cell counts only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningReport {
    pub sentinel_replacements: usize,
    pub numeric: Vec<NumericCoercion>,
    pub dates: Vec<DateCoercion>,
    pub actions: Vec<String>,
}

impl CleaningReport {
    pub fn numeric_column(&self, column: &str) -> Option<&NumericCoercion> {
        self.numeric.iter().find(|c| c.column == column)
    }

    pub fn date_column(&self, column: &str) -> Option<&DateCoercion> {
        self.dates.iter().find(|c| c.column == column)
    }
}

// ============================================================================
// Aggregate reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandReceiptCount {
    /// `None` is the group of products without a brand.
    pub brand: Option<String>,
    pub receipt_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSales {
    pub brand: Option<String>,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUser {
    pub user_id: Option<String>,
    pub receipt_count: u64,
}

/// Results of the three aggregate queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResults {
    /// Latest scan date in the transactions table, the reference date of
    /// both brand reports.
    pub reference_date: Option<NaiveDate>,
    pub top_brands_by_receipts: Vec<BrandReceiptCount>,
    pub top_brands_by_sales: Vec<BrandSales>,
    pub power_users: Vec<PowerUser>,
}

/// Paths of the charts written to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedCharts {
    pub transactions_over_time: Option<PathBuf>,
    pub top_categories: Option<PathBuf>,
}

/// Everything one run of the pipeline produced.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub shapes: [(TableKind, (usize, usize)); 3],
    pub raw_audit: RawAuditReport,
    pub cleaning: CleaningReport,
    pub cleaned_audit: CleanedAuditReport,
    pub charts: RenderedCharts,
    pub queries: QueryResults,
    pub duration_ms: u64,
}
