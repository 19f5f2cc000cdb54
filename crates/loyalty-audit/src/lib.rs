//! Loyalty Data Audit Library
//!
//! Data quality audit and descriptive reporting for a loyalty program's
//! receipt data, built on Polars.
//!
//! # Overview
//!
//! The library works on three CSV exports (users, transactions, products) and
//! provides:
//!
//! - **Loading**: the three fixed-name files, key columns read as text
//! - **Quality Audit**: null counts, duplicate keys, column types, non-numeric
//!   quantities, negative values, orphaned foreign keys, cardinalities, date ranges
//! - **Cleaning**: quantity token rewrite, numeric coercion, date parsing; no
//!   row is ever dropped
//! - **Charts**: scans per day and top categories as SVG
//! - **Queries**: top brands by receipts and by sales, and power users, via SQL
//! - **Progress Reporting**: stage-by-stage progress updates
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use loyalty_audit::{AuditConfig, AuditPipeline};
//!
//! let config = AuditConfig::builder()
//!     .data_dir("data")
//!     .output_dir("output")
//!     .build()?;
//!
//! let outcome = AuditPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! for brand in &outcome.queries.top_brands_by_receipts {
//!     println!("{:?}: {}", brand.brand, brand.receipt_count);
//! }
//! ```
//!
//! # Individual Checks
//!
//! Every check is usable on its own:
//!
//! ```rust,ignore
//! use loyalty_audit::{DatasetLoader, QualityAuditor};
//!
//! let datasets = DatasetLoader::load_all(Path::new("data"))?;
//! let dupes = QualityAuditor::count_duplicates(&datasets.users, &["ID"])?;
//! let orphans = QualityAuditor::check_referential(
//!     &datasets.transactions,
//!     &datasets.users,
//!     "USER_ID",
//!     "ID",
//! )?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CellParseError, DataCleaner, parse_cell};
pub use config::{AuditConfig, AuditConfigBuilder, ConfigValidationError};
pub use error::{AuditError, Result as AuditResult};
pub use loader::{DatasetLoader, PRODUCTS_FILE, TRANSACTIONS_FILE, USERS_FILE};
pub use pipeline::{
    AuditPipeline, AuditPipelineBuilder, AuditStage, ClosureProgressReporter, ProgressReporter,
    ProgressUpdate,
};
pub use quality::{CompositeKey, KeyPart, QualityAuditor};
pub use reporting::{ChartRenderer, QueryStore, daily_scan_counts, top_values};
pub use types::{
    AuditOutcome, BrandReceiptCount, BrandSales, CleanedAuditReport, CleaningReport, Datasets,
    PowerUser, QueryResults, RawAuditReport, RenderedCharts, TableKind,
};
