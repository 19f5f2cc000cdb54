//! Descriptive reporting over the cleaned tables.
//!
//! Two observational outputs:
//! - [`ChartRenderer`] writes a scans-per-day line chart and a top categories
//!   bar chart as SVG files
//! - [`QueryStore`] answers the brand and power-user questions with SQL over
//!   an in-memory context
//!
//! # Example
//!
//! ```rust,ignore
//! use loyalty_audit::reporting::{ChartRenderer, QueryStore};
//!
//! let charts = ChartRenderer::new("output", 10).render(&cleaned.transactions, &cleaned.products)?;
//!
//! let mut store = QueryStore::new(&cleaned)?;
//! for user in store.power_users(10)? {
//!     println!("{:?}: {}", user.user_id, user.receipt_count);
//! }
//! ```

mod charts;
mod queries;

pub use charts::{
    daily_scan_counts, top_values, ChartRenderer, CATEGORIES_CHART_FILE, TRANSACTIONS_CHART_FILE,
};
pub use queries::QueryStore;
