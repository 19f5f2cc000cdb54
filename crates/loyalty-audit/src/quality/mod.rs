//! Data quality audit module.
//!
//! This module provides the read-only checks run over the three tables:
//! missing values, duplicate keys, column types, non-numeric text, negative
//! amounts, orphaned foreign keys, categorical cardinality and date ranges.

mod analyzer;
pub mod keys;

pub use analyzer::QualityAuditor;
pub use keys::{CompositeKey, KeyPart};
