//! Typed row keys for duplicate and foreign-key checks.
//!
//! A key keeps every part as its own typed value, so `("A_B", "1")` and
//! `("A", "B_1")` never collide and the text `"12"` is a different key from
//! the integer `12`.

use polars::prelude::*;

/// One cell of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// Stored as bits; `-0.0` and `0.0` stay distinct.
    Float(u64),
    Date(i32),
    Text(String),
    /// Any other dtype, compared by its display form.
    Other(String),
}

impl KeyPart {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<AnyValue<'_>> for KeyPart {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Self::Null,
            AnyValue::Boolean(b) => Self::Bool(b),
            AnyValue::Int8(v) => Self::Int(v as i64),
            AnyValue::Int16(v) => Self::Int(v as i64),
            AnyValue::Int32(v) => Self::Int(v as i64),
            AnyValue::Int64(v) => Self::Int(v),
            AnyValue::UInt8(v) => Self::UInt(v as u64),
            AnyValue::UInt16(v) => Self::UInt(v as u64),
            AnyValue::UInt32(v) => Self::UInt(v as u64),
            AnyValue::UInt64(v) => Self::UInt(v),
            AnyValue::Float32(v) => Self::Float((v as f64).to_bits()),
            AnyValue::Float64(v) => Self::Float(v.to_bits()),
            AnyValue::Date(days) => Self::Date(days),
            AnyValue::String(s) => Self::Text(s.to_string()),
            AnyValue::StringOwned(s) => Self::Text(s.to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

/// A row's values over one or more key columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(pub Vec<KeyPart>);

/// Build one key per row from the given columns.
pub(crate) fn row_keys(columns: &[&Series]) -> PolarsResult<Vec<CompositeKey>> {
    let height = columns.first().map_or(0, |s| s.len());
    let mut keys = Vec::with_capacity(height);

    for row in 0..height {
        let mut parts = Vec::with_capacity(columns.len());
        for series in columns {
            parts.push(KeyPart::from(series.get(row)?));
        }
        keys.push(CompositeKey(parts));
    }

    Ok(keys)
}

/// Keys of a single column, one part each.
pub(crate) fn column_keys(series: &Series) -> PolarsResult<Vec<KeyPart>> {
    (0..series.len())
        .map(|row| series.get(row).map(KeyPart::from))
        .collect()
}
