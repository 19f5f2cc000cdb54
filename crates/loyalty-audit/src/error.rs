//! Custom error types for the audit pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Load, query and
//! chart failures are fatal and surface here; cell-level parse failures never
//! do (they become nulls and are counted by the cleaner).
//!
//! Errors are serializable so a caller can forward them as `{ code, message }`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the audit pipeline.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Column was not found in a table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A table could not be read from disk.
    #[error("Failed to load {table} table: {reason}")]
    LoadFailed { table: String, reason: String },

    /// A quality check failed to run.
    #[error("Failed to audit data: {0}")]
    AuditFailed(String),

    /// Data cleaning failed.
    #[error("Failed to clean data: {0}")]
    CleaningFailed(String),

    /// Chart rendering failed.
    #[error("Failed to render chart: {0}")]
    ChartRenderFailed(String),

    /// An aggregate query against the in-memory store failed.
    #[error("Query '{query}' failed: {reason}")]
    QueryFailed { query: String, reason: String },
}

impl AuditError {
    /// Stable error code, independent of the message text.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::LoadFailed { .. } => "LOAD_FAILED",
            Self::AuditFailed(_) => "AUDIT_FAILED",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::ChartRenderFailed(_) => "CHART_RENDER_FAILED",
            Self::QueryFailed { .. } => "QUERY_FAILED",
        }
    }

    /// Check if this error happened while reading the input tables.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::LoadFailed { .. })
    }
}

impl From<crate::config::ConfigValidationError> for AuditError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        AuditError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AuditError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AuditError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
