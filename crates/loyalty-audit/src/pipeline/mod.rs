//! Pipeline module.
//!
//! This module provides the audit pipeline and its progress reporting types.

mod builder;
pub mod progress;

pub use builder::{AuditPipeline, AuditPipelineBuilder};
pub use progress::{AuditStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
