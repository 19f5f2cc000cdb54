//! Configuration types for the audit pipeline.
//!
//! The input file names are fixed constants (see [`crate::loader`]); this
//! configuration only carries where to find them, where charts go, and the
//! thresholds the reports use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the audit pipeline.
///
/// Use [`AuditConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use loyalty_audit::AuditConfig;
///
/// let config = AuditConfig::builder()
///     .data_dir("data")
///     .render_charts(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory containing the three input CSV files.
    /// Default: "."
    pub data_dir: PathBuf,

    /// Directory the rendered charts are written to.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Whether to render the two charts.
    /// Default: true
    pub render_charts: bool,

    /// Minimum age (in years, as of the latest scan date) for the receipts report.
    /// Default: 21
    pub legal_age_years: u32,

    /// Minimum account age (in months, as of the latest scan date) for the sales report.
    /// Default: 6
    pub tenure_months: u32,

    /// Number of brands listed by the two brand reports.
    /// Default: 5
    pub top_brands_limit: usize,

    /// Number of users listed by the power users report.
    /// Default: 10
    pub top_users_limit: usize,

    /// Number of categories drawn in the category chart.
    /// Default: 10
    pub top_categories_limit: usize,

    /// Literal quantity token rewritten to "0" before numeric parsing.
    /// Default: "zero"
    pub quantity_sentinel: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            render_charts: true,
            legal_age_years: 21,
            tenure_months: 6,
            top_brands_limit: 5,
            top_users_limit: 10,
            top_categories_limit: 10,
            quantity_sentinel: "zero".to_string(),
        }
    }
}

impl AuditConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let limits = [
            ("legal_age_years", self.legal_age_years as usize),
            ("tenure_months", self.tenure_months as usize),
            ("top_brands_limit", self.top_brands_limit),
            ("top_users_limit", self.top_users_limit),
            ("top_categories_limit", self.top_categories_limit),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigValidationError::ZeroValue {
                    field: field.to_string(),
                });
            }
        }

        if self.quantity_sentinel.trim().is_empty() {
            return Err(ConfigValidationError::EmptySentinel);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': must be at least 1")]
    ZeroValue { field: String },

    #[error("Quantity sentinel must not be empty")]
    EmptySentinel,
}

/// Builder for [`AuditConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AuditConfigBuilder {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    render_charts: Option<bool>,
    legal_age_years: Option<u32>,
    tenure_months: Option<u32>,
    top_brands_limit: Option<usize>,
    top_users_limit: Option<usize>,
    top_categories_limit: Option<usize>,
    quantity_sentinel: Option<String>,
}

impl AuditConfigBuilder {
    /// Set the directory holding the input files.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Set the output directory for rendered charts.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Enable or disable chart rendering.
    pub fn render_charts(mut self, render: bool) -> Self {
        self.render_charts = Some(render);
        self
    }

    pub fn legal_age_years(mut self, years: u32) -> Self {
        self.legal_age_years = Some(years);
        self
    }

    pub fn tenure_months(mut self, months: u32) -> Self {
        self.tenure_months = Some(months);
        self
    }

    pub fn top_brands_limit(mut self, limit: usize) -> Self {
        self.top_brands_limit = Some(limit);
        self
    }

    pub fn top_users_limit(mut self, limit: usize) -> Self {
        self.top_users_limit = Some(limit);
        self
    }

    pub fn top_categories_limit(mut self, limit: usize) -> Self {
        self.top_categories_limit = Some(limit);
        self
    }

    /// Set the quantity token that is rewritten to "0".
    pub fn quantity_sentinel(mut self, token: impl Into<String>) -> Self {
        self.quantity_sentinel = Some(token.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AuditConfig` or an error if validation fails.
    pub fn build(self) -> Result<AuditConfig, ConfigValidationError> {
        let defaults = AuditConfig::default();
        let config = AuditConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            render_charts: self.render_charts.unwrap_or(defaults.render_charts),
            legal_age_years: self.legal_age_years.unwrap_or(defaults.legal_age_years),
            tenure_months: self.tenure_months.unwrap_or(defaults.tenure_months),
            top_brands_limit: self.top_brands_limit.unwrap_or(defaults.top_brands_limit),
            top_users_limit: self.top_users_limit.unwrap_or(defaults.top_users_limit),
            top_categories_limit: self
                .top_categories_limit
                .unwrap_or(defaults.top_categories_limit),
            quantity_sentinel: self.quantity_sentinel.unwrap_or(defaults.quantity_sentinel),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.legal_age_years, 21);
        assert_eq!(config.tenure_months, 6);
        assert_eq!(config.top_brands_limit, 5);
        assert_eq!(config.top_users_limit, 10);
        assert_eq!(config.quantity_sentinel, "zero");
        assert!(config.render_charts);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AuditConfig::builder()
            .data_dir("fixtures")
            .output_dir("charts")
            .render_charts(false)
            .top_users_limit(3)
            .build()
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("fixtures"));
        assert_eq!(config.output_dir, PathBuf::from("charts"));
        assert!(!config.render_charts);
        assert_eq!(config.top_users_limit, 3);
        assert_eq!(config.top_brands_limit, 5);
    }

    #[test]
    fn test_validation_zero_limit() {
        let result = AuditConfig::builder().top_brands_limit(0).build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroValue { field } if field == "top_brands_limit"
        ));
    }

    #[test]
    fn test_validation_empty_sentinel() {
        let result = AuditConfig::builder().quantity_sentinel("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptySentinel
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "data_dir": "/data/takehome",
            "output_dir": "plots",
            "render_charts": false,
            "legal_age_years": 18,
            "tenure_months": 12,
            "top_brands_limit": 3,
            "top_users_limit": 20,
            "top_categories_limit": 5,
            "quantity_sentinel": "zero"
        }"#;

        let config: AuditConfig = serde_json::from_str(json).expect("valid config json");
        assert_eq!(config.legal_age_years, 18);
        assert_eq!(config.tenure_months, 12);
        assert!(config.validate().is_ok());
    }
}
