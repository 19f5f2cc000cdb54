//! Main audit pipeline module.
//!
//! This module provides the core `AuditPipeline` struct and builder for
//! orchestrating load, audit, clean, chart and query stages.

use crate::cleaner::DataCleaner;
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::loader::DatasetLoader;
use crate::pipeline::progress::{
    AuditStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::quality::QualityAuditor;
use crate::reporting::{ChartRenderer, QueryStore};
use crate::types::{AuditOutcome, Datasets, QueryResults, RenderedCharts};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The audit pipeline.
///
/// Use [`AuditPipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use loyalty_audit::{AuditConfig, AuditPipeline};
///
/// let outcome = AuditPipeline::builder()
///     .config(AuditConfig::builder().data_dir("data").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// println!("{} power users", outcome.queries.power_users.len());
/// ```
pub struct AuditPipeline {
    config: AuditConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    charts: ChartRenderer,
}

static_assertions::assert_impl_all!(AuditPipeline: Send);

impl AuditPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> AuditPipelineBuilder {
        AuditPipelineBuilder::default()
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Load the three tables from the configured directory and run every stage.
    pub fn run(&self) -> Result<AuditOutcome> {
        self.finish(self.run_internal(None))
    }

    /// Run every stage after loading on tables already in memory.
    pub fn run_on(&self, datasets: Datasets) -> Result<AuditOutcome> {
        self.finish(self.run_internal(Some(datasets)))
    }

    fn finish(&self, result: Result<AuditOutcome>) -> Result<AuditOutcome> {
        match result {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete("Audit completed successfully"));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, preloaded: Option<Datasets>) -> Result<AuditOutcome> {
        let start_time = Instant::now();
        info!("Starting loyalty data audit...");

        // Step 1: Load
        let datasets = match preloaded {
            Some(datasets) => datasets,
            None => self.load()?,
        };
        let shapes = datasets.shapes();

        // Step 2: Raw audit
        self.report_progress(ProgressUpdate::new(
            AuditStage::RawAudit,
            0.0,
            "Auditing raw tables...",
        ));
        info!("Step 2: Auditing raw tables...");
        let raw_audit = QualityAuditor::audit_raw(&datasets)
            .map_err(|e| AuditError::AuditFailed(e.to_string()))?;

        // Step 3: Clean
        self.report_progress(ProgressUpdate::new(
            AuditStage::Cleaning,
            0.0,
            "Cleaning numeric and date columns...",
        ));
        info!("Step 3: Cleaning...");
        let (cleaned, cleaning) = self
            .cleaner
            .clean(&datasets, &self.config)
            .map_err(|e| AuditError::CleaningFailed(e.to_string()))?;
        drop(datasets);

        // Step 4: Cleaned audit
        self.report_progress(ProgressUpdate::new(
            AuditStage::CleanedAudit,
            0.0,
            "Auditing cleaned tables...",
        ));
        info!("Step 4: Auditing cleaned tables...");
        let cleaned_audit = QualityAuditor::audit_cleaned(&cleaned)
            .map_err(|e| AuditError::AuditFailed(e.to_string()))?;

        // Step 5: Charts
        let charts = if self.config.render_charts {
            self.report_progress(ProgressUpdate::new(
                AuditStage::ChartRendering,
                0.0,
                "Rendering charts...",
            ));
            info!("Step 5: Rendering charts to {}", self.config.output_dir.display());
            self.charts
                .render(&cleaned.transactions, &cleaned.products)
                .map_err(|e| AuditError::ChartRenderFailed(e.to_string()))?
        } else {
            info!("Step 5: Skipping chart rendering (disabled)");
            RenderedCharts::default()
        };

        // Step 6: Queries
        let queries = self.run_queries(&cleaned)?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!("Audit finished in {} ms", duration_ms);

        Ok(AuditOutcome {
            shapes,
            raw_audit,
            cleaning,
            cleaned_audit,
            charts,
            queries,
            duration_ms,
        })
    }

    fn load(&self) -> Result<Datasets> {
        info!("Step 1: Loading tables from {}", self.config.data_dir.display());
        DatasetLoader::load_all_with(&self.config.data_dir, |idx, kind| {
            self.report_progress(ProgressUpdate::with_items(
                AuditStage::Loading,
                format!("Table: {}", kind),
                idx,
                3,
                format!("Loading {}...", DatasetLoader::file_name(kind)),
            ));
        })
    }

    fn run_queries(&self, cleaned: &Datasets) -> Result<QueryResults> {
        info!("Step 6: Running aggregate queries...");
        let query_failed = |query: &str| {
            let query = query.to_string();
            move |e: anyhow::Error| AuditError::QueryFailed {
                query,
                reason: e.to_string(),
            }
        };

        let mut store = QueryStore::new(cleaned).map_err(query_failed("register tables"))?;
        let reference_date = store.reference_date();
        match reference_date {
            Some(date) => info!("Reference date for age and tenure filters: {}", date),
            None => info!("SCAN_DATE has no parsed values; brand reports will be empty"),
        }

        self.report_progress(ProgressUpdate::with_items(
            AuditStage::Querying,
            "Query: top brands by receipts",
            0,
            3,
            "Ranking brands by receipts scanned...",
        ));
        let top_brands_by_receipts = store
            .top_brands_by_receipts(self.config.legal_age_years, self.config.top_brands_limit)
            .map_err(query_failed("top brands by receipts"))?;

        self.report_progress(ProgressUpdate::with_items(
            AuditStage::Querying,
            "Query: top brands by sales",
            1,
            3,
            "Ranking brands by sales...",
        ));
        let top_brands_by_sales = store
            .top_brands_by_sales(self.config.tenure_months, self.config.top_brands_limit)
            .map_err(query_failed("top brands by sales"))?;

        self.report_progress(ProgressUpdate::with_items(
            AuditStage::Querying,
            "Query: power users",
            2,
            3,
            "Ranking users by receipts...",
        ));
        let power_users = store
            .power_users(self.config.top_users_limit)
            .map_err(query_failed("power users"))?;

        Ok(QueryResults {
            reference_date,
            top_brands_by_receipts,
            top_brands_by_sales,
            power_users,
        })
    }
}

/// Builder for creating an [`AuditPipeline`] with custom configuration.
#[derive(Default)]
pub struct AuditPipelineBuilder {
    config: Option<AuditConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl AuditPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: AuditConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during the run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns [`AuditError::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<AuditPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let charts = ChartRenderer::new(config.output_dir.clone(), config.top_categories_limit);

        Ok(AuditPipeline {
            config,
            progress_reporter: self.progress_reporter,
            cleaner: DataCleaner,
            charts,
        })
    }
}
