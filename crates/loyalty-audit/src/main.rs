//! CLI entry point for the loyalty data audit.

use anyhow::{anyhow, Result};
use clap::Parser;
use loyalty_audit::{
    AuditConfig, AuditOutcome, AuditPipeline, PRODUCTS_FILE, TRANSACTIONS_FILE, USERS_FILE,
};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Loyalty receipt data quality audit",
    long_about = "Audits the users, transactions and products exports of a loyalty program,\n\
                  cleans them, renders two charts and answers three aggregate questions.\n\n\
                  INPUT FILES (read from the working directory):\n  \
                  USER_TAKEHOME.csv\n  \
                  TRANSACTION_TAKEHOME.csv\n  \
                  PRODUCTS_TAKEHOME.csv\n\n\
                  EXAMPLES:\n  \
                  loyalty-audit --output charts/\n\n  \
                  # Skip chart rendering\n  \
                  loyalty-audit --no-charts"
)]
struct Args {
    /// Output directory for the rendered charts
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final report)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    let config = AuditConfig::builder()
        .output_dir(&args.output)
        .render_charts(!args.no_charts)
        .build()?;

    let pipeline = AuditPipeline::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;

    info!("{}", "=".repeat(80));
    info!(
        "Starting loyalty data audit in {}",
        pipeline.config().data_dir.display()
    );
    info!("{}", "=".repeat(80));

    match pipeline.run() {
        Ok(outcome) => {
            print_report(&outcome);
            Ok(())
        }
        Err(e) => {
            error!("Audit failed [{}]: {}", e.error_code(), e);
            if e.is_load_failure() {
                error!(
                    "Expected {}, {} and {} in the working directory",
                    USERS_FILE, TRANSACTIONS_FILE, PRODUCTS_FILE
                );
            }
            Err(anyhow!("Audit failed: {}", e))
        }
    }
}

fn print_report(outcome: &AuditOutcome) {
    println!();
    println!("{}", "=".repeat(80));
    println!("LOYALTY DATA AUDIT");
    println!("{}", "=".repeat(80));
    println!();

    println!("Tables:");
    for (kind, (rows, cols)) in &outcome.shapes {
        println!("  {:<14} {} rows x {} columns", kind.name(), rows, cols);
    }
    println!();

    print_raw_audit(outcome);
    print_cleaning(outcome);
    print_cleaned_audit(outcome);
    print_queries(outcome);

    let charts = &outcome.charts;
    if charts.transactions_over_time.is_some() || charts.top_categories.is_some() {
        println!("Charts:");
        for path in [&charts.transactions_over_time, &charts.top_categories]
            .into_iter()
            .flatten()
        {
            println!("  {}", path.display());
        }
        println!();
    }

    println!("Completed in {}ms", outcome.duration_ms);
    println!("{}", "=".repeat(80));
}

fn print_raw_audit(outcome: &AuditOutcome) {
    let raw = &outcome.raw_audit;

    println!("Missing Values (raw):");
    println!("{}", "-".repeat(40));
    for profile in &raw.profiles {
        println!("  {}", profile.table.name());
        for (nulls, dtype) in profile.null_counts.iter().zip(&profile.dtypes) {
            println!(
                "    {:<16} {:>8} missing  ({})",
                nulls.column, nulls.null_count, dtype.dtype
            );
        }
    }
    println!();

    println!("Duplicate Keys:");
    println!("{}", "-".repeat(40));
    for check in &raw.duplicate_checks {
        println!(
            "  {} ({}): {}",
            check.table.name(),
            check.key_columns.join(", "),
            check.duplicate_count
        );
    }
    println!();

    let non_numeric = &raw.non_numeric;
    println!(
        "Non-numeric {} values: {} rows",
        non_numeric.column, non_numeric.row_count
    );
    if !non_numeric.sample_values.is_empty() {
        let sample: Vec<&str> = non_numeric
            .sample_values
            .iter()
            .map(|v| v.as_deref().unwrap_or("null"))
            .collect();
        println!("  e.g. {}", sample.join(", "));
    }
    println!();
}

fn print_cleaning(outcome: &AuditOutcome) {
    println!("Cleaning:");
    println!("{}", "-".repeat(40));
    for action in &outcome.cleaning.actions {
        println!("  - {}", action);
    }
    for coercion in &outcome.cleaning.numeric {
        if !coercion.failed_samples.is_empty() {
            println!(
                "  ! {} unparseable examples: {}",
                coercion.column,
                coercion.failed_samples.join(", ")
            );
        }
    }
    println!();
}

fn print_cleaned_audit(outcome: &AuditOutcome) {
    let cleaned = &outcome.cleaned_audit;

    println!("Negative Values:");
    for check in &cleaned.negative_values {
        println!("  {:<16} {}", check.column, check.negative_count);
    }
    println!();

    println!("Referential Integrity:");
    for check in &cleaned.referential {
        println!(
            "  {}.{} not in {}.{}: {}",
            check.child.name(),
            check.fk_column,
            check.parent.name(),
            check.pk_column,
            check.unmatched_count
        );
    }
    println!();

    println!("Distinct Values:");
    for check in &cleaned.cardinality {
        println!(
            "  {}.{}: {}",
            check.table.name(),
            check.column,
            check.unique_count
        );
    }
    println!();

    println!("Date Ranges:");
    for check in &cleaned.date_ranges {
        match (check.range.min, check.range.max) {
            (Some(min), Some(max)) => {
                println!("  {}.{}: {} to {}", check.table.name(), check.column, min, max)
            }
            _ => println!("  {}.{}: no parsed dates", check.table.name(), check.column),
        }
    }
    println!();
}

fn print_queries(outcome: &AuditOutcome) {
    let queries = &outcome.queries;
    let brand_name = |brand: &Option<String>| brand.clone().unwrap_or_else(|| "(no brand)".into());

    if let Some(date) = queries.reference_date {
        println!("Reference date (latest scan): {}", date);
        println!();
    }

    println!("Top Brands by Receipts Scanned (users 21+):");
    println!("{}", "-".repeat(40));
    for (rank, row) in queries.top_brands_by_receipts.iter().enumerate() {
        println!(
            "  {:>2}. {:<30} {:>8}",
            rank + 1,
            brand_name(&row.brand),
            row.receipt_count
        );
    }
    println!();

    println!("Top Brands by Sales (accounts 6+ months old):");
    println!("{}", "-".repeat(40));
    for (rank, row) in queries.top_brands_by_sales.iter().enumerate() {
        println!(
            "  {:>2}. {:<30} {:>12.2}",
            rank + 1,
            brand_name(&row.brand),
            row.total_sales
        );
    }
    println!();

    println!("Power Users:");
    println!("{}", "-".repeat(40));
    for (rank, row) in queries.power_users.iter().enumerate() {
        println!(
            "  {:>2}. {:<30} {:>8}",
            rank + 1,
            row.user_id.as_deref().unwrap_or("(no user)"),
            row.receipt_count
        );
    }
    println!();
}
