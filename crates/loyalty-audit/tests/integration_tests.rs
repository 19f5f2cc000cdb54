//! Integration tests for the loyalty data audit.
//!
//! These tests run the loader, auditor, cleaner and reports end to end over
//! the small exports in `tests/fixtures`, whose anomalies are known:
//! a duplicated `(RECEIPT_ID, BARCODE)` pair, a duplicated product barcode,
//! a `"zero"` and a `"three"` quantity, an orphaned user, an orphaned
//! barcode, a transaction without user or scan date, an under-age user and
//! a recently created account.

use loyalty_audit::{
    AuditConfig, AuditError, AuditPipeline, AuditStage, BrandReceiptCount, DataCleaner,
    DatasetLoader, Datasets, QualityAuditor, QueryStore, TableKind,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixtures() -> Datasets {
    DatasetLoader::load_all(&fixtures_path()).expect("Fixtures should load")
}

fn config_without_charts() -> AuditConfig {
    AuditConfig::builder()
        .data_dir(fixtures_path())
        .render_charts(false)
        .build()
        .unwrap()
}

fn brand(name: Option<&str>, receipt_count: u64) -> BrandReceiptCount {
    BrandReceiptCount {
        brand: name.map(str::to_string),
        receipt_count,
    }
}

// ============================================================================
// Loading and Raw Audit
// ============================================================================

#[test]
fn test_load_fixture_shapes() {
    let datasets = load_fixtures();
    assert_eq!(
        datasets.shapes(),
        [
            (TableKind::Users, (5, 6)),
            (TableKind::Transactions, (15, 8)),
            (TableKind::Products, (7, 7)),
        ]
    );
    assert_eq!(
        datasets.transactions.column("BARCODE").unwrap().dtype(),
        &DataType::String
    );
}

#[test]
fn test_raw_audit_findings() {
    let report = QualityAuditor::audit_raw(&load_fixtures()).unwrap();

    let duplicates: Vec<(TableKind, usize)> = report
        .duplicate_checks
        .iter()
        .map(|c| (c.table, c.duplicate_count))
        .collect();
    assert_eq!(
        duplicates,
        vec![
            (TableKind::Users, 0),
            (TableKind::Products, 1),
            (TableKind::Transactions, 1),
        ]
    );

    assert_eq!(report.non_numeric.row_count, 2);
    assert_eq!(
        report.non_numeric.sample_values,
        vec![Some("zero".to_string()), Some("three".to_string())]
    );

    let transactions = report
        .profiles
        .iter()
        .find(|p| p.table == TableKind::Transactions)
        .unwrap();
    let nulls_of = |column: &str| {
        transactions
            .null_counts
            .iter()
            .find(|c| c.column == column)
            .unwrap()
            .null_count
    };
    assert_eq!(nulls_of("SCAN_DATE"), 1);
    assert_eq!(nulls_of("USER_ID"), 1);
    assert_eq!(nulls_of("FINAL_SALE"), 1);
    assert_eq!(nulls_of("FINAL_QUANTITY"), 0);
}

#[test]
fn test_referential_check_returns_orphans() {
    let datasets = load_fixtures();
    let orphans = QualityAuditor::check_referential(
        &datasets.transactions,
        &datasets.users,
        "USER_ID",
        "ID",
    )
    .unwrap();

    let receipts: Vec<Option<&str>> = orphans
        .column("RECEIPT_ID")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(receipts, vec![Some("r10"), Some("r12")]);
}

// ============================================================================
// Cleaning and Cleaned Audit
// ============================================================================

#[test]
fn test_cleaning_accounts_for_every_null() {
    let datasets = load_fixtures();
    let (cleaned, report) = DataCleaner
        .clean(&datasets, &AuditConfig::default())
        .unwrap();

    assert_eq!(report.sentinel_replacements, 1);
    let quantity = report.numeric_column("FINAL_QUANTITY").unwrap();
    assert_eq!(quantity.failed, 1);
    assert_eq!(quantity.failed_samples, vec!["three".to_string()]);
    assert_eq!(
        cleaned.transactions.column("FINAL_QUANTITY").unwrap().null_count(),
        quantity.already_null + quantity.failed
    );
    assert_eq!(cleaned.transactions.height(), datasets.transactions.height());

    // The "zero" row now holds 0
    let zero_row = cleaned
        .transactions
        .column("FINAL_QUANTITY")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .get(2);
    assert_eq!(zero_row, Some(0.0));
}

#[test]
fn test_cleaned_audit_findings() {
    let (cleaned, _) = DataCleaner
        .clean(&load_fixtures(), &AuditConfig::default())
        .unwrap();
    let report = QualityAuditor::audit_cleaned(&cleaned).unwrap();

    let negatives: Vec<(String, usize)> = report
        .negative_values
        .iter()
        .map(|c| (c.column.clone(), c.negative_count))
        .collect();
    assert_eq!(
        negatives,
        vec![
            ("FINAL_QUANTITY".to_string(), 1),
            ("FINAL_SALE".to_string(), 1),
        ]
    );

    let orphans: Vec<usize> = report.referential.iter().map(|c| c.unmatched_count).collect();
    assert_eq!(orphans, vec![2, 1]);

    let cardinality: Vec<(String, usize)> = report
        .cardinality
        .iter()
        .map(|c| (c.column.clone(), c.unique_count))
        .collect();
    assert_eq!(
        cardinality,
        vec![
            ("STATE".to_string(), 4),
            ("LANGUAGE".to_string(), 2),
            ("GENDER".to_string(), 2),
            ("CATEGORY_1".to_string(), 4),
        ]
    );

    let scan = report
        .date_ranges
        .iter()
        .find(|c| c.column == "SCAN_DATE")
        .unwrap();
    assert_eq!(scan.range.min, chrono::NaiveDate::from_ymd_opt(2024, 6, 1));
    assert_eq!(scan.range.max, chrono::NaiveDate::from_ymd_opt(2024, 9, 8));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_queries_over_fixtures() {
    let (cleaned, _) = DataCleaner
        .clean(&load_fixtures(), &AuditConfig::default())
        .unwrap();
    let mut store = QueryStore::new(&cleaned).unwrap();
    assert_eq!(
        store.reference_date(),
        chrono::NaiveDate::from_ymd_opt(2024, 9, 8)
    );

    // u4 is under 21 and u5 has no birth date; r7's product has no brand
    assert_eq!(
        store.top_brands_by_receipts(21, 5).unwrap(),
        vec![
            brand(Some("DORITOS"), 3),
            brand(Some("COCA-COLA"), 2),
            brand(Some("OREO"), 2),
            brand(Some("CVS"), 1),
            brand(None, 1),
        ]
    );

    // u3 joined less than six months before the latest scan
    let sales: Vec<(Option<String>, f64)> = store
        .top_brands_by_sales(6, 5)
        .unwrap()
        .into_iter()
        .map(|b| (b.brand, b.total_sales))
        .collect();
    let expected = [
        ("OREO", 15.0),
        ("DORITOS", 12.99),
        ("COCA-COLA", 3.99),
        ("CVS", -1.5),
    ];
    assert_eq!(sales.len(), expected.len());
    for ((brand, total), (expected_brand, expected_total)) in sales.iter().zip(expected) {
        assert_eq!(brand.as_deref(), Some(expected_brand));
        assert!(
            (total - expected_total).abs() < 1e-9,
            "{} total {} != {}",
            expected_brand,
            total,
            expected_total
        );
    }

    let users: Vec<(Option<String>, u64)> = store
        .power_users(10)
        .unwrap()
        .into_iter()
        .map(|u| (u.user_id, u.receipt_count))
        .collect();
    assert_eq!(
        users,
        vec![
            (Some("u2".to_string()), 4),
            (Some("u1".to_string()), 3),
            (Some("u3".to_string()), 2),
            (Some("u4".to_string()), 1),
            (Some("u5".to_string()), 1),
            (Some("u9".to_string()), 1),
            (None, 1),
        ]
    );
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline_over_fixtures() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();

    let outcome = AuditPipeline::builder()
        .config(config_without_charts())
        .on_progress(move |update| {
            let mut seen = stages_clone.lock().unwrap();
            if seen.last() != Some(&update.stage) {
                seen.push(update.stage);
            }
        })
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(outcome.shapes[1], (TableKind::Transactions, (15, 8)));
    assert_eq!(outcome.cleaning.sentinel_replacements, 1);
    assert_eq!(outcome.queries.top_brands_by_receipts.len(), 5);
    assert_eq!(outcome.queries.top_brands_by_sales.len(), 4);
    assert_eq!(outcome.queries.power_users.len(), 7);
    assert!(outcome.charts.transactions_over_time.is_none());

    assert_eq!(
        stages.lock().unwrap().as_slice(),
        &[
            AuditStage::Loading,
            AuditStage::RawAudit,
            AuditStage::Cleaning,
            AuditStage::CleanedAudit,
            AuditStage::Querying,
            AuditStage::Complete,
        ]
    );
}

#[test]
fn test_pipeline_renders_charts() {
    let output = tempfile::tempdir().unwrap();
    let config = AuditConfig::builder()
        .data_dir(fixtures_path())
        .output_dir(output.path())
        .build()
        .unwrap();

    let outcome = AuditPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run_on(load_fixtures())
        .unwrap();

    let line_chart = outcome.charts.transactions_over_time.unwrap();
    let bar_chart = outcome.charts.top_categories.unwrap();
    assert_eq!(line_chart, output.path().join("transactions_over_time.svg"));
    assert!(line_chart.exists());
    assert!(bar_chart.exists());
}

#[test]
fn test_pipeline_limits_from_config() {
    let config = AuditConfig::builder()
        .render_charts(false)
        .top_brands_limit(2)
        .top_users_limit(1)
        .build()
        .unwrap();

    let outcome = AuditPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run_on(load_fixtures())
        .unwrap();

    assert_eq!(
        outcome.queries.top_brands_by_receipts,
        vec![brand(Some("DORITOS"), 3), brand(Some("COCA-COLA"), 2)]
    );
    assert_eq!(outcome.queries.power_users.len(), 1);
    assert_eq!(
        outcome.queries.power_users[0].user_id.as_deref(),
        Some("u2")
    );
}

#[test]
fn test_pipeline_missing_input_is_fatal() {
    let empty = tempfile::tempdir().unwrap();
    let config = AuditConfig::builder()
        .data_dir(empty.path())
        .render_charts(false)
        .build()
        .unwrap();

    let err = AuditPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run()
        .unwrap_err();

    assert!(matches!(err, AuditError::FileNotFound(ref path) if path.ends_with("USER_TAKEHOME.csv")));
    assert_eq!(err.error_code(), "FILE_NOT_FOUND");

    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["code"], "FILE_NOT_FOUND");
}
