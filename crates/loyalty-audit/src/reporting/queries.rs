//! SQL aggregate queries over the cleaned tables.
//!
//! Date filters are relative to the latest scan date in the data, never to
//! the wall clock. Ranked results break count ties by identifier ascending
//! with nulls last.

use crate::quality::QualityAuditor;
use crate::types::{columns, BrandReceiptCount, BrandSales, Datasets, PowerUser};
use crate::utils::{months_before, text_values, years_before};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use polars::sql::SQLContext;
use tracing::{debug, info};

/// In-memory SQL store holding the `users`, `transactions` and `products` tables.
pub struct QueryStore {
    ctx: SQLContext,
    reference_date: Option<NaiveDate>,
}

impl QueryStore {
    /// Register the cleaned tables.
    ///
    /// The reference date is the maximum parsed `SCAN_DATE`, if any.
    pub fn new(datasets: &Datasets) -> Result<Self> {
        let reference_date =
            QualityAuditor::date_range(&datasets.transactions, columns::SCAN_DATE)?.max;

        let mut ctx = SQLContext::new();
        ctx.register("users", datasets.users.clone().lazy());
        ctx.register("transactions", datasets.transactions.clone().lazy());
        ctx.register("products", datasets.products.clone().lazy());

        debug!("Query store ready, reference date {:?}", reference_date);
        Ok(Self {
            ctx,
            reference_date,
        })
    }

    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }

    /// Run a statement and collect its result.
    pub fn execute(&mut self, sql: &str) -> Result<DataFrame> {
        debug!("Executing SQL: {}", sql);
        let df = self.ctx.execute(sql)?.collect()?;
        Ok(df)
    }

    /// Brands with the most distinct receipts among users of at least
    /// `legal_age_years` as of the reference date.
    pub fn top_brands_by_receipts(
        &mut self,
        legal_age_years: u32,
        limit: usize,
    ) -> Result<Vec<BrandReceiptCount>> {
        let Some(cutoff) = self.cutoff(|date| years_before(date, legal_age_years))? else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT p.BRAND AS brand, COUNT(DISTINCT t.RECEIPT_ID) AS receipt_count \
             FROM transactions t \
             INNER JOIN products p ON t.BARCODE = p.BARCODE \
             INNER JOIN users u ON t.USER_ID = u.ID \
             WHERE u.BIRTH_DATE <= CAST('{cutoff}' AS DATE) \
             GROUP BY p.BRAND \
             ORDER BY receipt_count DESC, brand ASC NULLS LAST \
             LIMIT {limit}",
            cutoff = cutoff.format("%Y-%m-%d"),
        );
        let df = self.execute(&sql)?;

        let brands = text_values(df.column("brand")?.as_materialized_series())?;
        let counts = count_values(&df, "receipt_count")?;
        Ok(brands
            .into_iter()
            .zip(counts)
            .map(|(brand, receipt_count)| BrandReceiptCount {
                brand,
                receipt_count,
            })
            .collect())
    }

    /// Brands with the highest total sales among users whose account is at
    /// least `tenure_months` old as of the reference date.
    pub fn top_brands_by_sales(
        &mut self,
        tenure_months: u32,
        limit: usize,
    ) -> Result<Vec<BrandSales>> {
        let Some(cutoff) = self.cutoff(|date| months_before(date, tenure_months))? else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT p.BRAND AS brand, SUM(COALESCE(t.FINAL_SALE, 0.0)) AS total_sales \
             FROM transactions t \
             INNER JOIN products p ON t.BARCODE = p.BARCODE \
             INNER JOIN users u ON t.USER_ID = u.ID \
             WHERE u.CREATED_DATE <= CAST('{cutoff}' AS DATE) \
             GROUP BY p.BRAND \
             ORDER BY total_sales DESC, brand ASC NULLS LAST \
             LIMIT {limit}",
            cutoff = cutoff.format("%Y-%m-%d"),
        );
        let df = self.execute(&sql)?;

        let brands = text_values(df.column("brand")?.as_materialized_series())?;
        let totals = df
            .column("total_sales")?
            .cast(&DataType::Float64)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect::<Vec<_>>();
        Ok(brands
            .into_iter()
            .zip(totals)
            .map(|(brand, total_sales)| BrandSales { brand, total_sales })
            .collect())
    }

    /// Users with the most distinct receipts.
    pub fn power_users(&mut self, limit: usize) -> Result<Vec<PowerUser>> {
        let sql = format!(
            "SELECT USER_ID AS user_id, COUNT(DISTINCT RECEIPT_ID) AS receipt_count \
             FROM transactions \
             GROUP BY USER_ID \
             ORDER BY receipt_count DESC, user_id ASC NULLS LAST \
             LIMIT {limit}"
        );
        let df = self.execute(&sql)?;

        let users = text_values(df.column("user_id")?.as_materialized_series())?;
        let counts = count_values(&df, "receipt_count")?;
        Ok(users
            .into_iter()
            .zip(counts)
            .map(|(user_id, receipt_count)| PowerUser {
                user_id,
                receipt_count,
            })
            .collect())
    }

    fn cutoff(
        &self,
        shift: impl Fn(NaiveDate) -> Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>> {
        match self.reference_date {
            None => {
                info!("No parsed scan dates, date-filtered query returns no rows");
                Ok(None)
            }
            Some(date) => shift(date)
                .map(Some)
                .ok_or_else(|| anyhow!("date cutoff before {} is out of range", date)),
        }
    }
}

fn count_values(df: &DataFrame, column: &str) -> Result<Vec<u64>> {
    let counts = df
        .column(column)?
        .cast(&DataType::UInt64)
        .with_context(|| format!("column '{}' is not a count", column))?;
    Ok(counts
        .as_materialized_series()
        .u64()?
        .into_iter()
        .map(|v| v.unwrap_or(0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::date_to_days;
    use pretty_assertions::assert_eq;

    fn date_column(name: &str, dates: &[Option<(i32, u32, u32)>]) -> Column {
        let days: Vec<Option<i32>> = dates
            .iter()
            .map(|d| {
                d.and_then(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day))
                    .map(date_to_days)
            })
            .collect();
        Series::new(name.into(), days)
            .cast(&DataType::Date)
            .unwrap()
            .into()
    }

    fn sample_datasets() -> Datasets {
        let users = DataFrame::new(vec![
            Column::new("ID".into(), &["adult", "minor", "newbie"]),
            date_column(
                "BIRTH_DATE",
                &[Some((1990, 1, 1)), Some((2010, 1, 1)), Some((1980, 1, 1))],
            ),
            date_column(
                "CREATED_DATE",
                &[Some((2020, 1, 1)), Some((2020, 1, 1)), Some((2024, 8, 1))],
            ),
        ])
        .unwrap();

        let transactions = DataFrame::new(vec![
            Column::new("RECEIPT_ID".into(), &["r1", "r1", "r2", "r3", "r4", "r5"]),
            Column::new("BARCODE".into(), &["b1", "b2", "b1", "b2", "b2", "b9"]),
            Column::new(
                "USER_ID".into(),
                &["adult", "adult", "adult", "minor", "newbie", "ghost"],
            ),
            Column::new(
                "FINAL_SALE".into(),
                &[Some(2.0f64), Some(1.0), None, Some(5.0), Some(7.0), Some(9.0)],
            ),
            date_column(
                "SCAN_DATE",
                &[
                    Some((2024, 9, 1)),
                    Some((2024, 9, 1)),
                    Some((2024, 9, 2)),
                    Some((2024, 9, 3)),
                    None,
                    Some((2024, 9, 1)),
                ],
            ),
        ])
        .unwrap();

        let products = df!(
            "BARCODE" => &["b1", "b2"],
            "BRAND" => &["ACME", "BOLT"]
        )
        .unwrap();

        Datasets {
            users,
            transactions,
            products,
        }
    }

    /// One receipt per user, each for a product branded with the user's id,
    /// all scanned on `scan`.
    fn single_scan_datasets(
        scan: (i32, u32, u32),
        users: &[(&str, (i32, u32, u32), (i32, u32, u32))],
    ) -> Datasets {
        let ids: Vec<&str> = users.iter().map(|u| u.0).collect();
        let births: Vec<_> = users.iter().map(|u| Some(u.1)).collect();
        let created: Vec<_> = users.iter().map(|u| Some(u.2)).collect();

        Datasets {
            users: DataFrame::new(vec![
                Column::new("ID".into(), &ids),
                date_column("BIRTH_DATE", &births),
                date_column("CREATED_DATE", &created),
            ])
            .unwrap(),
            transactions: DataFrame::new(vec![
                Column::new("RECEIPT_ID".into(), &ids),
                Column::new("BARCODE".into(), &ids),
                Column::new("USER_ID".into(), &ids),
                Column::new("FINAL_SALE".into(), vec![1.0f64; ids.len()]),
                date_column("SCAN_DATE", &vec![Some(scan); ids.len()]),
            ])
            .unwrap(),
            products: DataFrame::new(vec![
                Column::new("BARCODE".into(), &ids),
                Column::new("BRAND".into(), &ids),
            ])
            .unwrap(),
        }
    }

    fn brands<T>(rows: Vec<T>, brand: impl Fn(T) -> Option<String>) -> Vec<String> {
        rows.into_iter().filter_map(brand).collect()
    }

    #[test]
    fn test_reference_date_is_max_scan() {
        let store = QueryStore::new(&sample_datasets()).unwrap();
        assert_eq!(store.reference_date(), NaiveDate::from_ymd_opt(2024, 9, 3));
    }

    #[test]
    fn test_top_brands_by_receipts_excludes_minors() {
        let mut store = QueryStore::new(&sample_datasets()).unwrap();
        let brands = store.top_brands_by_receipts(21, 5).unwrap();
        assert_eq!(
            brands,
            vec![
                BrandReceiptCount {
                    brand: Some("ACME".to_string()),
                    receipt_count: 2
                },
                BrandReceiptCount {
                    brand: Some("BOLT".to_string()),
                    receipt_count: 2
                },
            ]
        );
    }

    #[test]
    fn test_top_brands_by_sales_requires_tenure() {
        let mut store = QueryStore::new(&sample_datasets()).unwrap();
        let brands = store.top_brands_by_sales(6, 5).unwrap();
        // newbie joined within six months; ghost has no user row
        assert_eq!(
            brands,
            vec![
                BrandSales {
                    brand: Some("BOLT".to_string()),
                    total_sales: 6.0
                },
                BrandSales {
                    brand: Some("ACME".to_string()),
                    total_sales: 2.0
                },
            ]
        );
    }

    #[test]
    fn test_age_cutoff_is_inclusive() {
        // Latest scan 2024-09-03: turning 21 that day counts, a day later does not
        let datasets = single_scan_datasets(
            (2024, 9, 3),
            &[
                ("on_cutoff", (2003, 9, 3), (2020, 1, 1)),
                ("day_after", (2003, 9, 4), (2020, 1, 1)),
            ],
        );
        let mut store = QueryStore::new(&datasets).unwrap();

        let receipts = store.top_brands_by_receipts(21, 5).unwrap();
        assert_eq!(brands(receipts, |b| b.brand), vec!["on_cutoff".to_string()]);
    }

    #[test]
    fn test_tenure_cutoff_is_inclusive() {
        let datasets = single_scan_datasets(
            (2024, 9, 3),
            &[
                ("on_cutoff", (1990, 1, 1), (2024, 3, 3)),
                ("day_after", (1990, 1, 1), (2024, 3, 4)),
            ],
        );
        let mut store = QueryStore::new(&datasets).unwrap();

        let sales = store.top_brands_by_sales(6, 5).unwrap();
        assert_eq!(brands(sales, |b| b.brand), vec!["on_cutoff".to_string()]);
    }

    #[test]
    fn test_tenure_cutoff_at_month_end() {
        // Six months before 2024-08-31 is 2024-03-02, not the end of February
        let datasets = single_scan_datasets(
            (2024, 8, 31),
            &[
                ("march_1", (1990, 1, 1), (2024, 3, 1)),
                ("march_2", (1990, 1, 1), (2024, 3, 2)),
                ("march_3", (1990, 1, 1), (2024, 3, 3)),
            ],
        );
        let mut store = QueryStore::new(&datasets).unwrap();

        let sales = store.top_brands_by_sales(6, 5).unwrap();
        assert_eq!(
            brands(sales, |b| b.brand),
            vec!["march_1".to_string(), "march_2".to_string()]
        );
    }

    #[test]
    fn test_power_users_tie_break() {
        let transactions = df!(
            "RECEIPT_ID" => &["a", "b", "c", "d", "e", "f", "g", "h", "h"],
            "USER_ID" => &["u2", "u1", "u3", "u2", "u1", "u2", "u1", "u3", "u3"]
        )
        .unwrap();
        let datasets = Datasets {
            transactions: transactions
                .hstack(&[date_column("SCAN_DATE", &[None; 9])])
                .unwrap(),
            ..sample_datasets()
        };

        let mut store = QueryStore::new(&datasets).unwrap();
        let users: Vec<(Option<String>, u64)> = store
            .power_users(10)
            .unwrap()
            .into_iter()
            .map(|u| (u.user_id, u.receipt_count))
            .collect();
        assert_eq!(
            users,
            vec![
                (Some("u1".to_string()), 3),
                (Some("u2".to_string()), 3),
                (Some("u3".to_string()), 2),
            ]
        );
    }

    #[test]
    fn test_no_scan_dates_means_no_filtered_rows() {
        let mut datasets = sample_datasets();
        datasets
            .transactions
            .replace(
                "SCAN_DATE",
                date_column("SCAN_DATE", &[None; 6]).take_materialized_series(),
            )
            .unwrap();

        let mut store = QueryStore::new(&datasets).unwrap();
        assert_eq!(store.reference_date(), None);
        assert!(store.top_brands_by_receipts(21, 5).unwrap().is_empty());
        assert!(store.top_brands_by_sales(6, 5).unwrap().is_empty());
        assert_eq!(store.power_users(10).unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_sql_is_an_error() {
        let mut store = QueryStore::new(&sample_datasets()).unwrap();
        assert!(store.execute("SELECT nope FROM missing_table").is_err());
    }
}
