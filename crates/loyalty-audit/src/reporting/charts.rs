//! Chart data preparation and SVG rendering.

use crate::types::{columns, RenderedCharts};
use crate::utils::{column_series, date_days, date_to_days, days_to_date, text_values};
use anyhow::Result;
use chrono::NaiveDate;
use plotters::prelude::*;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const TRANSACTIONS_CHART_FILE: &str = "transactions_over_time.svg";
pub const CATEGORIES_CHART_FILE: &str = "top_categories.svg";

const CHART_SIZE: (u32, u32) = (1200, 700);

/// Number of transactions per distinct scan date, oldest first.
///
/// Expects a parsed `Date` column; null dates are skipped.
pub fn daily_scan_counts(transactions: &DataFrame) -> Result<Vec<(NaiveDate, usize)>> {
    let scan_dates = column_series(transactions, columns::SCAN_DATE)?;

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for day in date_days(scan_dates)?.into_iter().flatten() {
        *counts.entry(day).or_insert(0) += 1;
    }

    Ok(counts
        .into_iter()
        .filter_map(|(day, count)| days_to_date(day).map(|date| (date, count)))
        .collect())
}

/// The `n` most frequent non-null values of a column.
///
/// Ordered by count descending, ties broken by value ascending.
pub fn top_values(df: &DataFrame, column: &str, n: usize) -> Result<Vec<(String, usize)>> {
    let series = column_series(df, column)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in text_values(series)?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    Ok(ranked)
}

/// Writes the two observational charts into an output directory.
pub struct ChartRenderer {
    output_dir: PathBuf,
    top_categories: usize,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, top_categories: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            top_categories,
        }
    }

    /// Render both charts from the cleaned tables.
    ///
    /// A chart with no data to plot is skipped and left as `None`.
    pub fn render(&self, transactions: &DataFrame, products: &DataFrame) -> Result<RenderedCharts> {
        fs::create_dir_all(&self.output_dir)?;

        let daily = daily_scan_counts(transactions)?;
        let transactions_over_time = if daily.is_empty() {
            warn!("No parsed scan dates, skipping {}", TRANSACTIONS_CHART_FILE);
            None
        } else {
            let path = self.output_dir.join(TRANSACTIONS_CHART_FILE);
            draw_daily_counts(&path, &daily)?;
            info!("Chart saved to {}", path.display());
            Some(path)
        };

        let categories = top_values(products, columns::CATEGORY_1, self.top_categories)?;
        let top_categories = if categories.is_empty() {
            warn!("No category values, skipping {}", CATEGORIES_CHART_FILE);
            None
        } else {
            let path = self.output_dir.join(CATEGORIES_CHART_FILE);
            draw_category_bars(&path, &categories)?;
            info!("Chart saved to {}", path.display());
            Some(path)
        };

        Ok(RenderedCharts {
            transactions_over_time,
            top_categories,
        })
    }
}

fn draw_daily_counts(path: &Path, daily: &[(NaiveDate, usize)]) -> Result<()> {
    let points: Vec<(i32, f64)> = daily
        .iter()
        .map(|(date, count)| (date_to_days(*date), *count as f64))
        .collect();

    let first_day = points.first().map_or(0, |p| p.0);
    let last_day = points.last().map_or(0, |p| p.0);
    let max_count = points.iter().map(|p| p.1).fold(1.0, f64::max);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Number of Transactions Over Time", ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(first_day..last_day + 1, 0f64..max_count * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("Scan Date")
        .y_desc("Number of Transactions")
        .x_labels(8)
        .x_label_formatter(&|day| {
            days_to_date(*day).map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string())
        })
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_category_bars(path: &Path, categories: &[(String, usize)]) -> Result<()> {
    let max_count = categories.iter().map(|c| c.1).max().unwrap_or(1) as f64;
    let names: Vec<String> = categories.iter().map(|c| c.0.clone()).collect();

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Top {} Product Categories", categories.len()),
            ("sans-serif", 28),
        )
        .margin(15)
        .x_label_area_size(80)
        .y_label_area_size(70)
        .build_cartesian_2d(0..categories.len() as i32, (1f64..max_count * 2.0).log_scale())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Category")
        .y_desc("Product Count (log scale)")
        .x_labels(categories.len())
        .x_label_formatter(&|idx| {
            names
                .get(*idx as usize)
                .cloned()
                .unwrap_or_default()
        })
        .draw()?;

    chart.draw_series(categories.iter().enumerate().map(|(idx, (_, count))| {
        let x = idx as i32;
        let mut bar = Rectangle::new([(x, 1.0), (x + 1, *count as f64)], BLUE.mix(0.7).filled());
        bar.set_margin(0, 0, 6, 6);
        bar
    }))?;

    root.present()?;
    Ok(())
}
