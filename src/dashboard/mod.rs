// src/dashboard/mod.rs

pub mod filters;
pub mod frame;
pub mod metrics;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::{fmt, fs, path::Path, path::PathBuf};
use tracing::{info, instrument, warn};

use crate::config::DashboardConfig;
use crate::duck::read_from_duckdb;
use crate::error::EtlError;
use crate::load::load_raw_table;
use crate::process::RawTable;

pub use filters::{apply_filters, filter_options, FilterOptions, Filters};
pub use frame::DashboardFrame;
pub use metrics::{compute_kpis, Kpis, SeriesPoint};

/// Where the dashboard data came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Database { path: PathBuf, table: String },
    Csv { path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the dashboard shows for one set of filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub source: DataSource,
    pub rows_loaded: usize,
    pub rows_filtered: usize,
    pub filters: Filters,
    pub options: FilterOptions,
    pub kpis: Kpis,
    pub monthly_sales: Option<Vec<SeriesPoint>>,
    pub top_products: Option<Vec<SeriesPoint>>,
    pub sales_by_region: Option<Vec<SeriesPoint>>,
    pub sample: SampleRows,
    /// Informational messages about series or filters that could not be shown.
    pub notices: Vec<String>,
}

/// Read from DuckDB when configured, falling back to the CSV on failure.
pub fn load_source(cfg: &DashboardConfig) -> Result<(RawTable, DataSource)> {
    if let Some(db) = &cfg.database {
        match read_from_duckdb(db, cfg.limit) {
            Ok(raw) => {
                info!(table = %db.table, rows = raw.len(), "loaded dashboard data from DuckDB");
                let source = DataSource::Database {
                    path: db.path.clone(),
                    table: db.table.clone(),
                };
                return Ok((raw, source));
            }
            Err(e) if cfg.csv_path.is_some() => {
                warn!(error = %e, "database load failed, falling back to CSV");
            }
            Err(e) => return Err(e.context("loading dashboard data from DuckDB")),
        }
    }

    let path = cfg
        .csv_path
        .clone()
        .ok_or_else(|| EtlError::MissingConfig("dashboard data source".into()))?;
    let mut raw = load_raw_table(&path)?;
    if let Some(limit) = cfg.limit {
        raw.rows.truncate(limit);
    }
    info!(path = %path.display(), rows = raw.len(), "loaded dashboard data from CSV");
    Ok((raw, DataSource::Csv { path }))
}

/// Apply `filters` and compute KPIs, series and the sample.
#[instrument(level = "debug", skip(frame, filters))]
pub fn build_dashboard(
    frame: &DashboardFrame,
    source: DataSource,
    filters: &Filters,
    sample_rows: usize,
) -> Dashboard {
    let mut notices = Vec::new();
    let rows = apply_filters(frame, filters, &mut notices);

    let monthly_sales = if frame.has_column("order_date") && frame.has_column("sales") {
        Some(metrics::monthly_sales(frame, &rows))
    } else {
        notices.push("no 'order_date' or 'sales' column: monthly sales unavailable".into());
        None
    };
    let top_products = if frame.has_column("profit") {
        metrics::top_products_by_profit(frame, &rows)
    } else {
        None
    };
    if top_products.is_none() {
        notices.push("no 'product_name' or 'profit' column: top products unavailable".into());
    }
    let sales_by_region = if frame.has_column("sales") {
        metrics::sales_by_region(frame, &rows)
    } else {
        None
    };
    if sales_by_region.is_none() {
        notices.push("no 'region' or 'sales' column: sales by region unavailable".into());
    }

    let sample = SampleRows {
        headers: frame.headers.clone(),
        rows: rows
            .iter()
            .take(sample_rows)
            .map(|&i| frame.rows[i].clone())
            .collect(),
    };

    Dashboard {
        source,
        rows_loaded: frame.len(),
        rows_filtered: rows.len(),
        filters: filters.clone(),
        options: filter_options(frame),
        kpis: compute_kpis(frame, &rows),
        monthly_sales,
        top_products,
        sales_by_region,
        sample,
        notices,
    }
}

/// Load, filter and summarize in one go.
pub fn run_dashboard(cfg: &DashboardConfig, filters: &Filters) -> Result<(DashboardFrame, Dashboard)> {
    let (raw, source) = load_source(cfg)?;
    let frame = DashboardFrame::from_raw(raw);
    let dashboard = build_dashboard(&frame, source, filters, cfg.sample_rows);
    info!(
        loaded = dashboard.rows_loaded,
        filtered = dashboard.rows_filtered,
        notices = dashboard.notices.len(),
        "dashboard ready"
    );
    Ok((frame, dashboard))
}

/// Write the rows passing `filters` as CSV under the loaded headers.
/// Returns the number of data rows written.
pub fn export_filtered<P: AsRef<Path>>(
    frame: &DashboardFrame,
    filters: &Filters,
    path: P,
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating export directory {}", parent.display()))?;
    }

    let rows = apply_filters(frame, filters, &mut Vec::new());
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating export {}", path.display()))?;
    writer.write_record(&frame.headers)?;
    for &i in &rows {
        writer.write_record(&frame.rows[i])?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "exported filtered rows");
    Ok(rows.len())
}

fn money(v: Option<f64>) -> String {
    let Some(v) = v else {
        return "n/a".to_string();
    };
    let fixed = format!("{:.2}", v.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

fn write_series(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    series: Option<&[SeriesPoint]>,
) -> fmt::Result {
    let Some(points) = series else {
        return Ok(());
    };
    writeln!(f, "\n{title}")?;
    if points.is_empty() {
        writeln!(f, "  (no data)")?;
    }
    let width = points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
    for p in points {
        writeln!(f, "  {:<width$}  {:>14}", p.label, money(Some(p.value)))?;
    }
    Ok(())
}

/// Plain-text report.
impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            DataSource::Database { path, table } => {
                writeln!(f, "Retail dashboard: {table} ({})", path.display())?
            }
            DataSource::Csv { path } => writeln!(f, "Retail dashboard: {}", path.display())?,
        }
        writeln!(
            f,
            "Rows: {} loaded, {} after filters",
            self.rows_loaded, self.rows_filtered
        )?;

        let k = &self.kpis;
        writeln!(f, "\nSales (total)    {}", money(k.total_sales))?;
        writeln!(f, "Profit (total)   {}", money(k.total_profit))?;
        writeln!(f, "Orders (unique)  {}", k.orders)?;
        writeln!(f, "Margin           {:.2}%", k.margin * 100.0)?;
        writeln!(f, "Avg ticket       {}", money(Some(k.avg_ticket)))?;

        write_series(f, "Monthly sales", self.monthly_sales.as_deref())?;
        write_series(f, "Top products by profit", self.top_products.as_deref())?;
        write_series(f, "Sales by region", self.sales_by_region.as_deref())?;

        if !self.notices.is_empty() {
            writeln!(f)?;
            for n in &self.notices {
                writeln!(f, "note: {n}")?;
            }
        }

        if !self.sample.rows.is_empty() {
            writeln!(f, "\nSample ({} rows)", self.sample.rows.len())?;
            writeln!(f, "  {}", self.sample.headers.join(" | "))?;
            for row in &self.sample.rows {
                writeln!(f, "  {}", row.join(" | "))?;
            }
        }
        Ok(())
    }
}

/// Plain-text rendering of a dashboard.
pub fn render_text(d: &Dashboard) -> String {
    d.to_string()
}
