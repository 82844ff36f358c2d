// src/etl.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf, time::Instant};
use tracing::{info, instrument, warn};

use crate::config::EtlConfig;
use crate::duck::load_into_duckdb;
use crate::error::EtlError;
use crate::load::load_raw_table;
use crate::process::prepare_table;
use crate::schema::{write_clean_csv, write_parquet};

/// Outcome of one ETL run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtlSummary {
    pub input_path: PathBuf,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub columns: Vec<String>,
    pub reconciled: BTreeMap<&'static str, String>,
    pub missing_fields: Vec<&'static str>,
    pub coercion_failures: BTreeMap<&'static str, usize>,
    pub clean_output_path: PathBuf,
    pub parquet_output_path: Option<PathBuf>,
    /// `table@path` of the DuckDB copy, when one was loaded.
    pub database_table: Option<String>,
}

/// Load → normalize → write. A missing input is reported before anything is
/// read or written.
#[instrument(level = "info", skip(cfg), fields(input = %cfg.input_path.display()))]
pub fn run_etl(cfg: &EtlConfig) -> Result<EtlSummary> {
    let start = Instant::now();

    // 1) input must exist
    if !cfg.input_path.exists() {
        return Err(EtlError::MissingInput(cfg.input_path.clone()).into());
    }

    // 2) load + normalize
    let raw = load_raw_table(&cfg.input_path)?;
    let (table, report) = prepare_table(&raw);
    if !report.discarded_columns.is_empty() {
        warn!(columns = ?report.discarded_columns, "input columns replaced by recomputed values");
    }
    if report.truncated_cells > 0 {
        info!(cells = report.truncated_cells, "truncated long text cells");
    }

    // 3) clean CSV, always
    write_clean_csv(&table, &cfg.clean_output_path)
        .with_context(|| format!("writing clean CSV {}", cfg.clean_output_path.display()))?;

    // 4) optional parquet snapshot
    if let Some(path) = &cfg.parquet_output_path {
        write_parquet(&table, path)
            .with_context(|| format!("writing parquet {}", path.display()))?;
    }

    // 5) optional relational copy
    let database_table = match &cfg.database {
        Some(db) => {
            load_into_duckdb(db, &table)
                .with_context(|| format!("loading {} into {}", db.table, db.path.display()))?;
            Some(format!("{}@{}", db.table, db.path.display()))
        }
        None => {
            info!("no database configured, skipping load");
            None
        }
    };

    info!(
        rows_read = report.rows_in,
        rows_written = report.rows_out,
        elapsed = ?start.elapsed(),
        "ETL finished"
    );

    Ok(EtlSummary {
        input_path: cfg.input_path.clone(),
        rows_read: report.rows_in,
        rows_written: report.rows_out,
        rows_dropped: report.dropped,
        columns: table.column_names().into_iter().map(str::to_string).collect(),
        reconciled: report.reconciled,
        missing_fields: report.missing_fields,
        coercion_failures: report.coercion_failures,
        clean_output_path: cfg.clean_output_path.clone(),
        parquet_output_path: cfg.parquet_output_path.clone(),
        database_table,
    })
}
