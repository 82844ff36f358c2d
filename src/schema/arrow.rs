// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, StringArray},
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use super::types::{CanonicalTable, Cell, Column, ValueKind};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Map a canonical column kind onto an Arrow DataType.
///
/// - Date   → Date32
/// - Float  → Float64
/// - BigInt → Int64
/// - Int    → Int32
/// - Text   → Utf8
pub fn map_to_arrow_type(kind: ValueKind) -> DataType {
    match kind {
        ValueKind::Date => DataType::Date32,
        ValueKind::Float => DataType::Float64,
        ValueKind::BigInt => DataType::Int64,
        ValueKind::Int => DataType::Int32,
        ValueKind::Text => DataType::Utf8,
    }
}

/// Build an ArrowSchema (inside an Arc) for the table's output columns.
pub fn canonical_arrow_schema(table: &CanonicalTable) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = table
        .columns
        .iter()
        .map(|&col| {
            let dt = map_to_arrow_type(table.column_kind(col));
            ArrowField::new(table.column_name(col), dt, /* nullable = */ true)
        })
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

pub fn date_to_epoch_days(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Materialize the whole table as one Arrow record batch.
pub fn to_record_batch(table: &CanonicalTable) -> Result<RecordBatch> {
    let schema = canonical_arrow_schema(table);
    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .map(|&col| build_array(table, col))
        .collect();

    RecordBatch::try_new(schema, arrays).context("assembling canonical record batch")
}

fn build_array(table: &CanonicalTable, col: Column) -> ArrayRef {
    let cells = table.rows.iter().map(|row| row.cell(col));
    match table.column_kind(col) {
        ValueKind::Date => Arc::new(Date32Array::from(
            cells
                .map(|c| match c {
                    Cell::Date(d) => Some(date_to_epoch_days(d)),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ValueKind::Float => Arc::new(Float64Array::from(
            cells
                .map(|c| match c {
                    Cell::Float(v) => Some(v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ValueKind::BigInt => Arc::new(Int64Array::from(
            cells
                .map(|c| match c {
                    Cell::Int(v) => Some(v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ValueKind::Int => Arc::new(Int32Array::from(
            cells
                .map(|c| match c {
                    Cell::Int(v) => i32::try_from(v).ok(),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ValueKind::Text => Arc::new(StringArray::from(
            cells
                .map(|c| match c {
                    Cell::Text(s) => Some(s),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
    }
}
