// src/process/mod.rs

pub mod columns;
pub mod convert;
pub mod date_parser;
pub mod derive;
pub mod raw_table;
pub mod trimming;
pub mod utils;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::schema::{CanonicalField, CanonicalRow, CanonicalTable, MAX_TEXT_CHARS};
use columns::{normalize_headers, plan_columns};
use convert::{to_float, to_int};
use date_parser::parse_date;
use derive::fill_derived;
use trimming::apply_trimming;
use utils::clean_str;

pub use raw_table::RawTable;

/// What happened while normalizing one extract.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows with neither an order date nor a sales value.
    pub dropped: usize,
    /// Canonical field → raw header it was taken from.
    pub reconciled: BTreeMap<&'static str, String>,
    /// Canonical fields absent from the input (emitted as all-null).
    pub missing_fields: Vec<&'static str>,
    /// Input columns dropped because a derived field of the same name is recomputed.
    pub discarded_columns: Vec<String>,
    /// Non-empty values per field that could not be coerced and became null.
    pub coercion_failures: BTreeMap<&'static str, usize>,
    pub truncated_cells: usize,
}

/// Turn a raw extract into the canonical table. Never fails: values that do
/// not parse become null, rows without both `order_date` and `sales` are
/// dropped. The input is left untouched.
#[instrument(level = "info", skip(raw), fields(rows = raw.rows.len(), cols = raw.headers.len()))]
pub fn prepare_table(raw: &RawTable) -> (CanonicalTable, NormalizeReport) {
    // 1) names → canonical plan
    let names = normalize_headers(&raw.headers);
    let plan = plan_columns(&names);

    let mut report = NormalizeReport {
        rows_in: raw.rows.len(),
        discarded_columns: plan.discarded.clone(),
        ..Default::default()
    };
    for field in CanonicalField::ALL {
        match plan.sources.get(&field) {
            Some(&src) => {
                report.reconciled.insert(field.name(), raw.headers[src].clone());
            }
            None => report.missing_fields.push(field.name()),
        }
    }
    debug!(reconciled = ?report.reconciled, missing = ?report.missing_fields, "column plan");

    // 2) per-row coercion, derivation, filtering, trimming
    use CanonicalField::*;
    let mut rows = Vec::with_capacity(raw.rows.len());
    for raw_row in &raw.rows {
        let source = |field: CanonicalField| {
            plan.sources
                .get(&field)
                .and_then(|&i| raw_row.get(i))
                .map(String::as_str)
        };
        let failures = &mut report.coercion_failures;

        let mut row = CanonicalRow {
            order_date: coerce(source(OrderDate), parse_date, OrderDate, failures),
            ship_date: coerce(source(ShipDate), parse_date, ShipDate, failures),
            sales: coerce(source(Sales), to_float, Sales, failures),
            profit: coerce(source(Profit), to_float, Profit, failures),
            quantity: coerce(source(Quantity), to_int, Quantity, failures),
            discount: coerce(source(Discount), to_float, Discount, failures),
            ..Default::default()
        };

        if row.order_date.is_none() && row.sales.is_none() {
            report.dropped += 1;
            continue;
        }

        fill_derived(&mut row);
        row.text = plan
            .text
            .iter()
            .map(|(_, src)| raw_row.get(*src).filter(|s| !s.is_empty()).cloned())
            .collect();
        report.truncated_cells += apply_trimming(&mut row, MAX_TEXT_CHARS);
        rows.push(row);
    }
    report.rows_out = rows.len();

    info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        dropped = report.dropped,
        "normalized extract"
    );

    let table = CanonicalTable {
        columns: plan.columns,
        text_names: plan.text.into_iter().map(|(name, _)| name).collect(),
        rows,
    };
    (table, report)
}

/// Shorthand for [`prepare_table`] when the report is not needed.
pub fn normalize(raw: &RawTable) -> CanonicalTable {
    prepare_table(raw).0
}

fn coerce<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    field: CanonicalField,
    failures: &mut BTreeMap<&'static str, usize>,
) -> Option<T> {
    let value = clean_str(raw?)?;
    let parsed = parse(value);
    if parsed.is_none() {
        *failures.entry(field.name()).or_insert(0) += 1;
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, DerivedField};
    use chrono::NaiveDate;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn day_first_example_row() {
        let input = raw(&["Order Date", "Sales", "Profit"], &[&["13/05/2023", "100", "20"]]);
        let (table, report) = prepare_table(&input);

        assert_eq!(report.rows_out, 1);
        let row = &table.rows[0];
        assert_eq!(row.order_date, NaiveDate::from_ymd_opt(2023, 5, 13));
        assert_eq!(row.sales, Some(100.0));
        assert_eq!(row.profit, Some(20.0));
        assert_eq!(row.profit_margin, Some(0.2));
        assert_eq!(row.order_year, Some(2023));
        assert_eq!(row.order_month.as_deref(), Some("2023-05"));
        assert_eq!(row.order_month_num, Some(5));
        assert_eq!(row.days_to_ship, None);
    }

    #[test]
    fn bad_sales_kept_only_with_order_date() {
        let input = raw(
            &["OrderDate", "Sales"],
            &[&["2023-01-05", "abc"], &["not a date", "abc"], &["", "12.5"]],
        );
        let (table, report) = prepare_table(&input);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].sales, None);
        assert_eq!(table.rows[0].order_date, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert_eq!(table.rows[1].order_date, None);
        assert_eq!(table.rows[1].sales, Some(12.5));
        assert_eq!(report.dropped, 1);
        assert_eq!(report.coercion_failures.get("sales"), Some(&2));
        assert_eq!(report.coercion_failures.get("order_date"), Some(&1));
    }

    #[test]
    fn dropped_rows_have_neither_date_nor_sales() {
        let input = raw(
            &["order_date", "sales", "region"],
            &[&["", "", "West"], &["2023-02-01", "", "East"], &["x", "y", "South"]],
        );
        let (table, report) = prepare_table(&input);
        assert_eq!(report.rows_in, 3);
        assert_eq!(report.rows_out, 1);
        assert_eq!(report.dropped, 2);
        assert!(table.rows.len() <= input.rows.len());
        assert_eq!(table.rows[0].text, vec![Some("East".to_string())]);
    }

    #[test]
    fn quantity_and_discount_coercion() {
        let input = raw(
            &["Sales", "Quantity", "Discount"],
            &[&["10", "3", "0.2"], &["10", "2.5", "20%"], &["10", "4.0", ""]],
        );
        let table = normalize(&input);
        let qty: Vec<_> = table.rows.iter().map(|r| r.quantity).collect();
        let disc: Vec<_> = table.rows.iter().map(|r| r.discount).collect();
        assert_eq!(qty, vec![Some(3), None, Some(4)]);
        assert_eq!(disc, vec![Some(0.2), None, None]);
    }

    #[test]
    fn margin_null_for_zero_or_missing_sales() {
        let input = raw(
            &["order_date", "sales", "profit"],
            &[&["2023-01-01", "0", "5"], &["2023-01-01", "", "5"], &["2023-01-01", "50", "5"]],
        );
        let table = normalize(&input);
        for row in &table.rows {
            match row.sales {
                Some(s) if s != 0.0 => assert_eq!(row.profit_margin, Some(row.profit.unwrap() / s)),
                _ => assert_eq!(row.profit_margin, None),
            }
        }
    }

    #[test]
    fn text_columns_pass_through_and_truncate() {
        let long = "p".repeat(700);
        let input = raw(&["Product Name", "Sales"], &[&[long.as_str(), "1"]]);
        let (table, report) = prepare_table(&input);
        assert_eq!(table.text_names, vec!["product_name".to_string()]);
        assert_eq!(table.rows[0].text[0].as_ref().map(|s| s.len()), Some(500));
        assert_eq!(report.truncated_cells, 1);
    }

    #[test]
    fn idempotent_on_canonical_input() {
        let input = raw(
            &["Row ID", "Order Date", "Ship Date", "Region", "Sales", "Quantity", "Profit"],
            &[
                &["1", "11/8/2016", "11/11/2016", "South", "261.96", "2", "41.9136"],
                &["2", "", "", "West", "14.62", "", ""],
            ],
        );
        let first = normalize(&input);

        let names = first.column_names();
        let again = RawTable {
            headers: names.iter().map(|s| s.to_string()).collect(),
            rows: first
                .rows
                .iter()
                .map(|row| {
                    first
                        .columns
                        .iter()
                        .map(|c| row.cell(*c).render().unwrap_or_default())
                        .collect()
                })
                .collect(),
        };
        let second = normalize(&again);

        assert_eq!(first.column_names(), second.column_names());
        assert_eq!(first, second);
    }

    #[test]
    fn canonical_layout_order() {
        let input = raw(&["Region", "Sales"], &[&["West", "1"]]);
        let table = normalize(&input);
        assert_eq!(
            table.column_names(),
            vec![
                "region", "sales", "order_date", "ship_date", "profit", "quantity", "discount",
                "profit_margin", "order_year", "order_month", "order_month_num", "days_to_ship",
            ]
        );
        assert_eq!(table.columns.last(), Some(&Column::Derived(DerivedField::DaysToShip)));
    }

    #[test]
    fn input_is_not_mutated() {
        let input = raw(&["Sales"], &[&[" 5 "]]);
        let before = input.clone();
        let _ = normalize(&input);
        assert_eq!(input, before);
    }
}
