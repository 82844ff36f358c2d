use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::frame::DashboardFrame;

pub const TOP_PRODUCTS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// `None` when no row carries a sales value.
    pub total_sales: Option<f64>,
    pub total_profit: Option<f64>,
    pub orders: usize,
    pub margin: f64,
    pub avg_ticket: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Sum of the present values, `None` if there are none.
fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

pub fn compute_kpis(frame: &DashboardFrame, rows: &[usize]) -> Kpis {
    let total_sales = sum_present(rows.iter().map(|&i| frame.sales[i]));
    let total_profit = sum_present(rows.iter().map(|&i| frame.profit[i]));

    let orders = match frame.column("order_id") {
        Some(col) => rows
            .iter()
            .filter_map(|&i| frame.cell(i, col))
            .collect::<HashSet<_>>()
            .len(),
        None => rows.len(),
    };

    let margin = match total_sales {
        Some(s) if s != 0.0 => total_profit.unwrap_or(0.0) / s,
        _ => 0.0,
    };
    let avg_ticket = if orders > 0 {
        total_sales.unwrap_or(0.0) / orders as f64
    } else {
        0.0
    };

    Kpis {
        total_sales,
        total_profit,
        orders,
        margin,
        avg_ticket,
    }
}

fn next_month(d: NaiveDate) -> Option<NaiveDate> {
    if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
    }
}

fn month_start(d: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1)
}

/// Sales per calendar month ("YYYY-MM") from the first to the last dated
/// row, months without sales reported as 0.
pub fn monthly_sales(frame: &DashboardFrame, rows: &[usize]) -> Vec<SeriesPoint> {
    let mut by_month: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &i in rows {
        let Some(month) = frame.order_dates[i].and_then(month_start) else {
            continue;
        };
        *by_month.entry(month).or_insert(0.0) += frame.sales[i].unwrap_or(0.0);
    }

    let (Some(&first), Some(&last)) = (by_month.keys().next(), by_month.keys().next_back()) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut month = Some(first);
    while let Some(m) = month.filter(|m| *m <= last) {
        let total = by_month.get(&m).copied().unwrap_or(0.0);
        points.push(SeriesPoint::new(m.format("%Y-%m").to_string(), total));
        month = next_month(m);
    }
    points
}

/// Sum `values` per non-blank value of `key`, largest first. Ties keep
/// alphabetical order.
fn grouped_desc(
    frame: &DashboardFrame,
    rows: &[usize],
    key: usize,
    values: &[Option<f64>],
) -> Vec<SeriesPoint> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for &i in rows {
        if let Some(k) = frame.cell(i, key) {
            *groups.entry(k).or_insert(0.0) += values[i].unwrap_or(0.0);
        }
    }
    let mut points: Vec<SeriesPoint> = groups
        .into_iter()
        .map(|(k, v)| SeriesPoint::new(k, v))
        .collect();
    points.sort_by(|a, b| b.value.total_cmp(&a.value));
    points
}

/// `None` when `product_name` is absent.
pub fn top_products_by_profit(frame: &DashboardFrame, rows: &[usize]) -> Option<Vec<SeriesPoint>> {
    let col = frame.column("product_name")?;
    let mut points = grouped_desc(frame, rows, col, &frame.profit);
    points.truncate(TOP_PRODUCTS);
    Some(points)
}

/// `None` when `region` is absent.
pub fn sales_by_region(frame: &DashboardFrame, rows: &[usize]) -> Option<Vec<SeriesPoint>> {
    let col = frame.column("region")?;
    Some(grouped_desc(frame, rows, col, &frame.sales))
}
