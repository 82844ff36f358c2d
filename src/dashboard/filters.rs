use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use super::frame::DashboardFrame;

/// User-selected filters. Empty lists mean "no filter"; absent date bounds
/// default to the data's own range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub regions: Vec<String>,
    pub categories: Vec<String>,
    pub segments: Vec<String>,
}

/// Choices offered for each categorical filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub regions: Vec<String>,
    pub categories: Vec<String>,
    pub segments: Vec<String>,
}

/// Sorted distinct non-blank values of `name`, empty if the column is absent.
pub fn distinct_values(frame: &DashboardFrame, name: &str) -> Vec<String> {
    let Some(col) = frame.column(name) else {
        return Vec::new();
    };
    (0..frame.len())
        .filter_map(|i| frame.cell(i, col))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn filter_options(frame: &DashboardFrame) -> FilterOptions {
    let range = frame.date_range();
    FilterOptions {
        min_date: range.map(|r| r.0),
        max_date: range.map(|r| r.1),
        regions: distinct_values(frame, "region"),
        categories: distinct_values(frame, "category"),
        segments: distinct_values(frame, "segment"),
    }
}

/// Indices of the rows that pass `filters`. Filters naming a column the
/// data does not have are skipped and reported in `notices`.
pub fn apply_filters(
    frame: &DashboardFrame,
    filters: &Filters,
    notices: &mut Vec<String>,
) -> Vec<usize> {
    let mut keep: Vec<usize> = (0..frame.len()).collect();

    // 1) date window, inclusive; rows without an order date fall outside it
    let range = frame.date_range();
    let from = filters.from.or(range.map(|r| r.0));
    let to = filters.to.or(range.map(|r| r.1));
    if from.is_some() || to.is_some() {
        if frame.has_column("order_date") {
            keep.retain(|&i| match frame.order_dates[i] {
                Some(d) => from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t),
                None => false,
            });
        } else {
            notices.push("date filter ignored: no 'order_date' column".to_string());
        }
    }

    // 2) categorical membership
    for (name, wanted) in [
        ("region", &filters.regions),
        ("category", &filters.categories),
        ("segment", &filters.segments),
    ] {
        if wanted.is_empty() {
            continue;
        }
        let Some(col) = frame.column(name) else {
            notices.push(format!("{name} filter ignored: no '{name}' column"));
            continue;
        };
        keep.retain(|&i| frame.cell(i, col).is_some_and(|v| wanted.iter().any(|w| w == v)));
    }

    keep
}
