use chrono::NaiveDate;

use crate::process::convert::to_float;
use crate::process::date_parser::parse_date;
use crate::process::RawTable;

/// The loaded dataset as the dashboard sees it: text cells under re-normalized
/// headers, with the columns it aggregates on parsed once up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardFrame {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub order_dates: Vec<Option<NaiveDate>>,
    pub sales: Vec<Option<f64>>,
    pub profit: Vec<Option<f64>>,
}

/// trim, lowercase, spaces → underscores
pub fn dashboard_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

impl DashboardFrame {
    pub fn from_raw(raw: RawTable) -> Self {
        let headers: Vec<String> = raw.headers.iter().map(|h| dashboard_header(h)).collect();
        let mut frame = DashboardFrame {
            headers,
            rows: raw.rows,
            ..Default::default()
        };

        let order_date = frame.column("order_date");
        let sales = frame.column("sales");
        let profit = frame.column("profit");
        let parsed = |col: Option<usize>| -> Vec<Option<f64>> {
            (0..frame.rows.len())
                .map(|i| col.and_then(|c| frame.cell(i, c)).and_then(to_float))
                .collect()
        };
        let sales = parsed(sales);
        let profit = parsed(profit);
        let order_dates = (0..frame.rows.len())
            .map(|i| order_date.and_then(|c| frame.cell(i, c)).and_then(parse_date))
            .collect();

        frame.order_dates = order_dates;
        frame.sales = sales;
        frame.profit = profit;
        frame
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Trimmed cell text, `None` when blank.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Earliest and latest order date present.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.order_dates.iter().flatten().copied();
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}
