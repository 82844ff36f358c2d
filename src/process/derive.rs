use chrono::Datelike;

use crate::schema::CanonicalRow;

/// `profit / sales`, undefined when either side is missing or sales is zero.
pub fn profit_margin(profit: Option<f64>, sales: Option<f64>) -> Option<f64> {
    match (profit, sales) {
        (Some(p), Some(s)) if s != 0.0 => Some(p / s),
        _ => None,
    }
}

/// Recompute every derived field from the row's canonical fields.
pub fn fill_derived(row: &mut CanonicalRow) {
    row.profit_margin = profit_margin(row.profit, row.sales);
    row.order_year = row.order_date.map(|d| d.year());
    row.order_month = row.order_date.map(|d| d.format("%Y-%m").to_string());
    row.order_month_num = row.order_date.map(|d| d.month() as i32);
    row.days_to_ship = match (row.order_date, row.ship_date) {
        (Some(ordered), Some(shipped)) => Some((shipped - ordered).num_days()),
        _ => None,
    };
}
