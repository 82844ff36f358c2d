use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::schema::{CanonicalField, Column, DerivedField};

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9a-z_]").expect("static regex"));

/// Accepted spellings per canonical field, compared after normalization with
/// underscores removed ("Order Date", "order-date", "OrderDate" all become
/// `orderdate`).
pub const FIELD_VARIANTS: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::OrderDate, &["orderdate"]),
    (CanonicalField::ShipDate, &["shipdate", "shippingdate"]),
    (CanonicalField::Sales, &["sales"]),
    (CanonicalField::Profit, &["profit"]),
    (CanonicalField::Quantity, &["quantity", "qty"]),
    (CanonicalField::Discount, &["discount"]),
];

/// Trim, lowercase, spaces → underscores, drop anything outside `[0-9a-z_]`.
pub fn normalize_column_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase().replace(' ', "_");
    DISALLOWED.replace_all(&lowered, "").into_owned()
}

/// Normalize every header and make the result unique: empty names become
/// `unnamed_<idx>`, repeats get `_1`, `_2`, … appended.
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());

    for (idx, raw) in headers.iter().enumerate() {
        let mut name = normalize_column_name(raw);
        if name.is_empty() {
            name = format!("unnamed_{idx}");
        }
        let base = name.clone();
        let mut n = 0;
        while seen.contains(&name) {
            n += 1;
            name = format!("{base}_{n}");
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

fn squash(name: &str) -> String {
    name.replace('_', "")
}

/// Which canonical field, if any, `name` (already normalized) spells.
pub fn match_field(name: &str) -> Option<CanonicalField> {
    let key = squash(name);
    FIELD_VARIANTS
        .iter()
        .find(|(_, variants)| variants.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

/// Where each output column comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    /// Output column order (derived fields included, at the end).
    pub columns: Vec<Column>,
    /// Raw source index per canonical field found in the input.
    pub sources: HashMap<CanonicalField, usize>,
    /// (normalized name, raw source index) per pass-through text column.
    pub text: Vec<(String, usize)>,
    /// Normalized names of input columns discarded because they collide
    /// with a derived field.
    pub discarded: Vec<String>,
}

/// Reconcile normalized input names against the canonical schema.
///
/// An exact canonical name beats a variant; otherwise the first variant in
/// input order wins. Each input column feeds at most one field.
pub fn plan_columns(names: &[String]) -> ColumnPlan {
    let mut sources: HashMap<CanonicalField, usize> = HashMap::new();

    for field in CanonicalField::ALL {
        if let Some(idx) = names.iter().position(|n| n == field.name()) {
            sources.insert(field, idx);
        }
    }
    for (idx, name) in names.iter().enumerate() {
        if sources.values().any(|&used| used == idx) {
            continue;
        }
        if let Some(field) = match_field(name) {
            sources.entry(field).or_insert(idx);
        }
    }

    let mut columns = Vec::with_capacity(names.len() + DerivedField::ALL.len());
    let mut text = Vec::new();
    let mut discarded = Vec::new();

    for (idx, name) in names.iter().enumerate() {
        if let Some((field, _)) = sources.iter().find(|(_, src)| **src == idx) {
            debug!(column = %name, field = field.name(), "reconciled");
            columns.push(Column::Field(*field));
        } else if DerivedField::from_name(name).is_some() {
            discarded.push(name.clone());
        } else {
            columns.push(Column::Text(text.len()));
            text.push((name.clone(), idx));
        }
    }

    for field in CanonicalField::ALL {
        if !sources.contains_key(&field) {
            columns.push(Column::Field(field));
        }
    }
    columns.extend(DerivedField::ALL.map(Column::Derived));

    ColumnPlan {
        columns,
        sources,
        text,
        discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_column_name("  Order Date "), "order_date");
        assert_eq!(normalize_column_name("Sales ($)"), "sales_");
        assert_eq!(normalize_column_name("Product-Name"), "productname");
        assert_eq!(normalize_column_name("Unnamed: 0"), "unnamed_0");
        assert_eq!(normalize_column_name("Año"), "ao");
    }

    #[test]
    fn headers_are_made_unique() {
        let names = normalize_headers(&strings(&["Order Date", "order_date", "", "?!", "order date"]));
        assert_eq!(
            names,
            strings(&["order_date", "order_date_1", "unnamed_2", "unnamed_3", "order_date_2"])
        );
    }

    #[test]
    fn variants_match_case_and_punctuation_insensitively() {
        assert_eq!(match_field("orderdate"), Some(CanonicalField::OrderDate));
        assert_eq!(match_field("order_date"), Some(CanonicalField::OrderDate));
        assert_eq!(match_field("ship_date"), Some(CanonicalField::ShipDate));
        assert_eq!(match_field("s_ales"), Some(CanonicalField::Sales));
        assert_eq!(match_field("qty"), Some(CanonicalField::Quantity));
        assert_eq!(match_field("sales_"), Some(CanonicalField::Sales));
        assert_eq!(match_field("region"), None);
        assert_eq!(match_field("order_date_1"), None);
    }

    #[test]
    fn exact_name_beats_variant() {
        let plan = plan_columns(&strings(&["orderdate", "order_date", "region"]));
        assert_eq!(plan.sources[&CanonicalField::OrderDate], 1);
        assert_eq!(plan.text, vec![("orderdate".to_string(), 0), ("region".to_string(), 2)]);
        assert_eq!(plan.columns[0], Column::Text(0));
        assert_eq!(plan.columns[1], Column::Field(CanonicalField::OrderDate));
    }

    #[test]
    fn missing_fields_appended_then_derived() {
        let plan = plan_columns(&strings(&["region", "sales"]));
        let expected_tail: Vec<Column> = [
            CanonicalField::OrderDate,
            CanonicalField::ShipDate,
            CanonicalField::Profit,
            CanonicalField::Quantity,
            CanonicalField::Discount,
        ]
        .into_iter()
        .map(Column::Field)
        .chain(DerivedField::ALL.map(Column::Derived))
        .collect();

        assert_eq!(plan.columns[0], Column::Text(0));
        assert_eq!(plan.columns[1], Column::Field(CanonicalField::Sales));
        assert_eq!(&plan.columns[2..], expected_tail.as_slice());
    }

    #[test]
    fn derived_inputs_are_discarded() {
        let plan = plan_columns(&strings(&["sales", "profit_margin", "order_month"]));
        assert_eq!(plan.discarded, strings(&["profit_margin", "order_month"]));
        assert!(plan.text.is_empty());
    }
}
