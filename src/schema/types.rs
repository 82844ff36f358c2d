// src/schema/types.rs

use chrono::NaiveDate;
use serde::Serialize;

/// Maximum length, in characters, of any text cell in the canonical table.
pub const MAX_TEXT_CHARS: usize = 500;

/// Storage class of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Date,
    Float,
    /// 64-bit integer (`quantity`, `days_to_ship`).
    BigInt,
    /// 32-bit integer (`order_year`, `order_month_num`).
    Int,
    Text,
}

/// Fields taken (after coercion) from the raw extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    OrderDate,
    ShipDate,
    Sales,
    Profit,
    Quantity,
    Discount,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::OrderDate,
        CanonicalField::ShipDate,
        CanonicalField::Sales,
        CanonicalField::Profit,
        CanonicalField::Quantity,
        CanonicalField::Discount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::OrderDate => "order_date",
            CanonicalField::ShipDate => "ship_date",
            CanonicalField::Sales => "sales",
            CanonicalField::Profit => "profit",
            CanonicalField::Quantity => "quantity",
            CanonicalField::Discount => "discount",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            CanonicalField::OrderDate | CanonicalField::ShipDate => ValueKind::Date,
            CanonicalField::Quantity => ValueKind::BigInt,
            CanonicalField::Sales | CanonicalField::Profit | CanonicalField::Discount => {
                ValueKind::Float
            }
        }
    }
}

/// Fields computed from the canonical ones, always appended last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedField {
    ProfitMargin,
    OrderYear,
    OrderMonth,
    OrderMonthNum,
    DaysToShip,
}

impl DerivedField {
    pub const ALL: [DerivedField; 5] = [
        DerivedField::ProfitMargin,
        DerivedField::OrderYear,
        DerivedField::OrderMonth,
        DerivedField::OrderMonthNum,
        DerivedField::DaysToShip,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DerivedField::ProfitMargin => "profit_margin",
            DerivedField::OrderYear => "order_year",
            DerivedField::OrderMonth => "order_month",
            DerivedField::OrderMonthNum => "order_month_num",
            DerivedField::DaysToShip => "days_to_ship",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            DerivedField::ProfitMargin => ValueKind::Float,
            DerivedField::OrderYear | DerivedField::OrderMonthNum => ValueKind::Int,
            DerivedField::OrderMonth => ValueKind::Text,
            DerivedField::DaysToShip => ValueKind::BigInt,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

/// One output column; `Text` indexes into `CanonicalTable::text_names`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Field(CanonicalField),
    Text(usize),
    Derived(DerivedField),
}

/// A borrowed view of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Date(NaiveDate),
    Float(f64),
    Int(i64),
    Text(&'a str),
}

impl Cell<'_> {
    /// Text form used by the CSV and database writers; `None` for null.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Int(v) => Some(v.to_string()),
            Cell::Text(s) => Some((*s).to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRow {
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub sales: Option<f64>,
    pub profit: Option<f64>,
    pub quantity: Option<i64>,
    pub discount: Option<f64>,
    pub profit_margin: Option<f64>,
    pub order_year: Option<i32>,
    pub order_month: Option<String>,
    pub order_month_num: Option<i32>,
    pub days_to_ship: Option<i64>,
    /// Pass-through text cells, aligned with `CanonicalTable::text_names`.
    pub text: Vec<Option<String>>,
}

impl CanonicalRow {
    pub fn field(&self, field: CanonicalField) -> Cell<'_> {
        match field {
            CanonicalField::OrderDate => self.order_date.map_or(Cell::Null, Cell::Date),
            CanonicalField::ShipDate => self.ship_date.map_or(Cell::Null, Cell::Date),
            CanonicalField::Sales => self.sales.map_or(Cell::Null, Cell::Float),
            CanonicalField::Profit => self.profit.map_or(Cell::Null, Cell::Float),
            CanonicalField::Quantity => self.quantity.map_or(Cell::Null, Cell::Int),
            CanonicalField::Discount => self.discount.map_or(Cell::Null, Cell::Float),
        }
    }

    pub fn derived(&self, field: DerivedField) -> Cell<'_> {
        match field {
            DerivedField::ProfitMargin => self.profit_margin.map_or(Cell::Null, Cell::Float),
            DerivedField::OrderYear => self.order_year.map_or(Cell::Null, |v| Cell::Int(v.into())),
            DerivedField::OrderMonth => self
                .order_month
                .as_deref()
                .map_or(Cell::Null, Cell::Text),
            DerivedField::OrderMonthNum => self
                .order_month_num
                .map_or(Cell::Null, |v| Cell::Int(v.into())),
            DerivedField::DaysToShip => self.days_to_ship.map_or(Cell::Null, Cell::Int),
        }
    }

    pub fn cell(&self, column: Column) -> Cell<'_> {
        match column {
            Column::Field(f) => self.field(f),
            Column::Derived(d) => self.derived(d),
            Column::Text(i) => self
                .text
                .get(i)
                .and_then(|v| v.as_deref())
                .map_or(Cell::Null, Cell::Text),
        }
    }
}

/// The cleaned dataset: fixed canonical fields, pass-through text columns and
/// derived fields, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    pub columns: Vec<Column>,
    pub text_names: Vec<String>,
    pub rows: Vec<CanonicalRow>,
}

impl CanonicalTable {
    pub fn column_name(&self, column: Column) -> &str {
        match column {
            Column::Field(f) => f.name(),
            Column::Derived(d) => d.name(),
            Column::Text(i) => &self.text_names[i],
        }
    }

    pub fn column_kind(&self, column: Column) -> ValueKind {
        match column {
            Column::Field(f) => f.kind(),
            Column::Derived(d) => d.kind(),
            Column::Text(_) => ValueKind::Text,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| self.column_name(*c)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
