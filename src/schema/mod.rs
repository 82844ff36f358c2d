pub mod arrow;
pub mod types;
pub mod write;

pub use self::arrow::{canonical_arrow_schema, map_to_arrow_type, to_record_batch};
pub use types::{
    CanonicalField, CanonicalRow, CanonicalTable, Cell, Column, DerivedField, ValueKind,
    MAX_TEXT_CHARS,
};
pub use write::{write_clean_csv, write_parquet};
