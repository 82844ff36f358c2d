use anyhow::{Context, Result};
use duckdb::{params, types::Value, Connection, ToSql};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs, path::Path, time::Instant};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::EtlError;
use crate::process::RawTable;
use crate::schema::arrow::date_to_epoch_days;
use crate::schema::{CanonicalTable, Cell, ValueKind};

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Table names are spliced into SQL, so only plain identifiers are allowed.
pub fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(EtlError::InvalidTableName(name.to_string()).into())
    }
}

/// Open a DuckDB database on disk at `path`, creating the file (and its
/// directory) if it doesn't exist.
pub fn open_disk_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    Connection::open(path).with_context(|| format!("opening DuckDB at {}", path.display()))
}

/// Open a DuckDB in‐memory database
pub fn open_mem_db() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Date => "DATE",
        ValueKind::Float => "DOUBLE",
        ValueKind::BigInt => "BIGINT",
        ValueKind::Int => "INTEGER",
        ValueKind::Text => "VARCHAR",
    }
}

/// Appender value for one cell, matching the column's declared type.
fn to_value(kind: ValueKind, cell: Cell<'_>) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Date(d) => Value::Date32(date_to_epoch_days(d)),
        Cell::Float(v) => Value::Double(v),
        Cell::Int(v) if kind == ValueKind::Int => i32::try_from(v).map_or(Value::Null, Value::Int),
        Cell::Int(v) => Value::BigInt(v),
        Cell::Text(s) => Value::Text(s.to_string()),
    }
}

/// Drop-and-recreate `table_name` with the canonical column types and append
/// every row, all inside one transaction. Returns the number of rows written.
pub fn replace_table(conn: &mut Connection, table_name: &str, table: &CanonicalTable) -> Result<usize> {
    validate_table_name(table_name)?;
    let start = Instant::now();

    let column_defs: Vec<String> = table
        .columns
        .iter()
        .map(|&c| {
            format!(
                "{} {}",
                quote_ident(table.column_name(c)),
                sql_type(table.column_kind(c))
            )
        })
        .collect();
    let kinds: Vec<ValueKind> = table.columns.iter().map(|&c| table.column_kind(c)).collect();

    let tx = conn.transaction().context("starting load transaction")?;
    tx.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {} ({});",
        quote_ident(table_name),
        column_defs.join(", ")
    ))
    .with_context(|| format!("creating table {table_name}"))?;

    {
        let mut appender = tx
            .appender(table_name)
            .with_context(|| format!("opening appender on {table_name}"))?;
        for (n, row) in table.rows.iter().enumerate() {
            let values: Vec<Value> = table
                .columns
                .iter()
                .zip(&kinds)
                .map(|(&c, &kind)| to_value(kind, row.cell(c)))
                .collect();
            let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
            appender
                .append_row(params.as_slice())
                .with_context(|| format!("appending row {} to {table_name}", n + 1))?;
        }
        appender.flush()?;
    }
    tx.commit().context("committing load transaction")?;

    let inserted = table.rows.len();
    info!(table = table_name, rows = inserted, elapsed = ?start.elapsed(), "replaced table");
    Ok(inserted)
}

/// Read `table_name` back with every column cast to text, optionally capped
/// at `limit` rows. Column order follows the table definition.
pub fn read_table(conn: &Connection, table_name: &str, limit: Option<usize>) -> Result<RawTable> {
    validate_table_name(table_name)?;

    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_name = ? AND table_schema = current_schema() \
         ORDER BY ordinal_position;",
    )?;
    let headers: Vec<String> = stmt
        .query_map(params![table_name], |r| r.get::<_, String>(0))?
        .collect::<std::result::Result<_, _>>()?;
    if headers.is_empty() {
        anyhow::bail!("table `{}` does not exist", table_name);
    }

    let select_list: Vec<String> = headers
        .iter()
        .map(|h| format!("CAST({0} AS VARCHAR) AS {0}", quote_ident(h)))
        .collect();
    let mut sql = format!(
        "SELECT {} FROM {}",
        select_list.join(", "),
        quote_ident(table_name)
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }

    let width = headers.len();
    let mut table = RawTable::new(headers);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let v: Option<String> = row.get(i)?;
            cells.push(v.unwrap_or_default());
        }
        table.rows.push(cells);
    }
    Ok(table)
}

/// Open the configured database file and replace its table with `table`.
pub fn load_into_duckdb(db: &DatabaseConfig, table: &CanonicalTable) -> Result<usize> {
    let mut conn = open_disk_db(&db.path)?;
    replace_table(&mut conn, &db.table, table)
}

/// Read the configured table. The database file must already exist.
pub fn read_from_duckdb(db: &DatabaseConfig, limit: Option<usize>) -> Result<RawTable> {
    if !db.path.is_file() {
        return Err(EtlError::MissingInput(db.path.clone()).into());
    }
    let conn = Connection::open(&db.path)
        .with_context(|| format!("opening DuckDB at {}", db.path.display()))?;
    read_table(&conn, &db.table, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::normalize;
    use tempfile::tempdir;

    fn sample() -> CanonicalTable {
        normalize(&RawTable {
            headers: vec!["Order Date".into(), "Ship Date".into(), "Sales".into(), "Region".into()],
            rows: vec![
                vec!["13/05/2023".into(), "15/05/2023".into(), "100".into(), "West".into()],
                vec!["".into(), "".into(), "7.5".into(), "".into()],
            ],
        })
    }

    #[test]
    fn table_names_are_identifiers() {
        assert!(validate_table_name("superstore_clean").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("1abc").is_err());
        assert!(validate_table_name("a-b").is_err());
        assert!(validate_table_name("x; DROP TABLE y").is_err());
        assert!(validate_table_name("").is_err());
    }

    #[test]
    fn replace_then_read_back() -> Result<()> {
        let mut conn = open_mem_db()?;
        let table = sample();
        assert_eq!(replace_table(&mut conn, "superstore_clean", &table)?, 2);

        let raw = read_table(&conn, "superstore_clean", None)?;
        assert_eq!(raw.headers, table.column_names());
        assert_eq!(raw.rows.len(), 2);

        let idx = |name: &str| raw.headers.iter().position(|h| h == name).unwrap();
        assert_eq!(raw.rows[0][idx("order_date")], "2023-05-13");
        assert_eq!(raw.rows[0][idx("days_to_ship")], "2");
        assert_eq!(raw.rows[0][idx("order_month")], "2023-05");
        assert_eq!(raw.rows[0][idx("region")], "West");
        assert_eq!(raw.rows[1][idx("order_date")], "");

        // re-normalizing what the database hands back yields the same table
        assert_eq!(normalize(&raw), table);
        Ok(())
    }

    #[test]
    fn second_load_replaces_first() -> Result<()> {
        let mut conn = open_mem_db()?;
        replace_table(&mut conn, "t", &sample())?;

        let mut smaller = sample();
        smaller.rows.truncate(1);
        replace_table(&mut conn, "t", &smaller)?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t;", [], |r| r.get(0))?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn appended_values_keep_column_types() -> Result<()> {
        let mut conn = open_mem_db()?;
        replace_table(&mut conn, "t", &sample())?;

        let dated: i64 = conn.query_row(
            "SELECT COUNT(*) FROM t WHERE order_date = DATE '2023-05-13' AND days_to_ship = 2;",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(dated, 1);
        let year_type: String =
            conn.query_row("SELECT typeof(order_year) FROM t LIMIT 1;", [], |r| r.get(0))?;
        assert_eq!(year_type, "INTEGER");
        let nulls: i64 = conn.query_row(
            "SELECT COUNT(*) FROM t WHERE order_date IS NULL AND region IS NULL;",
            [],
            |r| r.get(0),
        )?;
        assert_eq!(nulls, 1);
        Ok(())
    }

    #[test]
    fn same_name_in_other_schema_is_ignored() -> Result<()> {
        let mut conn = open_mem_db()?;
        let table = sample();
        replace_table(&mut conn, "t", &table)?;
        conn.execute_batch("CREATE SCHEMA other; CREATE TABLE other.t (extra INTEGER);")?;

        let raw = read_table(&conn, "t", None)?;
        assert_eq!(raw.headers, table.column_names());
        Ok(())
    }

    #[test]
    fn limit_caps_rows() -> Result<()> {
        let mut conn = open_mem_db()?;
        replace_table(&mut conn, "t", &sample())?;
        assert_eq!(read_table(&conn, "t", Some(1))?.rows.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_table_is_an_error() -> Result<()> {
        let conn = open_mem_db()?;
        assert!(read_table(&conn, "nope", None).is_err());
        Ok(())
    }

    #[test]
    fn disk_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let db = DatabaseConfig {
            path: dir.path().join("db").join("retail.duckdb"),
            table: "superstore_clean".into(),
        };
        assert_eq!(load_into_duckdb(&db, &sample())?, 2);
        assert_eq!(read_from_duckdb(&db, None)?.rows.len(), 2);
        Ok(())
    }

    #[test]
    fn reading_missing_database_file_fails() {
        let db = DatabaseConfig {
            path: "/no/such/retail.duckdb".into(),
            table: "superstore_clean".into(),
        };
        let err = read_from_duckdb(&db, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::MissingInput(_))
        ));
    }
}
