use std::path::PathBuf;
use thiserror::Error;

/// Domain failures that callers may want to match on. Everything else
/// (I/O, Arrow, DuckDB) travels as `anyhow::Error` with context attached.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("input source not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("invalid table name `{0}` (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidTableName(String),

    #[error("no CSV entry found in archive {}", .0.display())]
    EmptyArchive(PathBuf),
}
