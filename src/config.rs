// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::duck::validate_table_name;
use crate::error::EtlError;

/// Table the cleaned extract is loaded into when none is given.
pub const DEFAULT_TABLE: &str = "superstore_clean";
pub const DEFAULT_SAMPLE_ROWS: usize = 200;

/// Where the relational copy lives. There is no default path:
/// it must come from a flag, the environment or a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlConfig {
    pub input_path: PathBuf,
    pub clean_output_path: PathBuf,
    pub parquet_output_path: Option<PathBuf>,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub csv_path: Option<PathBuf>,
    pub database: Option<DatabaseConfig>,
    pub limit: Option<usize>,
    pub sample_rows: usize,
}

/// On-disk YAML layout. Every key is optional; command-line values win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input_path: Option<PathBuf>,
    pub clean_output_path: Option<PathBuf>,
    pub parquet_output_path: Option<PathBuf>,
    pub database: Option<DatabaseSection>,
    pub dashboard: DashboardSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub path: Option<PathBuf>,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardSection {
    pub csv_path: Option<PathBuf>,
    pub limit: Option<usize>,
    pub sample_rows: Option<usize>,
}

/// Values supplied on the command line / environment for the ETL run.
#[derive(Debug, Clone, Default)]
pub struct EtlOverrides {
    pub input_path: Option<PathBuf>,
    pub clean_output_path: Option<PathBuf>,
    pub parquet_output_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub table: Option<String>,
}

/// Values supplied on the command line / environment for the dashboard.
#[derive(Debug, Clone, Default)]
pub struct DashboardOverrides {
    pub csv_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub table: Option<String>,
    pub limit: Option<usize>,
    pub sample_rows: Option<usize>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Merge with command-line values into a complete ETL configuration.
    pub fn etl(&self, overrides: EtlOverrides) -> Result<EtlConfig> {
        let input_path = overrides
            .input_path
            .or_else(|| self.input_path.clone())
            .ok_or_else(|| EtlError::MissingConfig("input path (--input or input_path)".into()))?;
        let clean_output_path = overrides
            .clean_output_path
            .or_else(|| self.clean_output_path.clone())
            .unwrap_or_else(|| default_clean_path(&input_path));

        Ok(EtlConfig {
            input_path,
            clean_output_path,
            parquet_output_path: overrides
                .parquet_output_path
                .or_else(|| self.parquet_output_path.clone()),
            database: self.database(overrides.db_path, overrides.table)?,
        })
    }

    /// Merge with command-line values into a dashboard configuration. At
    /// least one of a database or a CSV source is required.
    pub fn dashboard(&self, overrides: DashboardOverrides) -> Result<DashboardConfig> {
        let csv_path = overrides
            .csv_path
            .or_else(|| self.dashboard.csv_path.clone());
        let database = self.database(overrides.db_path, overrides.table)?;
        if csv_path.is_none() && database.is_none() {
            return Err(EtlError::MissingConfig(
                "a data source (--db-path / RETAIL_DB_PATH or --csv)".into(),
            )
            .into());
        }

        Ok(DashboardConfig {
            csv_path,
            database,
            limit: overrides.limit.or(self.dashboard.limit),
            sample_rows: overrides
                .sample_rows
                .or(self.dashboard.sample_rows)
                .unwrap_or(DEFAULT_SAMPLE_ROWS),
        })
    }

    fn database(&self, path: Option<PathBuf>, table: Option<String>) -> Result<Option<DatabaseConfig>> {
        let section = self.database.clone().unwrap_or_default();
        let path = path.or(section.path);
        let table = table.or(section.table);

        match (path, table) {
            (Some(path), table) => {
                let table = table.unwrap_or_else(|| DEFAULT_TABLE.to_string());
                validate_table_name(&table)?;
                Ok(Some(DatabaseConfig { path, table }))
            }
            (None, Some(_)) => Err(EtlError::MissingConfig(
                "database path (--db-path or RETAIL_DB_PATH) for the given table".into(),
            )
            .into()),
            (None, None) => Ok(None),
        }
    }
}

/// `data/superstore.csv` → `data/clean_superstore.csv`
pub fn default_clean_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "extract".to_string());
    input.with_file_name(format!("clean_{stem}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn clean_path_sits_next_to_input() {
        assert_eq!(
            default_clean_path(Path::new("data/superstore.csv")),
            PathBuf::from("data/clean_superstore.csv")
        );
        assert_eq!(
            default_clean_path(Path::new("data/extract.zip")),
            PathBuf::from("data/clean_extract.csv")
        );
    }

    #[test]
    fn input_is_required() {
        let err = FileConfig::default().etl(EtlOverrides::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::MissingConfig(_))
        ));
    }

    #[test]
    fn no_database_unless_path_given() -> Result<()> {
        let cfg = FileConfig::default().etl(EtlOverrides {
            input_path: Some("in.csv".into()),
            ..Default::default()
        })?;
        assert_eq!(cfg.database, None);
        assert_eq!(cfg.clean_output_path, PathBuf::from("clean_in.csv"));
        Ok(())
    }

    #[test]
    fn table_without_path_is_rejected() {
        let err = FileConfig::default()
            .etl(EtlOverrides {
                input_path: Some("in.csv".into()),
                table: Some("sales".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("database path"));
    }

    #[test]
    fn cli_overrides_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("etl.yaml");
        fs::write(
            &path,
            "input_path: data/raw.csv\n\
             clean_output_path: data/out.csv\n\
             database:\n  path: data/retail.duckdb\n  table: from_file\n\
             dashboard:\n  sample_rows: 5\n",
        )?;
        let file = FileConfig::load(&path)?;

        let etl = file.etl(EtlOverrides {
            table: Some("from_cli".into()),
            ..Default::default()
        })?;
        assert_eq!(etl.input_path, PathBuf::from("data/raw.csv"));
        assert_eq!(etl.clean_output_path, PathBuf::from("data/out.csv"));
        assert_eq!(
            etl.database,
            Some(DatabaseConfig {
                path: "data/retail.duckdb".into(),
                table: "from_cli".into()
            })
        );

        let dash = file.dashboard(DashboardOverrides::default())?;
        assert_eq!(dash.sample_rows, 5);
        assert_eq!(dash.database.map(|d| d.table), Some("from_file".to_string()));
        Ok(())
    }

    #[test]
    fn default_table_and_validation() -> Result<()> {
        let cfg = FileConfig::default().etl(EtlOverrides {
            input_path: Some("in.csv".into()),
            db_path: Some("retail.duckdb".into()),
            ..Default::default()
        })?;
        assert_eq!(cfg.database.map(|d| d.table), Some(DEFAULT_TABLE.to_string()));

        let bad = FileConfig::default().etl(EtlOverrides {
            input_path: Some("in.csv".into()),
            db_path: Some("retail.duckdb".into()),
            table: Some("x; DROP TABLE y".into()),
            ..Default::default()
        });
        assert!(bad.is_err());
        Ok(())
    }

    #[test]
    fn dashboard_needs_a_source() {
        assert!(FileConfig::default()
            .dashboard(DashboardOverrides::default())
            .is_err());
    }

    #[test]
    fn sample_defaults_to_two_hundred_rows() -> Result<()> {
        let dash = FileConfig::default().dashboard(DashboardOverrides {
            csv_path: Some("clean.csv".into()),
            ..Default::default()
        })?;
        assert_eq!(dash.sample_rows, 200);
        assert_eq!(dash.database, None);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("etl.yaml");
        fs::write(&path, "password: hunter2\n")?;
        assert!(FileConfig::load(&path).is_err());
        Ok(())
    }
}
