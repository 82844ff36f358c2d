use anyhow::{Context, Result};
use arrow::csv::WriterBuilder;
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::info;

use super::{arrow::to_record_batch, types::CanonicalTable};

/// Write the cleaned table as CSV (header row, ISO dates, empty cells for
/// nulls). The file is written next to `path` first and renamed over it.
pub fn write_clean_csv<P: AsRef<Path>>(table: &CanonicalTable, path: P) -> Result<u64> {
    let path = path.as_ref();
    let batch = to_record_batch(table)?;

    let bytes = write_atomically(path, |file| {
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer.write(&batch).context("writing CSV batch")?;
        Ok(())
    })?;

    info!(path = %path.display(), rows = table.len(), bytes, "wrote clean CSV");
    Ok(bytes)
}

/// Same batch as [`write_clean_csv`], as a Brotli-compressed Parquet file.
pub fn write_parquet<P: AsRef<Path>>(table: &CanonicalTable, path: P) -> Result<u64> {
    let path = path.as_ref();
    let batch = to_record_batch(table)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .set_dictionary_enabled(true)
        .build();

    let bytes = write_atomically(path, |file| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating parquet writer")?;
        writer.write(&batch).context("writing batch to parquet")?;
        writer.close().context("closing parquet writer")?;
        Ok(())
    })?;

    info!(path = %path.display(), rows = table.len(), bytes, "wrote parquet snapshot");
    Ok(bytes)
}

/// Create parent dirs, write to `.<name>.tmp`, then rename over `path`.
/// Returns the final file size.
fn write_atomically<F>(path: &Path, write: F) -> Result<u64>
where
    F: FnOnce(File) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let tmp_path = tmp_path_for(path);
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating file {}", tmp_path.display()))?;
    if let Err(e) = write(file) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    let metadata = fs::metadata(path).context("getting file metadata")?;
    Ok(metadata.len())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
