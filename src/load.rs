// src/load.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use std::{
    borrow::Cow,
    fs::{self, File},
    io::Read,
    path::Path,
};
use tracing::{info, warn};
use zip::ZipArchive;

use crate::error::EtlError;
use crate::process::RawTable;

/// Read a CSV (or the first CSV inside a `.zip`) into a [`RawTable`].
///
/// - missing path → [`EtlError::MissingInput`], before anything is read
/// - bytes are decoded as UTF-8, falling back to windows-1252 (Latin-1)
/// - lines with more fields than the header are skipped, shorter ones padded
pub fn load_raw_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(EtlError::MissingInput(path.to_path_buf()).into());
    }

    let bytes = if is_zip(path) {
        read_first_csv_entry(path)?
    } else {
        fs::read(path).with_context(|| format!("reading {}", path.display()))?
    };

    let text = decode(&bytes);
    let table = parse_csv(&text)?;
    info!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded raw extract"
    );
    Ok(table)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"))
}

/// Upper bound on the buffer reserved up front for an archive entry.
const MAX_PREALLOC: u64 = 64 << 20;

/// Archive headers declare the entry size; it is only trusted up to
/// [`MAX_PREALLOC`].
fn prealloc_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

fn read_first_csv_entry(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("reading archive {}", path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.name().to_lowercase().ends_with(".csv") {
            continue;
        }
        info!(archive = %path.display(), entry = entry.name(), "reading CSV from archive");
        let mut buf = Vec::with_capacity(prealloc_hint(entry.size()));
        entry.read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Err(EtlError::EmptyArchive(path.to_path_buf()).into())
}

/// UTF-8 (BOM stripped) when valid, windows-1252 otherwise.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            warn!("input is not valid UTF-8, decoding as Latin-1");
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded
        }
    }
}

/// Parse CSV text into headers + rows, skipping malformed lines.
pub fn parse_csv(text: &str) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    let width = headers.len();
    let mut table = RawTable::new(headers);

    let mut skipped = 0usize;
    for (line_no, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line_no + 2, error = %e, "unreadable CSV record, skipping");
                skipped += 1;
                continue;
            }
        };
        if record.len() > width {
            skipped += 1;
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        table.rows.push(row);
    }

    if skipped > 0 {
        warn!(skipped, "skipped malformed CSV lines");
    }
    Ok(table)
}
