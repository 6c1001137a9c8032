//! Per-run record files: `;`-delimited, UTF-8 with BOM, one header row.
//!
//! Each extraction run writes exactly one file and never touches another
//! run's output, which is what makes concurrent extraction safe without any
//! locking. Files land under their final name only after being fully
//! written, so a reader never sees a half-written run.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::StockRecord;

/// Run files are `previsao_<artigo>_<YYYYMMDD_HHMMSS>.csv`; the prefix keeps
/// the consolidated output from feeding back into a later consolidation.
pub const RUN_PREFIX: &str = "previsao_";
pub const CONSOLIDATED_FILE: &str = "consolidado.csv";
pub const SUMMARY_FILE: &str = "resumo.json";

const BOM: &[u8] = b"\xEF\xBB\xBF";
const HEADER: &str = "artigo;datahora;\"Produto / Situação / Cor / Desenho / Variante\";Previsão;Estoque;Pedidos;Disponível";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record file error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Write one run's records under a timestamped name, temp + rename.
pub fn write_run_file(dir: &Path, article: &str, records: &[StockRecord]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let name = format!("{RUN_PREFIX}{article}_{stamp}.csv");
    let path = dir.join(&name);
    write_atomic(&path, records)?;
    Ok(path)
}

/// Write a record file through a `.tmp` sibling and rename into place.
pub fn write_atomic(path: &Path, records: &[StockRecord]) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    write_records(&tmp, records)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_records(path: &Path, records: &[StockRecord]) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    buf.write_all(BOM)?;
    writeln!(buf, "{HEADER}")?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(&mut buf);
    for r in records {
        writer.write_record([
            &r.article,
            &r.captured_at,
            &r.description,
            &r.forecast,
            &r.stock,
            &r.orders,
            &r.available,
        ])?;
    }
    writer.flush()?;
    drop(writer);
    fs::write(path, &buf)?;
    Ok(())
}

/// Run files under `dir`, oldest first. Missing directory reads as empty.
pub fn list_run_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with(RUN_PREFIX) && name.ends_with(".csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read every record of one file, tolerating the BOM. Short rows are logged
/// and skipped; validity is the consolidator's business.
pub fn read_records(path: &Path) -> Result<Vec<StockRecord>> {
    let mut raw = String::new();
    File::open(path)?.read_to_string(&mut raw)?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() < 7 {
            tracing::warn!(file = %path.display(), fields = row.len(), "short row skipped");
            continue;
        }
        records.push(StockRecord {
            article: row[0].to_string(),
            captured_at: row[1].to_string(),
            description: row[2].to_string(),
            forecast: row[3].to_string(),
            stock: row[4].to_string(),
            orders: row[5].to_string(),
            available: row[6].to_string(),
        });
    }
    Ok(records)
}
