//! Batch merge of all per-run record files into one dataset.
//!
//! Consolidation is a pure read-then-compute step over whatever runs exist:
//! it never mutates a source file and rebuilding it from the same inputs
//! yields the same output. Writing the result is single-writer; a second
//! concurrent invocation is rejected instead of interleaving.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use serde::Serialize;

use crate::normalize::parse_value;
use crate::record::StockRecord;
use crate::store;

#[derive(Debug, Serialize)]
pub struct Totals {
    pub records: usize,
    pub articles: usize,
    pub descriptions: usize,
    pub stock: f64,
    pub orders: f64,
    pub available: f64,
    pub source_files: usize,
}

#[derive(Debug, Serialize)]
pub struct ArticleSummary {
    pub article: String,
    pub records: usize,
    pub descriptions: usize,
    pub stock: f64,
    pub orders: f64,
    pub available: f64,
}

#[derive(Debug)]
pub struct ConsolidatedDataset {
    pub records: Vec<StockRecord>,
    pub by_article: Vec<ArticleSummary>,
    pub totals: Totals,
}

/// Merge rows from every run: exact duplicates go first, then rows that are
/// the same `(article, description, forecast)` captured by redundant runs
/// collapse to the most recent capture. Output order is description, then
/// the custom forecast order (immediate first, dates chronological).
pub fn consolidate(all: Vec<StockRecord>, source_files: usize) -> ConsolidatedDataset {
    let mut seen: HashSet<StockRecord> = HashSet::new();
    let mut merged: HashMap<(String, String, String), StockRecord> = HashMap::new();

    for record in all {
        if !seen.insert(record.clone()) {
            continue;
        }
        if !record.is_valid() {
            tracing::warn!(
                article = %record.article,
                forecast = %record.forecast,
                "invalid row dropped during consolidation"
            );
            continue;
        }
        let key = (
            record.article.clone(),
            record.description.clone(),
            record.forecast.clone(),
        );
        match merged.entry(key) {
            Entry::Occupied(mut slot) => {
                // Capture timestamps are "YYYY-MM-DD HH:MM:SS", so string
                // order is capture order.
                if record.captured_at > slot.get().captured_at {
                    slot.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let mut records: Vec<StockRecord> = merged.into_values().collect();
    records.sort_by(|a, b| {
        a.description
            .cmp(&b.description)
            .then_with(|| a.forecast_key().cmp(&b.forecast_key()))
            .then_with(|| a.article.cmp(&b.article))
    });

    let groups: HashMap<String, Vec<&StockRecord>> = records
        .iter()
        .map(|r| (r.article.clone(), r))
        .into_group_map();
    let mut by_article: Vec<ArticleSummary> = groups
        .into_iter()
        .map(|(article, rows)| ArticleSummary {
            article,
            records: rows.len(),
            descriptions: rows.iter().map(|r| &r.description).unique().count(),
            stock: rows.iter().map(|r| parse_value(&r.stock)).sum(),
            orders: rows.iter().map(|r| parse_value(&r.orders)).sum(),
            available: rows.iter().map(|r| parse_value(&r.available)).sum(),
        })
        .collect();
    by_article.sort_by_key(|s| s.article.parse::<u64>().unwrap_or(u64::MAX));

    let totals = Totals {
        records: records.len(),
        articles: by_article.len(),
        descriptions: records.iter().map(|r| &r.description).unique().count(),
        stock: records.iter().map(|r| parse_value(&r.stock)).sum(),
        orders: records.iter().map(|r| parse_value(&r.orders)).sum(),
        available: records.iter().map(|r| parse_value(&r.available)).sum(),
        source_files,
    };

    ConsolidatedDataset { records, by_article, totals }
}

/// Load every run file under `dir`, consolidate, and write
/// `consolidado.csv` + `resumo.json`. Returns `None` when there is nothing
/// to merge, which is a user-facing situation rather than an error.
pub fn run(dir: &Path) -> Result<Option<ConsolidatedDataset>> {
    let files = store::list_run_files(dir)?;
    if files.is_empty() {
        return Ok(None);
    }

    let _guard = LockGuard::acquire(dir)?;

    let mut all = Vec::new();
    for file in &files {
        let records = store::read_records(file)
            .with_context(|| format!("reading {}", file.display()))?;
        tracing::debug!(file = %file.display(), records = records.len(), "run file loaded");
        all.extend(records);
    }

    let dataset = consolidate(all, files.len());

    store::write_atomic(&dir.join(store::CONSOLIDATED_FILE), &dataset.records)?;

    let summary = serde_json::to_string_pretty(&SummaryArtifact {
        totals: &dataset.totals,
        by_article: &dataset.by_article,
    })?;
    let tmp = dir.join(format!("{}.tmp", store::SUMMARY_FILE));
    fs::write(&tmp, summary)?;
    fs::rename(&tmp, dir.join(store::SUMMARY_FILE))?;

    Ok(Some(dataset))
}

#[derive(Serialize)]
struct SummaryArtifact<'a> {
    totals: &'a Totals,
    by_article: &'a [ArticleSummary],
}

/// `create_new` lock file; consolidation requests overlapping an in-flight
/// one are rejected, matching the single-writer discipline.
struct LockGuard {
    path: PathBuf,
    _file: File,
}

impl LockGuard {
    fn acquire(dir: &Path) -> Result<LockGuard> {
        let path = dir.join(".consolidado.lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(LockGuard { path, _file: file }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => bail!(
                "another consolidation is already running (remove {} if it is stale)",
                path.display()
            ),
            Err(e) => Err(e).context("acquiring consolidation lock"),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
