mod consolidate;
mod normalize;
mod parser;
mod record;
mod store;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use parser::ParseOptions;

#[derive(Parser)]
#[command(name = "previsao_estoque", about = "Stock forecast page extractor and consolidator")]
struct Cli {
    /// Directory holding per-run record files
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from one captured page (text or HTML)
    Extract {
        /// Captured page content file
        input: PathBuf,
        /// Queried product code (digits, possibly zero-padded)
        #[arg(short, long)]
        artigo: String,
        /// Keep leading zeros on the article column
        #[arg(long)]
        keep_leading_zeros: bool,
        /// Digit width of the product code that anchors a block
        #[arg(long, default_value = "6")]
        anchor_width: usize,
    },
    /// Extract every capture in a directory, one run file per capture.
    /// Captures are named <artigo>.txt or <artigo>.html
    Batch {
        /// Directory of captured pages
        captures: PathBuf,
        /// Max captures to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        keep_leading_zeros: bool,
        #[arg(long, default_value = "6")]
        anchor_width: usize,
    },
    /// Merge all run files into consolidado.csv + resumo.json
    Consolidate,
    /// Show record counts over the data directory
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { input, artigo, keep_leading_zeros, anchor_width } => {
            let options = ParseOptions { keep_leading_zeros, anchor_width };
            run_extract(&cli.data_dir, &input, &artigo, &options)
        }
        Commands::Batch { captures, limit, keep_leading_zeros, anchor_width } => {
            let options = ParseOptions { keep_leading_zeros, anchor_width };
            run_batch(&cli.data_dir, &captures, limit, &options)
        }
        Commands::Consolidate => run_consolidate(&cli.data_dir),
        Commands::Stats => run_stats(&cli.data_dir),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn run_extract(
    data_dir: &Path,
    input: &Path,
    artigo: &str,
    options: &ParseOptions,
) -> Result<()> {
    check_artigo(artigo)?;
    let content = fs::read_to_string(input)
        .with_context(|| format!("reading capture {}", input.display()))?;
    let captured_at = capture_stamp();

    let outcome = parser::process_capture(&content, artigo, &captured_at, options);
    if outcome.records.is_empty() {
        println!(
            "No data for product {} ({} blocks scanned, {} markers skipped).",
            artigo, outcome.blocks, outcome.skipped_markers
        );
        return Ok(());
    }

    let article = record::format_article(artigo, options.keep_leading_zeros);
    let path = store::write_run_file(data_dir, &article, &outcome.records)?;
    println!(
        "Saved {} records to {} ({} blocks, {} markers skipped, {} invalid dropped).",
        outcome.records.len(),
        path.display(),
        outcome.blocks,
        outcome.skipped_markers,
        outcome.invalid_records
    );
    Ok(())
}

struct BatchCounts {
    captures: usize,
    records: usize,
    empty: usize,
    skipped_markers: usize,
    invalid_records: usize,
}

impl BatchCounts {
    fn print(&self) {
        println!(
            "Processed {} captures: {} records, {} empty, {} markers skipped, {} invalid dropped.",
            self.captures, self.records, self.empty, self.skipped_markers, self.invalid_records,
        );
    }
}

fn run_batch(
    data_dir: &Path,
    captures_dir: &Path,
    limit: Option<usize>,
    options: &ParseOptions,
) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let mut captures: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(captures_dir)
        .with_context(|| format!("reading capture directory {}", captures_dir.display()))?
    {
        let path = entry?.path();
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "txt" | "html" | "htm"));
        if !ext_ok {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            tracing::warn!(file = %path.display(), "capture name is not a product code; skipped");
            continue;
        }
        captures.push((stem.to_string(), path));
    }
    captures.sort();
    if let Some(n) = limit {
        captures.truncate(n);
    }
    if captures.is_empty() {
        println!("No captures found in {}.", captures_dir.display());
        return Ok(());
    }

    println!("Processing {} captures...", captures.len());
    let pb = ProgressBar::new(captures.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let captured_at = capture_stamp();
    let mut counts = BatchCounts {
        captures: captures.len(),
        records: 0,
        empty: 0,
        skipped_markers: 0,
        invalid_records: 0,
    };

    // Extraction is pure and every capture writes its own run file, so the
    // parallel part shares nothing.
    for chunk in captures.chunks(64) {
        let outcomes: Vec<_> = chunk
            .par_iter()
            .map(|(artigo, path)| {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("reading capture {}", path.display()))?;
                Ok((artigo, parser::process_capture(&content, artigo, &captured_at, options)))
            })
            .collect::<Result<Vec<_>>>()?;

        for (artigo, outcome) in outcomes {
            counts.skipped_markers += outcome.skipped_markers;
            counts.invalid_records += outcome.invalid_records;
            if outcome.records.is_empty() {
                counts.empty += 1;
            } else {
                counts.records += outcome.records.len();
                let article = record::format_article(artigo, options.keep_leading_zeros);
                store::write_run_file(data_dir, &article, &outcome.records)?;
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    counts.print();
    Ok(())
}

fn run_consolidate(data_dir: &Path) -> Result<()> {
    match consolidate::run(data_dir)? {
        None => {
            println!("No run files in {}; nothing to consolidate.", data_dir.display());
        }
        Some(dataset) => {
            let t = &dataset.totals;
            println!(
                "Consolidated {} records from {} run files into {}.",
                t.records,
                t.source_files,
                data_dir.join(store::CONSOLIDATED_FILE).display()
            );
            println!(
                "{} articles, {} descriptions | estoque {:.2} | pedidos {:.2} | disponível {:.2}",
                t.articles, t.descriptions, t.stock, t.orders, t.available
            );
        }
    }
    Ok(())
}

fn run_stats(data_dir: &Path) -> Result<()> {
    let files = store::list_run_files(data_dir)?;
    if files.is_empty() {
        println!("No run files in {}.", data_dir.display());
        return Ok(());
    }

    let mut total = 0usize;
    let mut per_article: std::collections::BTreeMap<String, usize> = Default::default();
    for file in &files {
        for r in store::read_records(file)? {
            total += 1;
            *per_article.entry(r.article).or_default() += 1;
        }
    }

    println!("Run files: {}", files.len());
    println!("Records:   {}", total);
    println!("Articles:  {}", per_article.len());
    println!("\n{:>10} | {:>7}", "artigo", "records");
    println!("{}", "-".repeat(21));
    for (article, count) in &per_article {
        println!("{:>10} | {:>7}", article, count);
    }
    Ok(())
}

fn check_artigo(artigo: &str) -> Result<()> {
    if artigo.is_empty() || !artigo.bytes().all(|b| b.is_ascii_digit()) {
        bail!("product code must be numeric, got {:?}", artigo);
    }
    Ok(())
}

fn capture_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
