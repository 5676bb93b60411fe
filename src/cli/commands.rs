//! Command implementations

use crate::config::ExtractConfig;
use crate::extract::{RecordFormat, SignatureExtractor, TypeAliases};
use crate::pipeline::{self, PoolConfig, RunOptions, RunSummary};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Run the extraction pipeline over a corpus
pub fn extract(
    config: ExtractConfig,
    path_in: &Path,
    file: &Path,
    num_threads: usize,
    num_processes: usize,
    format: RecordFormat,
) -> Result<RunSummary> {
    let options = RunOptions {
        input_root: path_in.to_path_buf(),
        output_path: file.to_path_buf(),
        pool: PoolConfig::new(num_processes, num_threads)?,
        format,
    };

    let summary = pipeline::run(&options, Arc::new(config))
        .with_context(|| format!("Extraction from {:?} failed", path_in))?;

    println!("✓ Extraction complete");
    println!("  Work units: {}", summary.units);
    println!("  Workers: {}", summary.workers);
    println!("  Files parsed: {}", summary.files_parsed);
    if summary.files_failed > 0 {
        println!("  Files skipped (parse failure): {}", summary.files_failed);
    }
    if summary.units_failed > 0 {
        println!("  Units skipped (unreadable): {}", summary.units_failed);
    }
    if summary.missing_reports > 0 {
        println!("  ⚠ Workers lost: {}", summary.missing_reports);
    }
    println!("  Unique records: {}", summary.records);
    println!("  Output: {:?}", file);

    Ok(summary)
}

/// Print the records of one source file
pub fn inspect(config: ExtractConfig, target: &Path, format: RecordFormat) -> Result<()> {
    let aliases = TypeAliases::new(&config.type_aliases);
    let mut extractor = SignatureExtractor::new(Arc::new(config), Arc::new(aliases))?;

    let records = extractor
        .extract_path(target)
        .with_context(|| format!("Failed to extract {:?}", target))?;

    for record in &records {
        println!("{}", format.encode(record)?);
    }

    let conflicts = records.iter().filter(|r| r.has_delimiter_conflict()).count();
    if conflicts > 0 && format == RecordFormat::Lines {
        eprintln!(
            "Warning: {} record(s) contain ',' or '|' in a field; use --format jsonl for an unambiguous encoding",
            conflicts
        );
    }

    Ok(())
}
