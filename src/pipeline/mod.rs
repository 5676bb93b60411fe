//! Parallel extraction pipeline
//!
//! Work units (subdirectories of the input root) go through one shared
//! queue to a pool of workers. Each worker keeps a private record set and
//! hands it over once, through the result channel, to the aggregator, which
//! is the only place sets are merged.

pub mod aggregate;
pub mod pool;
pub mod source;
pub mod worker;

pub use aggregate::{collect, Aggregation, OutputWriter};
pub use pool::{PoolConfig, WorkerPool};
pub use source::{enumerate_units, load_queue, UnitReceiver, WorkUnit};
pub use worker::{WorkerId, WorkerReport, WorkerStats};

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::extract::{RecordFormat, RecordSet, TypeAliases};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Inputs of one extraction run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory whose immediate subdirectories are the work units
    pub input_root: PathBuf,
    /// Output artifact
    pub output_path: PathBuf,
    pub pool: PoolConfig,
    pub format: RecordFormat,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub units: usize,
    pub workers: usize,
    pub units_failed: u64,
    pub files_parsed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    /// Distinct records; after `run`, distinct output lines
    pub records: usize,
    /// Worker results that never reached the aggregator
    pub missing_reports: usize,
    /// Workers that panicked
    pub panicked_workers: usize,
    pub duration: Duration,
}

/// Extract the global record set of a corpus without writing it anywhere
pub fn harvest(
    input_root: &Path,
    pool: &PoolConfig,
    config: Arc<ExtractConfig>,
) -> Result<(RecordSet, RunSummary)> {
    let start = Instant::now();

    let queue = load_queue(enumerate_units(input_root)?)?;
    let unit_count = queue.len();
    if queue.is_empty() {
        warn!(root = ?input_root, "No work units under input root");
    }

    info!(
        root = ?input_root,
        units = unit_count,
        workers = pool.total_workers(),
        "Starting extraction"
    );

    let aliases = Arc::new(TypeAliases::new(&config.type_aliases));
    let expected = pool.total_workers();
    // Room for every report, so publishing never blocks
    let (results_tx, results_rx) = crossbeam_channel::bounded(expected);

    let workers = WorkerPool::start(pool, config, aliases, queue, results_tx)?;
    let aggregation = collect(results_rx, expected);
    let panicked_workers = workers.join();

    let summary = RunSummary {
        units: unit_count,
        workers: expected,
        units_failed: aggregation.stats.units_failed,
        files_parsed: aggregation.stats.files_parsed,
        files_failed: aggregation.stats.files_failed,
        files_skipped: aggregation.stats.files_skipped,
        records: aggregation.records.len(),
        missing_reports: aggregation.missing,
        panicked_workers,
        duration: start.elapsed(),
    };

    Ok((aggregation.records, summary))
}

/// Run the whole pipeline and write the output artifact
pub fn run(options: &RunOptions, config: Arc<ExtractConfig>) -> Result<RunSummary> {
    let start = Instant::now();
    // Fail on an unwritable output before any work is done
    let writer = OutputWriter::create(&options.output_path, options.format)?;

    let (records, mut summary) = harvest(&options.input_root, &options.pool, config)?;
    summary.records = writer.write_records(&records)?;
    summary.duration = start.elapsed();

    info!(
        units = summary.units,
        files = summary.files_parsed,
        failed = summary.files_failed,
        records = summary.records,
        output = ?options.output_path,
        format = %options.format,
        duration_ms = summary.duration.as_millis() as u64,
        "Extraction complete"
    );

    Ok(summary)
}
