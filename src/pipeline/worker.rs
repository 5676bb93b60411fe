//! Worker thread logic
//!
//! Each worker:
//! - Owns its own extractor (tree-sitter parsers are per thread)
//! - Claims units from the shared queue until it is drained
//! - Extracts every file of a unit into a worker-local record set
//! - Publishes that set exactly once when it stops

use super::source::{list_unit_files, UnitReceiver, WorkUnit};
use crate::error::{PipelineError, Result};
use crate::extract::{RecordSet, SignatureExtractor};
use crossbeam_channel::Sender;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Position of a worker in the `processes x threads` grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub outer: usize,
    pub inner: usize,
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.outer, self.inner)
    }
}

/// Counters collected by one worker
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Units claimed
    pub units: u64,
    /// Units whose directory could not be listed
    pub units_failed: u64,
    /// Files that produced a syntax tree
    pub files_parsed: u64,
    /// Files that could not be read or parsed
    pub files_failed: u64,
    /// Files with an extension no grammar is configured for
    pub files_skipped: u64,
    /// Records emitted before worker-local deduplication
    pub records_emitted: u64,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.units += other.units;
        self.units_failed += other.units_failed;
        self.files_parsed += other.files_parsed;
        self.files_failed += other.files_failed;
        self.files_skipped += other.files_skipped;
        self.records_emitted += other.records_emitted;
    }
}

/// What a worker hands to the aggregator when it stops
#[derive(Debug)]
pub struct WorkerReport {
    pub worker: WorkerId,
    pub records: RecordSet,
    pub stats: WorkerStats,
}

/// A worker thread that processes work units
pub struct Worker {
    id: WorkerId,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: WorkerId,
        extractor: SignatureExtractor,
        units: UnitReceiver,
        results: Sender<WorkerReport>,
    ) -> Result<Self> {
        let name = format!("sigharvest-{}", id);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(id, extractor, units, results))
            .map_err(|source| PipelineError::Spawn { name, source })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| PipelineError::WorkerPanicked {
                name: format!("sigharvest-{}", self.id),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: WorkerId,
    mut extractor: SignatureExtractor,
    units: UnitReceiver,
    results: Sender<WorkerReport>,
) {
    let mut records = RecordSet::new();
    let mut stats = WorkerStats::default();

    while let Some(unit) = units.claim() {
        let completed = isolate_unit(&unit, || {
            process_unit(&mut extractor, &unit, &mut records, &mut stats)
        });
        if !completed {
            stats.units_failed += 1;
        }
    }

    debug!(
        worker = %id,
        units = stats.units,
        records = records.len(),
        "Worker drained"
    );

    let report = WorkerReport {
        worker: id,
        records,
        stats,
    };
    if results.send(report).is_err() {
        warn!(worker = %id, "Aggregator went away before results were published");
    }
}

/// Run the work for one unit; a panic inside it costs only that unit.
///
/// Records already folded into the worker's set are kept.
fn isolate_unit<F: FnOnce()>(unit: &WorkUnit, work: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(()) => true,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(unit = %unit.name, reason = %reason, "Unit aborted by a panic");
            false
        }
    }
}

/// Extract every file of one unit into `records`
pub fn process_unit(
    extractor: &mut SignatureExtractor,
    unit: &WorkUnit,
    records: &mut RecordSet,
    stats: &mut WorkerStats,
) {
    stats.units += 1;

    let files = match list_unit_files(unit) {
        Ok(files) => files,
        Err(e) => {
            warn!(unit = %unit.name, error = %e, "Skipping unit that cannot be listed");
            stats.units_failed += 1;
            return;
        }
    };

    for path in files {
        match extractor.extract_path(&path) {
            Ok(found) => {
                stats.files_parsed += 1;
                stats.records_emitted += found.len() as u64;
                trace!(path = ?path, records = found.len(), "Extracted file");
                records.extend(found);
            }
            Err(e) if e.is_skip() => {
                stats.files_skipped += 1;
                trace!(path = ?path, "Skipping file without a configured grammar");
            }
            Err(e) => {
                stats.files_failed += 1;
                debug!(error = %e, "Skipping file that failed to parse");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FunctionRecord;
    use crate::pipeline::source::load_queue;
    use crossbeam_channel::bounded;
    use std::fs;

    #[test]
    fn test_process_unit_collapses_duplicates() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("math");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.c"), "int add(int a, int b);\n").unwrap();
        fs::write(dir.join("b.c"), "int add(int x, int y) { return x + y; }\n").unwrap();
        fs::write(dir.join("broken.c"), "int ((( nope\n").unwrap();
        fs::write(dir.join("README"), "not code").unwrap();

        let mut extractor = SignatureExtractor::with_defaults().unwrap();
        let mut records = RecordSet::new();
        let mut stats = WorkerStats::default();
        process_unit(&mut extractor, &WorkUnit::new(root.path(), "math"), &mut records, &mut stats);

        let lines: Vec<_> = records.iter().map(|r| r.to_line()).collect();
        assert_eq!(lines, vec!["add|int,int,int|"]);
        assert_eq!(stats.units, 1);
        assert_eq!(stats.files_parsed, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.records_emitted, 2);
    }

    #[test]
    fn test_missing_unit_is_counted_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let mut extractor = SignatureExtractor::with_defaults().unwrap();
        let mut records = RecordSet::new();
        let mut stats = WorkerStats::default();
        process_unit(&mut extractor, &WorkUnit::new(root.path(), "vanished"), &mut records, &mut stats);

        assert!(records.is_empty());
        assert_eq!(stats.units, 1);
        assert_eq!(stats.units_failed, 1);
    }

    #[test]
    fn test_worker_publishes_once_on_drained_queue() {
        let queue = load_queue(Vec::new()).unwrap();
        let (tx, rx) = bounded(1);
        let id = WorkerId { outer: 0, inner: 0 };

        let worker = Worker::spawn(id, SignatureExtractor::with_defaults().unwrap(), queue, tx).unwrap();
        worker.join().unwrap();

        let report = rx.recv().unwrap();
        assert_eq!(report.worker, id);
        assert!(report.records.is_empty());
        assert_eq!(report.stats, WorkerStats::default());
        // The worker's sender is gone, nothing else arrives
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_panicking_unit_keeps_earlier_records() {
        let root = tempfile::tempdir().unwrap();
        let mut records = RecordSet::new();
        records.insert(FunctionRecord::new("kept", vec!["int".into()], vec![]));

        let unit = WorkUnit::new(root.path(), "cursed");
        let completed = isolate_unit(&unit, || {
            records.insert(FunctionRecord::new("partial", vec!["void".into()], vec![]));
            panic!("parser blew up");
        });

        assert!(!completed);
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.name == "kept"));
        assert!(isolate_unit(&unit, || {}));
    }

    #[test]
    fn test_stats_merge() {
        let mut total = WorkerStats::default();
        let one = WorkerStats {
            units: 2,
            files_parsed: 5,
            records_emitted: 9,
            ..Default::default()
        };
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.units, 4);
        assert_eq!(total.files_parsed, 10);
        assert_eq!(total.records_emitted, 18);
    }
}
