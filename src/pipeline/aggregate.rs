//! Aggregation of worker results and the output artifact

use super::worker::{WorkerReport, WorkerStats};
use crate::error::{PipelineError, Result};
use crate::extract::{RecordFormat, RecordSet};
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Union of every published worker set
#[derive(Debug, Default)]
pub struct Aggregation {
    pub records: RecordSet,
    pub stats: WorkerStats,
    /// Reports received
    pub reports: usize,
    /// Reports that never arrived (their worker died)
    pub missing: usize,
}

/// Receive `expected` reports and union them.
///
/// Stops early when every sender is gone; the shortfall ends up in
/// [`Aggregation::missing`].
pub fn collect(results: Receiver<WorkerReport>, expected: usize) -> Aggregation {
    let mut aggregation = Aggregation::default();

    while aggregation.reports < expected {
        let Ok(report) = results.recv() else {
            break;
        };
        trace!(
            worker = %report.worker,
            records = report.records.len(),
            "Received worker results"
        );

        aggregation.stats.merge(&report.stats);
        let mut records = report.records;
        // Extend the larger set with the smaller one
        if records.len() > aggregation.records.len() {
            std::mem::swap(&mut records, &mut aggregation.records);
        }
        aggregation.records.extend(records);
        aggregation.reports += 1;
    }

    aggregation.missing = expected - aggregation.reports;
    if aggregation.missing > 0 {
        warn!(
            expected,
            received = aggregation.reports,
            "Some workers never published their results"
        );
    }

    aggregation
}

/// Output artifact, created up front so an unwritable path fails early
pub struct OutputWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    format: RecordFormat,
}

impl OutputWriter {
    /// Create (or truncate) the output file
    pub fn create(path: &Path, format: RecordFormat) -> Result<Self> {
        let file = File::create(path).map_err(|source| PipelineError::Output {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            format,
        })
    }

    /// Write one line per distinct encoding; returns the number written.
    ///
    /// `lines` does not escape delimiters, so different records can encode
    /// to the same line. Each line is written once.
    pub fn write_records(mut self, records: &RecordSet) -> Result<usize> {
        let path = self.path.clone();
        let to_error = |source: std::io::Error| PipelineError::Output {
            path: path.clone(),
            source,
        };

        let mut written = HashSet::with_capacity(records.len());
        for record in records {
            let line = self.format.encode(record).map_err(|e| to_error(e.into()))?;
            if written.contains(&line) {
                trace!(line = %line, "Skipping record whose encoding is already written");
                continue;
            }
            self.writer.write_all(line.as_bytes()).map_err(to_error)?;
            self.writer.write_all(b"\n").map_err(to_error)?;
            written.insert(line);
        }
        self.writer.flush().map_err(to_error)?;

        Ok(written.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FunctionRecord;
    use crate::pipeline::worker::WorkerId;
    use crossbeam_channel::bounded;
    use std::collections::HashSet;

    fn record(name: &str, params: &[&str]) -> FunctionRecord {
        let mut signature = vec!["int".to_string()];
        signature.extend(params.iter().map(|p| p.to_string()));
        FunctionRecord::new(name, signature, vec![])
    }

    fn report(inner: usize, records: Vec<FunctionRecord>) -> WorkerReport {
        WorkerReport {
            worker: WorkerId { outer: 0, inner },
            records: records.into_iter().collect(),
            stats: WorkerStats {
                units: 1,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_collect_unions_overlapping_sets() {
        let (tx, rx) = bounded(3);
        tx.send(report(0, vec![record("a", &[]), record("b", &["int"])])).unwrap();
        tx.send(report(1, vec![record("b", &["int"]), record("c", &["double"])])).unwrap();
        tx.send(report(2, vec![])).unwrap();

        let aggregation = collect(rx, 3);
        assert_eq!(aggregation.reports, 3);
        assert_eq!(aggregation.missing, 0);
        assert_eq!(aggregation.stats.units, 3);

        let names: HashSet<_> = aggregation.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(aggregation.records.len(), 3);
        assert_eq!(names, HashSet::from(["a", "b", "c"]));
    }

    #[test]
    fn test_collect_stops_when_senders_are_gone() {
        let (tx, rx) = bounded(4);
        tx.send(report(0, vec![record("a", &[])])).unwrap();
        drop(tx);

        let aggregation = collect(rx, 4);
        assert_eq!(aggregation.reports, 1);
        assert_eq!(aggregation.missing, 3);
        assert_eq!(aggregation.records.len(), 1);
    }

    #[test]
    fn test_writer_emits_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let records: RecordSet = [record("f", &["int"]), record("f", &["double"])].into_iter().collect();
        let written = OutputWriter::create(&path, RecordFormat::Lines)
            .unwrap()
            .write_records(&records)
            .unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: HashSet<_> = content.lines().collect();
        assert_eq!(lines, HashSet::from(["f|int,int|", "f|int,double|"]));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_writer_collapses_colliding_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        // One parameter spelled with a comma vs two parameters
        let records: RecordSet = [
            FunctionRecord::new("f", vec!["int".into(), "pair<int,int>".into()], vec![]),
            FunctionRecord::new("f", vec!["int".into(), "pair<int".into(), "int>".into()], vec![]),
        ]
        .into_iter()
        .collect();
        assert_eq!(records.len(), 2);

        let written = OutputWriter::create(&path, RecordFormat::Lines)
            .unwrap()
            .write_records(&records)
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "f|int,pair<int,int>|\n");
    }

    #[test]
    fn test_jsonl_keeps_records_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let records: RecordSet = [
            FunctionRecord::new("f", vec!["int".into(), "pair<int,int>".into()], vec![]),
            FunctionRecord::new("f", vec!["int".into(), "pair<int".into(), "int>".into()], vec![]),
        ]
        .into_iter()
        .collect();

        let written = OutputWriter::create(&path, RecordFormat::Jsonl)
            .unwrap()
            .write_records(&records)
            .unwrap();
        assert_eq!(written, 2);
    }

    #[test]
    fn test_writer_empty_set_gives_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        OutputWriter::create(&path, RecordFormat::Jsonl)
            .unwrap()
            .write_records(&RecordSet::new())
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_writer_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("out.txt");
        assert!(matches!(
            OutputWriter::create(&path, RecordFormat::Lines),
            Err(PipelineError::Output { .. })
        ));
    }
}
