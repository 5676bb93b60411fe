//! Integration tests for the extraction pipeline
//!
//! These build small corpora on disk and run the full queue/worker/aggregator
//! path through the public API.

use sigharvest::pipeline::{harvest, run, PoolConfig, RunOptions};
use sigharvest::{ExtractConfig, FunctionRecord, PipelineError, RecordFormat, RecordSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A corpus with several units, shared declarations and one broken file
fn sample_corpus() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();

    write(root, "math/add.c", "int add(int a, int b);\n");
    write(root, "math/add_again.c", "int add(int a, int b);\n");
    write(
        root,
        "math/ops.h",
        "#include <stddef.h>\n/** Sum of a buffer. */\nsize_t sum(const int *values, size_t n);\n",
    );
    write(root, "log/log.c", "/** Logs a message. */\nvoid log(const char* msg);\n");
    write(root, "log/broken.c", "int ((( nope\n");
    write(root, "log/notes.txt", "not a source file\n");
    write(
        root,
        "overload/f.cpp",
        "int f(int);\nint f(double);\nnamespace n { int g(); }\n",
    );
    write(
        root,
        "headers/api.h",
        concat!(
            "#ifndef API_H\n",
            "#define API_H\n",
            "\n",
            "#ifdef __cplusplus\n",
            "extern \"C\" {\n",
            "#endif\n",
            "\n",
            "/* Opens the API. */\n",
            "int open_api(const char *name);\n",
            "\n",
            "#if API_VERSION > 1\n",
            "void close_api(int handle);\n",
            "#endif\n",
            "\n",
            "#ifdef __cplusplus\n",
            "}\n",
            "#endif\n",
            "\n",
            "#endif\n",
        ),
    );
    write(root, "empty/.keep", "");
    for i in 0..12 {
        write(root, &format!("bulk{i}/shared.c"), "int add(int a, int b);\n");
        write(root, &format!("bulk{i}/own.c"), &format!("long unit_{i}(void);\n"));
    }
    // Loose files at the root are not units
    write(root, "stray.c", "int stray(void);\n");

    dir
}

fn harvest_with(root: &Path, processes: usize, threads: usize) -> RecordSet {
    let pool = PoolConfig::new(processes, threads).unwrap();
    let (records, _) = harvest(root, &pool, Arc::new(ExtractConfig::default())).unwrap();
    records
}

#[test]
fn test_result_independent_of_pool_shape() {
    let corpus = sample_corpus();
    let baseline = harvest_with(corpus.path(), 1, 1);

    for (processes, threads) in [(1, 4), (2, 3), (4, 1), (8, 8)] {
        assert_eq!(
            harvest_with(corpus.path(), processes, threads),
            baseline,
            "pool {processes}x{threads} diverged"
        );
    }
}

#[test]
fn test_expected_records() {
    let corpus = sample_corpus();
    let records = harvest_with(corpus.path(), 2, 2);

    assert!(records.contains(&FunctionRecord::new(
        "add",
        vec!["int".into(), "int".into(), "int".into()],
        vec![],
    )));
    assert!(records.contains(&FunctionRecord::new(
        "log",
        vec!["void".into(), "const char *".into()],
        vec!["Logs".into(), "a".into(), "message".into()],
    )));
    assert!(records.contains(&FunctionRecord::new(
        "f",
        vec!["int".into(), "int".into()],
        vec![],
    )));
    assert!(records.contains(&FunctionRecord::new(
        "f",
        vec!["int".into(), "double".into()],
        vec![],
    )));
    assert!(records.contains(&FunctionRecord::new(
        "sum",
        vec!["unsigned long".into(), "const int *".into(), "unsigned long".into()],
        vec!["Sum".into(), "of".into(), "a".into(), "buffer".into()],
    )));

    assert!(records.contains(&FunctionRecord::new(
        "open_api",
        vec!["int".into(), "const char *".into()],
        vec!["Opens".into(), "the".into(), "API".into()],
    )));
    assert!(records.contains(&FunctionRecord::new(
        "close_api",
        vec!["void".into(), "int".into()],
        vec![],
    )));

    // 12 per-unit functions, add, log, two f overloads, sum, two from api.h
    assert_eq!(records.len(), 19);
    assert!(!records.iter().any(|r| r.name == "stray" || r.name == "g"));
}

#[test]
fn test_broken_file_does_not_affect_siblings() {
    let corpus = sample_corpus();
    let pool = PoolConfig::new(1, 2).unwrap();
    let (with_broken, summary) = harvest(corpus.path(), &pool, Arc::new(ExtractConfig::default())).unwrap();

    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_skipped, 2);
    assert_eq!(summary.missing_reports, 0);
    assert_eq!(summary.panicked_workers, 0);

    fs::remove_file(corpus.path().join("log").join("broken.c")).unwrap();
    let (without_broken, summary) = harvest(corpus.path(), &pool, Arc::new(ExtractConfig::default())).unwrap();

    assert_eq!(summary.files_failed, 0);
    assert_eq!(with_broken, without_broken);
}

#[test]
fn test_more_workers_than_units() {
    let dir = tempdir().unwrap();
    write(dir.path(), "only/a.c", "char *dup(const char *s);\n");

    let records = harvest_with(dir.path(), 4, 4);
    assert_eq!(records.len(), 1);
    let record = records.iter().next().unwrap();
    assert_eq!(record.to_line(), "dup|char *,const char *|");
}

#[test]
fn test_empty_root_produces_empty_file() {
    let corpus = tempdir().unwrap();
    let out = tempdir().unwrap();
    let options = RunOptions {
        input_root: corpus.path().to_path_buf(),
        output_path: out.path().join("funcs.txt"),
        pool: PoolConfig::new(2, 2).unwrap(),
        format: RecordFormat::Lines,
    };

    let summary = run(&options, Arc::new(ExtractConfig::default())).unwrap();
    assert_eq!(summary.units, 0);
    assert_eq!(summary.records, 0);
    assert_eq!(fs::read_to_string(&options.output_path).unwrap(), "");
}

#[test]
fn test_output_lines_are_unique() {
    let corpus = sample_corpus();
    let out = tempdir().unwrap();
    let options = RunOptions {
        input_root: corpus.path().to_path_buf(),
        output_path: out.path().join("funcs.txt"),
        pool: PoolConfig::new(3, 2).unwrap(),
        format: RecordFormat::Lines,
    };

    let summary = run(&options, Arc::new(ExtractConfig::default())).unwrap();
    let content = fs::read_to_string(&options.output_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let unique: std::collections::HashSet<&str> = lines.iter().copied().collect();

    assert_eq!(lines.len(), summary.records);
    assert_eq!(unique.len(), lines.len());
    assert!(lines.contains(&"add|int,int,int|"));
    assert!(lines.contains(&"log|void,const char *|Logs,a,message"));
}

#[test]
fn test_jsonl_output() {
    let dir = tempdir().unwrap();
    write(dir.path(), "u/a.c", "int add(int a, int b);\n");
    let out = tempdir().unwrap();
    let options = RunOptions {
        input_root: dir.path().to_path_buf(),
        output_path: out.path().join("funcs.jsonl"),
        pool: PoolConfig::new(1, 1).unwrap(),
        format: RecordFormat::Jsonl,
    };

    run(&options, Arc::new(ExtractConfig::default())).unwrap();
    let content = fs::read_to_string(&options.output_path).unwrap();
    let record: FunctionRecord = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(record.name, "add");
    assert_eq!(record.signature, vec!["int", "int", "int"]);
    assert!(record.comment_tokens.is_empty());
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let pool = PoolConfig::new(1, 1).unwrap();
    let result = harvest(&dir.path().join("absent"), &pool, Arc::new(ExtractConfig::default()));
    assert!(matches!(result, Err(PipelineError::InputRoot { .. })));
}

#[test]
fn test_configured_alias_applies_to_all_workers() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        write(dir.path(), &format!("u{i}/a.c"), "handle_t open_handle(void);\n");
    }

    let mut config = ExtractConfig::default();
    config.type_aliases.insert("handle_t".into(), "int".into());
    let pool = PoolConfig::new(2, 2).unwrap();
    let (records, _) = harvest(dir.path(), &pool, Arc::new(config)).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records.iter().next().unwrap().to_line(), "open_handle|int|");
}
