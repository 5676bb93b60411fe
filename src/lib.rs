//! sigharvest - parallel C/C++ function signature harvester
//!
//! This library walks a corpus of source folders, extracts every top-level
//! function declaration (name, canonical signature, doc-comment tokens) and
//! merges the results of many workers into one deduplicated set.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;

/// Re-export commonly used types
pub use config::ExtractConfig;
pub use error::{ParseError, PipelineError};
pub use extract::{FunctionRecord, RecordFormat, RecordSet, SignatureExtractor};
pub use pipeline::{harvest, run, PoolConfig, RunOptions, RunSummary};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "sigharvest";
