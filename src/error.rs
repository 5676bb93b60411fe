//! Error types for sigharvest
//!
//! Two families:
//! - `ParseError`: why a single source file produced no records. These are
//!   absorbed by the pipeline and only ever logged.
//! - `PipelineError`: conditions that abort a run before any work begins.

use std::path::PathBuf;
use thiserror::Error;

/// A single file could not be turned into a syntax tree
#[derive(Error, Debug)]
pub enum ParseError {
    /// No grammar is configured for this extension
    #[error("Unsupported file extension: {path:?}")]
    UnsupportedExtension { path: PathBuf },

    /// The file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The front end gave up (timeout or cancellation)
    #[error("Parser produced no tree for {path:?}")]
    NoTree { path: PathBuf },

    /// The tree contains syntax errors and partial recovery is off
    #[error("Syntax errors in {path:?}")]
    Syntax { path: PathBuf },
}

impl ParseError {
    /// Whether this failure means the file was never a candidate
    pub fn is_skip(&self) -> bool {
        matches!(self, ParseError::UnsupportedExtension { .. })
    }
}

/// Fatal pipeline conditions
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input root cannot be enumerated
    #[error("Cannot read input root {path:?}: {reason}")]
    InputRoot { path: PathBuf, reason: String },

    /// The output artifact cannot be created or written
    #[error("Cannot write output file {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A grammar could not be loaded into a parser
    #[error("Failed to load {language} grammar: {reason}")]
    Grammar {
        language: &'static str,
        reason: String,
    },

    /// The OS refused to start a worker thread
    #[error("Failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Worker counts must be at least one
    #[error("Invalid worker configuration: {0}")]
    InvalidPool(String),

    /// A worker thread panicked before publishing its records
    #[error("Worker {name} panicked")]
    WorkerPanicked { name: String },

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
