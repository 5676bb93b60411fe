//! The extracted record and its line encodings

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Separates the three fields of a `lines` record
pub const FIELD_DELIMITER: char = '|';

/// Separates items inside a list field
pub const LIST_DELIMITER: char = ',';

/// One top-level function declaration, reduced to its comparable content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Declared identifier
    pub name: String,
    /// Canonical return type followed by canonical parameter types
    pub signature: Vec<String>,
    /// Alphanumeric runs of the attached comment, in order
    pub comment_tokens: Vec<String>,
}

/// Set of records owned by a worker, later by the aggregator
pub type RecordSet = HashSet<FunctionRecord>;

impl FunctionRecord {
    pub fn new(name: impl Into<String>, signature: Vec<String>, comment_tokens: Vec<String>) -> Self {
        Self {
            name: name.into(),
            signature,
            comment_tokens,
        }
    }

    /// Return type spelling
    pub fn return_type(&self) -> &str {
        self.signature.first().map(String::as_str).unwrap_or("")
    }

    /// Parameter type spellings
    pub fn parameters(&self) -> &[String] {
        self.signature.get(1..).unwrap_or(&[])
    }

    /// `name|ret,params...|tokens...`
    ///
    /// Nothing is escaped: a type spelling that itself contains `,` or `|`
    /// (function pointers, template arguments) makes the line ambiguous.
    /// Use [`RecordFormat::Jsonl`] when that matters.
    pub fn to_line(&self) -> String {
        let list = LIST_DELIMITER.to_string();
        format!(
            "{}{d}{}{d}{}",
            self.name,
            self.signature.join(&list),
            self.comment_tokens.join(&list),
            d = FIELD_DELIMITER
        )
    }

    /// Whether [`to_line`](Self::to_line) would be ambiguous for this record
    pub fn has_delimiter_conflict(&self) -> bool {
        let conflicts = |s: &String| s.contains(FIELD_DELIMITER) || s.contains(LIST_DELIMITER);
        self.name.contains(FIELD_DELIMITER)
            || self.signature.iter().any(conflicts)
            || self.comment_tokens.iter().any(conflicts)
    }
}

impl std::fmt::Display for FunctionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// On-disk encoding of the output artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordFormat {
    /// `name|types|tokens`, one record per line
    #[default]
    Lines,
    /// One JSON object per line
    Jsonl,
}

impl RecordFormat {
    /// Encode a record as a single line, without the newline
    pub fn encode(&self, record: &FunctionRecord) -> serde_json::Result<String> {
        match self {
            RecordFormat::Lines => Ok(record.to_line()),
            RecordFormat::Jsonl => serde_json::to_string(record),
        }
    }
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFormat::Lines => write!(f, "lines"),
            RecordFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
