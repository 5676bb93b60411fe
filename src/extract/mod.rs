//! C/C++ signature extraction module
//!
//! This module turns one source file into function records:
//! - `code`: front-end parsing (tree-sitter) and the top-level walk
//! - `types`: canonical type spelling with typedef resolution
//! - `comment`: doc-comment attachment and tokenization
//! - `preproc`: conditional blocks and `extern "C"` guards
//! - `record`: the record type and its output encodings

pub mod code;
pub mod comment;
pub mod preproc;
pub mod record;
pub mod types;

pub use code::{Language, SignatureExtractor};
pub use comment::tokenize_comment;
pub use record::{FunctionRecord, RecordFormat, RecordSet};
pub use types::TypeAliases;
