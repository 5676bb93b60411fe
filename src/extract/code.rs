//! Function signature extraction using tree-sitter
//!
//! Only top-level items are considered: direct children of the translation
//! unit, and the contents of preprocessor conditionals and `extern "C"`
//! blocks at that level.
//! - `function_definition` nodes
//! - `declaration` nodes whose declarator names a function
//!
//! Top-level `typedef`/`using` declarations are collected along the way so
//! later signatures can be spelled with the underlying types.

use super::comment::comment_tokens;
use super::preproc::{mask_linkage_guards, TRANSPARENT_KINDS};
use super::record::FunctionRecord;
use super::types::{CType, TypeAliases, TypeBuilder};
use crate::config::ExtractConfig;
use crate::error::{ParseError, PipelineError};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tree_sitter::Node;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    /// Get the tree-sitter language for this language
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts function records from C and C++ files.
///
/// Holds one parser per grammar, so each worker owns its own extractor.
pub struct SignatureExtractor {
    c_parser: tree_sitter::Parser,
    cpp_parser: tree_sitter::Parser,
    config: Arc<ExtractConfig>,
    aliases: Arc<TypeAliases>,
}

impl SignatureExtractor {
    /// Create a new extractor
    pub fn new(config: Arc<ExtractConfig>, aliases: Arc<TypeAliases>) -> Result<Self, PipelineError> {
        let c_parser = Self::parser_for(Language::C, &config)?;
        let cpp_parser = Self::parser_for(Language::Cpp, &config)?;

        Ok(Self {
            c_parser,
            cpp_parser,
            config,
            aliases,
        })
    }

    /// Extractor with default configuration
    pub fn with_defaults() -> Result<Self, PipelineError> {
        let config = ExtractConfig::default();
        let aliases = TypeAliases::new(&config.type_aliases);
        Self::new(Arc::new(config), Arc::new(aliases))
    }

    #[allow(deprecated)]
    fn parser_for(language: Language, config: &ExtractConfig) -> Result<tree_sitter::Parser, PipelineError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&language.tree_sitter_language())
            .map_err(|e| PipelineError::Grammar {
                language: language.name(),
                reason: e.to_string(),
            })?;
        if let Some(timeout) = config.parse_timeout() {
            parser.set_timeout_micros(timeout.as_micros() as u64);
        }
        Ok(parser)
    }

    /// Read and extract one file from disk
    pub fn extract_path(&mut self, path: &Path) -> Result<Vec<FunctionRecord>, ParseError> {
        // Check the extension before touching the file
        if self.config.language_for(path).is_none() {
            return Err(ParseError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }

        let source = std::fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.extract_file(path, &source)
    }

    /// Extract records from file contents; `path` selects the grammar
    pub fn extract_file(&mut self, path: &Path, source: &[u8]) -> Result<Vec<FunctionRecord>, ParseError> {
        let language = self
            .config
            .language_for(path)
            .ok_or_else(|| ParseError::UnsupportedExtension {
                path: path.to_path_buf(),
            })?;

        let source = mask_linkage_guards(source);
        let parser = match language {
            Language::C => &mut self.c_parser,
            Language::Cpp => &mut self.cpp_parser,
        };
        // A timed-out parse must not leave state behind for the next file
        parser.reset();

        let tree = parser.parse(&*source, None).ok_or_else(|| ParseError::NoTree {
            path: path.to_path_buf(),
        })?;

        let root = tree.root_node();
        if root.has_error() && !self.config.recover_partial {
            return Err(ParseError::Syntax {
                path: path.to_path_buf(),
            });
        }

        let mut builder = TypeBuilder::new(language, &source, &self.aliases);
        let mut records = Vec::new();
        walk_items(&mut builder, language, root, &source, &mut records);

        if root.has_error() {
            if records.is_empty() {
                return Err(ParseError::Syntax {
                    path: path.to_path_buf(),
                });
            }
            debug!(path = ?path, records = records.len(), "Kept clean declarations of a file with syntax errors");
        }

        Ok(records)
    }
}

/// Visit the top-level items under `parent`, in source order.
///
/// Conditional blocks and linkage specifications are looked through, so
/// what they contain counts as top level.
fn walk_items(
    builder: &mut TypeBuilder,
    language: Language,
    parent: Node,
    source: &[u8],
    records: &mut Vec<FunctionRecord>,
) {
    let mut cursor = parent.walk();
    for node in parent.named_children(&mut cursor) {
        visit_item(builder, language, node, source, records);
    }
}

fn visit_item(
    builder: &mut TypeBuilder,
    language: Language,
    node: Node,
    source: &[u8],
    records: &mut Vec<FunctionRecord>,
) {
    let kind = node.kind();
    if TRANSPARENT_KINDS.contains(&kind) {
        walk_items(builder, language, node, source, records);
        return;
    }
    if kind == "linkage_specification" {
        if let Some(body) = node.child_by_field_name("body") {
            visit_item(builder, language, body, source, records);
        }
        return;
    }

    if node.has_error() {
        return;
    }

    match kind {
        "type_definition" | "alias_declaration" => builder.register_alias(node),
        "function_definition" => {
            if let Some(declarator) = node.child_by_field_name("declarator") {
                records.extend(function_record(builder, language, node, declarator, source));
            }
        }
        "declaration" => {
            let mut decl_cursor = node.walk();
            for declarator in node.children_by_field_name("declarator", &mut decl_cursor) {
                records.extend(function_record(builder, language, node, declarator, source));
            }
        }
        _ => {}
    }
}

/// Build a record when `declarator` declares a free function by plain name
fn function_record(
    builder: &TypeBuilder,
    language: Language,
    owner: Node,
    declarator: Node,
    source: &[u8],
) -> Option<FunctionRecord> {
    let (name_node, ty) = builder.declared(owner, Some(declarator))?;
    let name_node = name_node?;

    // Qualified names are members or namespaced; destructors and template
    // specialisations are not free functions either
    if !matches!(name_node.kind(), "identifier" | "operator_name") {
        return None;
    }

    let CType::Function { ret, params, .. } = ty else {
        return None;
    };

    let name = spelled_name(name_node.utf8_text(source).ok()?);
    let mut signature = Vec::with_capacity(params.len() + 1);
    signature.push(ret.spelling(language));
    signature.extend(params.iter().map(|p| p.spelling(language)));

    Some(FunctionRecord::new(name, signature, comment_tokens(owner, source)))
}

/// `operator +` -> `operator+`, `operator  new` -> `operator new`
fn spelled_name(raw: &str) -> String {
    match raw.strip_prefix("operator") {
        Some(rest) if rest.starts_with(|c: char| !c.is_alphanumeric() && c != '_') => {
            let rest = rest.trim_start();
            if rest.starts_with(|c: char| c.is_alphabetic()) {
                format!("operator {}", rest.split_whitespace().collect::<Vec<_>>().join(" "))
            } else {
                format!("operator{}", rest.split_whitespace().collect::<String>())
            }
        }
        _ => raw.to_string(),
    }
}
