//! Extraction configuration for sigharvest

use crate::extract::Language;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Settings shared by every worker of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// File extensions routed to each grammar
    #[serde(default)]
    pub extensions: ExtensionConfig,

    /// Keep error-free top-level declarations from files with syntax errors.
    ///
    /// When off, any syntax error fails the whole file.
    #[serde(default = "default_recover_partial")]
    pub recover_partial: bool,

    /// Per-file parse time limit in milliseconds (0 disables the limit)
    #[serde(default)]
    pub parse_timeout_ms: u64,

    /// Extra typedef names and their canonical spelling.
    ///
    /// Values are used verbatim as a base type name, so they should be
    /// scalar spellings such as `"unsigned long"` or `"struct _IO_FILE"`.
    #[serde(default)]
    pub type_aliases: BTreeMap<String, String>,
}

/// Extension lists per grammar (without the leading dot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default = "default_c_extensions")]
    pub c: Vec<String>,

    #[serde(default = "default_cpp_extensions")]
    pub cpp: Vec<String>,
}

fn default_recover_partial() -> bool {
    true
}

fn default_c_extensions() -> Vec<String> {
    vec!["c".to_string(), "h".to_string()]
}

fn default_cpp_extensions() -> Vec<String> {
    ["cc", "cpp", "cxx", "c++", "hh", "hpp", "hxx", "h++"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            c: default_c_extensions(),
            cpp: default_cpp_extensions(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionConfig::default(),
            recover_partial: default_recover_partial(),
            parse_timeout_ms: 0,
            type_aliases: BTreeMap::new(),
        }
    }
}

impl ExtractConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: ExtractConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Pick the grammar for a file, if its extension is configured
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?.to_lowercase();

        // C wins for extensions listed twice
        if self.extensions.c.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            Some(Language::C)
        } else if self.extensions.cpp.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            Some(Language::Cpp)
        } else {
            None
        }
    }

    /// Parse time limit, if any
    pub fn parse_timeout(&self) -> Option<Duration> {
        (self.parse_timeout_ms > 0).then(|| Duration::from_millis(self.parse_timeout_ms))
    }
}
