//! Export configuration, read from the `[export]` section of `tw5md.toml`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::converter::PandocConverter;
use crate::export::SortKey;

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// pandoc executable (default: "pandoc" on the PATH)
    #[serde(default = "default_pandoc_path")]
    pub pandoc_path: PathBuf,

    /// Extra arguments passed to every pandoc run, e.g. `["--toc"]`
    #[serde(default)]
    pub pandoc_args: Vec<String>,

    /// Concurrent conversions (default: available parallelism)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Subtitle of combined documents when the wiki has none
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Order of tiddlers in combined documents (default: created)
    #[serde(default)]
    pub sort_key: SortKey,
}

fn default_pandoc_path() -> PathBuf {
    PathBuf::from("pandoc")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pandoc_path: default_pandoc_path(),
            pandoc_args: Vec::new(),
            workers: None,
            subtitle: None,
            sort_key: SortKey::default(),
        }
    }
}

impl ExportConfig {
    /// Load the user configuration; defaults when there is no file
    pub fn load() -> anyhow::Result<Self> {
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse the `[export]` section of a config file. A file without that
    /// section yields the defaults; unknown sections are ignored.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let full_config: toml::Value = toml::from_str(content)?;
        match full_config.get("export") {
            Some(section) => Ok(section.clone().try_into()?),
            None => Ok(Self::default()),
        }
    }

    /// `<config dir>/tw5md/tw5md.toml`
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tw5md").join("tw5md.toml"))
    }

    /// pandoc converter with the configured executable and arguments
    pub fn pandoc(&self) -> PandocConverter {
        PandocConverter::new(&self.pandoc_path).with_args(self.pandoc_args.iter().cloned())
    }
}
