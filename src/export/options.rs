//! Export options

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::converter::OutputFormat;
use crate::tiddler::Tiddler;

/// Order of tiddlers in a combined document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Oldest first
    #[default]
    Created,
    /// Least recently modified first; tiddlers never modified count as
    /// modified when created
    Modified,
    Title,
}

impl SortKey {
    /// Ascending order of `a` and `b` under this key
    pub fn compare(&self, a: &Tiddler, b: &Tiddler) -> Ordering {
        match self {
            SortKey::Created => a.created.cmp(&b.created),
            SortKey::Modified => a
                .modified
                .unwrap_or(a.created)
                .cmp(&b.modified.unwrap_or(b.created)),
            SortKey::Title => a.title.cmp(&b.title),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Created => write!(f, "created"),
            SortKey::Modified => write!(f, "modified"),
            SortKey::Title => write!(f, "title"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Ok(SortKey::Created),
            "modified" => Ok(SortKey::Modified),
            "title" => Ok(SortKey::Title),
            other => Err(format!(
                "unknown sort key '{}' (expected created, modified or title)",
                other
            )),
        }
    }
}

/// Options for single and batch export
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: OutputFormat,
    /// Drop every character above U+00FF before conversion
    pub restrict_to_latin1: bool,
    /// Title line of the combined document preamble
    pub title: String,
    /// Second preamble line
    pub subtitle: String,
    /// Third preamble line (default: today)
    pub date: NaiveDate,
    /// Order of tiddlers in the combined document
    pub sort_key: SortKey,
    /// Upper bound on concurrent conversions (None = available parallelism)
    pub workers: Option<usize>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

impl ExportOptions {
    /// Options for `format`; Latin-1 restriction is switched on for formats
    /// that go through LaTeX
    pub fn new(format: OutputFormat) -> Self {
        Self {
            restrict_to_latin1: format.is_latex_based(),
            format,
            title: String::new(),
            subtitle: String::new(),
            date: chrono::Local::now().date_naive(),
            sort_key: SortKey::default(),
            workers: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_sort_key(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Cap concurrent conversions at `workers`
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Override the Latin-1 restriction chosen from the format
    pub fn with_latin1(mut self, restrict: bool) -> Self {
        self.restrict_to_latin1 = restrict;
        self
    }

    /// Worker count for a batch of `documents`: the configured bound (or the
    /// available parallelism), never more than there are documents and never
    /// less than one.
    pub fn effective_workers(&self, documents: usize) -> usize {
        let bound = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        bound.min(documents).max(1)
    }
}
