//! Batch export report

use serde::{Deserialize, Serialize};

use crate::converter::OutputFormat;

/// A document left out of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDocument {
    /// Title of the tiddler
    pub title: String,
    /// Why it was left out
    pub message: String,
}

impl std::fmt::Display for FailedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Partial-success summary of a batch export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of tiddlers handed to the batch
    pub total: usize,
    /// Number of tiddlers in the combined document
    pub succeeded: usize,
    /// Tiddlers left out, in completion order
    pub failed: Vec<FailedDocument>,
    /// Wall-clock time of the whole run
    pub duration_ms: u64,
    /// Target format, serialized by name (`html`, `pdf`, ...)
    pub format: OutputFormat,
}

impl BatchReport {
    /// Create an empty report for `total` tiddlers
    pub fn new(format: OutputFormat, total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: Vec::new(),
            duration_ms: 0,
            format,
        }
    }

    /// Record a tiddler that was left out
    pub fn add_failure(&mut self, title: &str, message: impl Into<String>) {
        self.failed.push(FailedDocument {
            title: title.to_string(),
            message: message.into(),
        });
    }

    /// Every tiddler made it into the combined document
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Export report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export report as human-readable text
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} of {} succeeded ({}, {}ms)\n",
            self.succeeded, self.total, self.format, self.duration_ms
        ));
        if !self.failed.is_empty() {
            output.push_str("The following tiddlers could not be converted:\n");
            for failure in &self.failed {
                output.push_str(&format!("\t{}\n", failure));
            }
        }
        output
    }
}
