//! Tiddler export
//!
//! Renders tiddlers as Markdown documents (header, separator, body) and hands
//! them to a [`DocumentConverter`](crate::converter::DocumentConverter).
//! Batches are converted concurrently; documents the converter rejects are
//! reported and left out of the combined result.

mod batch;
mod document;
mod options;
mod report;

pub use batch::{BatchExporter, BatchOutcome};
pub use document::{
    batch_preamble, export_content, export_header, export_markdown, export_tiddler,
    restrict_to_latin1, DOCUMENT_SEPARATOR, HEADER_SEPARATOR,
};
pub use options::{ExportOptions, SortKey};
pub use report::{BatchReport, FailedDocument};

use thiserror::Error;

use crate::converter::ConversionError;
use crate::transducer::TransducerError;

#[derive(Error, Debug)]
pub enum ExportError {
    /// Broken placeholder bookkeeping in the transducer; aborts a batch
    #[error(transparent)]
    Transducer(#[from] TransducerError),
    #[error("could not convert '{title}': {source}")]
    Conversion {
        title: String,
        #[source]
        source: ConversionError,
    },
    #[error("export task for '{title}' did not complete: {message}")]
    Task { title: String, message: String },
}
