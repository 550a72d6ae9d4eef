//! Concurrent export of many tiddlers into one document

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};

use crate::converter::DocumentConverter;
use crate::tiddler::Tiddler;

use super::document::{batch_preamble, export_markdown, DOCUMENT_SEPARATOR};
use super::report::BatchReport;
use super::{ExportError, ExportOptions};

/// Result of [`BatchExporter::run`]
#[derive(Debug)]
pub struct BatchOutcome {
    /// Combined Markdown handed to the converter
    pub markdown: String,
    /// Combined document in the requested format
    pub document: Vec<u8>,
    /// Which tiddlers made it in
    pub report: BatchReport,
}

/// Exports a set of tiddlers as one document.
///
/// Every tiddler is rendered and converted on its own blocking task first, so
/// a tiddler the converter rejects, or whose task panics, is left out instead
/// of failing the whole document. The survivors are sorted and converted
/// together.
pub struct BatchExporter {
    converter: Arc<dyn DocumentConverter>,
    options: ExportOptions,
}

impl BatchExporter {
    /// `converter` is shared by every task of a run
    pub fn new(converter: Arc<dyn DocumentConverter>, options: ExportOptions) -> Self {
        Self { converter, options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export `tiddlers`. Only a transducer fault or a rejected combined
    /// document is an error; single documents that fail end up in the report.
    pub async fn run(&self, tiddlers: Vec<Tiddler>) -> Result<BatchOutcome, ExportError> {
        let start = Instant::now();
        let total = tiddlers.len();
        let workers = self.options.effective_workers(total);
        let options = Arc::new(self.options.clone());
        log::info!(
            "exporting {} tiddler(s) to {} with {} worker(s)",
            total,
            options.format,
            workers
        );

        let finished: Vec<_> = stream::iter(tiddlers)
            .map(|tiddler| {
                let converter = Arc::clone(&self.converter);
                let options = Arc::clone(&options);
                let title = tiddler.title.clone();
                async move {
                    let joined = tokio::task::spawn_blocking(move || {
                        let rendered = render_checked(&tiddler, converter.as_ref(), &options);
                        (tiddler, rendered)
                    })
                    .await;
                    (title, joined)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut report = BatchReport::new(options.format.clone(), total);
        let mut exported = Vec::with_capacity(total);
        for (title, joined) in finished {
            let rendered = match joined {
                Ok((tiddler, rendered)) => rendered.map(|markdown| (tiddler, markdown)),
                Err(e) => Err(ExportError::Task {
                    title: title.clone(),
                    message: e.to_string(),
                }),
            };
            match rendered {
                Ok(document) => exported.push(document),
                Err(ExportError::Transducer(e)) => return Err(ExportError::Transducer(e)),
                Err(e) => {
                    log::warn!("leaving out '{}': {}", title, e);
                    report.add_failure(&title, e.to_string());
                }
            }
        }
        report.succeeded = exported.len();

        // completion order is arbitrary
        exported.sort_by(|(a, _), (b, _)| options.sort_key.compare(a, b));

        let mut markdown = batch_preamble(&options);
        for (_, body) in &exported {
            markdown.push_str(body);
            markdown.push_str(DOCUMENT_SEPARATOR);
        }

        let converter = Arc::clone(&self.converter);
        let combined = markdown.clone();
        let format = options.format.clone();
        let document = tokio::task::spawn_blocking(move || converter.convert(&combined, &format))
            .await
            .map_err(|e| ExportError::Task {
                title: options.title.clone(),
                message: e.to_string(),
            })?
            .map_err(|source| ExportError::Conversion {
                title: options.title.clone(),
                source,
            })?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "{} of {} tiddler(s) exported in {}ms",
            report.succeeded,
            report.total,
            report.duration_ms
        );

        Ok(BatchOutcome {
            markdown,
            document,
            report,
        })
    }
}

/// Markdown of one tiddler, kept only if the converter accepts it on its own
fn render_checked(
    tiddler: &Tiddler,
    converter: &dyn DocumentConverter,
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let markdown = export_markdown(tiddler, converter, options)?;
    converter
        .convert(&markdown, &options.format)
        .map_err(|source| ExportError::Conversion {
            title: tiddler.title.clone(),
            source,
        })?;
    Ok(markdown)
}
