//! Integration tests for batch export with a scripted converter

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tw5md::converter::{ConversionError, DocumentConverter, OutputFormat};
use tw5md::export::{BatchExporter, ExportError, ExportOptions, SortKey};
use tw5md::tiddler::{parse_timestamp, Tiddler, TiddlerType};

/// Rejects every document containing `marker`; echoes everything else.
struct RejectingConverter {
    marker: &'static str,
    calls: AtomicUsize,
}

impl RejectingConverter {
    fn new(marker: &'static str) -> Self {
        Self {
            marker,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DocumentConverter for RejectingConverter {
    fn convert(&self, markdown: &str, format: &OutputFormat) -> Result<Vec<u8>, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if markdown.contains(self.marker) {
            return Err(ConversionError::Rejected {
                format: format.clone(),
                status: "exit status: 43".to_string(),
                stderr: "! Undefined control sequence.".to_string(),
            });
        }
        Ok(markdown.as_bytes().to_vec())
    }
}

/// Panics on every document containing `marker`
struct PanickingConverter {
    marker: &'static str,
}

impl DocumentConverter for PanickingConverter {
    fn convert(&self, markdown: &str, _: &OutputFormat) -> Result<Vec<u8>, ConversionError> {
        if markdown.contains(self.marker) {
            panic!("converter crashed");
        }
        Ok(markdown.as_bytes().to_vec())
    }
}

/// Reads HTML as Markdown by dropping the paragraph tags
struct HtmlReadingConverter;

impl DocumentConverter for HtmlReadingConverter {
    fn convert(&self, markdown: &str, _: &OutputFormat) -> Result<Vec<u8>, ConversionError> {
        Ok(markdown.as_bytes().to_vec())
    }

    fn html_to_markdown(&self, html: &str) -> Result<String, ConversionError> {
        Ok(html.replace("<p>", "").replace("</p>", ""))
    }
}

fn tiddler(title: &str, content: &str, created: &str) -> Tiddler {
    Tiddler::new(title, content, parse_timestamp(created).unwrap())
}

fn five_tiddlers() -> Vec<Tiddler> {
    vec![
        tiddler("Delta", "!! fourth", "20180104000000"),
        tiddler("Alpha", "''first''", "20180101000000"),
        tiddler("Broken", "\\badmacro", "20180103000000"),
        tiddler("Echo", "[[Alpha]]", "20180105000000"),
        tiddler("Bravo", "$$x^2$$", "20180102000000"),
    ]
}

fn options() -> ExportOptions {
    ExportOptions::new(OutputFormat::Pdf)
        .with_title("Notebook")
        .with_subtitle("thoughts")
        .with_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .with_workers(3)
}

#[tokio::test]
async fn test_one_failure_does_not_abort_siblings() {
    let converter = Arc::new(RejectingConverter::new("badmacro"));
    let exporter = BatchExporter::new(converter.clone(), options());

    let outcome = exporter.run(five_tiddlers()).await.unwrap();

    assert_eq!(outcome.report.total, 5);
    assert_eq!(outcome.report.succeeded, 4);
    assert_eq!(outcome.report.failed.len(), 1);
    assert_eq!(outcome.report.failed[0].title, "Broken");

    let combined = String::from_utf8(outcome.document).unwrap();
    for title in ["Alpha", "Bravo", "Delta", "Echo"] {
        assert!(combined.contains(&format!("# {title}\n")), "missing {title}");
    }
    assert!(!combined.contains("# Broken"));

    // five single-document checks plus the combined document
    assert_eq!(converter.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_combined_document_layout() {
    let exporter = BatchExporter::new(Arc::new(RejectingConverter::new("badmacro")), options());
    let outcome = exporter.run(five_tiddlers()).await.unwrap();
    let md = outcome.markdown;

    assert!(md.starts_with("% Notebook\n% thoughts\n% 2024-05-01\n\n# Alpha\n"));
    assert_eq!(md.matches("\n\n---\n\n---\n\n").count(), 4);
    assert!(md.ends_with("\n\n---\n\n---\n\n"));
    assert!(md.contains("__first__"));
    assert!(md.contains("$x^2$"));
    assert!(md.contains("[Alpha](Alpha)"));
}

#[tokio::test]
async fn test_sorted_by_creation_regardless_of_completion() {
    let exporter = BatchExporter::new(Arc::new(RejectingConverter::new("badmacro")), options());
    let outcome = exporter.run(five_tiddlers()).await.unwrap();

    let positions: Vec<usize> = ["# Alpha", "# Bravo", "# Delta", "# Echo"]
        .iter()
        .map(|heading| outcome.markdown.find(heading).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_sorted_by_title() {
    let exporter = BatchExporter::new(
        Arc::new(RejectingConverter::new("never")),
        options().with_sort_key(SortKey::Title).with_workers(1),
    );
    let tiddlers = vec![
        tiddler("b", "x", "20180101000000"),
        tiddler("a", "x", "20190101000000"),
    ];
    let outcome = exporter.run(tiddlers).await.unwrap();
    assert!(outcome.markdown.find("# a\n").unwrap() < outcome.markdown.find("# b\n").unwrap());
    assert!(outcome.report.is_complete());
}

#[tokio::test]
async fn test_latin1_restriction_for_pdf() {
    let exporter = BatchExporter::new(Arc::new(RejectingConverter::new("never")), options());
    let outcome = exporter
        .run(vec![tiddler("Sums", "∑ café", "20180101000000")])
        .await
        .unwrap();
    assert!(outcome.markdown.contains(" café"));
    assert!(!outcome.markdown.contains('∑'));
}

#[tokio::test]
async fn test_report_lists_failures() {
    let exporter = BatchExporter::new(Arc::new(RejectingConverter::new("badmacro")), options());
    let outcome = exporter.run(five_tiddlers()).await.unwrap();
    let text = outcome.report.to_text();
    assert!(text.starts_with("4 of 5 succeeded"));
    assert!(text.contains("Broken"));
}

#[tokio::test]
async fn test_rejected_combined_document_is_an_error() {
    // the preamble carries the marker, so only the combined document fails
    let exporter = BatchExporter::new(
        Arc::new(RejectingConverter::new("% Notebook")),
        options(),
    );
    let err = exporter.run(five_tiddlers()).await.unwrap_err();
    assert!(matches!(err, ExportError::Conversion { ref title, .. } if title == "Notebook"));
}

#[tokio::test]
async fn test_panicking_task_is_reported_not_fatal() {
    let exporter = BatchExporter::new(
        Arc::new(PanickingConverter { marker: "explode" }),
        options().with_workers(2),
    );
    let mut tiddlers = five_tiddlers();
    tiddlers[2] = tiddler("Broken", "explode", "20180103000000");

    let outcome = exporter.run(tiddlers).await.unwrap();

    assert_eq!(outcome.report.succeeded, 4);
    assert_eq!(outcome.report.failed.len(), 1);
    assert_eq!(outcome.report.failed[0].title, "Broken");
    assert!(!outcome.markdown.contains("# Broken"));
    assert!(!outcome.report.is_complete());
}

#[tokio::test]
async fn test_html_tiddlers_are_read_through_the_converter() {
    let exporter = BatchExporter::new(Arc::new(HtmlReadingConverter), options());
    let outcome = exporter
        .run(vec![
            tiddler("Page", "<p>from html</p>", "20180101000000").with_kind(TiddlerType::Html),
            tiddler("Note", "''tw5''", "20180102000000"),
        ])
        .await
        .unwrap();

    assert!(outcome.report.is_complete());
    assert!(outcome.markdown.contains("\n\n---\n\nfrom html\n\n---\n\n---\n\n"));
    assert!(!outcome.markdown.contains("<p>"));
}

#[tokio::test]
async fn test_unreadable_html_tiddler_is_left_out() {
    // the scripted converter keeps the default, which cannot read HTML
    let exporter = BatchExporter::new(Arc::new(RejectingConverter::new("never")), options());
    let outcome = exporter
        .run(vec![
            tiddler("Page", "<p>x</p>", "20180101000000").with_kind(TiddlerType::Html),
            tiddler("Note", "text", "20180102000000"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.report.succeeded, 1);
    assert_eq!(outcome.report.failed[0].title, "Page");
    assert!(outcome.report.failed[0].message.contains("not supported"));
}
