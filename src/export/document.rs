//! Single tiddler export

use crate::converter::DocumentConverter;
use crate::tiddler::{Tiddler, TiddlerType};
use crate::transducer::Transducer;

use super::{ExportError, ExportOptions};

/// Separator between a tiddler's header and its body
pub const HEADER_SEPARATOR: &str = "\n\n---\n\n";

/// Separator after each tiddler of a combined document
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n---\n\n";

/// Title, dates and tags of a tiddler as Markdown
pub fn export_header(tiddler: &Tiddler) -> String {
    let modified = tiddler
        .modified
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "# {}\n__created__: {}, __last modified__: {}\n\n__keywords__: {}",
        tiddler.title,
        tiddler.created,
        modified,
        tiddler.tags.join(", ")
    )
}

/// Body of a tiddler as Markdown.
///
/// tw5 bodies go through `transducer`, HTML bodies through `converter`;
/// Markdown and unknown types are kept as they are.
pub fn export_content(
    tiddler: &Tiddler,
    transducer: &Transducer,
    converter: &dyn DocumentConverter,
) -> Result<String, ExportError> {
    match &tiddler.kind {
        TiddlerType::TiddlyWiki => Ok(transducer.convert(&tiddler.content)?),
        TiddlerType::Html => converter
            .html_to_markdown(&tiddler.content)
            .map_err(|source| ExportError::Conversion {
                title: tiddler.title.clone(),
                source,
            }),
        TiddlerType::Markdown | TiddlerType::Other(_) => Ok(tiddler.content.clone()),
    }
}

/// Keep only characters LaTeX's default input encoding accepts
pub fn restrict_to_latin1(text: &str) -> String {
    text.chars().filter(|&c| c <= '\u{ff}').collect()
}

/// Header, separator and body of one tiddler, with the Latin-1 restriction
/// applied when `options` ask for it
pub fn export_markdown(
    tiddler: &Tiddler,
    converter: &dyn DocumentConverter,
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let transducer = Transducer::new();
    let mut markdown = export_header(tiddler);
    markdown.push_str(HEADER_SEPARATOR);
    markdown.push_str(&export_content(tiddler, &transducer, converter)?);

    if options.restrict_to_latin1 {
        Ok(restrict_to_latin1(&markdown))
    } else {
        Ok(markdown)
    }
}

/// Export one tiddler to `options.format`
pub fn export_tiddler(
    tiddler: &Tiddler,
    converter: &dyn DocumentConverter,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let markdown = export_markdown(tiddler, converter, options)?;
    converter
        .convert(&markdown, &options.format)
        .map_err(|source| ExportError::Conversion {
            title: tiddler.title.clone(),
            source,
        })
}

/// `% title`, `% subtitle`, `% date` preamble of a combined document
pub fn batch_preamble(options: &ExportOptions) -> String {
    format!(
        "% {}\n% {}\n% {}\n\n",
        options.title, options.subtitle, options.date
    )
}
