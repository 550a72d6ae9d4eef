//! TiddlyWiki5 markup to GitHub-flavored Markdown
//!
//! The conversion is a fixed sequence of whole-text rewrites. Math formulas
//! and link targets are swapped for indexed placeholders before any markup
//! rewrite runs, so `''`, `//`, `*` or `!` inside them are never touched, and
//! are swapped back at the end:
//!
//! 1. entity unescaping (`&lt;` `&gt;` `&amp;` `&quot;`)
//! 2. math extraction (`$$...$$` to `$$<index>$$`)
//! 3. link extraction (`[[name|target]]`, `[[target]]`)
//! 4. `"""` literal blocks
//! 5. horizontal rule padding
//! 6. images
//! 7. list markers
//! 8. headings
//! 9. bold
//! 10. italic
//! 11. `~` link suppression
//! 12. block quotes
//! 13. math restoration and `$$` collapse
//! 14. link restoration as Markdown links
//!
//! Tables and definition lists are not converted.

mod patterns;
mod rewrite;
mod spans;

pub use spans::{SpanKind, SpanTable};

use thiserror::Error;

/// Raised only when the placeholder bookkeeping is broken. Textual input on
/// its own never produces an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransducerError {
    #[error("{kind} placeholder refers to index {index}, but only {len} span(s) were extracted")]
    InternalConsistency {
        kind: SpanKind,
        index: usize,
        len: usize,
    },
    #[error("{kind} placeholder `{placeholder}` carries no valid index")]
    MalformedPlaceholder { kind: SpanKind, placeholder: String },
    #[error("only {resolved} of {extracted} {kind} span(s) were restored")]
    UnresolvedPlaceholders {
        kind: SpanKind,
        extracted: usize,
        resolved: usize,
    },
}

/// tw5 to Markdown converter. Holds no state between calls; every
/// [`convert`](Transducer::convert) owns its span tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transducer;

impl Transducer {
    pub fn new() -> Self {
        Self
    }

    /// Convert one tiddler body to Markdown
    pub fn convert(&self, text: &str) -> Result<String, TransducerError> {
        let mut math = SpanTable::new(SpanKind::Math);
        let mut links = SpanTable::new(SpanKind::Link);

        let text = rewrite::unescape_entities(text);
        let text = spans::extract_math(&text, &mut math);
        let text = spans::extract_links(&text, &mut links);
        log::trace!(
            "extracted {} math span(s) and {} link(s)",
            math.len(),
            links.len()
        );

        let text = rewrite::hard_wrap_literal_blocks(&text);
        let text = rewrite::pad_horizontal_rules(&text);
        let text = rewrite::convert_images(&text);
        let text = rewrite::convert_list_markers(&text);
        let text = rewrite::convert_headings(&text);
        let text = rewrite::convert_bold(&text);
        let text = rewrite::convert_italic(&text);
        let text = rewrite::strip_link_suppression(&text);
        let text = rewrite::convert_block_quotes(&text);

        let mut restored = spans::restore_math(&text, &math)?;
        let text = spans::collapse_math_delimiters(&restored.text, &mut restored.formulas);
        let nested = links.resolve_nested_math(&math)?;
        math.ensure_resolved(restored.resolved + nested)?;

        spans::restore_links(&text, &links, &restored.formulas)
    }
}

/// Convert one tiddler body to Markdown with a fresh [`Transducer`].
pub fn convert_tw5_to_md(text: &str) -> Result<String, TransducerError> {
    Transducer::new().convert(text)
}
