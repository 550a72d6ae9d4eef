//! Protected span tables
//!
//! Math formulas and link targets are pulled out of the text before the
//! markup rewrites run and put back afterwards. Each category owns one
//! [`SpanTable`]; the index written into a placeholder is the position of the
//! captured text in that table.

use std::fmt;
use std::ops::Range;

use regex::Captures;

use super::patterns::{LINK_PLACEHOLDER_RE, LINK_RE, MATH_PLACEHOLDER_RE, MATH_RE};
use super::TransducerError;

/// Category of a protected span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Math,
    Link,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanKind::Math => write!(f, "math"),
            SpanKind::Link => write!(f, "link"),
        }
    }
}

/// Append-only list of captured spans for one category.
#[derive(Debug, Clone)]
pub struct SpanTable {
    kind: SpanKind,
    spans: Vec<String>,
}

impl SpanTable {
    /// Empty table for spans of `kind`
    pub fn new(kind: SpanKind) -> Self {
        Self {
            kind,
            spans: Vec::new(),
        }
    }

    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    /// Store a captured span and return its index. Indices start at 0 and
    /// follow capture order.
    pub fn push(&mut self, span: &str) -> usize {
        self.spans.push(span.to_string());
        self.spans.len() - 1
    }

    /// Span captured under `index`. An index that was never handed out
    /// means the placeholder bookkeeping is broken.
    pub fn get(&self, index: usize) -> Result<&str, TransducerError> {
        self.spans
            .get(index)
            .map(String::as_str)
            .ok_or(TransducerError::InternalConsistency {
                kind: self.kind,
                index,
                len: self.spans.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Fail unless exactly every captured span was restored once.
    pub fn ensure_resolved(&self, resolved: usize) -> Result<(), TransducerError> {
        if resolved == self.spans.len() {
            Ok(())
        } else {
            Err(TransducerError::UnresolvedPlaceholders {
                kind: self.kind,
                extracted: self.spans.len(),
                resolved,
            })
        }
    }

    /// Restore math placeholders that ended up inside captured link text,
    /// e.g. `[[$$x$$]]`. Returns how many math spans were consumed.
    pub fn resolve_nested_math(&mut self, math: &SpanTable) -> Result<usize, TransducerError> {
        let mut resolved = 0;
        for span in self.spans.iter_mut() {
            if !MATH_PLACEHOLDER_RE.is_match(span) {
                continue;
            }
            let mut restored = restore_math(span, math)?;
            resolved += restored.resolved;
            *span = collapse_math_delimiters(&restored.text, &mut restored.formulas);
        }
        Ok(resolved)
    }
}

fn parse_index(kind: SpanKind, caps: &Captures, group: &str) -> Result<usize, TransducerError> {
    let raw = caps.name(group).map(|m| m.as_str()).unwrap_or_default();
    raw.parse()
        .map_err(|_| TransducerError::MalformedPlaceholder {
            kind,
            placeholder: caps[0].to_string(),
        })
}

/// Replace every `$$formula$$` with `$$<index>$$`.
pub(crate) fn extract_math(text: &str, math: &mut SpanTable) -> String {
    MATH_RE
        .replace_all(text, |caps: &Captures| {
            let index = math.push(&caps["formula"]);
            format!("$${index}$$")
        })
        .into_owned()
}

/// Replace link targets with indices: `[[name|target]]` becomes
/// `[[name|<index>]]`, `[[target]]` becomes `[[<index>]]`.
pub(crate) fn extract_links(text: &str, links: &mut SpanTable) -> String {
    LINK_RE
        .replace_all(text, |caps: &Captures| {
            if let Some(bare) = caps.name("bare") {
                let index = links.push(bare.as_str());
                format!("[[{index}]]")
            } else {
                let index = links.push(&caps["target"]);
                format!("[[{}|{index}]]", &caps["name"])
            }
        })
        .into_owned()
}

/// Output of [`restore_math`]
#[derive(Debug)]
pub(crate) struct MathRestoration {
    pub(crate) text: String,
    /// Byte ranges of the restored formula bodies in `text`
    pub(crate) formulas: Vec<Range<usize>>,
    pub(crate) resolved: usize,
}

/// Put every formula back between `$$` delimiters.
pub(crate) fn restore_math(text: &str, math: &SpanTable) -> Result<MathRestoration, TransducerError> {
    let mut restored = String::with_capacity(text.len());
    let mut formulas = Vec::new();
    let mut last = 0;
    let mut resolved = 0;

    for caps in MATH_PLACEHOLDER_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let formula = math.get(parse_index(SpanKind::Math, &caps, "index")?)?;

        restored.push_str(&text[last..whole.start()]);
        restored.push_str("$$");
        let start = restored.len();
        restored.push_str(formula);
        formulas.push(start..restored.len());
        restored.push_str("$$");

        last = whole.end();
        resolved += 1;
    }
    restored.push_str(&text[last..]);

    Ok(MathRestoration {
        text: restored,
        formulas,
        resolved,
    })
}

/// Turn `$$` into `$` unless it is newline-flanked on both sides.
///
/// A `$$` collapses when the character before it is not a newline, or when
/// a character other than a newline follows it. Start of text counts as
/// "not a newline" before, end of text counts as a newline after. Two
/// display formulas written back to back (`$$$$`) therefore merge into a
/// single `$$`; that is a known limitation kept for compatibility.
///
/// `formulas` is shifted so it keeps pointing at the same formula bodies.
pub(crate) fn collapse_math_delimiters(text: &str, formulas: &mut [Range<usize>]) -> String {
    let bytes = text.as_bytes();
    let mut collapsed = String::with_capacity(text.len());
    let mut removed: Vec<usize> = Vec::new();
    let mut last = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'$' {
            let inline_before = i == 0 || bytes[i - 1] != b'\n';
            let inline_after = i + 2 < bytes.len() && bytes[i + 2] != b'\n';
            if inline_before || inline_after {
                collapsed.push_str(&text[last..=i]);
                removed.push(i + 1);
                last = i + 2;
                i += 2;
                continue;
            }
        }
        i += 1;
    }
    collapsed.push_str(&text[last..]);

    for range in formulas.iter_mut() {
        let start = range.start - removed.partition_point(|&p| p < range.start);
        let end = range.end - removed.partition_point(|&p| p < range.end);
        *range = start..end;
    }
    collapsed
}

/// Replace link placeholders with Markdown links: `[target](target)` for
/// bare links and `[name](target)` for aliased ones.
///
/// Placeholders that start inside a restored formula are formula text, not
/// links, and are left alone.
pub(crate) fn restore_links(
    text: &str,
    links: &SpanTable,
    formulas: &[Range<usize>],
) -> Result<String, TransducerError> {
    let mut restored = String::with_capacity(text.len());
    let mut last = 0;
    let mut resolved = 0;

    for caps in LINK_PLACEHOLDER_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        // a placeholder's `[[` and its `|index]]` tail never lie inside a
        // formula; only an aliased name may contain one
        let tail_start = caps.name("index").map_or(whole.start(), |m| m.start() - 1);
        let overlaps_tail = |f: &Range<usize>| f.start < whole.end() && tail_start < f.end;
        if formulas
            .iter()
            .any(|f| f.contains(&whole.start()) || overlaps_tail(f))
        {
            continue;
        }

        restored.push_str(&text[last..whole.start()]);
        if caps.name("bare").is_some() {
            let target = links.get(parse_index(SpanKind::Link, &caps, "bare")?)?;
            restored.push_str(&format!("[{target}]({target})"));
        } else {
            let target = links.get(parse_index(SpanKind::Link, &caps, "index")?)?;
            restored.push_str(&format!("[{}]({target})", &caps["name"]));
        }
        last = whole.end();
        resolved += 1;
    }
    restored.push_str(&text[last..]);

    links.ensure_resolved(resolved)?;
    Ok(restored)
}
