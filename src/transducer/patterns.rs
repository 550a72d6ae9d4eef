//! Cached regex patterns for the tw5 rewrite stages.
//!
//! Rewrites that need look-around (tilde stripping, horizontal rules and
//! the `$$` collapse) are hand-written scanners in `rewrite` and `spans`
//! because `regex` has no look-behind.

use regex::Regex;
use std::sync::LazyLock;

// === Protected spans ===

/// `$$formula$$`, shortest match, may span lines
pub static MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$(?P<formula>.*?)\$\$").unwrap());

/// `$$<index>$$` left behind by math extraction
pub static MATH_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$(?P<index>[0-9]+)\$\$").unwrap());

/// `[[name|target]]` or `[[target]]`
pub static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(?P<name>[^\[\]|]+)\|(?P<target>[^\[\]]+)\]\]|\[\[(?P<bare>[^\[\]|]+)\]\]")
        .unwrap()
});

/// `[[name|<index>]]` or `[[<index>]]` left behind by link extraction
pub static LINK_PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(?P<name>[^\[\]|]+)\|(?P<index>[0-9]+)\]\]|\[\[(?P<bare>[0-9]+)\]\]").unwrap()
});

// === Block rewrites ===

/// `"""` ... `"""` literal block; the opening `"""` starts a line and the
/// closing one ends a line
pub static LITERAL_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^"""\n?(?P<body>(?s:.*?))\n?"""$"#).unwrap());

/// `<<<` quote `<<<` reference, the reference runs up to (not including) the next newline
pub static BLOCK_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^<<<[\t ]*(?P<quote>(?s:.*?))<<<(?P<reference>[^\n]*)\n").unwrap()
});

// === Line-anchored rewrites ===

pub static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\t ]*[*#]+[*#\t ]*").unwrap());

pub static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\t ]*!+[!\t ]*").unwrap());

// === Inline rewrites ===

/// `[img <options> [target]]`
pub static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*img(?P<options>[^\[\]]*?)\[(?P<target>[^\[\]]+)\]\]").unwrap()
});

pub static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)''(?P<phrase>.+?)''").unwrap());

pub static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)//(?P<phrase>.+?)//").unwrap());
