//! Markup rewrite stages. Each stage maps the whole text to a new text.

use regex::Captures;

use super::patterns::{
    BLOCK_QUOTE_RE, BOLD_RE, HEADING_RE, IMAGE_RE, ITALIC_RE, LIST_MARKER_RE, LITERAL_BLOCK_RE,
};

/// `&lt;` `&gt;` `&amp;` `&quot;` to their literal characters, in that order.
///
/// Decoding once more changes nothing, except where `&amp;` escapes another
/// entity: `&amp;lt;` decodes to `&lt;`, which a second pass turns into `<`.
pub(crate) fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
}

/// `"""` blocks keep their line breaks by ending every inner line with `\`.
pub(crate) fn hard_wrap_literal_blocks(text: &str) -> String {
    LITERAL_BLOCK_RE
        .replace_all(text, |caps: &Captures| caps["body"].replace('\n', "\\\n"))
        .into_owned()
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3 && line.bytes().all(|b| b == b'-')
}

/// Surround a `---` line with blank lines so Markdown does not read the
/// paragraph above it as a setext heading. Only lines with a newline on
/// both sides qualify.
pub(crate) fn pad_horizontal_rules(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len() - 1;
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i > 0 && i < last && is_rule(line) {
                "\n\n---\n\n"
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[img options [target]]` to `![options](target)`
pub(crate) fn convert_images(text: &str) -> String {
    IMAGE_RE
        .replace_all(text, "![${options}](${target})")
        .into_owned()
}

fn list_marker(run: &str) -> String {
    let symbols: Vec<char> = run.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(last) = symbols.last() else {
        return String::new();
    };
    let mut marker = "  ".repeat(symbols.len() - 1);
    // the trailing space is part of the marker
    marker.push_str(if *last == '#' { "1. " } else { "* " });
    marker
}

/// Leading `*`/`#` runs become indented bullet or numbered markers.
pub(crate) fn convert_list_markers(text: &str) -> String {
    LIST_MARKER_RE
        .replace_all(text, |caps: &Captures| list_marker(&caps[0]))
        .into_owned()
}

/// Leading `!` runs become `#` headings.
pub(crate) fn convert_headings(text: &str) -> String {
    HEADING_RE
        .replace_all(text, |caps: &Captures| {
            let level = caps[0].chars().filter(|&c| c == '!').count();
            format!("{} ", "#".repeat(level))
        })
        .into_owned()
}

/// `''bold''` to `__bold__`
pub(crate) fn convert_bold(text: &str) -> String {
    BOLD_RE.replace_all(text, "__${phrase}__").into_owned()
}

/// `//italic//` to `_italic_`
pub(crate) fn convert_italic(text: &str) -> String {
    ITALIC_RE.replace_all(text, "_${phrase}_").into_owned()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Drop the `~` that suppresses CamelCase links (`~CamelCase`). A tilde
/// next to another tilde belongs to `~~strike~~` and stays.
pub(crate) fn strip_link_suppression(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let suppresses_link = c == '~'
            && previous != Some('~')
            && chars.peek().is_some_and(|&next| is_word_char(next));
        if !suppresses_link {
            stripped.push(c);
        }
        previous = Some(c);
    }
    stripped
}

/// `<<<` quote `<<< reference` to `> ` prefixed lines plus `(reference)`.
///
/// All matches are collected against the unmodified text first and then
/// applied from the last one to the first, so the byte offsets of the
/// earlier matches stay valid while the text grows.
pub(crate) fn convert_block_quotes(text: &str) -> String {
    let quotes: Vec<_> = BLOCK_QUOTE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let reference = caps.name("reference")?;
            let mut quoted = format!("> {}", caps["quote"].replace('\n', "\n> "));
            let reference_text = reference.as_str().trim();
            if !reference_text.is_empty() {
                quoted.push_str(&format!("({reference_text})"));
            }
            Some((start..reference.end(), quoted))
        })
        .collect();

    let mut converted = text.to_string();
    for (range, quoted) in quotes.into_iter().rev() {
        converted.replace_range(range, &quoted);
    }
    converted
}
