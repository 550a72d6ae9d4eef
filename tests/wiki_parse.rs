//! Integration tests: saved wiki file to Markdown

use std::io::Write;
use std::path::Path;

use tw5md::converter::{BuiltinConverter, OutputFormat};
use tw5md::export::{export_markdown, ExportOptions};
use tw5md::tiddler::TiddlerType;
use tw5md::wiki::{TiddlerFilter, TiddlyWiki, WikiError};

const WIKI_HTML: &str = r#"<!doctype html>
<html>
<head>
<title>Lab Notebook — experiments and notes</title>
</head>
<body>
<div id="storeArea" style="display:none;">
<div created="20180108222550419" modified="20180111174922056" tags="[[multi word tag]] tag2 tag3" title="just a test" tmap.id="8b72e085-396b-4145-92aa-6793964cedad">
<pre>!This is a test tiddler.

* nested
** bullet
* points
*# point 1
*# point 2

# enumeration
# hashtag sign # is used on twitter

''bold'' //italic//

~CamelCase ~~strike through~~

&lt;&lt;&lt; A short quote
on two lines

by a &lt;&lt;&lt; wise man

separation bar
---
without blank lines before or after

&quot;&quot;&quot;
multi
line
environment
&quot;&quot;&quot;

in line math formula $$a^2+b^2=c^2$$. this is the [[pythagorean theorem|https://en.wikipedia.org/wiki/Pythagorean_theorem]].
second derivative: $$f''(x) + g''(x)$$. [[https://en.wikipedia.org/wiki/Pythagorean_theorem]].

a formula ''within a bold text region $$a^2$$''.

latex equation:
$$
a^2+b^2=c^2.
$$</pre>
</div>
<div created="20180101000000000" title="$:/StoryList" type="text/vnd.tiddlywiki">
<pre></pre>
</div>
<div created="20190301120000000" tags="draft" title="Plain markdown" type="text/x-markdown">
<pre># Already markdown</pre>
</div>
</div>
</body>
</html>
"#;

fn write_wiki() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
    file.write_all(WIKI_HTML.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file() {
    let file = write_wiki();
    let wiki = TiddlyWiki::from_file(file.path()).unwrap();

    assert_eq!(wiki.title.as_deref(), Some("Lab Notebook"));
    assert_eq!(wiki.subtitle.as_deref(), Some("experiments and notes"));
    assert_eq!(wiki.len(), 2);

    let test = wiki.get(0).unwrap();
    assert_eq!(test.title, "just a test");
    assert_eq!(test.tags, vec!["multi word tag", "tag2", "tag3"]);
    assert_eq!(test.created.to_string(), "2018-01-08 22:25:50");
    assert_eq!(
        test.extra.get("tmap.id").map(String::as_str),
        Some("8b72e085-396b-4145-92aa-6793964cedad")
    );

    let markdown = wiki.get(1).unwrap();
    assert_eq!(markdown.kind, TiddlerType::Markdown);
    assert_eq!(markdown.content, "# Already markdown");
}

#[test]
fn test_missing_file() {
    let err = TiddlyWiki::from_file(Path::new("/nonexistent/wiki.html")).unwrap_err();
    assert!(matches!(err, WikiError::Read { .. }));
}

#[test]
fn test_filter_by_tag() {
    let wiki = TiddlyWiki::parse_from_str(WIKI_HTML);
    let filter = TiddlerFilter {
        exclude_tags: vec!["draft".to_string()],
        ..Default::default()
    };
    let titles: Vec<_> = wiki
        .filter(|t| filter.matches(t))
        .into_iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(titles, vec!["just a test"]);
}

#[test]
fn test_tiddler_to_markdown() {
    let wiki = TiddlyWiki::parse_from_str(WIKI_HTML);
    let tiddler = wiki.find(|t| t.title == "just a test").unwrap();
    let md = export_markdown(
        tiddler,
        &BuiltinConverter::new(),
        &ExportOptions::new(OutputFormat::Markdown),
    )
    .unwrap();

    assert!(md.starts_with(
        "# just a test\n__created__: 2018-01-08 22:25:50, __last modified__: 2018-01-11 17:49:22\n\n__keywords__: multi word tag, tag2, tag3\n\n---\n\n# This is a test tiddler.\n"
    ));
    assert!(md.contains("* nested\n  * bullet\n* points\n  1. point 1\n  1. point 2\n"));
    assert!(md.contains("1. enumeration\n1. hashtag sign # is used on twitter\n"));
    assert!(md.contains("__bold__ _italic_"));
    assert!(md.contains("CamelCase ~~strike through~~"));
    assert!(md.contains("> A short quote\n> on two lines\n> \n> by a (wise man)\n"));
    assert!(md.contains("separation bar\n\n\n---\n\n\nwithout blank lines"));
    assert!(md.contains("multi\\\nline\\\nenvironment\n"));
    assert!(md.contains(
        "in line math formula $a^2+b^2=c^2$. this is the [pythagorean theorem](https://en.wikipedia.org/wiki/Pythagorean_theorem)."
    ));
    assert!(md.contains(
        "second derivative: $f''(x) + g''(x)$. [https://en.wikipedia.org/wiki/Pythagorean_theorem](https://en.wikipedia.org/wiki/Pythagorean_theorem)."
    ));
    assert!(md.contains("a formula __within a bold text region $a^2$__."));
    assert!(md.ends_with("latex equation:\n$$\na^2+b^2=c^2.\n$$"));
}
