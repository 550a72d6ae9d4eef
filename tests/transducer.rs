//! Integration tests for the tw5 to Markdown transducer

use proptest::prelude::*;
use tw5md::transducer::{convert_tw5_to_md, Transducer};

fn convert(text: &str) -> String {
    convert_tw5_to_md(text).unwrap()
}

#[test]
fn test_list_depth() {
    let md = convert("*** item");
    assert!(md.starts_with("    * item"));
}

#[test]
fn test_mixed_list_markers() {
    assert_eq!(
        convert("* item\n*# point 1\n*# point 2\n** bullet"),
        "* item\n  1. point 1\n  1. point 2\n  * bullet"
    );
}

#[test]
fn test_heading_depth() {
    assert_eq!(convert("!! Title"), "## Title");
}

#[test]
fn test_tilde_suppression() {
    assert_eq!(convert("~CamelCase"), "CamelCase");
    assert_eq!(convert("~~strike~~"), "~~strike~~");
}

#[test]
fn test_math_collapse_asymmetry() {
    assert_eq!(convert("text $$x^2$$ text"), "text $x^2$ text");
    assert_eq!(convert("\n$$\nx^2\n$$\n"), "\n$$\nx^2\n$$\n");
}

#[test]
fn test_link_forms() {
    assert_eq!(convert("[[Home]]"), "[Home](Home)");
    assert_eq!(convert("[[Home|Start Page]]"), "[Home](Start Page)");
}

#[test]
fn test_block_quote_with_reference() {
    assert_eq!(
        convert("<<<\nquoted text\n<<< — Author\n"),
        "> \n> quoted text\n> (— Author)\n"
    );
}

#[test]
fn test_image_with_options() {
    assert_eq!(
        convert("[img width=32 [Motovun Jack.jpg]]"),
        "![ width=32 ](Motovun Jack.jpg)"
    );
}

#[test]
fn test_full_tiddler() {
    let tw5 = "!This is a test tiddler.\n\
               \n\
               Some ''bold'' and //italic// text with $$e^{i\\pi}$$ inline.\n\
               \n\
               * first\n\
               ** nested [[Home]]\n\
               \n\
               ---\n\
               \n\
               &lt;&lt;&lt;\n\
               Be yourself.\n\
               &lt;&lt;&lt; Oscar Wilde\n";
    let md = convert(tw5);

    assert!(md.starts_with("# This is a test tiddler.\n"));
    assert!(md.contains("Some __bold__ and _italic_ text with $e^{i\\pi}$ inline."));
    assert!(md.contains("* first\n  * nested [Home](Home)\n"));
    assert!(md.contains("\n\n---\n\n"));
    assert!(md.contains("> \n> Be yourself.\n> (Oscar Wilde)\n"));
}

#[test]
fn test_transducer_is_reusable() {
    let transducer = Transducer::new();
    assert_eq!(transducer.convert("[[a]]").unwrap(), "[a](a)");
    assert_eq!(transducer.convert("[[b]]").unwrap(), "[b](b)");
}

#[test]
fn test_concurrent_conversions() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let text = format!("[[page{i}]] $$x_{i}$$");
                convert_tw5_to_md(&text).unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            format!("[page{i}](page{i}) $x_{i}$")
        );
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Plain(String),
    Math(String),
    Link(String),
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Segment::Plain),
        // markup characters that the rewrite stages would touch outside a span
        "[a-z0-9'/*#!^+ ]{1,10}".prop_map(Segment::Math),
        "[a-z0-9'/*#!:. ]{1,10}".prop_map(Segment::Link),
    ]
}

proptest! {
    #[test]
    fn prop_never_fails_on_text(text in "[\\[\\]|$~\"<>!*#'/ \n\tabcilmgt0-2&;-]{0,64}") {
        prop_assert!(convert_tw5_to_md(&text).is_ok());
    }

    #[test]
    fn prop_protected_spans_come_back_verbatim(segments in prop::collection::vec(segment(), 0..8)) {
        let mut input = String::new();
        let mut expected = String::new();
        for segment in &segments {
            match segment {
                Segment::Plain(text) => {
                    input.push_str(text);
                    expected.push_str(text);
                }
                Segment::Math(formula) => {
                    input.push_str(&format!("$${formula}$$"));
                    expected.push_str(&format!("${formula}$"));
                }
                Segment::Link(target) => {
                    input.push_str(&format!("[[{target}]]"));
                    expected.push_str(&format!("[{target}]({target})"));
                }
            }
        }
        prop_assert_eq!(convert_tw5_to_md(&input).unwrap(), expected);
    }
}
