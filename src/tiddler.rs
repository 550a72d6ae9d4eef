//! Tiddler records, tag lists and tw5 timestamps

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Prefix reserved for TiddlyWiki's own system tiddlers
pub const SYSTEM_TITLE_PREFIX: &str = "$:/";

const TIMESTAMP_LEN: usize = 14;

static BRACKETED_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(?P<tag>.*?)\]\]").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("timestamp `{0}` is shorter than {TIMESTAMP_LEN} digits")]
    TimestampTooShort(String),
    #[error("timestamp `{raw}` is not a valid YYYYMMDDhhmmss value: {reason}")]
    InvalidTimestamp { raw: String, reason: String },
}

/// Content type of a tiddler body
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TiddlerType {
    /// `text/vnd.tiddlywiki`
    #[default]
    TiddlyWiki,
    /// `text/x-markdown`
    Markdown,
    /// `text/html`
    Html,
    Other(String),
}

impl TiddlerType {
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim() {
            "" | "text/vnd.tiddlywiki" => TiddlerType::TiddlyWiki,
            "text/x-markdown" | "text/markdown" => TiddlerType::Markdown,
            "text/html" => TiddlerType::Html,
            other => TiddlerType::Other(other.to_string()),
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            TiddlerType::TiddlyWiki => "text/vnd.tiddlywiki",
            TiddlerType::Markdown => "text/x-markdown",
            TiddlerType::Html => "text/html",
            TiddlerType::Other(mime) => mime,
        }
    }
}

impl fmt::Display for TiddlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime())
    }
}

/// One tiddler: the known fields plus every other attribute found on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tiddler {
    /// Unique name of the tiddler
    pub title: String,
    /// Raw tw5 (or markdown/html) body
    pub content: String,
    pub tags: Vec<String>,
    pub created: NaiveDateTime,
    /// None for tiddlers never edited after creation
    pub modified: Option<NaiveDateTime>,
    #[serde(rename = "type")]
    pub kind: TiddlerType,
    /// Attributes without a dedicated field, e.g. `tmap.id` or `color`
    pub extra: BTreeMap<String, String>,
}

impl Tiddler {
    pub fn new(title: &str, content: &str, created: NaiveDateTime) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            tags: Vec::new(),
            created,
            modified: None,
            kind: TiddlerType::default(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modified(mut self, modified: NaiveDateTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_kind(mut self, kind: TiddlerType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_system(&self) -> bool {
        self.title.starts_with(SYSTEM_TITLE_PREFIX)
    }

    /// One line for listings: title, creation date and tags
    pub fn summary(&self) -> String {
        if self.tags.is_empty() {
            format!("{} ({})", self.title, self.created.date())
        } else {
            format!(
                "{} ({}) [{}]",
                self.title,
                self.created.date(),
                self.tags.join(", ")
            )
        }
    }
}

/// Split a tw5 tag attribute into tags.
///
/// `[[multi word]]` tags are taken out first, left to right, then the rest
/// is split on whitespace: `"[[multi word tag]] tag2 tag3"` gives
/// `["multi word tag", "tag2", "tag3"]`.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut rest = raw.to_string();
    let mut tags = Vec::new();

    while let Some(caps) = BRACKETED_TAG_RE.captures(&rest) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        tags.push(caps["tag"].to_string());
        let range = whole.range();
        rest.replace_range(range, "");
    }

    tags.extend(rest.split_whitespace().map(str::to_string));
    tags
}

/// Parse a tw5 timestamp. Only the first 14 characters (`YYYYMMDDhhmmss`)
/// are read; tw5 appends milliseconds, which are ignored.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FormatError> {
    if raw.chars().count() < TIMESTAMP_LEN {
        return Err(FormatError::TimestampTooShort(raw.to_string()));
    }
    // a multibyte character among the first 14 leaves no boundary there
    let digits = raw.get(..TIMESTAMP_LEN).unwrap_or(raw);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::InvalidTimestamp {
            raw: raw.to_string(),
            reason: "expected digits only".to_string(),
        });
    }
    NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S").map_err(|e| {
        FormatError::InvalidTimestamp {
            raw: raw.to_string(),
            reason: e.to_string(),
        }
    })
}
