//! TiddlyWiki container: reads the tiddler store out of a saved wiki file
//! and offers simple lookups over it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::tiddler::{parse_tags, parse_timestamp, Tiddler, TiddlerType, SYSTEM_TITLE_PREFIX};

static TIDDLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<div(?P<attributes>[^>]*?)>\n<pre>(?P<content>.*?)</pre>\n</div>").unwrap()
});

static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+(?P<key>[\w.:-]+?)="(?P<value>[^"]*)""#).unwrap());

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<title>(?P<title>.*?) — (?P<subtitle>.*?)</title>").unwrap()
});

#[derive(Error, Debug)]
pub enum WikiError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a `<div>` record was not turned into a tiddler
#[derive(Debug, Clone, PartialEq, Eq)]
enum Skip {
    NoTitle,
    SystemTiddler,
    NoCreated,
    BadCreated(String),
}

/// A wiki: its page title/subtitle and the user tiddlers it stores.
#[derive(Debug, Clone, Default)]
pub struct TiddlyWiki {
    /// Page title, the part of `<title>` before ` — `
    pub title: Option<String>,
    /// Page subtitle, the part of `<title>` after ` — `
    pub subtitle: Option<String>,
    tiddlers: Vec<Tiddler>,
}

impl TiddlyWiki {
    /// Empty wiki
    pub fn new(title: Option<String>, subtitle: Option<String>) -> Self {
        Self {
            title,
            subtitle,
            tiddlers: Vec::new(),
        }
    }

    /// Read a saved wiki file
    pub fn from_file(path: &Path) -> Result<Self, WikiError> {
        let buffer = std::fs::read_to_string(path).map_err(|source| WikiError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse_from_str(&buffer))
    }

    /// Collect every user tiddler in `buffer`. Records without a title or a
    /// creation timestamp, and system tiddlers (`$:/...`), are skipped.
    pub fn parse_from_str(buffer: &str) -> Self {
        let (title, subtitle) = match TITLE_RE.captures(buffer) {
            Some(caps) => (
                Some(decode(&caps["title"])),
                Some(decode(&caps["subtitle"])),
            ),
            None => (None, None),
        };
        let mut wiki = Self::new(title, subtitle);

        for caps in TIDDLER_RE.captures_iter(buffer) {
            match parse_record(&caps["attributes"], &caps["content"]) {
                Ok(tiddler) => {
                    wiki.add_tiddler(tiddler);
                }
                Err(Skip::BadCreated(reason)) => {
                    log::warn!("skipping tiddler with malformed creation date: {}", reason);
                }
                Err(skip) => log::trace!("skipping record: {:?}", skip),
            }
        }
        log::debug!("parsed {} tiddler(s)", wiki.len());
        wiki
    }

    /// Add a tiddler unless an equal one is already stored
    pub fn add_tiddler(&mut self, tiddler: Tiddler) -> bool {
        if self.tiddlers.contains(&tiddler) {
            return false;
        }
        self.tiddlers.push(tiddler);
        true
    }

    /// Remove a tiddler equal to `tiddler`; false when there was none
    pub fn remove_tiddler(&mut self, tiddler: &Tiddler) -> bool {
        match self.tiddlers.iter().position(|t| t == tiddler) {
            Some(index) => {
                self.tiddlers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, tiddler: &Tiddler) -> bool {
        self.tiddlers.contains(tiddler)
    }

    /// Tiddler at `index`, in the order of the wiki file
    pub fn get(&self, index: usize) -> Option<&Tiddler> {
        self.tiddlers.get(index)
    }

    /// Tiddlers in the order of the wiki file
    pub fn iter(&self) -> impl Iterator<Item = &Tiddler> {
        self.tiddlers.iter()
    }

    pub fn len(&self) -> usize {
        self.tiddlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiddlers.is_empty()
    }

    /// All stored tiddlers as a slice
    pub fn tiddlers(&self) -> &[Tiddler] {
        &self.tiddlers
    }

    /// First tiddler accepted by `predicate`
    pub fn find<P>(&self, predicate: P) -> Option<&Tiddler>
    where
        P: Fn(&Tiddler) -> bool,
    {
        self.tiddlers.iter().find(|t| predicate(t))
    }

    /// Every tiddler accepted by `predicate`, in wiki order
    pub fn filter<P>(&self, predicate: P) -> Vec<&Tiddler>
    where
        P: Fn(&Tiddler) -> bool,
    {
        self.tiddlers.iter().filter(|t| predicate(t)).collect()
    }

    /// A random tiddler accepted by `predicate`
    pub fn random<R, P>(&self, rng: &mut R, predicate: P) -> Option<&Tiddler>
    where
        R: Rng + ?Sized,
        P: Fn(&Tiddler) -> bool,
    {
        self.filter(predicate).choose(rng).copied()
    }
}

impl<'a> IntoIterator for &'a TiddlyWiki {
    type Item = &'a Tiddler;
    type IntoIter = std::slice::Iter<'a, Tiddler>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiddlers.iter()
    }
}

/// Ready-made tiddler selection used by the command line.
#[derive(Debug, Clone, Default)]
pub struct TiddlerFilter {
    /// Keep tiddlers carrying at least one of these tags (no restriction when empty)
    pub include_tags: Vec<String>,
    /// Drop tiddlers carrying any of these tags
    pub exclude_tags: Vec<String>,
    /// Keep tiddlers whose title starts with this prefix
    pub title_prefix: Option<String>,
}

impl TiddlerFilter {
    /// All three conditions hold for `tiddler`
    pub fn matches(&self, tiddler: &Tiddler) -> bool {
        let included = self.include_tags.is_empty()
            || self.include_tags.iter().any(|tag| tiddler.has_tag(tag));
        let excluded = self.exclude_tags.iter().any(|tag| tiddler.has_tag(tag));
        let prefixed = self
            .title_prefix
            .as_deref()
            .is_none_or(|prefix| tiddler.title.starts_with(prefix));
        included && !excluded && prefixed
    }
}

fn decode(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

fn parse_record(attributes: &str, content: &str) -> Result<Tiddler, Skip> {
    let mut attrs: BTreeMap<String, String> = ATTRIBUTE_RE
        .captures_iter(attributes)
        .map(|caps| (caps["key"].to_string(), decode(&caps["value"])))
        .collect();

    let title = attrs.remove("title").ok_or(Skip::NoTitle)?;
    if title.starts_with(SYSTEM_TITLE_PREFIX) {
        return Err(Skip::SystemTiddler);
    }
    let created = attrs.remove("created").ok_or(Skip::NoCreated)?;
    let created =
        parse_timestamp(&created).map_err(|e| Skip::BadCreated(format!("{title}: {e}")))?;

    let mut tiddler = Tiddler::new(&title, content, created);
    if let Some(tags) = attrs.remove("tags") {
        tiddler.tags = parse_tags(&tags);
    }
    if let Some(modified) = attrs.remove("modified") {
        match parse_timestamp(&modified) {
            Ok(modified) => tiddler.modified = Some(modified),
            Err(e) => log::warn!("dropping modified date of '{}': {}", title, e),
        }
    }
    if let Some(kind) = attrs.remove("type") {
        tiddler.kind = TiddlerType::from_mime(&kind);
    }
    tiddler.extra = attrs;
    Ok(tiddler)
}
