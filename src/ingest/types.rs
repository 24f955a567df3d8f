// src/ingest/types.rs
use anyhow::Result;
use serde::Serialize;

/// Shape of a configured source: structured feed or scraped HTML page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Page,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::Page => "page",
        }
    }
}

/// A regulator endpoint. Built from validated config only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

/// One entry as exposed by the feed parser; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
}

/// A relevance-matched announcement. Constructed by `ingest::normalize` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    regulator: String,
    title: String,
    link: String,
    published: Option<String>,
    summary: String,
}

impl Item {
    pub(crate) fn new(
        regulator: &str,
        title: String,
        link: String,
        published: Option<String>,
        summary: String,
    ) -> Self {
        debug_assert!(!regulator.is_empty(), "regulator must be non-empty");
        Self {
            regulator: regulator.to_string(),
            title,
            link,
            published,
            summary,
        }
    }

    pub fn regulator(&self) -> &str {
        &self.regulator
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn published(&self) -> Option<&str> {
        self.published.as_deref()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// `regulator|title`, the input of near-duplicate comparison.
    pub fn similarity_key(&self) -> String {
        format!("{}|{}", self.regulator, self.title)
    }
}

/// Why a source contributed nothing to this run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("parse failed: {0:#}")]
    Parse(anyhow::Error),
}

impl SourceError {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Fetch(_) => "fetch",
            SourceError::Parse(_) => "parse",
        }
    }
}

/// Result of processing a single source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: Source,
    pub result: std::result::Result<Vec<Item>, SourceError>,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Return the body at `url` as text. Non-2xx responses are errors.
    async fn fetch(&self, url: &str) -> Result<String>;
}
