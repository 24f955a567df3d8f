// src/relevance.rs
//! Keyword relevance gate: an ordered list of regex patterns tested against
//! lower-cased text. Union semantics, first hit wins.

use anyhow::Context;
use regex::Regex;
use tracing::debug;

/// Short anonymized id for log lines; raw announcement text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug)]
struct CompiledPattern {
    source: String,
    re: Regex,
}

/// Compiled keyword set. Immutable after construction.
#[derive(Debug)]
pub struct KeywordMatcher {
    patterns: Vec<CompiledPattern>,
}

impl KeywordMatcher {
    /// Compile patterns in order. A pattern that fails to compile is a config error.
    pub fn new<I, S>(patterns: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let p = p.as_ref();
                let re = Regex::new(p)
                    .with_context(|| format!("keyword pattern #{i} `{p}` does not compile"))?;
                Ok(CompiledPattern {
                    source: p.to_string(),
                    re,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Source text of the first pattern matching `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if text.trim().is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        let hit = self
            .patterns
            .iter()
            .find(|p| p.re.is_match(&lowered))
            .map(|p| p.source.as_str());
        if let Some(pattern) = hit {
            debug!(target: "relevance", id = %anon_hash(text), pattern, "keyword hit");
        }
        hit
    }

    pub fn is_relevant(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}
