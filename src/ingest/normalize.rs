// src/ingest/normalize.rs
//! Turn raw feed entries and page lines into `Item`s, gated by the keyword matcher.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::{Item, RawEntry, Source};
use crate::relevance::KeywordMatcher;

pub const TITLE_MAX_CHARS: usize = 200;
pub const SUMMARY_MAX_CHARS: usize = 400;
pub const DEFAULT_CONTEXT_LINES: usize = 2;

/// Collapse every whitespace run (newlines included) to one space and trim.
///
/// Trimming is deliberate: leading and trailing whitespace never counts toward
/// the summary cap, so a feed that pads its description loses no text.
pub fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

/// First `max` chars of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Trimmed, non-empty lines of extracted page text.
pub fn page_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build an item from a feed entry if `title + " " + summary` is relevant.
pub fn from_feed_entry(
    matcher: &KeywordMatcher,
    source: &Source,
    entry: &RawEntry,
) -> Option<Item> {
    let title = entry.title.as_deref().unwrap_or_default();
    let summary = collapse_whitespace(entry.summary.as_deref().unwrap_or_default());

    if !matcher.is_relevant(&format!("{title} {summary}")) {
        return None;
    }

    let link = entry
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&source.url)
        .to_string();
    let published = entry
        .published
        .clone()
        .or_else(|| entry.updated.clone())
        .filter(|p| !p.trim().is_empty());

    Some(Item::new(
        &source.name,
        title.trim().to_string(),
        link,
        published,
        truncate_chars(&summary, SUMMARY_MAX_CHARS),
    ))
}

/// Build an item from `lines[index]` if that line alone is relevant.
/// The summary is the line with up to `context` neighbours on each side.
pub fn from_page_line(
    matcher: &KeywordMatcher,
    source: &Source,
    lines: &[String],
    index: usize,
    context: usize,
) -> Option<Item> {
    let line = lines.get(index)?;
    if !matcher.is_relevant(line) {
        return None;
    }

    let start = index.saturating_sub(context);
    let end = index.saturating_add(context).saturating_add(1).min(lines.len());
    let snippet = lines[start..end].join(" ");

    Some(Item::new(
        &source.name,
        truncate_chars(line, TITLE_MAX_CHARS),
        source.url.clone(),
        None,
        truncate_chars(&snippet, SUMMARY_MAX_CHARS),
    ))
}

/// All items found in one page's text, in line order.
pub fn items_from_page_text(
    matcher: &KeywordMatcher,
    source: &Source,
    text: &str,
    context: usize,
) -> Vec<Item> {
    let lines = page_lines(text);
    (0..lines.len())
        .filter_map(|i| from_page_line(matcher, source, &lines, i, context))
        .collect()
}
