// src/dedup.rs
//! Near-duplicate suppression.
//!
//! Each incoming item's key (`regulator|title`) is compared against every key
//! accepted so far using a token-set similarity ratio on a 0..=100 scale. An item
//! is dropped when any accepted key is identical or scores strictly above the
//! threshold. Single pass, stable, O(n²) in accepted items.
//!
//! Token-set ratio (fuzzywuzzy / rapidfuzz semantics):
//! - tokens are whitespace-delimited words, compared as sorted sets;
//! - a non-empty intersection where one side is a subset of the other scores 100;
//! - otherwise the best of three indel ratios built from
//!   `sorted(intersection)`, `sorted(a - b)` and `sorted(b - a)`.

use std::collections::BTreeSet;

use metrics::counter;
use tracing::debug;

use crate::ingest::types::Item;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 90.0;

#[derive(Clone, Debug)]
pub struct DedupParams {
    /// Drop when similarity is strictly greater than this (0..=100).
    pub threshold: f64,
    /// Lower-case tokens and treat non-alphanumeric chars as separators.
    /// `false` scores the raw whitespace tokens with no preprocessing.
    pub fold_tokens: bool,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fold_tokens: true,
        }
    }
}

/// Lower-case and replace every non-alphanumeric char with a space.
fn fold(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
}

fn token_set(s: &str) -> BTreeSet<&str> {
    s.split_whitespace().collect()
}

fn join_sorted<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

/// Length of the longest common subsequence, over chars.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Insertions + deletions needed to turn `a` into `b`.
fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_len(&a, &b)
}

fn norm_ratio(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        return 100.0;
    }
    100.0 * (1.0 - dist as f64 / lensum as f64)
}

/// Token-set similarity ratio in 0..=100.
pub fn token_set_ratio(a: &str, b: &str, fold_tokens: bool) -> f64 {
    let (fa, fb);
    let (a, b) = if fold_tokens {
        fa = fold(a);
        fb = fold(b);
        (fa.as_str(), fb.as_str())
    } else {
        (a, b)
    };

    let ta = token_set(a);
    let tb = token_set(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = ta.intersection(&tb).copied().collect();
    let diff_ab: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_ba: Vec<&str> = tb.difference(&ta).copied().collect();

    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = join_sorted(diff_ab);
    let diff_ba_joined = join_sorted(diff_ba);
    let sect_len = join_sorted(sect).chars().count();
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();

    let sep = usize::from(sect_len != 0);
    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    // "sect ab" vs "sect ba" differ only in their tails.
    let dist = indel_distance(&diff_ab_joined, &diff_ba_joined);
    let result = norm_ratio(dist, sect_ab_len + sect_ba_len);

    if sect_len == 0 {
        return result;
    }

    let sect_ab_ratio = norm_ratio(sep + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = norm_ratio(sep + ba_len, sect_len + sect_ba_len);

    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

/// Online near-duplicate filter. Remembers keys of accepted items only.
#[derive(Debug)]
pub struct NearDuplicateFilter {
    params: DedupParams,
    accepted: Vec<String>,
}

impl NearDuplicateFilter {
    pub fn new(mut params: DedupParams) -> Self {
        if !params.threshold.is_finite() {
            params.threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        params.threshold = params.threshold.clamp(0.0, 100.0);
        Self {
            params,
            accepted: Vec::new(),
        }
    }

    pub fn params(&self) -> &DedupParams {
        &self.params
    }

    /// Keys accepted so far, in acceptance order.
    pub fn accepted_keys(&self) -> &[String] {
        &self.accepted
    }

    /// Returns `true` and remembers the key if `item` is not a near-duplicate.
    pub fn admit(&mut self, item: &Item) -> bool {
        let key = item.similarity_key();
        for prev in &self.accepted {
            if *prev == key {
                debug!(target: "dedup", prev = %prev, "exact duplicate key");
                return false;
            }
            let score = token_set_ratio(prev, &key, self.params.fold_tokens);
            if score > self.params.threshold {
                debug!(target: "dedup", prev = %prev, key = %key, score, "near-duplicate");
                return false;
            }
        }
        self.accepted.push(key);
        true
    }

    /// Keep only admitted items, in order.
    pub fn filter_batch(&mut self, items: Vec<Item>) -> Vec<Item> {
        let before = items.len();
        let kept: Vec<Item> = items.into_iter().filter(|it| self.admit(it)).collect();
        counter!("ingest_dedup_total").increment((before - kept.len()) as u64);
        kept
    }
}

/// Fresh filter over one sequence.
pub fn dedupe(items: Vec<Item>, params: &DedupParams) -> Vec<Item> {
    NearDuplicateFilter::new(params.clone()).filter_batch(items)
}
