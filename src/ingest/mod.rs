// src/ingest/mod.rs
pub mod feed;
pub mod fetch;
pub mod normalize;
pub mod page;
pub mod types;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::MonitorConfig;
use crate::dedup::{dedupe, DedupParams};
use crate::ingest::normalize::{from_feed_entry, items_from_page_text};
use crate::ingest::types::{Fetcher, Item, Source, SourceError, SourceKind, SourceOutcome};
use crate::relevance::KeywordMatcher;
use crate::report::Report;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total entries parsed from feeds.");
        describe_counter!(
            "ingest_kept_total",
            "Items kept after relevance gating and deduplication."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Feed entries dropped by the keyword gate."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Items removed as near-duplicates."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Feed/page parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

/// Counters for one run, logged once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub extracted: usize,
    pub duplicates_dropped: usize,
    pub kept: usize,
}

/// Runs every configured source in order and reduces the results to a `Report`.
pub struct Aggregator<F: Fetcher> {
    sources: Vec<Source>,
    matcher: KeywordMatcher,
    dedup: DedupParams,
    context_lines: usize,
    wrap_width: usize,
    fetcher: F,
}

impl<F: Fetcher> Aggregator<F> {
    /// Validates `cfg`; an invalid config is a contract error for the caller.
    pub fn new(cfg: MonitorConfig, fetcher: F) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            sources: cfg.sources(),
            matcher: cfg.matcher()?,
            dedup: cfg.dedup.params(),
            context_lines: cfg.page.context_lines,
            wrap_width: cfg.page.wrap_width,
            fetcher,
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    async fn extract(&self, source: &Source) -> std::result::Result<Vec<Item>, SourceError> {
        let body = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(SourceError::Fetch)?;

        match source.kind {
            SourceKind::Feed => {
                let entries = feed::parse_feed(&body).map_err(SourceError::Parse)?;
                let items: Vec<Item> = entries
                    .iter()
                    .filter_map(|e| from_feed_entry(&self.matcher, source, e))
                    .collect();
                counter!("ingest_filtered_total").increment((entries.len() - items.len()) as u64);
                Ok(items)
            }
            SourceKind::Page => {
                let text = page::html_to_text(&body, self.wrap_width);
                Ok(items_from_page_text(
                    &self.matcher,
                    source,
                    &text,
                    self.context_lines,
                ))
            }
        }
    }

    /// Process sources one at a time in declaration order. Failures stay per source.
    pub async fn collect(&self) -> Vec<SourceOutcome> {
        ensure_metrics_described();

        let mut out = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let result = self.extract(source).await;
            match &result {
                Ok(items) => {
                    tracing::debug!(
                        target: "ingest",
                        source = %source.name,
                        kind = source.kind.as_str(),
                        items = items.len(),
                        "source ok"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        source = %source.name,
                        kind = source.kind.as_str(),
                        error_kind = e.kind(),
                        error = %e,
                        "source skipped"
                    );
                    counter!("ingest_provider_errors_total", "kind" => e.kind()).increment(1);
                }
            }
            out.push(SourceOutcome {
                source: source.clone(),
                result,
            });
        }
        out
    }

    /// Collect, concatenate in source order, dedupe, stamp.
    pub async fn run_once_with_summary(&self) -> (Report, RunSummary) {
        let outcomes = self.collect().await;

        let mut summary = RunSummary::default();
        let mut items = Vec::new();
        for o in outcomes {
            match o.result {
                Ok(mut v) => {
                    summary.sources_ok += 1;
                    items.append(&mut v);
                }
                Err(_) => summary.sources_failed += 1,
            }
        }
        summary.extracted = items.len();

        let kept = dedupe(items, &self.dedup);
        summary.kept = kept.len();
        summary.duplicates_dropped = summary.extracted - summary.kept;

        let report = Report::new(kept);

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        counter!("ingest_kept_total").increment(summary.kept as u64);
        gauge!("ingest_pipeline_last_run_ts").set(now as f64);

        tracing::info!(
            target: "ingest",
            sources_ok = summary.sources_ok,
            sources_failed = summary.sources_failed,
            extracted = summary.extracted,
            duplicates = summary.duplicates_dropped,
            kept = summary.kept,
            "run finished"
        );

        (report, summary)
    }

    pub async fn run_once(&self) -> Report {
        self.run_once_with_summary().await.0
    }
}
