// src/ingest/page.rs
//! HTML → line-oriented plain text for page-shaped sources.
use metrics::histogram;

pub const DEFAULT_WRAP_WIDTH: usize = 78;

/// Render `html` as plain text wrapped at `width` columns.
///
/// Conversion is lenient and never fails: broken markup still yields whatever
/// text html2text can recover, so a page source only fails at fetch time.
pub fn html_to_text(html: &str, width: usize) -> String {
    let t0 = std::time::Instant::now();
    let text = html2text::from_read(html.as_bytes(), width);
    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    text
}
