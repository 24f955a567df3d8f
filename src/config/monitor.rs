// src/config/monitor.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dedup::{DedupParams, DEFAULT_SIMILARITY_THRESHOLD};
use crate::ingest::normalize::DEFAULT_CONTEXT_LINES;
use crate::ingest::page::DEFAULT_WRAP_WIDTH;
use crate::ingest::types::{Source, SourceKind};
use crate::relevance::KeywordMatcher;

pub const ENV_CONFIG_PATH: &str = "AML_MONITOR_CONFIG_PATH";
pub const ENV_DEDUP_THRESHOLD: &str = "AML_MONITOR_DEDUP_THRESHOLD";
pub const DEFAULT_CONFIG_TOML: &str = "config/monitor.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/monitor.json";

const MIN_WRAP_WIDTH: usize = 20;

fn default_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    concat!("aml-fines-monitor/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_fold_tokens() -> bool {
    true
}
fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}
fn default_wrap_width() -> usize {
    DEFAULT_WRAP_WIDTH
}

/// Multilingual AML / financial-crime patterns, matched against lower-cased text.
pub fn default_keywords() -> Vec<String> {
    [
        // English
        r"\baml\b",
        r"money laundering",
        r"financial crime",
        r"kyc",
        r"customer due diligence",
        r"transaction monitoring",
        // Norwegian
        r"hvitvask",
        r"overtredelsesgebyr",
        r"tilsynsrapport",
        // Swedish
        r"penningtvatt|penningtvätt",
        r"sanktionsavgift",
        r"sanktioner",
        // French
        r"\blcb\s*ft\b|\bblanchiment\b",
        // German
        r"geldw[äa]sche|\bbuss?geld|\bbußgeld",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCfg {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// `false` scores raw whitespace tokens with no preprocessing.
    #[serde(default = "default_fold_tokens")]
    pub fold_tokens: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            fold_tokens: default_fold_tokens(),
        }
    }
}

impl DedupConfig {
    pub fn params(&self) -> DedupParams {
        DedupParams {
            threshold: self.threshold,
            fold_tokens: self.fold_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Lines taken before and after a matched line for the summary.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            wrap_width: default_wrap_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordsConfig {
    pub patterns: Vec<String>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            patterns: default_keywords(),
        }
    }
}

/// Static configuration of one monitoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub feeds: Vec<SourceCfg>,
    #[serde(default)]
    pub pages: Vec<SourceCfg>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let src = |name: &str, url: &str| SourceCfg {
            name: name.to_string(),
            url: url.to_string(),
        };
        Self {
            fetch: FetchConfig::default(),
            dedup: DedupConfig::default(),
            page: PageConfig::default(),
            keywords: KeywordsConfig::default(),
            feeds: vec![
                src("FCA", "https://www.fca.org.uk/news/rss.xml"),
                src("Finanstilsynet NO", "https://www.finanstilsynet.no/en/rss/"),
                src(
                    "BaFin",
                    "https://www.bafin.de/EN/Service/TopNavigation/RSS/rss_node.html",
                ),
            ],
            pages: vec![
                src(
                    "DNB NL",
                    "https://www.dnb.nl/en/general-news/enforcement-measures-2025/",
                ),
                src(
                    "FI SE",
                    "https://www.fi.se/sv/publicerat/sanktioner/finansiella-foretag/",
                ),
            ],
        }
    }
}

// parse optional float env and clamp to <0.0..=100.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 100.0))
}

fn validate_source(kind: SourceKind, s: &SourceCfg) -> Result<()> {
    if s.name.trim().is_empty() {
        bail!("{} source with url `{}` has an empty name", kind.as_str(), s.url);
    }
    let url = reqwest::Url::parse(&s.url)
        .with_context(|| format!("{} source `{}` has an invalid url", kind.as_str(), s.name))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "{} source `{}` must use http(s), got `{}`",
            kind.as_str(),
            s.name,
            url.scheme()
        );
    }
    Ok(())
}

impl MonitorConfig {
    /// Load from an explicit path. `.json` is parsed as JSON, everything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: MonitorConfig = if ext == "json" {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing json config {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("parsing toml config {}", path.display()))?
        };
        Ok(cfg)
    }

    /// Resolve config using env var + fallbacks:
    /// 1) $AML_MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) built-in defaults
    ///
    /// `AML_MONITOR_DEDUP_THRESHOLD` overrides the dedup threshold. The result is validated.
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::resolve()?;
        if let Some(t) = parse_threshold_env(std::env::var(ENV_DEDUP_THRESHOLD).ok()) {
            cfg.dedup.threshold = t;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!(
                "{ENV_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            ));
        }
        let toml_p = PathBuf::from(DEFAULT_CONFIG_TOML);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_CONFIG_JSON);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Reject configs the run cannot honor. Errors here abort the run.
    pub fn validate(&self) -> Result<()> {
        for s in &self.feeds {
            validate_source(SourceKind::Feed, s)?;
        }
        for s in &self.pages {
            validate_source(SourceKind::Page, s)?;
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be > 0");
        }
        if self.page.wrap_width < MIN_WRAP_WIDTH {
            bail!("page.wrap_width must be >= {MIN_WRAP_WIDTH}");
        }
        if !(0.0..=100.0).contains(&self.dedup.threshold) {
            bail!("dedup.threshold must be within 0..=100");
        }
        KeywordMatcher::new(&self.keywords.patterns)?;
        Ok(())
    }

    /// Feed sources then page sources, each in declaration order.
    pub fn sources(&self) -> Vec<Source> {
        let feeds = self.feeds.iter().map(|s| (SourceKind::Feed, s));
        let pages = self.pages.iter().map(|s| (SourceKind::Page, s));
        feeds
            .chain(pages)
            .map(|(kind, s)| Source {
                name: s.name.trim().to_string(),
                url: s.url.clone(),
                kind,
            })
            .collect()
    }

    pub fn matcher(&self) -> Result<KeywordMatcher> {
        KeywordMatcher::new(&self.keywords.patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn defaults_are_valid() {
        let cfg = MonitorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.feeds.len(), 3);
        assert_eq!(cfg.pages.len(), 2);
        assert_eq!(cfg.dedup.threshold, 90.0);
        assert_eq!(cfg.page.context_lines, 2);
        assert_eq!(cfg.fetch.timeout_secs, 20);
    }

    #[test]
    fn sources_keep_feed_then_page_order() {
        let kinds: Vec<_> = MonitorConfig::default()
            .sources()
            .into_iter()
            .map(|s| (s.kind, s.name))
            .collect();
        assert_eq!(kinds[0], (SourceKind::Feed, "FCA".to_string()));
        assert_eq!(kinds[2], (SourceKind::Feed, "BaFin".to_string()));
        assert_eq!(kinds[3], (SourceKind::Page, "DNB NL".to_string()));
        assert_eq!(kinds[4], (SourceKind::Page, "FI SE".to_string()));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: MonitorConfig = toml::from_str(
            r#"
[dedup]
threshold = 85.0

[[feeds]]
name = "FCA"
url = "https://www.fca.org.uk/news/rss.xml"
"#,
        )
        .unwrap();
        assert_eq!(cfg.dedup.threshold, 85.0);
        assert!(cfg.dedup.fold_tokens);
        assert!(cfg.pages.is_empty());
        assert_eq!(cfg.keywords.patterns, default_keywords());
    }

    #[test]
    fn threshold_env_parses_and_clamps() {
        assert_eq!(parse_threshold_env(Some(" 80 ".into())), Some(80.0));
        assert_eq!(parse_threshold_env(Some("250".into())), Some(100.0));
        assert_eq!(parse_threshold_env(Some("nope".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }

    #[test]
    fn validation_rejects_bad_sources_and_patterns() {
        let mut cfg = MonitorConfig::default();
        cfg.feeds[0].name = "  ".into();
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.pages[0].url = "ftp://example.test/x".into();
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.pages[0].url = "not a url".into();
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.keywords.patterns.push("[".into());
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.fetch.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_DEDUP_THRESHOLD);

        // Nothing on disk -> built-in defaults
        assert_eq!(MonitorConfig::load_default().unwrap(), MonitorConfig::default());

        // ./config/monitor.json fallback
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_CONFIG_JSON),
            r#"{"feeds":[{"name":"J","url":"https://j.example/rss"}]}"#,
        )
        .unwrap();
        let cfg = MonitorConfig::load_default().unwrap();
        assert_eq!(cfg.feeds[0].name, "J");

        // env wins, threshold override applies
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[[pages]]\nname = \"P\"\nurl = \"https://p.example/\"\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_DEDUP_THRESHOLD, "75");
        let cfg = MonitorConfig::load_default().unwrap();
        assert!(cfg.feeds.is_empty());
        assert_eq!(cfg.pages[0].name, "P");
        assert_eq!(cfg.dedup.threshold, 75.0);

        // env pointing nowhere is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(MonitorConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_DEDUP_THRESHOLD);
        env::set_current_dir(&old).unwrap();
    }
}
