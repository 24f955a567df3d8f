// src/config/mod.rs
pub mod monitor;

pub use monitor::{
    default_keywords, DedupConfig, FetchConfig, KeywordsConfig, MonitorConfig, PageConfig,
    SourceCfg, ENV_CONFIG_PATH, ENV_DEDUP_THRESHOLD,
};
