// src/report.rs
//! Terminal artifact of one run.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;

use crate::ingest::types::Item;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    generated_at: String,
    count: usize,
    items: Vec<Item>,
}

impl Report {
    /// Stamp `items` with the current UTC instant.
    pub fn new(items: Vec<Item>) -> Self {
        Self::at(Utc::now(), items)
    }

    pub fn at(ts: DateTime<Utc>, items: Vec<Item>) -> Self {
        Self {
            generated_at: ts.to_rfc3339_opts(SecondsFormat::Micros, false),
            count: items.len(),
            items,
        }
    }

    pub fn generated_at(&self) -> &str {
        &self.generated_at
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Pretty JSON, two-space indent, non-ASCII kept as UTF-8.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing report")
    }

    pub fn write_pretty<W: Write>(&self, mut w: W) -> Result<()> {
        let json = self.to_json_pretty()?;
        writeln!(w, "{json}").context("writing report")?;
        w.flush().context("flushing report")
    }
}
