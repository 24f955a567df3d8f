// src/metrics.rs
use anyhow::{anyhow, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const ENV_METRICS: &str = "AML_MONITOR_METRICS";

/// Prometheus recorder for a single run; rendered once the report is out.
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow!("prometheus: install recorder: {e}"))?;
        Ok(Self { handle })
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

pub fn metrics_enabled() -> bool {
    std::env::var(ENV_METRICS).ok().as_deref() == Some("1")
}
