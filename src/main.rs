//! AML enforcement monitor — binary entrypoint.
//! Runs every configured source once and prints the JSON report on stdout.
//! Logs go to stderr.

use aml_fines_monitor::ingest::fetch::HttpFetcher;
use aml_fines_monitor::metrics::{metrics_enabled, Metrics};
use aml_fines_monitor::{Aggregator, MonitorConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ENV_LOG_JSON: &str = "AML_MONITOR_LOG_JSON";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("aml_fines_monitor=info,ingest=info,warn"));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = if metrics_enabled() {
        Some(Metrics::init()?)
    } else {
        None
    };

    let cfg = MonitorConfig::load_default()?;
    let fetcher = HttpFetcher::new(&cfg.fetch)?;
    let aggregator = Aggregator::new(cfg, fetcher)?;

    let report = aggregator.run_once().await;
    report.write_pretty(std::io::stdout().lock())?;

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
