// tests/ingest_driver.rs
use aml_fines_monitor::config::{KeywordsConfig, MonitorConfig, SourceCfg};
use aml_fines_monitor::ingest::fetch::StaticFetcher;
use aml_fines_monitor::{Aggregator, SourceError, SourceKind};

const FCA_RSS: &str = include_str!("fixtures/fca_rss.xml");
const BAFIN_ATOM: &str = include_str!("fixtures/bafin_atom.xml");
const FTNO_RSS: &str = include_str!("fixtures/finanstilsynet_rss.xml");
const FI_SE_HTML: &str = include_str!("fixtures/fi_se_sanktioner.html");
const ACPR_RSS: &str = include_str!("fixtures/acpr_rss_namespaced.xml");

fn src(name: &str, url: &str) -> SourceCfg {
    SourceCfg {
        name: name.to_string(),
        url: url.to_string(),
    }
}

fn cfg(feeds: Vec<SourceCfg>, pages: Vec<SourceCfg>) -> MonitorConfig {
    MonitorConfig {
        feeds,
        pages,
        ..MonitorConfig::default()
    }
}

#[tokio::test]
async fn matching_entry_survives_failing_page_source() {
    let feed = r#"<rss><channel>
<item><title>Firm fined over money laundering controls</title><link>https://r.example/1</link></item>
<item><title>Annual report published</title><link>https://r.example/2</link></item>
</channel></rss>"#;
    let fetcher = StaticFetcher::new()
        .with_body("https://r.example/rss", feed)
        .with_error("https://r.example/page", "connection timed out");
    let agg = Aggregator::new(
        cfg(
            vec![src("Reg", "https://r.example/rss")],
            vec![src("Reg page", "https://r.example/page")],
        ),
        fetcher,
    )
    .unwrap();

    let (report, summary) = agg.run_once_with_summary().await;
    assert_eq!(report.count(), 1);
    assert_eq!(
        report.items()[0].title(),
        "Firm fined over money laundering controls"
    );
    assert_eq!(summary.sources_ok, 1);
    assert_eq!(summary.sources_failed, 1);
}

#[tokio::test]
async fn norwegian_keyword_includes_entry() {
    let mut c = cfg(vec![src("Finanstilsynet NO", "https://ft.example/rss")], vec![]);
    c.keywords = KeywordsConfig {
        patterns: vec![r"hvitvask".to_string()],
    };
    let fetcher = StaticFetcher::new().with_body("https://ft.example/rss", FTNO_RSS);
    let report = Aggregator::new(c, fetcher).unwrap().run_once().await;

    assert_eq!(report.count(), 1);
    let it = &report.items()[0];
    assert_eq!(it.title(), "Ny hvitvaskingssak");
    assert_eq!(it.regulator(), "Finanstilsynet NO");
    assert_eq!(it.published(), Some("Wed, 04 Jun 2025 12:00:00 +0200"));
}

#[tokio::test]
async fn full_run_orders_feeds_before_pages_and_dedupes() {
    let fetcher = StaticFetcher::new()
        .with_body("https://fca.example/rss", FCA_RSS)
        .with_body("https://bafin.example/atom", BAFIN_ATOM)
        .with_body("https://fi.example/sanktioner", FI_SE_HTML);
    let agg = Aggregator::new(
        cfg(
            vec![
                src("FCA", "https://fca.example/rss"),
                src("BaFin", "https://bafin.example/atom"),
            ],
            vec![src("FI SE", "https://fi.example/sanktioner")],
        ),
        fetcher,
    )
    .unwrap();

    let (report, summary) = agg.run_once_with_summary().await;
    let regs: Vec<&str> = report.items().iter().map(|i| i.regulator()).collect();
    assert_eq!(regs, vec!["FCA", "BaFin", "FI SE", "FI SE"]);
    assert_eq!(summary.duplicates_dropped, 1);
    assert_eq!(report.count(), report.items().len());

    let fca = &report.items()[0];
    assert_eq!(fca.title(), "FCA fines Bank X £2m for AML failures");
    assert!(!fca.summary().contains('\n'));
    assert!(fca.summary().contains("anti-money laundering systems"));

    let bafin = &report.items()[1];
    assert_eq!(bafin.link(), "https://www.bafin.de/meldung/1");
    assert_eq!(bafin.published(), Some("2025-06-04T09:00:00Z"));
    assert_eq!(bafin.summary(), "Verstöße gegen das Geldwäschegesetz");

    let page = &report.items()[2];
    assert_eq!(page.title(), "Finansinspektionen ger Bank AB en sanktionsavgift");
    assert_eq!(page.published(), None);
    assert_eq!(page.link(), "https://fi.example/sanktioner");
    assert!(page.summary().contains("Startsida"));
    assert!(page.summary().contains("penningtvätt"));
    assert!(page.summary().chars().count() <= 400);
}

#[tokio::test]
async fn malformed_feed_is_a_parse_failure() {
    let fetcher = StaticFetcher::new()
        .with_body("https://a.example/rss", "<rss><channel><item><title>AML</title>")
        .with_body("https://b.example/rss", FTNO_RSS);
    let agg = Aggregator::new(
        cfg(
            vec![
                src("A", "https://a.example/rss"),
                src("B", "https://b.example/rss"),
            ],
            vec![],
        ),
        fetcher,
    )
    .unwrap();

    let outcomes = agg.collect().await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].source.kind, SourceKind::Feed);
    assert!(matches!(outcomes[0].result, Err(SourceError::Parse(_))));
    assert_eq!(outcomes[1].result.as_ref().unwrap().len(), 1);
}

#[tokio::test]
async fn fetch_failure_is_reported_as_fetch_kind() {
    let agg = Aggregator::new(
        cfg(vec![src("A", "https://a.example/rss")], vec![]),
        StaticFetcher::new(),
    )
    .unwrap();
    let outcomes = agg.collect().await;
    let err = outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(err.kind(), "fetch");
}

#[tokio::test]
async fn all_sources_failing_yields_empty_report() {
    let agg = Aggregator::new(MonitorConfig::default(), StaticFetcher::new()).unwrap();
    let report = agg.run_once().await;
    assert_eq!(report.count(), 0);
    assert!(report.items().is_empty());
    assert!(report.to_json_pretty().unwrap().contains("\"items\": []"));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let bad = cfg(vec![src("", "https://a.example/rss")], vec![]);
    assert!(Aggregator::new(bad, StaticFetcher::new()).is_err());
}

#[tokio::test]
async fn namespaced_feed_still_contributes_items() {
    let fetcher = StaticFetcher::new().with_body("https://acpr.example/rss", ACPR_RSS);
    let report = Aggregator::new(
        cfg(vec![src("ACPR", "https://acpr.example/rss")], vec![]),
        fetcher,
    )
    .unwrap()
    .run_once()
    .await;

    assert_eq!(report.count(), 1);
    let it = &report.items()[0];
    assert_eq!(it.title(), "Sanction pour manquements en matière de LCB FT");
    assert_eq!(it.link(), "https://acpr.example/sanctions/2025-04");
    assert_eq!(it.published(), Some("2025-06-05T10:00:00+02:00"));
}
