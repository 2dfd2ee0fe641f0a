//! Resume semantics across runs: checkpoint contents, idempotent
//! re-processing, and snapshot survival.

use chrono::NaiveDate;
use keiba_scraper::output::{CsvSnapshot, SnapshotWriter};
use keiba_scraper::pipeline::Orchestrator;
use keiba_scraper::rules::SiteRules;
use keiba_scraper::shutdown::ShutdownCoordinator;
use std::collections::HashMap;
use tempfile::TempDir;

use super::support::*;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
}

fn snapshot(dir: &TempDir) -> CsvSnapshot {
    CsvSnapshot::new(dir.path(), "races.csv", "horse_odds.csv")
}

async fn run(
    dir: &TempDir,
    pages: HashMap<String, String>,
) -> (keiba_scraper::pipeline::ScrapeSummary, FetchLog) {
    let (fetcher, log) = MockFetcher::new(pages);
    let mut orchestrator = Orchestrator::new(
        config_for(dir.path(), date()),
        SiteRules::default(),
        Box::new(fetcher),
        Box::new(snapshot(dir)),
        ShutdownCoordinator::shared(),
    )
    .unwrap();
    let summary = orchestrator.run().await.unwrap();
    (summary, log)
}

fn test_pages() -> HashMap<String, String> {
    let mut pages = HashMap::new();
    pages.insert(
        primary_listing_url(date()),
        listing_page(&["202401031105", "202401039901"]),
    );
    insert_complete_race(&mut pages, "川崎", "5R ダ1400m 右 良", "202401031105");
    insert_complete_race(&mut pages, "帯広", "3R ダ200m 直 良", "202401039901");
    pages
}

#[tokio::test]
async fn test_checkpoint_records_every_terminal_outcome() {
    let dir = TempDir::new().unwrap();
    run(&dir, test_pages()).await;

    // Bare JSON object mapping every candidate URL to true, skips included
    let raw = std::fs::read_to_string(dir.path().join("checkpoint.json")).unwrap();
    let map: std::collections::BTreeMap<String, bool> = serde_json::from_str(&raw).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&detail_url("202401031105")), Some(&true));
    assert_eq!(map.get(&detail_url("202401039901")), Some(&true));
}

#[tokio::test]
async fn test_second_run_refetches_nothing_and_keeps_data() {
    let dir = TempDir::new().unwrap();
    let (first, _) = run(&dir, test_pages()).await;
    assert_eq!(first.included, 1);

    let (second, log) = run(&dir, test_pages()).await;
    assert_eq!(second.already_processed, 2);
    assert_eq!(second.included, 0);
    assert_eq!(second.skipped_excluded, 0);

    // Only listing pages were fetched the second time
    let fetched = log.lock().unwrap().clone();
    assert!(fetched.iter().all(|url| !url.contains("RACEID")));

    // Earlier rows survive the second run's final flush
    assert_eq!(snapshot(&dir).read_races().unwrap().len(), 1);
    assert_eq!(snapshot(&dir).read_horses().unwrap().len(), 3);
}

#[tokio::test]
async fn test_corrupt_checkpoint_reprocesses_from_scratch() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("checkpoint.json"), "{{{ not json").unwrap();

    let (summary, _) = run(&dir, test_pages()).await;
    assert_eq!(summary.already_processed, 0);
    assert_eq!(summary.included, 1);
}
