//! End-to-end pipeline tests over canned pages: inclusion, exclusion,
//! incompleteness, dataset contents and interruption.

use async_trait::async_trait;
use chrono::NaiveDate;
use keiba_scraper::fetcher::{FetchedPage, PageFetcher};
use keiba_scraper::output::{CsvSnapshot, SnapshotWriter};
use keiba_scraper::pipeline::Orchestrator;
use keiba_scraper::rules::SiteRules;
use keiba_scraper::shutdown::{SharedShutdown, ShutdownCoordinator};
use keiba_scraper::Surface;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::support::*;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
}

fn snapshot(dir: &TempDir) -> CsvSnapshot {
    CsvSnapshot::new(dir.path(), "races.csv", "horse_odds.csv")
}

async fn run(dir: &TempDir, pages: HashMap<String, String>) -> keiba_scraper::pipeline::ScrapeSummary {
    let (fetcher, _log) = MockFetcher::new(pages);
    let mut orchestrator = Orchestrator::new(
        config_for(dir.path(), date()),
        SiteRules::default(),
        Box::new(fetcher),
        Box::new(snapshot(dir)),
        ShutdownCoordinator::shared(),
    )
    .unwrap();
    orchestrator.run().await.unwrap()
}

#[tokio::test]
async fn test_complete_race_is_included() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(primary_listing_url(date()), listing_page(&["202401031105"]));
    insert_complete_race(&mut pages, "川崎", "5R ダ1400m 右 良", "202401031105");

    let summary = run(&dir, pages).await;
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.included, 1);
    assert_eq!(summary.horse_rows, 3);
    assert!(!summary.interrupted);

    let races = snapshot(&dir).read_races().unwrap();
    assert_eq!(races.len(), 1);
    let race = &races[0];
    assert_eq!(race.track, "川崎");
    assert_eq!(race.race_no, Some(5));
    assert_eq!(race.distance_m, Some(1400));
    assert_eq!(race.surface, Surface::Dirt);
    assert_eq!(race.race_key, "202401031105");
    assert_eq!(race.trifecta_combo.as_deref(), Some("3-7-1"));
    assert_eq!(race.trifecta_pay, Some(12340));

    // Horse rows sorted by ascending popularity, joined by race_key
    let horses = snapshot(&dir).read_horses().unwrap();
    assert_eq!(horses.len(), 3);
    let popularity: Vec<u32> = horses.iter().map(|h| h.popularity).collect();
    assert_eq!(popularity, vec![1, 2, 3]);
    assert!(horses.iter().all(|h| h.race_key == race.race_key));
}

#[tokio::test]
async fn test_excluded_venue_produces_no_rows() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(
        primary_listing_url(date()),
        listing_page(&["202401031105", "202401039901"]),
    );
    insert_complete_race(&mut pages, "川崎", "5R ダ1400m 右 良", "202401031105");
    insert_complete_race(&mut pages, "帯広", "3R ダ200m 直 良", "202401039901");

    let summary = run(&dir, pages).await;
    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.included, 1);
    assert_eq!(summary.skipped_excluded, 1);

    let races = snapshot(&dir).read_races().unwrap();
    assert!(races.iter().all(|r| r.track != "帯広"));
    let horses = snapshot(&dir).read_horses().unwrap();
    assert!(horses.iter().all(|h| h.track != "帯広"));
}

#[tokio::test]
async fn test_missing_links_or_empty_odds_skip_incomplete() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(
        primary_listing_url(date()),
        listing_page(&["202401031101", "202401031102"]),
    );
    // No odds link at all
    pages.insert(
        detail_url("202401031101"),
        detail_page("大井", "1R ダ1200m 右 良", "202401031101", false, true),
    );
    // Links present but the odds table yields zero rows
    pages.insert(
        detail_url("202401031102"),
        detail_page("大井", "2R ダ1200m 右 良", "202401031102", true, true),
    );
    pages.insert(odds_url("202401031102"), odds_page(&[]));

    let summary = run(&dir, pages).await;
    assert_eq!(summary.skipped_incomplete, 2);
    assert_eq!(summary.included, 0);
    assert!(snapshot(&dir).read_races().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_payout_page_keeps_race_without_trifecta() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(primary_listing_url(date()), listing_page(&["202401031105"]));
    pages.insert(
        detail_url("202401031105"),
        detail_page("船橋", "5R ダ1600m 左 稍重", "202401031105", true, true),
    );
    pages.insert(odds_url("202401031105"), odds_page(&[(1, 4, "2.3")]));
    // Payout page absent from the canned set

    let summary = run(&dir, pages).await;
    assert_eq!(summary.included, 1);

    let races = snapshot(&dir).read_races().unwrap();
    assert_eq!(races[0].trifecta_combo, None);
    assert_eq!(races[0].trifecta_pay, None);
}

/// Canned fetcher that records, at every fetch, how many race rows are
/// durably on disk. Lets tests observe flush timing from the outside.
struct SnapshotObservingFetcher {
    pages: HashMap<String, String>,
    races_path: PathBuf,
    observed: Arc<Mutex<Vec<(String, usize)>>>,
}

fn disk_race_rows(path: &std::path::Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count().saturating_sub(1))
        .unwrap_or(0)
}

#[async_trait]
impl PageFetcher for SnapshotObservingFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        self.observed
            .lock()
            .unwrap()
            .push((url.to_string(), disk_race_rows(&self.races_path)));
        self.pages.get(url).map(|body| FetchedPage::new(url, body))
    }
}

#[tokio::test]
async fn test_batch_size_flushes_snapshots_mid_run() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(
        primary_listing_url(date()),
        listing_page(&["202401031101", "202401031102"]),
    );
    insert_complete_race(&mut pages, "川崎", "1R ダ1400m 右 良", "202401031101");
    insert_complete_race(&mut pages, "川崎", "2R ダ1600m 右 良", "202401031102");

    let observed = Arc::new(Mutex::new(Vec::new()));
    let fetcher = SnapshotObservingFetcher {
        pages,
        races_path: dir.path().join("races.csv"),
        observed: observed.clone(),
    };

    let mut config = config_for(dir.path(), date());
    config.batch_size = 1;
    let mut orchestrator = Orchestrator::new(
        config,
        SiteRules::default(),
        Box::new(fetcher),
        Box::new(snapshot(&dir)),
        ShutdownCoordinator::shared(),
    )
    .unwrap();
    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.included, 2);

    // With batch_size 1 the first race is flushed before any of the second
    // race's pages are fetched; nothing is on disk before that flush
    let observed = observed.lock().unwrap();
    let rows_at = |url: &str| {
        observed
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, rows)| *rows)
            .unwrap()
    };
    assert_eq!(rows_at(&detail_url("202401031101")), 0);
    assert_eq!(rows_at(&detail_url("202401031102")), 1);

    assert_eq!(snapshot(&dir).read_races().unwrap().len(), 2);
    // The checkpoint flushed alongside the snapshots
    let raw = std::fs::read_to_string(dir.path().join("checkpoint.json")).unwrap();
    let map: std::collections::BTreeMap<String, bool> = serde_json::from_str(&raw).unwrap();
    assert_eq!(map.len(), 2);
}

/// Canned fetcher that requests shutdown when a trigger URL is fetched,
/// simulating an interrupt arriving while a page is in flight.
struct InterruptingFetcher {
    pages: HashMap<String, String>,
    trigger_url: String,
    shutdown: SharedShutdown,
    log: FetchLog,
}

#[async_trait]
impl PageFetcher for InterruptingFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        self.log.lock().unwrap().push(url.to_string());
        if url == self.trigger_url {
            self.shutdown.request_shutdown();
        }
        self.pages.get(url).map(|body| FetchedPage::new(url, body))
    }
}

#[tokio::test]
async fn test_mid_run_interrupt_finishes_in_flight_page_and_flushes() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(
        primary_listing_url(date()),
        listing_page(&["202401031101", "202401031102"]),
    );
    insert_complete_race(&mut pages, "川崎", "1R ダ1400m 右 良", "202401031101");
    insert_complete_race(&mut pages, "川崎", "2R ダ1600m 右 良", "202401031102");

    let shutdown = ShutdownCoordinator::shared();
    let log: FetchLog = Arc::new(Mutex::new(Vec::new()));
    let fetcher = InterruptingFetcher {
        pages,
        // Interrupt arrives while the first race's odds page is in flight
        trigger_url: odds_url("202401031101"),
        shutdown: shutdown.clone(),
        log: log.clone(),
    };

    let mut orchestrator = Orchestrator::new(
        config_for(dir.path(), date()),
        SiteRules::default(),
        Box::new(fetcher),
        Box::new(snapshot(&dir)),
        shutdown,
    )
    .unwrap();
    let summary = orchestrator.run().await.unwrap();

    // The in-flight page completes, the run stops before the next one
    assert!(summary.interrupted);
    assert_eq!(summary.included, 1);

    let fetched = log.lock().unwrap();
    assert!(fetched.contains(&dividend_url("202401031101")));
    assert!(!fetched.iter().any(|u| u == &detail_url("202401031102")));

    // The final flush persisted the completed race and its checkpoint entry
    assert_eq!(snapshot(&dir).read_races().unwrap().len(), 1);
    let raw = std::fs::read_to_string(dir.path().join("checkpoint.json")).unwrap();
    let map: std::collections::BTreeMap<String, bool> = serde_json::from_str(&raw).unwrap();
    assert_eq!(map.get(&detail_url("202401031101")), Some(&true));
    assert!(!map.contains_key(&detail_url("202401031102")));
}

#[tokio::test]
async fn test_pre_requested_shutdown_stops_before_any_date() {
    let dir = TempDir::new().unwrap();
    let mut pages = HashMap::new();
    pages.insert(primary_listing_url(date()), listing_page(&["202401031105"]));
    insert_complete_race(&mut pages, "川崎", "5R ダ1400m 右 良", "202401031105");

    let (fetcher, log) = MockFetcher::new(pages);
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let mut orchestrator = Orchestrator::new(
        config_for(dir.path(), date()),
        SiteRules::default(),
        Box::new(fetcher),
        Box::new(snapshot(&dir)),
        shutdown,
    )
    .unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.dates_processed, 0);
    assert!(log.lock().unwrap().is_empty());
}
