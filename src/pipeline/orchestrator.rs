//! Scrape run orchestration.
//!
//! Walks the configured date range in ascending order, discovers candidate
//! detail pages per date, and drives each candidate through the per-page
//! state machine. Every candidate reaches exactly one terminal outcome and
//! is checkpointed whichever one it is, so an interrupted run resumes
//! without refetching anything already classified.

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::extract;
use crate::fetcher::PageFetcher;
use crate::output::SnapshotWriter;
use crate::resume::CheckpointStore;
use crate::rules::SiteRules;
use crate::shutdown::SharedShutdown;
use crate::{HorseOddsRow, RaceRecord, Surface};

use super::{PageOutcome, PipelineError, ScrapeConfig, ScrapeSummary};

/// Drives one scrape run end to end.
pub struct Orchestrator {
    config: ScrapeConfig,
    rules: SiteRules,
    fetcher: Box<dyn PageFetcher>,
    writer: Box<dyn SnapshotWriter>,
    store: CheckpointStore,
    shutdown: SharedShutdown,
    races: Vec<RaceRecord>,
    horses: Vec<HorseOddsRow>,
}

impl Orchestrator {
    /// Build an orchestrator, loading the checkpoint and seeding the
    /// dataset accumulators from any existing snapshots.
    ///
    /// Seeding makes the snapshot-overwrite flush safe across resumes:
    /// records from earlier runs survive because this run re-writes them
    /// together with its own.
    pub fn new(
        config: ScrapeConfig,
        rules: SiteRules,
        fetcher: Box<dyn PageFetcher>,
        writer: Box<dyn SnapshotWriter>,
        shutdown: SharedShutdown,
    ) -> Result<Self, PipelineError> {
        let store = CheckpointStore::load(config.checkpoint_path());
        let races = writer.read_races()?;
        let horses = writer.read_horses()?;

        if !races.is_empty() || !horses.is_empty() {
            info!(
                races = races.len(),
                horse_rows = horses.len(),
                "Seeded accumulators from existing snapshots"
            );
        }

        Ok(Self {
            config,
            rules,
            fetcher,
            writer,
            store,
            shutdown,
            races,
            horses,
        })
    }

    /// Run the scrape over the configured date range.
    ///
    /// Returns a summary of this run's work. A shutdown request ends the
    /// run between candidate pages; the in-flight page always completes
    /// and a final flush always happens.
    pub async fn run(&mut self) -> Result<ScrapeSummary, PipelineError> {
        let dates = self.config.dates();
        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            dates = dates.len(),
            checkpoint_entries = self.store.len(),
            "Starting scrape"
        );

        let progress = self.date_progress(dates.len() as u64);

        let mut summary = ScrapeSummary {
            dates_processed: 0,
            discovered: 0,
            already_processed: 0,
            skipped_excluded: 0,
            skipped_incomplete: 0,
            included: 0,
            horse_rows: 0,
            interrupted: false,
            races_path: self.writer.races_path().to_path_buf(),
            horses_path: self.writer.horses_path().to_path_buf(),
        };
        let mut since_flush = 0usize;

        'dates: for date in dates {
            if self.shutdown.is_shutdown_requested() {
                summary.interrupted = true;
                break;
            }

            let candidates =
                crate::discover::discover_candidates(&self.rules, self.fetcher.as_ref(), date)
                    .await;
            summary.discovered += candidates.len() as u64;
            debug!(%date, candidates = candidates.len(), "Processing date");

            for url in candidates {
                if self.shutdown.is_shutdown_requested() {
                    info!("Shutdown requested, stopping between pages");
                    summary.interrupted = true;
                    break 'dates;
                }

                if self.store.is_processed(&url) {
                    debug!(%url, "Already processed, skipping");
                    summary.already_processed += 1;
                    continue;
                }

                let before_horses = self.horses.len();
                let outcome = self.process_candidate(date, &url).await;
                self.store.mark_processed(&url);

                match outcome {
                    PageOutcome::SkippedExcluded => summary.skipped_excluded += 1,
                    PageOutcome::SkippedIncomplete => summary.skipped_incomplete += 1,
                    PageOutcome::Included => {
                        summary.included += 1;
                        summary.horse_rows += (self.horses.len() - before_horses) as u64;
                        since_flush += 1;
                        if since_flush >= self.config.batch_size {
                            self.flush()?;
                            since_flush = 0;
                        }
                    }
                }
            }

            summary.dates_processed += 1;
            progress.inc(1);
        }

        self.flush()?;
        progress.finish_and_clear();

        info!(
            dates = summary.dates_processed,
            included = summary.included,
            skipped_excluded = summary.skipped_excluded,
            skipped_incomplete = summary.skipped_incomplete,
            already_processed = summary.already_processed,
            interrupted = summary.interrupted,
            "Scrape finished"
        );
        Ok(summary)
    }

    /// Classify one candidate detail page.
    ///
    /// Never fails: transport and parse problems degrade to a skip outcome.
    /// A page that cannot be fetched is treated as excluded rather than
    /// retried across runs; candidate URLs are plentiful and a permanently
    /// broken one should not wedge the pipeline.
    async fn process_candidate(&mut self, date: NaiveDate, url: &str) -> PageOutcome {
        let Some(detail) = self.fetcher.fetch(url).await else {
            warn!(%url, "Detail page fetch failed");
            return PageOutcome::SkippedExcluded;
        };

        let analysis = extract::analyze_detail(&self.rules, detail.body());

        let Some(venue) = analysis.venue else {
            debug!(%url, "No known venue on page");
            return PageOutcome::SkippedExcluded;
        };
        if self.config.excluded_venues.contains(&venue) {
            debug!(%url, %venue, "Venue excluded");
            return PageOutcome::SkippedExcluded;
        }

        let (Some(odds_url), Some(dividend_url)) = (analysis.odds_url, analysis.dividend_url)
        else {
            debug!(%url, %venue, "Odds or payout link missing");
            return PageOutcome::SkippedIncomplete;
        };

        let Some(odds_page) = self.fetcher.fetch(&odds_url).await else {
            warn!(url = %odds_url, "Odds page fetch failed");
            return PageOutcome::SkippedIncomplete;
        };
        let odds = extract::odds_rows(odds_page.body());
        if odds.is_empty() {
            debug!(%url, "Odds table empty");
            return PageOutcome::SkippedIncomplete;
        }

        // The payout page is best-effort: the race is included even when
        // the trifecta result is absent (e.g. not yet published).
        let (trifecta_combo, trifecta_pay) = match self.fetcher.fetch(&dividend_url).await {
            Some(page) => extract::trifecta_result(&self.rules, page.body()),
            None => {
                warn!(url = %dividend_url, "Payout page fetch failed");
                (None, None)
            }
        };

        let race_key = self.rules.race_key_for(url);
        let record = RaceRecord {
            date,
            track: venue.clone(),
            race_no: analysis.meta.race_no,
            distance_m: analysis.meta.distance_m,
            surface: analysis.meta.surface.unwrap_or(Surface::Unknown),
            course_dir: analysis.meta.course_dir,
            going: analysis.meta.going,
            race_key: race_key.clone(),
            detail_url: url.to_string(),
            odds_url,
            dividend_url,
            trifecta_combo,
            trifecta_pay,
        };
        if let Err(e) = record.validate() {
            warn!(%url, error = %e, "Race record failed validation, keeping anyway");
        }

        for row in &odds {
            self.horses.push(HorseOddsRow {
                date,
                track: venue.clone(),
                race_key: race_key.clone(),
                popularity: row.popularity,
                horse_no: row.horse_no,
                win_odds: row.win_odds,
            });
        }
        self.races.push(record);

        debug!(%url, %venue, starters = odds.len(), "Race included");
        PageOutcome::Included
    }

    /// Flush both dataset snapshots, then the checkpoint.
    ///
    /// Order matters: datasets first, checkpoint second. A crash between
    /// the two re-processes some pages on resume but never loses rows the
    /// checkpoint claims were written.
    fn flush(&mut self) -> Result<(), PipelineError> {
        let races = self.writer.write_races(&self.races)?;
        let horses = self.writer.write_horses(&self.horses)?;
        self.store.save()?;
        debug!(races, horse_rows = horses, "Flushed snapshots and checkpoint");
        Ok(())
    }

    fn date_progress(&self, total: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} dates ({eta})")
                .expect("hardcoded template is valid")
                .progress_chars("#>-"),
        );
        bar
    }
}
