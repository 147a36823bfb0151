//! Run orchestrator: drives fetch → locate → extract → normalize → upsert
//! per configured target.
//!
//! Targets run strictly one at a time, with a politeness delay (plus random
//! jitter) between them. Each target is failure-isolated: its run log moves
//! `running → success` or `running → failed`, and the batch continues either
//! way. Zero extracted records is a valid `success` outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::models::{ScrapeStatus, ScrapeTarget};
use crate::scraper::http_client::HttpClient;
use crate::scraper::{SiteScraper, SubsidySource};
use crate::sources;
use crate::storage::Repository;

pub struct Pipeline {
    config: AppConfig,
    targets: Vec<ScrapeTarget>,
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub targets_processed: usize,
    pub targets_failed: usize,
    pub records_upserted: usize,
    pub record_errors: usize,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        let targets = sources::builtin_targets();
        Self { config, targets }
    }

    pub fn with_targets(config: AppConfig, targets: Vec<ScrapeTarget>) -> Self {
        Self { config, targets }
    }

    /// Keep only the target with the given id. Unknown ids leave an empty
    /// target list, which runs as a no-op.
    pub fn filter_source(mut self, source_id: &str) -> Self {
        self.targets.retain(|t| t.id == source_id);
        self
    }

    pub async fn run(&self) -> Result<RunStats> {
        let repo = Repository::open(&self.config.storage.db_path)
            .context("Failed to open store")?;
        if self.config.storage.run_migrations {
            repo.run_migrations()?;
        }
        self.run_with_repo(&repo).await
    }

    /// Run against an externally owned repository (used by the trigger
    /// server and by tests with an in-memory store).
    pub async fn run_with_repo(&self, repo: &Repository) -> Result<RunStats> {
        let client = Arc::new(
            HttpClient::new(&self.config.scraper).context("Failed to build HTTP client")?,
        );

        let mut stats = RunStats::default();

        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 {
                self.polite_delay().await;
            }

            info!("=== [{}/{}] {} ===", i + 1, self.targets.len(), target.name);
            let scraper = SiteScraper::new(Arc::clone(&client), target.clone());
            self.run_target(repo, &scraper, &mut stats).await;
            stats.targets_processed += 1;
        }

        info!(
            "=== Done: {} targets | {} failed | {} records | {} record errors ===",
            stats.targets_processed,
            stats.targets_failed,
            stats.records_upserted,
            stats.record_errors,
        );
        Ok(stats)
    }

    /// One target, failure-isolated. The log row is opened before the fetch
    /// and always closed with a terminal status.
    async fn run_target(&self, repo: &Repository, scraper: &SiteScraper, stats: &mut RunStats) {
        let target = scraper.target();

        let log_id = match repo.begin_scrape_log(&target.url, &target.name) {
            Ok(id) => id,
            Err(e) => {
                // No log row; still attempt the scrape rather than skip the target.
                warn!("{}: could not open run log: {:#}", target.id, e);
                0
            }
        };

        match scraper.fetch_listings().await {
            Ok(records) => {
                let mut upserted = 0usize;
                for record in &records {
                    match repo.upsert_subsidy(record) {
                        Ok(_) => upserted += 1,
                        Err(e) => {
                            stats.record_errors += 1;
                            warn!("{}: upsert failed for {:?}: {:#}", target.id, record.name, e);
                        }
                    }
                }

                stats.records_upserted += upserted;
                info!("{}: {} records upserted", target.id, upserted);
                if let Err(log_err) =
                    repo.finish_scrape_log(log_id, ScrapeStatus::Success, upserted, None)
                {
                    warn!("{}: could not close run log {}: {:#}", target.id, log_id, log_err);
                }
            }
            Err(e) => {
                stats.targets_failed += 1;
                error!("{}: target failed: {:#}", target.id, e);
                if let Err(log_err) =
                    repo.finish_scrape_log(log_id, ScrapeStatus::Failed, 0, Some(&e.to_string()))
                {
                    warn!("{}: could not close run log {}: {:#}", target.id, log_id, log_err);
                }
            }
        }
    }

    /// Politeness throttle between targets: configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter = if self.config.pipeline.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.pipeline.jitter_ms)
        } else {
            0
        };
        let total = Duration::from_millis(self.config.pipeline.request_delay_ms + jitter);
        sleep(total).await;
    }
}
