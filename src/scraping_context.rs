use std::sync::Arc;

use log::{error, info};

use crate::{
    checkpoint::CheckpointWriter,
    config::ScrapingConfig,
    extractor::ResultExtractor,
    fetch_worker::FetchWorker,
    ratelimit::NavigationPacer,
    render::PageRenderer,
    scheduler::{BatchScheduler, RoundReport},
};

pub struct ScrapingContext {
    pub scraping_config: ScrapingConfig,
    pub checkpoint_writer: CheckpointWriter,
}

impl ScrapingContext {
    pub fn new() -> anyhow::Result<Self> {
        let scraping_config = ScrapingConfig::new()?;
        Ok(Self::with_config(scraping_config))
    }

    pub fn with_config(scraping_config: ScrapingConfig) -> Self {
        let checkpoint_writer = CheckpointWriter::new(&scraping_config.output_dir);
        Self {
            scraping_config,
            checkpoint_writer,
        }
    }

    /// Runs every configured round in order, writing each round's final file.
    ///
    /// Page failures and failed writes are logged, never returned; an error
    /// here means the run could not be set up.
    pub async fn run_rounds<R: PageRenderer>(
        &self,
        renderer: Arc<R>,
    ) -> anyhow::Result<Vec<RoundReport>> {
        let config = &self.scraping_config;
        let worker = FetchWorker::new(renderer, ResultExtractor::new()?, config.fetch.clone())
            .with_pacer(NavigationPacer::new(config.requests_per_second));
        let scheduler = BatchScheduler::new(
            Arc::new(worker),
            self.checkpoint_writer.clone(),
            config.batch_pause,
        );

        let mut reports = Vec::with_capacity(config.rounds.len());
        for plan in &config.rounds {
            info!(
                "Scraping round {} ({}..={})",
                plan.name, plan.first_id, plan.last_id
            );
            let report = scheduler.run(plan).await;

            let final_path = self.checkpoint_writer.final_path(&plan.name);
            if let Err(e) = self.checkpoint_writer.write(&report.records, &final_path).await {
                error!("[{}] Final results not written: {e:#}", plan.name);
            }

            info!(
                "Round {} finished: {} records from {} pages in {} batches ({} failed, {} checkpoint failures)",
                plan.name,
                report.records.len(),
                report.attempted,
                report.batches,
                report.failed(),
                report.checkpoint_failures
            );
            reports.push(report);
        }
        Ok(reports)
    }
}
