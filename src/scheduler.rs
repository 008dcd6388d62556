use std::{num::NonZeroUsize, ops::RangeInclusive, sync::Arc, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, info, warn};

use crate::{
    checkpoint::CheckpointWriter,
    config::UrlTemplate,
    error::FetchError,
    fetch_worker::{FetchOutcome, FetchWorker},
    limiter::ConcurrencyLimiter,
    record::CommissionRecord,
    render::PageRenderer,
};

/// One sweep over an inclusive ID range.
#[derive(Debug, Clone)]
pub struct RoundPlan {
    /// Used in output file names.
    pub name: String,
    pub first_id: u64,
    pub last_id: u64,
    pub template: UrlTemplate,
    pub batch_size: NonZeroUsize,
    pub concurrency: NonZeroUsize,
}

#[derive(Debug, Default)]
pub struct RoundReport {
    /// Every record of the round, batch by batch, in ID order within a batch.
    pub records: Vec<CommissionRecord>,
    pub batches: usize,
    pub attempted: usize,
    pub checkpoint_failures: usize,
}

impl RoundReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.records.len()
    }
}

/// Splits `first..=last` into contiguous chunks of `size` IDs; the last chunk
/// may be shorter. `first > last` gives no chunks.
pub fn batch_ranges(first: u64, last: u64, size: NonZeroUsize) -> Vec<RangeInclusive<u64>> {
    let step = size.get() as u64;
    let mut ranges = Vec::new();
    let mut start = first;
    while start <= last {
        let end = start.saturating_add(step - 1).min(last);
        ranges.push(start..=end);
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }
    ranges
}

/// Drives a round batch by batch.
///
/// Batches run strictly one after another. Inside a batch every fetch is
/// spawned at once and the limiter decides how many run. The batch is done
/// when every fetch has settled, and only then is the checkpoint written, so
/// checkpoint `k` holds exactly the records of batches `1..=k`.
pub struct BatchScheduler<R: PageRenderer> {
    worker: Arc<FetchWorker<R>>,
    checkpoints: CheckpointWriter,
    batch_pause: Duration,
}

impl<R: PageRenderer> BatchScheduler<R> {
    pub fn new(
        worker: Arc<FetchWorker<R>>,
        checkpoints: CheckpointWriter,
        batch_pause: Duration,
    ) -> Self {
        Self {
            worker,
            checkpoints,
            batch_pause,
        }
    }

    pub async fn run(&self, plan: &RoundPlan) -> RoundReport {
        let limiter = ConcurrencyLimiter::new(plan.concurrency);
        let batches = batch_ranges(plan.first_id, plan.last_id, plan.batch_size);
        let total = batches.len();
        let mut report = RoundReport {
            batches: total,
            ..RoundReport::default()
        };

        for (index, ids) in batches.into_iter().enumerate() {
            let number = index + 1;
            info!(
                "[{}] Batch {number}/{total} - IDs: {}..{}",
                plan.name,
                ids.start(),
                ids.end()
            );

            let attempted = ids.clone().count();
            let records = self.run_batch(&limiter, &plan.template, ids).await;
            let succeeded = records.len();
            report.attempted += attempted;
            report.records.extend(records);

            let path = self.checkpoints.batch_path(&plan.name, number);
            if let Err(e) = self.checkpoints.write(&report.records, &path).await {
                report.checkpoint_failures += 1;
                error!("[{}] Checkpoint for batch {number} not written: {e:#}", plan.name);
            }

            info!("[{}] Batch {number} completed: {succeeded}/{attempted} succeeded", plan.name);

            if number < total && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        report
    }

    async fn run_batch(
        &self,
        limiter: &ConcurrencyLimiter,
        template: &UrlTemplate,
        ids: RangeInclusive<u64>,
    ) -> Vec<CommissionRecord> {
        let mut tasks = FuturesUnordered::new();
        for (slot, id) in ids.enumerate() {
            let url = template.url_for(id);
            let worker = Arc::clone(&self.worker);
            let limiter = limiter.clone();
            let task_url = url.clone();
            let handle = tokio::spawn(async move {
                let _permit = limiter.acquire().await;
                worker.fetch(&task_url).await
            });
            tasks.push(async move {
                let outcome: FetchOutcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let failure = FetchError::Panicked {
                            url,
                            message: e.to_string(),
                        };
                        warn!("✗ {failure}");
                        Err(failure)
                    }
                };
                (slot, outcome)
            });
        }

        let mut slots: Vec<Option<CommissionRecord>> = vec![None; tasks.len()];
        while let Some((slot, outcome)) = tasks.next().await {
            if let Ok(record) = outcome {
                slots[slot] = Some(record);
            }
        }
        slots.into_iter().flatten().collect()
    }
}
