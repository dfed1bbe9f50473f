//! Background grading workers.
//!
//! Each worker pulls jobs from the [`GradingQueue`], re-reads the answer,
//! evaluates it under `worker_timeout` and upserts the rating. Failures are
//! re-enqueued with exponential backoff until `max_attempts`, then recorded in
//! `grading_failures`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::GradingSettings;
use crate::errors::AppError;
use crate::grading::evaluator::{evaluate_within, Evaluator};
use crate::grading::queue::{GradingJob, GradingQueue};
use crate::grading::{evaluation_request_for_answer, persist_rating, RatingWrite};
use crate::models::rating::RatingRow;
use crate::store::EntityStore;

const POLL_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum JobOutcome {
    Graded(RatingRow),
    /// The answer was deleted or resubmitted after the job was queued.
    Stale,
    Retrying { next_attempt: u32, delay: Duration },
    DeadLettered,
}

pub struct GradingWorker {
    store: Arc<dyn EntityStore>,
    evaluator: Arc<dyn Evaluator>,
    queue: Arc<dyn GradingQueue>,
    settings: GradingSettings,
}

impl GradingWorker {
    pub fn new(
        store: Arc<dyn EntityStore>,
        evaluator: Arc<dyn Evaluator>,
        queue: Arc<dyn GradingQueue>,
        settings: GradingSettings,
    ) -> Self {
        Self {
            store,
            evaluator,
            queue,
            settings,
        }
    }

    /// Spawns `settings.workers` tasks sharing this worker's queue.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let count = self.settings.workers;
        let worker = Arc::new(self);
        (0..count)
            .map(|n| {
                let worker = Arc::clone(&worker);
                tokio::spawn(async move { worker.run(n).await })
            })
            .collect()
    }

    async fn run(&self, n: usize) {
        info!("Grading worker {n} started");
        loop {
            match self.queue.dequeue(POLL_WAIT).await {
                Ok(Some(job)) => {
                    let answer_id = job.answer_id;
                    if let Err(e) = self.process(job).await {
                        error!("Grading worker {n} failed on answer {answer_id}: {e}");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Grading worker {n} could not read the queue: {e}");
                    tokio::time::sleep(POLL_WAIT).await;
                }
            }
        }
    }

    pub async fn process(&self, job: GradingJob) -> Result<JobOutcome, AppError> {
        let Some(answer) = self.store.get_answer(job.answer_id).await? else {
            info!("Skipping grading for deleted answer {}", job.answer_id);
            return Ok(JobOutcome::Stale);
        };
        if answer.updated_at > job.answer_version {
            info!("Skipping stale grading job for resubmitted answer {}", answer.id);
            return Ok(JobOutcome::Stale);
        }
        let Some(request) = evaluation_request_for_answer(self.store.as_ref(), &answer).await?
        else {
            return Ok(JobOutcome::Stale);
        };

        let failure =
            match evaluate_within(self.evaluator.as_ref(), &request, self.settings.worker_timeout)
                .await
            {
                Ok(evaluation) => {
                    match persist_rating(self.store.as_ref(), &answer, &evaluation).await {
                        RatingWrite::Stored(rating) => return Ok(JobOutcome::Graded(rating)),
                        RatingWrite::Stale => return Ok(JobOutcome::Stale),
                        RatingWrite::Failed => "rating could not be stored".to_string(),
                    }
                }
                Err(e) => {
                    warn!(
                        "Grading attempt {} for answer {} failed: {e}",
                        job.attempt + 1,
                        answer.id
                    );
                    e.to_string()
                }
            };

        self.retry_or_dead_letter(job, &failure).await
    }

    async fn retry_or_dead_letter(
        &self,
        job: GradingJob,
        failure: &str,
    ) -> Result<JobOutcome, AppError> {
        let attempts_made = job.attempt + 1;
        if attempts_made >= self.settings.max_attempts {
            error!(
                "Giving up on grading answer {} after {attempts_made} attempts: {failure}",
                job.answer_id
            );
            self.store
                .record_grading_failure(job.answer_id, attempts_made as i32, failure)
                .await?;
            return Ok(JobOutcome::DeadLettered);
        }

        let delay = backoff(self.settings.retry_base, job.attempt);
        let retry = job.next_attempt();
        let next_attempt = retry.attempt;
        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let answer_id = retry.answer_id;
            if let Err(e) = queue.enqueue(retry).await {
                error!("Could not re-enqueue grading for answer {answer_id}: {e}");
            }
        });

        Ok(JobOutcome::Retrying {
            next_attempt,
            delay,
        })
    }
}

/// `base * 2^attempt`, capped at 64 × base.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.min(6))
}
