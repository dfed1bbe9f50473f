//! Grading queue: hands answers that could not be graded inline to the
//! background workers.
//!
//! Two backends:
//! - `ChannelGradingQueue`: in-process `tokio::sync::mpsc`, jobs are lost on restart.
//! - `RedisGradingQueue`: a Redis list (`LPUSH` / `BRPOP`) shared by every
//!   instance, jobs survive an API restart.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::errors::AppError;

pub const CHANNEL_CAPACITY: usize = 1024;
const REDIS_QUEUE_KEY: &str = "interview-coach:grading-jobs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingJob {
    pub answer_id: Uuid,
    /// `updated_at` of the answer when the job was created. A newer answer
    /// makes the job stale.
    pub answer_version: DateTime<Utc>,
    /// Zero-based count of worker attempts already made.
    pub attempt: u32,
}

impl GradingJob {
    pub fn first(answer_id: Uuid, answer_version: DateTime<Utc>) -> Self {
        Self {
            answer_id,
            answer_version,
            attempt: 0,
        }
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait GradingQueue: Send + Sync {
    async fn enqueue(&self, job: GradingJob) -> Result<(), AppError>;
    /// Waits up to `wait` for the next job; `Ok(None)` when nothing arrived.
    async fn dequeue(&self, wait: Duration) -> Result<Option<GradingJob>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process channel
// ────────────────────────────────────────────────────────────────────────────

pub struct ChannelGradingQueue {
    tx: mpsc::Sender<GradingJob>,
    rx: Mutex<mpsc::Receiver<GradingJob>>,
}

impl ChannelGradingQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

impl Default for ChannelGradingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GradingQueue for ChannelGradingQueue {
    /// Never waits for room: a full backlog drops the job and the answer
    /// stays pending.
    async fn enqueue(&self, job: GradingJob) -> Result<(), AppError> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => AppError::Internal(anyhow!(
                "grading queue is full ({CHANNEL_CAPACITY} jobs), dropped answer {}",
                job.answer_id
            )),
            TrySendError::Closed(_) => AppError::Internal(anyhow!("grading queue is closed")),
        })
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<GradingJob>, AppError> {
        let mut rx = self.rx.lock().await;
        Ok(tokio::time::timeout(wait, rx.recv()).await.ok().flatten())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis list
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisGradingQueue {
    client: redis::Client,
    /// Shared connection for pushes.
    producer: MultiplexedConnection,
    /// Connection reserved for `BRPOP`, so a waiting pop never stalls an
    /// enqueue. Opened on first use and dropped after an error.
    consumer: Mutex<Option<MultiplexedConnection>>,
}

impl RedisGradingQueue {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let producer = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            client,
            producer,
            consumer: Mutex::new(None),
        })
    }
}

fn redis_error(e: redis::RedisError) -> AppError {
    AppError::Internal(anyhow!("grading queue (redis): {e}"))
}

#[async_trait]
impl GradingQueue for RedisGradingQueue {
    async fn enqueue(&self, job: GradingJob) -> Result<(), AppError> {
        let payload = serde_json::to_string(&job)
            .map_err(|e| AppError::Internal(anyhow!("failed to encode grading job: {e}")))?;
        let mut conn = self.producer.clone();
        redis::cmd("LPUSH")
            .arg(REDIS_QUEUE_KEY)
            .arg(payload)
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<GradingJob>, AppError> {
        let mut slot = self.consumer.lock().await;
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(redis_error)?,
        };
        // On error the connection is dropped and the next poll reconnects.
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(REDIS_QUEUE_KEY)
            .arg(wait.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        *slot = Some(conn);

        match popped {
            None => Ok(None),
            Some((_, payload)) => decode_job(&payload).map(Some),
        }
    }
}

fn decode_job(payload: &str) -> Result<GradingJob, AppError> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::Internal(anyhow!("undecodable grading job {payload:?}: {e}")))
}
