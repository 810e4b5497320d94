//! Job submission and the workers that drain it.
//!
//! Uploads hand a [`ProcessVideo`] to a [`JobSubmitter`] and return at once.
//! With a database the queue is an apalis Postgres storage; without one, an
//! in-process [`LocalQueue`] runs jobs on the same runtime.

use apalis::prelude::*;
use apalis_sql::postgres::PostgresStorage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::SubmitError;
use crate::pipeline::Pipeline;

/// Job input: index one video against a comma-separated player list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessVideo {
    pub video_id: i64,
    pub player_names: String,
}

impl ProcessVideo {
    pub fn new(video_id: i64, player_names: impl Into<String>) -> Self {
        Self {
            video_id,
            player_names: player_names.into(),
        }
    }
}

/// Fire-and-forget hand-off to the pipeline workers.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, video_id: i64, player_names: &str) -> Result<(), SubmitError>;
}

/// Run one job to completion, logging the outcome. Failures never propagate
/// to the worker: the pipeline has already recorded them on the video.
pub async fn handle_job(pipeline: &Pipeline, job: &ProcessVideo) {
    match pipeline.run(job.video_id, &job.player_names).await {
        Ok(done) => tracing::info!(
            video_id = done.video_id,
            mentions = done.mentions,
            "[jobs] job complete"
        ),
        Err(e) => tracing::error!(video_id = job.video_id, error = %e, "[jobs] job failed"),
    }
}

// ---------------------------------------------------------------------------
// Durable queue (apalis + Postgres)
// ---------------------------------------------------------------------------

/// Create the apalis job tables.
pub async fn setup_queue(pool: &PgPool) -> Result<(), sqlx::Error> {
    PostgresStorage::setup(pool).await
}

#[derive(Clone)]
pub struct QueueSubmitter {
    storage: PostgresStorage<ProcessVideo>,
}

impl QueueSubmitter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            storage: PostgresStorage::new(pool),
        }
    }
}

#[async_trait]
impl JobSubmitter for QueueSubmitter {
    async fn submit(&self, video_id: i64, player_names: &str) -> Result<(), SubmitError> {
        let mut storage = self.storage.clone();
        storage
            .push(ProcessVideo::new(video_id, player_names))
            .await
            .map_err(|e| SubmitError::Queue(e.to_string()))?;
        tracing::info!(video_id, "[jobs] job queued");
        Ok(())
    }
}

/// Job handler. Always returns Ok so apalis never retries a job.
async fn process_video_job(job: ProcessVideo, pipeline: Data<Pipeline>) -> Result<(), Error> {
    handle_job(&pipeline, &job).await;
    Ok(())
}

/// Run `workers` apalis workers against the Postgres queue until shutdown.
pub async fn run_pipeline_worker(pool: PgPool, pipeline: Pipeline, workers: usize) {
    let storage: PostgresStorage<ProcessVideo> = PostgresStorage::new(pool);

    tracing::info!(workers, "[jobs] apalis pipeline workers starting");

    let mut monitor = Monitor::new();
    for index in 0..workers.max(1) {
        let worker = WorkerBuilder::new(format!("pipeline-worker-{}", index))
            .data(pipeline.clone())
            .backend(storage.clone())
            .build_fn(process_video_job);
        monitor = monitor.register(worker);
    }

    if let Err(e) = monitor.run().await {
        tracing::error!(error = %e, "[jobs] pipeline worker monitor failed");
    }
}

// ---------------------------------------------------------------------------
// In-process queue
// ---------------------------------------------------------------------------

/// Channel-backed queue for running without a database.
///
/// Jobs are lost on restart. Dropping every clone closes the queue; the
/// worker then finishes in-flight jobs and exits.
#[derive(Clone)]
pub struct LocalQueue {
    sender: mpsc::UnboundedSender<ProcessVideo>,
}

impl LocalQueue {
    /// Spawn the worker loop, running at most `concurrency` jobs at a time.
    pub fn start(pipeline: Pipeline, concurrency: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_local_worker(receiver, pipeline, concurrency.max(1)));
        (Self { sender }, worker)
    }
}

#[async_trait]
impl JobSubmitter for LocalQueue {
    async fn submit(&self, video_id: i64, player_names: &str) -> Result<(), SubmitError> {
        self.sender
            .send(ProcessVideo::new(video_id, player_names))
            .map_err(|_| SubmitError::Closed)?;
        tracing::info!(video_id, "[jobs] job queued locally");
        Ok(())
    }
}

async fn run_local_worker(
    mut receiver: mpsc::UnboundedReceiver<ProcessVideo>,
    pipeline: Pipeline,
    concurrency: usize,
) {
    tracing::info!(concurrency, "[jobs] local pipeline worker started");
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            Some(job) = receiver.recv(), if tasks.len() < concurrency => {
                let pipeline = pipeline.clone();
                tasks.spawn(async move { handle_job(&pipeline, &job).await });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "[jobs] pipeline task panicked");
                }
            }
            else => break,
        }
    }

    tracing::info!("[jobs] local pipeline worker stopped");
}
