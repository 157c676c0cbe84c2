//! Job executor: a fixed-width pool draining the queue.
//!
//! Each pool slot runs one job to completion; concurrency across jobs comes
//! from pool width, never from intra-job parallelism. Terminal jobs are
//! acked whether they succeeded or failed; this pipeline never re-queues a
//! finished job. A periodic reaper claims messages whose worker vanished and
//! reports them as failed without re-running them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use cliplet_queue::{ClipJob, JobQueue};

use crate::config::WorkerConfig;
use crate::error::{stage_failure_code, WorkerError, WorkerResult};
use crate::pipeline::{process_clip_job, PipelineContext};

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<PipelineContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue, ctx: PipelineContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} pool slots",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Reaper: claim orphaned messages and fail their records
        let reap_task = {
            let queue = Arc::clone(&self.queue);
            let ctx = Arc::clone(&self.ctx);
            let consumer_name = self.consumer_name.clone();
            let interval = self.config.reap_interval;
            let mut shutdown_rx = self.shutdown.subscribe();

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            if let Err(e) = Self::reap_orphans(&queue, &ctx, &consumer_name).await {
                                warn!("Orphan reap pass failed: {}", e);
                            }
                        }
                    }
                }
            })
        };

        // Main consumption loop
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        reap_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and dispatch jobs from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Queue(cliplet_queue::QueueError::connection_failed("Semaphore closed")))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute a single job to its terminal state.
    ///
    /// The message is acked in every case: the pipeline has already written
    /// done or error, and terminal jobs are never retried.
    async fn execute_job(
        ctx: Arc<PipelineContext>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: ClipJob,
    ) {
        let job_id = job.job_id.clone();
        info!(job_id = %job_id, "Executing job");

        match process_clip_job(&ctx, &job).await {
            Ok(object_key) => {
                info!(job_id = %job_id, object_key = %object_key, "Job succeeded");
            }
            Err(e) => {
                error!(job_id = %job_id, "Job failed: {}", e);
            }
        }

        if let Err(e) = queue.ack(&message_id).await {
            error!(job_id = %job_id, "Failed to ack job message: {}", e);
        }
    }

    /// Claim long-idle pending messages and fail their records.
    ///
    /// A claimed job belonged to a worker that died mid-flight. Its partial
    /// side effects are not safely replayable, so it is reported as error,
    /// never re-executed. Records that already reached a terminal state are
    /// left untouched.
    async fn reap_orphans(
        queue: &JobQueue,
        ctx: &PipelineContext,
        consumer_name: &str,
    ) -> WorkerResult<()> {
        let orphans = queue.claim_orphans(consumer_name, 10).await?;

        for (message_id, job) in orphans {
            let stage = ctx
                .store
                .read_stage(&job.job_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_default();
            let code = stage_failure_code(&stage, false);

            match ctx
                .store
                .mark_error_if_active(
                    &job.job_id,
                    code,
                    "Worker stopped responding while processing this job",
                )
                .await
            {
                Ok(true) => {
                    warn!(job_id = %job.job_id, stage = %stage, "Reaped orphaned job");
                }
                Ok(false) => {
                    debug!(job_id = %job.job_id, "Orphaned message for already-terminal job");
                }
                Err(e) => {
                    warn!(job_id = %job.job_id, "Failed to fail orphaned job record: {}", e);
                }
            }

            if let Err(e) = queue.ack(&message_id).await {
                warn!(job_id = %job.job_id, "Failed to ack orphaned message: {}", e);
            }
        }

        Ok(())
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
