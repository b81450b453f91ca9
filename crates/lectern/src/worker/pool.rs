use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use crate::content::{Content, ContentStatus};
use crate::db::{job_repo, Database};
use crate::error::WorkerError;
use crate::pipeline::Pipeline;
use crate::worker::job::{retry_backoff, Job, JobKind, JobOutcome, JobStatus};

/// Handle for scheduling background work. Jobs live in the database, so a
/// submitted job survives a restart; the notifier only shortens the wait.
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    notify: Arc<Notify>,
    shutdown: Arc<AtomicBool>,
}

impl JobQueue {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            notify: Arc::new(Notify::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queues `kind` for a content record. Returns the job and whether it is
    /// new; an identical pending or running job is reused.
    pub async fn submit(&self, content_id: &str, kind: JobKind) -> Result<(Job, bool), WorkerError> {
        if self.is_shut_down() {
            return Err(WorkerError::ShutDown);
        }

        let content_id = content_id.to_string();
        let (job, created) = self
            .db
            .call(move |db| job_repo::enqueue(db, &content_id, kind, Utc::now()))
            .await?;

        if created {
            debug!(job_id = %job.id, content_id = %job.content_id, kind = %job.kind, "Job queued");
            self.notify.notify_waiters();
        } else {
            debug!(job_id = %job.id, content_id = %job.content_id, "Reusing queued job");
        }
        Ok((job, created))
    }

    /// Writes a new content record together with its first job, so a record
    /// never exists without work scheduled for it.
    pub async fn submit_with_content(
        &self,
        content: &Content,
        kind: JobKind,
    ) -> Result<Job, WorkerError> {
        if self.is_shut_down() {
            return Err(WorkerError::ShutDown);
        }

        let row = content.clone();
        let job = self
            .db
            .call(move |db| job_repo::insert_content_with_job(db, &row, kind, Utc::now()))
            .await?;

        debug!(job_id = %job.id, content_id = %job.content_id, kind = %job.kind, "Job queued with new content");
        self.notify.notify_waiters();
        Ok(job)
    }

    /// Puts jobs left running by a previous process back in the queue.
    pub async fn recover(&self) -> Result<usize, WorkerError> {
        let recovered = self
            .db
            .call(|db| job_repo::recover_running(db, Utc::now()))
            .await?;
        if recovered > 0 {
            info!(recovered, "Recovered interrupted jobs");
            self.notify.notify_waiters();
        }
        Ok(recovered)
    }

    pub async fn job(&self, id: &str) -> Result<Option<Job>, WorkerError> {
        let id = id.to_string();
        Ok(self.db.call(move |db| job_repo::find_by_id(db, &id)).await?)
    }

    pub async fn jobs_for(&self, content_id: &str) -> Result<Vec<Job>, WorkerError> {
        let content_id = content_id.to_string();
        Ok(self
            .db
            .call(move |db| job_repo::list_for_content(db, &content_id))
            .await?)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    async fn claim(&self) -> Result<Option<Job>, WorkerError> {
        Ok(self.db.call(|db| job_repo::claim_next(db, Utc::now())).await?)
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub worker_count: usize,
    pub max_attempts: u32,
    /// Upper bound on how long an idle worker sleeps before re-checking the
    /// queue for retries whose backoff has elapsed.
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            max_attempts: 3,
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct WorkerPool {
    queue: JobQueue,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers on the current runtime.
    pub fn start(queue: JobQueue, pipeline: Arc<Pipeline>, config: PoolConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let config = Arc::new(config);

        let workers = (0..worker_count)
            .map(|worker_id| {
                let queue = queue.clone();
                let pipeline = Arc::clone(&pipeline);
                let config = Arc::clone(&config);
                tokio::spawn(
                    run_worker(queue, pipeline, config)
                        .instrument(tracing::info_span!("worker", worker_id)),
                )
            })
            .collect();

        info!("Started {} workers", worker_count);
        Self { queue, workers }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Stops accepting jobs and waits for in-flight jobs to finish.
    pub async fn shutdown(self) {
        info!("Shutting down worker pool...");
        self.queue.shutdown.store(true, Ordering::Relaxed);
        self.queue.notify.notify_waiters();

        let results = join_all(self.workers).await;
        for (i, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                error!("Worker {} panicked: {:?}", i, e);
            }
        }
        info!("All workers have stopped");
    }
}

async fn run_worker(queue: JobQueue, pipeline: Arc<Pipeline>, config: Arc<PoolConfig>) {
    debug!("Worker started");

    loop {
        if queue.is_shut_down() {
            break;
        }

        // Registered before claiming so a submit racing with an empty claim
        // still wakes this worker.
        let notified = queue.notify.notified();

        match queue.claim().await {
            Ok(Some(job)) => {
                let outcome = run_job(&queue, &pipeline, &job, config.max_attempts).await;
                debug!(job_id = %job.id, ?outcome, "Job finished");
                continue;
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "Failed to claim job"),
        }

        tokio::select! {
            _ = notified => {}
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }

    debug!("Worker stopped");
}

async fn run_job(queue: &JobQueue, pipeline: &Arc<Pipeline>, job: &Job, max_attempts: u32) -> JobOutcome {
    let span = tracing::info_span!(
        "job",
        job_id = %job.id,
        content_id = %job.content_id,
        kind = %job.kind,
        attempt = job.attempts
    );

    async {
        // A panic inside the pipeline surfaces here as a JoinError and is
        // handled like any other failure.
        let task = {
            let pipeline = Arc::clone(pipeline);
            let job = job.clone();
            tokio::spawn(async move { pipeline.run(&job).await }.in_current_span())
        };

        let error = match task.await {
            Ok(Ok(report)) => {
                let job_id = job.id.clone();
                if let Err(e) = queue
                    .db
                    .call(move |db| job_repo::complete(db, &job_id, Utc::now()))
                    .await
                {
                    error!(error = %e, "Failed to mark job done");
                }
                info!(status = ?report.status, warnings = report.warnings.len(), "Job done");
                return JobOutcome::Done;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("pipeline task failed: {}", e),
        };

        let now = Utc::now();
        let retry_at = now
            + chrono::Duration::from_std(retry_backoff(job.attempts))
                .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let job_id = job.id.clone();
        let message = error.clone();
        let status = match queue
            .db
            .call(move |db| job_repo::fail(db, &job_id, &message, max_attempts, retry_at, now))
            .await
        {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "Failed to record job failure");
                return JobOutcome::Dead { error };
            }
        };

        if status == JobStatus::Dead {
            error!(error = %error, "Job dead-lettered");
            degrade_after_dead_letter(pipeline, &job.content_id).await;
            JobOutcome::Dead { error }
        } else {
            warn!(error = %error, "Job failed; will retry");
            queue.notify.notify_waiters();
            JobOutcome::Retrying {
                attempts: job.attempts,
                error,
            }
        }
    }
    .instrument(span)
    .await
}

/// A record whose job died while still `processing` would otherwise never
/// leave that state; demote it to `partial` so clients stop waiting.
async fn degrade_after_dead_letter(pipeline: &Pipeline, content_id: &str) {
    let store = pipeline.store();
    match store.find(content_id).await {
        Ok(Some(content)) if content.status == ContentStatus::Processing => {
            if let Err(e) = store.set_status(content_id, ContentStatus::Partial).await {
                error!(error = %e, "Failed to degrade content after dead-lettered job");
            }
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to load content after dead-lettered job"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentType, Metadata, NewContent};
    use crate::pipeline::PipelineConfig;
    use crate::storage::FsBlobStore;
    use crate::store::ContentStore;
    use tempfile::TempDir;

    async fn wait_terminal(queue: &JobQueue, id: &str) -> Job {
        for _ in 0..200 {
            let job = queue.job(id).await.unwrap().unwrap();
            if matches!(job.status, JobStatus::Done | JobStatus::Dead) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} never finished", id);
    }

    fn setup(dir: &TempDir) -> (ContentStore, JobQueue, Arc<Pipeline>) {
        let db = Database::open_in_memory().unwrap();
        let store = ContentStore::new(db.clone());
        let blobs = Arc::new(FsBlobStore::new(dir.path()));
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            blobs,
            None,
            None,
            PipelineConfig::default(),
        ));
        (store, JobQueue::new(db), pipeline)
    }

    fn note() -> NewContent {
        NewContent {
            workspace_id: "ws".into(),
            content_type: ContentType::Text,
            status: ContentStatus::Ready,
            title: "Cell Biology".into(),
            raw_url: None,
            metadata: Metadata::new(),
            file_size: None,
            extracted_text: Some("Cells are the basic unit of life.".into()),
        }
    }

    #[tokio::test]
    async fn test_text_job_runs_to_ready() {
        let dir = TempDir::new().unwrap();
        let (store, queue, pipeline) = setup(&dir);
        let content = store.create(note()).await.unwrap();

        let pool = WorkerPool::start(
            queue.clone(),
            pipeline,
            PoolConfig {
                worker_count: 2,
                ..PoolConfig::default()
            },
        );
        let (job, created) = queue.submit(&content.id, JobKind::Process).await.unwrap();
        assert!(created);

        let job = wait_terminal(&queue, &job.id).await;
        assert_eq!(job.status, JobStatus::Done);
        let processed = store.processed(&content.id).await.unwrap().unwrap();
        assert_eq!(processed.chunks.len(), 1);

        pool.shutdown().await;
        assert!(matches!(
            queue.submit(&content.id, JobKind::Process).await,
            Err(WorkerError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_job_for_missing_content_completes() {
        let dir = TempDir::new().unwrap();
        let (_store, queue, pipeline) = setup(&dir);
        queue
            .db
            .with_conn(|conn| Ok(conn.execute_batch("PRAGMA foreign_keys=OFF;")?))
            .unwrap();
        let pool = WorkerPool::start(queue.clone(), pipeline, PoolConfig::default());

        let (job, _) = queue.submit("gone", JobKind::Process).await.unwrap();
        assert_eq!(wait_terminal(&queue, &job.id).await.status, JobStatus::Done);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_recover_requeues_running_jobs() {
        let dir = TempDir::new().unwrap();
        let (store, queue, _pipeline) = setup(&dir);
        let content = store.create(note()).await.unwrap();
        let (job, _) = queue.submit(&content.id, JobKind::Summarize).await.unwrap();
        let claimed = queue.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);

        assert_eq!(queue.recover().await.unwrap(), 1);
        let job = queue.job(&job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_with_content_writes_record_and_job() {
        let dir = TempDir::new().unwrap();
        let (store, queue, _pipeline) = setup(&dir);
        let content = note().into_content(Utc::now());

        let job = queue
            .submit_with_content(&content, JobKind::Process)
            .await
            .unwrap();
        assert_eq!(job.content_id, content.id);
        assert_eq!(store.get(&content.id).await.unwrap().title, "Cell Biology");
        assert_eq!(queue.jobs_for(&content.id).await.unwrap(), vec![job]);
    }

    #[tokio::test]
    async fn test_submit_with_content_after_shutdown_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (store, queue, pipeline) = setup(&dir);
        WorkerPool::start(queue.clone(), pipeline, PoolConfig::default())
            .shutdown()
            .await;

        let content = note().into_content(Utc::now());
        assert!(matches!(
            queue.submit_with_content(&content, JobKind::Process).await,
            Err(WorkerError::ShutDown)
        ));
        assert!(store.find(&content.id).await.unwrap().is_none());
    }
}
