use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ManagerConfig;
use crate::error::{JobqError, Result};
use crate::jobs::job::{Job, JobPriority, JobStatus};
use crate::jobs::persist;
use crate::jobs::registry::JobRegistry;
use crate::jobs::task::{JobHandle, TaskConfig, TaskFn};
use crate::worker::{PoolStats, WorkerPool};

struct TaskEntry {
    executor: TaskFn,
    config: TaskConfig,
    pool: Arc<WorkerPool>,
}

/// Owner of the job registry and the per-task worker pools.
///
/// Every mutation of a job goes through this type under a single
/// reader/writer lock; the persistence file is rewritten inside the same
/// critical section, which serializes writes. Inspection takes the read
/// lock and returns snapshot copies.
pub struct JobManager {
    tasks: RwLock<HashMap<String, TaskEntry>>,
    registry: Arc<RwLock<JobRegistry>>,
    state_file: Option<PathBuf>,
    ttl: Duration,
    cleanup_interval: Duration,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

impl JobManager {
    /// Build the manager, load any persisted registry, and start the
    /// cleanup loop (unless the TTL is zero, which disables it).
    pub fn new(config: ManagerConfig) -> Arc<Self> {
        let jobs = config
            .state_file
            .as_deref()
            .map(persist::load)
            .unwrap_or_default();

        let manager = Arc::new(Self {
            tasks: RwLock::new(HashMap::new()),
            registry: Arc::new(RwLock::new(JobRegistry::from_jobs(jobs))),
            state_file: config.state_file,
            ttl: config.ttl,
            cleanup_interval: config.cleanup_interval,
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });

        if !manager.ttl.is_zero() {
            let cleaner = Arc::clone(&manager);
            let token = manager.shutdown.clone();
            tokio::spawn(async move {
                // interval() panics on zero.
                let every = if cleaner.cleanup_interval.is_zero() {
                    Duration::from_secs(60)
                } else {
                    cleaner.cleanup_interval
                };
                let mut interval = tokio::time::interval(every);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => cleaner.cleanup_once().await,
                    }
                }
            });
        }

        manager
    }

    /// Install a task and start its pool. `workers` and `queue_depth` are
    /// clamped to at least 1; a zero `timeout` means the 60 s default.
    /// The first registration of a name wins; duplicates are rejected.
    pub async fn register(
        self: &Arc<Self>,
        name: &str,
        executor: TaskFn,
        workers: usize,
        queue_depth: usize,
        timeout: Duration,
    ) {
        let config = TaskConfig::new(workers, queue_depth, timeout);

        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(name) {
            tracing::warn!(task = %name, "task already registered, ignoring duplicate");
            return;
        }

        let pool = WorkerPool::start(
            name,
            config.workers,
            config.queue_depth,
            Arc::clone(self),
            self.shutdown.child_token(),
        );
        tasks.insert(
            name.to_string(),
            TaskEntry {
                executor,
                config,
                pool,
            },
        );
    }

    /// Admission point. Builds the job, pushes it non-blockingly onto the
    /// task's queue, and only then inserts it into the registry: a full
    /// queue fails fast with backpressure and leaves no trace.
    pub async fn submit(
        &self,
        task: &str,
        params: &[(String, String)],
        priority: JobPriority,
    ) -> Result<(String, JobStatus)> {
        let sender = {
            let tasks = self.tasks.read().await;
            let entry = tasks
                .get(task)
                .ok_or_else(|| JobqError::TaskNotFound(task.to_string()))?;
            entry.pool.sender()
        };

        // Repeated parameter names collapse to the first value.
        let mut flat: HashMap<String, String> = HashMap::new();
        for (key, value) in params {
            flat.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let job = Job::new(task, flat, priority);

        // The write lock is held across the enqueue so a worker that
        // dequeues the id immediately blocks in mark_running until the
        // registry insert below is visible.
        let mut registry = self.registry.write().await;
        match sender.try_send(job.id.clone()) {
            Ok(()) => {}
            Err(async_channel::TrySendError::Full(_)) => {
                return Err(JobqError::Backpressure(task.to_string()));
            }
            Err(async_channel::TrySendError::Closed(_)) => {
                return Err(JobqError::Internal(format!("queue for task '{task}' is closed")));
            }
        }

        let id = job.id.clone();
        registry.insert(job);
        self.persist_locked(&registry);

        tracing::info!(job_id = %id, task = %task, priority = %priority, "job queued");
        Ok((id, JobStatus::Queued))
    }

    /// Worker-side transition from `queued` to `running`. Returns false if
    /// the job is gone or already terminal, in which case the worker skips
    /// execution.
    pub(crate) async fn mark_running(&self, job_id: &str) -> bool {
        self.registry.write().await.mark_running(job_id)
    }

    /// Timed execution of one job, invoked by a pool worker. No manager
    /// lock is held while the executor runs.
    ///
    /// The executor future is spawned as a detached task and raced against
    /// the task's timeout. On timeout the job is finished with an error and
    /// the executor keeps running; whatever it later produces is discarded
    /// by the absorbing-terminal transition rules. A panicking executor is
    /// caught through the join error and recorded as a job error.
    pub(crate) async fn run_job(&self, job_id: &str) {
        let (task_name, params) = {
            let registry = self.registry.read().await;
            match registry.get(job_id) {
                Some(job) => (job.task.clone(), job.params.clone()),
                None => {
                    tracing::warn!(job_id = %job_id, "job vanished before execution");
                    return;
                }
            }
        };

        let entry = {
            let tasks = self.tasks.read().await;
            tasks
                .get(&task_name)
                .map(|e| (Arc::clone(&e.executor), e.config.timeout))
        };
        let Some((executor, timeout)) = entry else {
            self.finish_with_error(job_id, format!("unknown task '{task_name}'"))
                .await;
            return;
        };

        let handle = JobHandle::new(job_id, Arc::clone(&self.registry));
        let work = tokio::spawn(executor(params, handle));

        match tokio::time::timeout(timeout, work).await {
            Ok(Ok(Ok(result))) => self.finish_with_result(job_id, result).await,
            Ok(Ok(Err(err))) => self.finish_with_error(job_id, err.to_string()).await,
            Ok(Err(join_err)) => {
                let message = match join_err.try_into_panic() {
                    Ok(payload) => format!(
                        "panic in task '{}': {}",
                        task_name,
                        panic_message(payload.as_ref())
                    ),
                    Err(err) => format!("task '{}' aborted: {}", task_name, err),
                };
                self.finish_with_error(job_id, message).await;
            }
            Err(_) => {
                self.finish_with_error(job_id, format!("timeout ({timeout:?})"))
                    .await;
            }
        }
    }

    async fn finish_with_result(&self, job_id: &str, result: Value) {
        let mut registry = self.registry.write().await;
        if registry.finish_with_result(job_id, result) {
            self.persist_locked(&registry);
            tracing::info!(job_id = %job_id, "job done");
        } else {
            tracing::debug!(job_id = %job_id, "late result discarded, job already terminal");
        }
    }

    async fn finish_with_error(&self, job_id: &str, message: String) {
        let mut registry = self.registry.write().await;
        if registry.finish_with_error(job_id, &message) {
            self.persist_locked(&registry);
            tracing::info!(job_id = %job_id, error = %message, "job failed");
        } else {
            tracing::debug!(job_id = %job_id, "late error discarded, job already terminal");
        }
    }

    /// Snapshot copy of one job; callers cannot mutate registry state
    /// through it.
    pub async fn get_status(&self, job_id: &str) -> Result<Job> {
        let registry = self.registry.read().await;
        registry
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobqError::JobNotFound(job_id.to_string()))
    }

    /// Semantic alias for [`get_status`](Self::get_status); callers
    /// discriminate on the returned `status`.
    pub async fn get_result(&self, job_id: &str) -> Result<Job> {
        self.get_status(job_id).await
    }

    /// Logical cancel: marks the job terminal but never interrupts an
    /// executor already running it. A later result from such an executor
    /// is discarded.
    pub async fn cancel(&self, job_id: &str) -> Result<JobStatus> {
        let mut registry = self.registry.write().await;
        match registry.get(job_id) {
            None => return Err(JobqError::JobNotFound(job_id.to_string())),
            Some(job) if job.status.is_terminal() => {
                return Err(JobqError::NotCancelable(job_id.to_string()));
            }
            Some(_) => {}
        }
        registry.cancel(job_id);
        self.persist_locked(&registry);
        tracing::info!(job_id = %job_id, "job canceled");
        Ok(JobStatus::Canceled)
    }

    pub async fn worker_stats(&self) -> HashMap<String, PoolStats> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .map(|(name, entry)| (name.clone(), entry.pool.stats()))
            .collect()
    }

    pub async fn queue_sizes(&self) -> HashMap<String, usize> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .map(|(name, entry)| (name.clone(), entry.pool.queued()))
            .collect()
    }

    pub async fn jobs_snapshot(&self) -> HashMap<String, Job> {
        self.registry.read().await.snapshot()
    }

    pub async fn registered_tasks(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort();
        names
    }

    /// One TTL sweep: evict stale terminal jobs, fail stuck running jobs.
    /// A zero TTL disables cleanup entirely.
    pub async fn cleanup_once(&self) {
        if self.ttl.is_zero() {
            return;
        }
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return;
        };
        let cutoff = chrono::Utc::now() - ttl;

        let mut registry = self.registry.write().await;
        let (evicted, hung) = registry.sweep_expired(cutoff);
        if evicted + hung > 0 {
            self.persist_locked(&registry);
            tracing::info!(evicted, hung, remaining = registry.len(), "cleanup pass");
        }
    }

    /// Stop the cleanup loop and every pool, blocking until all workers
    /// have exited. Idempotent. Queued jobs are left as-is on disk.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();

        let pools: Vec<Arc<WorkerPool>> = {
            let tasks = self.tasks.read().await;
            tasks.values().map(|entry| Arc::clone(&entry.pool)).collect()
        };
        for pool in pools {
            pool.stop().await;
        }
        tracing::info!("job manager closed");
    }

    /// Must be called with the registry write lock held: the file write is
    /// part of the mutation's critical section.
    fn persist_locked(&self, registry: &JobRegistry) {
        if let Some(path) = &self.state_file {
            persist::store(path, registry.jobs());
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
