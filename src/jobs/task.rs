use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::jobs::registry::JobRegistry;

/// Flattened request parameters handed to an executor.
pub type TaskParams = HashMap<String, String>;

/// Executor calling convention: `(params, handle) -> result`.
///
/// Executors are opaque user functions. They receive a [`JobHandle`] for
/// progress reporting, must be safe to run concurrently with themselves up
/// to the pool's worker count, and get no cancellation signal: a job that
/// times out or is canceled keeps running to completion and its output is
/// discarded by the manager.
pub type TaskFn = Arc<dyn Fn(TaskParams, JobHandle) -> TaskFuture + Send + Sync>;

pub type TaskFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Wrap a plain async fn (or closure) into a [`TaskFn`].
pub fn task_fn<F, Fut>(f: F) -> TaskFn
where
    F: Fn(TaskParams, JobHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |params, handle| -> TaskFuture { Box::pin(f(params, handle)) })
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-task registration parameters. Immutable after registration.
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    pub workers: usize,
    pub queue_depth: usize,
    pub timeout: Duration,
}

impl TaskConfig {
    /// `workers` and `queue_depth` are clamped to at least 1; a zero
    /// `timeout` means the 60 s default.
    pub fn new(workers: usize, queue_depth: usize, timeout: Duration) -> Self {
        Self {
            workers: workers.max(1),
            queue_depth: queue_depth.max(1),
            timeout: if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout },
        }
    }
}

/// Write-through handle an executor uses to publish progress.
///
/// Updates go through the manager's registry lock, so they obey the same
/// rules as every other mutation: clamped to 0..=100 and dropped once the
/// job is terminal.
#[derive(Clone)]
pub struct JobHandle {
    job_id: String,
    registry: Arc<RwLock<JobRegistry>>,
}

impl JobHandle {
    pub(crate) fn new(job_id: impl Into<String>, registry: Arc<RwLock<JobRegistry>>) -> Self {
        Self {
            job_id: job_id.into(),
            registry,
        }
    }

    /// A handle not attached to any registry; progress updates are dropped.
    /// Useful for exercising executors directly.
    pub fn detached(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            registry: Arc::new(RwLock::new(JobRegistry::new())),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub async fn set_progress(&self, progress: u8) {
        self.registry.write().await.set_progress(&self.job_id, progress);
    }
}
