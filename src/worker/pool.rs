use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_channel as chan;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::jobs::JobManager;

/// The fixed set of workers dedicated to one task.
///
/// Each worker drains the task's bounded queue of job ids, asks the
/// manager to lift the job to `running`, and hands it to
/// [`JobManager::run_job`] for the timed execution. Workers exit when the
/// stop token fires (even with jobs still queued) or when the queue is
/// closed and drained.
pub struct WorkerPool {
    name: String,
    workers: usize,
    capacity: usize,
    queue_tx: chan::Sender<String>,
    queue_rx: chan::Receiver<String>,
    active: Arc<AtomicUsize>,
    total_jobs: Arc<AtomicU64>,
    total_nanos: Arc<AtomicU64>,
    stop: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Point-in-time counters for one pool, surfaced under `/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub active: usize,
    pub queued: usize,
    pub capacity: usize,
    pub avg_ms: f64,
}

impl WorkerPool {
    pub(crate) fn start(
        name: &str,
        workers: usize,
        queue_depth: usize,
        manager: Arc<JobManager>,
        stop: CancellationToken,
    ) -> Arc<Self> {
        let (queue_tx, queue_rx) = chan::bounded(queue_depth);
        let active = Arc::new(AtomicUsize::new(0));
        let total_jobs = Arc::new(AtomicU64::new(0));
        let total_nanos = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            handles.push(tokio::spawn(worker_loop(
                name.to_string(),
                worker_id,
                Arc::clone(&manager),
                queue_rx.clone(),
                stop.clone(),
                Arc::clone(&active),
                Arc::clone(&total_jobs),
                Arc::clone(&total_nanos),
            )));
        }

        tracing::info!(task = %name, workers, queue_depth, "worker pool started");

        Arc::new(Self {
            name: name.to_string(),
            workers,
            capacity: queue_depth,
            queue_tx,
            queue_rx,
            active,
            total_jobs,
            total_nanos,
            stop,
            handles: Mutex::new(handles),
        })
    }

    pub(crate) fn sender(&self) -> chan::Sender<String> {
        self.queue_tx.clone()
    }

    /// Jobs currently sitting in the queue.
    pub fn queued(&self) -> usize {
        self.queue_rx.len()
    }

    pub fn stats(&self) -> PoolStats {
        let total_jobs = self.total_jobs.load(Ordering::Relaxed);
        let avg_ms = if total_jobs > 0 {
            self.total_nanos.load(Ordering::Relaxed) as f64 / total_jobs as f64 / 1e6
        } else {
            0.0
        };
        PoolStats {
            workers: self.workers,
            active: self.active.load(Ordering::Relaxed),
            queued: self.queue_rx.len(),
            capacity: self.capacity,
            avg_ms,
        }
    }

    /// Stop the pool and block until every worker has exited. Pending
    /// queued jobs are abandoned in their current state.
    pub(crate) async fn stop(&self) {
        self.queue_tx.close();
        self.stop.cancel();
        let handles: Vec<JoinHandle<()>> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!(task = %self.name, "worker pool stopped");
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    task: String,
    worker_id: usize,
    manager: Arc<JobManager>,
    queue: chan::Receiver<String>,
    stop: CancellationToken,
    active: Arc<AtomicUsize>,
    total_jobs: Arc<AtomicU64>,
    total_nanos: Arc<AtomicU64>,
) {
    loop {
        let job_id = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::debug!(task = %task, worker_id, "worker stopped");
                break;
            }
            next = queue.recv() => match next {
                Ok(job_id) => job_id,
                Err(_) => {
                    tracing::debug!(task = %task, worker_id, "queue closed, worker exiting");
                    break;
                }
            },
        };

        active.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        if manager.mark_running(&job_id).await {
            tracing::debug!(task = %task, worker_id, job_id = %job_id, "worker picked up job");
            manager.run_job(&job_id).await;
        } else {
            // Canceled (or evicted) before pickup; nothing to run.
            tracing::debug!(task = %task, worker_id, job_id = %job_id, "job no longer runnable, skipping");
        }

        active.fetch_sub(1, Ordering::Relaxed);
        total_jobs.fetch_add(1, Ordering::Relaxed);
        total_nanos.fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }
}
