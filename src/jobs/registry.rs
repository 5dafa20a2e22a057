use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::jobs::job::{Job, JobStatus};

/// The `id -> Job` map and every state transition over it.
///
/// All mutators refuse to touch a job that already reached a terminal
/// state, which is what makes `done`/`error`/`canceled` absorbing: a worker
/// finishing a job that was canceled (or timed out) in the meantime simply
/// has its result dropped here.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_jobs(jobs: HashMap<String, Job>) -> Self {
        Self { jobs }
    }

    pub fn insert(&mut self, job: Job) {
        self.jobs.insert(job.id.clone(), job);
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn jobs(&self) -> &HashMap<String, Job> {
        &self.jobs
    }

    /// Point-in-time copy of the whole registry, safe to hand to callers.
    pub fn snapshot(&self) -> HashMap<String, Job> {
        self.jobs.clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Lift a job from `queued` to `running`. Returns false if the job is
    /// missing or already terminal (a cancel that beat the worker wins).
    pub fn mark_running(&mut self, id: &str) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Running;
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub fn finish_with_result(&mut self, id: &str, result: Value) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Done;
                job.result = Some(result);
                job.error = None;
                job.progress = 100;
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub fn finish_with_error(&mut self, id: &str, message: impl Into<String>) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Error;
                job.error = Some(message.into());
                job.result = None;
                job.progress = 100;
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, id: &str) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Canceled;
                job.progress = 100;
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Progress updates from a running executor. Clamped to 100; a no-op
    /// once the job is terminal.
    pub fn set_progress(&mut self, id: &str, progress: u8) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.progress = progress.min(100);
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// TTL sweep: evict terminal jobs not updated since `cutoff` and fail
    /// running jobs stuck past it. Queued jobs are left alone (backpressure
    /// bounds them; queue-size metrics surface the rest).
    ///
    /// Returns `(evicted, hung)` counts.
    pub fn sweep_expired(&mut self, cutoff: DateTime<Utc>) -> (usize, usize) {
        let expired: Vec<String> = self
            .jobs
            .values()
            .filter(|j| j.status.is_terminal() && j.updated_at < cutoff)
            .map(|j| j.id.clone())
            .collect();
        for id in &expired {
            self.jobs.remove(id);
        }

        let mut hung = 0;
        for job in self.jobs.values_mut() {
            if job.status == JobStatus::Running && job.updated_at < cutoff {
                job.status = JobStatus::Error;
                job.error = Some("automatic cleanup: job hung (global timeout)".to_string());
                job.progress = 100;
                job.updated_at = Utc::now();
                hung += 1;
            }
        }

        (expired.len(), hung)
    }
}
