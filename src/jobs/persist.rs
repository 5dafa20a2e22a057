use std::collections::HashMap;
use std::path::Path;

use crate::jobs::job::Job;

/// Load the persisted registry. A missing, empty, or unparseable file
/// yields an empty map: crash-safety for job metadata is best-effort and
/// the in-memory state is authoritative.
pub(crate) fn load(path: &Path) -> HashMap<String, Job> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "failed to read state file");
            }
            return HashMap::new();
        }
    };
    if data.is_empty() {
        return HashMap::new();
    }

    match serde_json::from_slice::<HashMap<String, Job>>(&data) {
        Ok(jobs) => {
            tracing::info!(path = %path.display(), jobs = jobs.len(), "loaded persisted jobs");
            jobs
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "state file unparseable, starting empty");
            HashMap::new()
        }
    }
}

/// Rewrite the whole registry snapshot. Failures are logged, never
/// propagated: persistence is advisory.
pub(crate) fn store(path: &Path, jobs: &HashMap<String, Job>) {
    let data = match serde_json::to_vec_pretty(jobs) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize job registry");
            return;
        }
    };
    if let Err(err) = std::fs::write(path, data) {
        tracing::warn!(path = %path.display(), error = %err, "failed to write state file");
    }
}
