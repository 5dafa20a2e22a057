//! Persistence: registry snapshots survive restarts, and broken state
//! files degrade to an empty registry instead of aborting.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;

use jobq_lite::config::ManagerConfig;
use jobq_lite::jobs::{task_fn, Job, JobPriority, JobStatus, JobManager, TaskFn};

fn mock_task() -> TaskFn {
    task_fn(|params, handle| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.set_progress(100).await;
        let n = params.get("n").cloned().unwrap_or_default();
        Ok(json!({ "n": n }))
    })
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_registry_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("jobs.json");

    let manager = JobManager::new(ManagerConfig::new().with_state_file(&state_file));
    manager
        .register("mock", mock_task(), 1, 2, Duration::from_secs(1))
        .await;
    let (id, _) = manager
        .submit("mock", &params(&[("n", "42")]), JobPriority::Normal)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let before = manager.jobs_snapshot().await;
    assert_eq!(before[&id].status, JobStatus::Done);
    manager.close().await;

    // Reconstruct against the same file; no task registration needed to
    // inspect history.
    let reloaded = JobManager::new(ManagerConfig::new().with_state_file(&state_file));
    let after = reloaded.jobs_snapshot().await;
    assert_eq!(after, before, "reloaded registry must equal the persisted one");

    let job = reloaded.get_status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.result, Some(json!({ "n": "42" })));
    reloaded.close().await;
}

#[tokio::test]
async fn test_missing_state_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let manager =
        JobManager::new(ManagerConfig::new().with_state_file(dir.path().join("absent.json")));
    assert!(manager.jobs_snapshot().await.is_empty());
    manager.close().await;
}

#[tokio::test]
async fn test_empty_state_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("jobs.json");
    std::fs::write(&state_file, "").unwrap();

    let manager = JobManager::new(ManagerConfig::new().with_state_file(&state_file));
    assert!(manager.jobs_snapshot().await.is_empty());
    manager.close().await;
}

#[tokio::test]
async fn test_unparseable_state_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("jobs.json");
    std::fs::write(&state_file, "this is {{{ not json").unwrap();

    let manager = JobManager::new(ManagerConfig::new().with_state_file(&state_file));
    assert!(manager.jobs_snapshot().await.is_empty());
    manager.close().await;
}

#[tokio::test]
async fn test_state_file_written_on_every_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("jobs.json");

    let manager = JobManager::new(ManagerConfig::new().with_state_file(&state_file));
    manager
        .register("mock", mock_task(), 1, 2, Duration::from_secs(1))
        .await;
    let (id, _) = manager
        .submit("mock", &params(&[("n", "5")]), JobPriority::Normal)
        .await
        .unwrap();

    // The create is on disk before the job ever runs.
    let on_disk: HashMap<String, Job> =
        serde_json::from_slice(&std::fs::read(&state_file).unwrap()).unwrap();
    assert!(on_disk.contains_key(&id), "submit must persist the new job");

    tokio::time::sleep(Duration::from_millis(150)).await;

    // The terminal transition is on disk too, and round-trips cleanly.
    let on_disk: HashMap<String, Job> =
        serde_json::from_slice(&std::fs::read(&state_file).unwrap()).unwrap();
    assert_eq!(on_disk[&id].status, JobStatus::Done);
    assert_eq!(on_disk, manager.jobs_snapshot().await);

    manager.close().await;
}

#[tokio::test]
async fn test_cancel_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("jobs.json");

    let manager = JobManager::new(ManagerConfig::new().with_state_file(&state_file));
    // Single worker busy with a long job so the second stays queued.
    let slow = task_fn(|_params, _handle| async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok(serde_json::Value::Null)
    });
    manager
        .register("slow", slow, 1, 2, Duration::from_secs(2))
        .await;

    manager.submit("slow", &params(&[]), JobPriority::Normal).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (queued_id, _) = manager
        .submit("slow", &params(&[]), JobPriority::Normal)
        .await
        .unwrap();
    manager.cancel(&queued_id).await.unwrap();

    let on_disk: HashMap<String, Job> =
        serde_json::from_slice(&std::fs::read(&state_file).unwrap()).unwrap();
    assert_eq!(on_disk[&queued_id].status, JobStatus::Canceled);

    manager.close().await;
}
