//! Worker pools: stats surfaces, FIFO dispatch, bounded concurrency.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;

use jobq_lite::config::ManagerConfig;
use jobq_lite::jobs::{task_fn, JobPriority, JobManager, TaskFn};

fn sleepy(ms: u64) -> TaskFn {
    task_fn(move |_params, _handle| async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({}))
    })
}

fn submit_params(i: usize) -> Vec<(String, String)> {
    vec![("i".to_string(), i.to_string())]
}

#[tokio::test]
async fn test_initial_pool_stats() {
    let manager = JobManager::new(ManagerConfig::new());
    manager
        .register("mock", sleepy(10), 2, 5, Duration::from_secs(1))
        .await;

    let stats = manager.worker_stats().await;
    let pool = stats.get("mock").expect("pool stats must exist after registration");
    assert_eq!(pool.workers, 2);
    assert_eq!(pool.active, 0);
    assert_eq!(pool.queued, 0);
    assert_eq!(pool.capacity, 5);
    assert_eq!(pool.avg_ms, 0.0, "no jobs processed yet");

    manager.close().await;
}

#[tokio::test]
async fn test_clamps_workers_and_depth_to_one() {
    let manager = JobManager::new(ManagerConfig::new());
    manager
        .register("tiny", sleepy(10), 0, 0, Duration::from_secs(1))
        .await;

    let stats = manager.worker_stats().await;
    let pool = &stats["tiny"];
    assert_eq!(pool.workers, 1);
    assert_eq!(pool.capacity, 1);

    manager.close().await;
}

#[tokio::test]
async fn test_fifo_dispatch_within_task() {
    let manager = JobManager::new(ManagerConfig::new());

    let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = {
        let order = Arc::clone(&order);
        task_fn(move |params, _handle| {
            let order = Arc::clone(&order);
            async move {
                let i = params.get("i").cloned().unwrap_or_default();
                order.lock().await.push(i);
                Ok(json!({}))
            }
        })
    };
    manager
        .register("record", recorder, 1, 8, Duration::from_secs(1))
        .await;

    for i in 0..5 {
        manager
            .submit("record", &submit_params(i), JobPriority::Normal)
            .await
            .expect("queue depth covers all submissions");
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    let seen = order.lock().await.clone();
    assert_eq!(
        seen,
        vec!["0", "1", "2", "3", "4"],
        "a single worker must drain the queue in submit order"
    );

    manager.close().await;
}

#[tokio::test]
async fn test_active_count_and_queue_depth() {
    let manager = JobManager::new(ManagerConfig::new());
    manager
        .register("slow", sleepy(300), 1, 4, Duration::from_secs(2))
        .await;

    for _ in 0..3 {
        manager.submit("slow", &[], JobPriority::Normal).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = manager.worker_stats().await;
    let pool = &stats["slow"];
    assert_eq!(pool.active, 1, "one worker, one running job");
    assert_eq!(pool.queued, 2, "the other two wait in the queue");

    let sizes = manager.queue_sizes().await;
    assert_eq!(sizes["slow"], 2);

    manager.close().await;
}

#[tokio::test]
async fn test_concurrency_bounded_by_worker_count() {
    let manager = JobManager::new(ManagerConfig::new());
    manager
        .register("slow", sleepy(300), 2, 8, Duration::from_secs(2))
        .await;

    for _ in 0..4 {
        manager.submit("slow", &[], JobPriority::Normal).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = manager.worker_stats().await;
    assert_eq!(stats["slow"].active, 2, "active workers never exceed the pool size");

    manager.close().await;
}

#[tokio::test]
async fn test_mean_service_time_tracked() {
    let manager = JobManager::new(ManagerConfig::new());
    manager
        .register("timed", sleepy(30), 1, 4, Duration::from_secs(1))
        .await;

    for _ in 0..2 {
        manager.submit("timed", &[], JobPriority::Normal).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(250)).await;

    let stats = manager.worker_stats().await;
    let avg = stats["timed"].avg_ms;
    assert!(avg > 0.0, "mean service time must be tracked, got {avg}");

    manager.close().await;
}
