//! Utility tasks used for demos and load generation.

use std::time::Duration;

use serde_json::{json, Value};

use crate::jobs::{JobHandle, TaskParams};

use super::parse_u64;

/// `sleep`: pause for `seconds`, reporting progress once per second.
pub async fn sleep(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let seconds = parse_u64(&params, "seconds", Some(1))?;
    for elapsed in 0..seconds {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.set_progress(((elapsed + 1) * 100 / seconds.max(1)) as u8).await;
    }
    handle.set_progress(100).await;
    Ok(json!({ "seconds": seconds }))
}

/// `simulate`: a labeled synthetic workload of `seconds` duration.
pub async fn simulate(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let seconds = parse_u64(&params, "seconds", Some(1))?;
    let label = params
        .get("label")
        .map(String::as_str)
        .unwrap_or("default")
        .to_string();

    for elapsed in 0..seconds {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.set_progress(((elapsed + 1) * 100 / seconds.max(1)) as u8).await;
    }

    handle.set_progress(100).await;
    Ok(json!({ "task": label, "duration": seconds, "status": "completed" }))
}
