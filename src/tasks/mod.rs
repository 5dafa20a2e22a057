//! Built-in task catalogue.
//!
//! Each task is an ordinary executor obeying the `(params, handle)`
//! calling convention; parsing and validation of the stringly-typed
//! parameters happens here, inside the executor, never in the manager.

pub mod cpu;
pub mod io;
pub mod util;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::jobs::{task_fn, JobManager, TaskParams};

pub(crate) fn require<'a>(params: &'a TaskParams, key: &str) -> anyhow::Result<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .with_context(|| format!("missing parameter '{key}'"))
}

pub(crate) fn parse_u64(params: &TaskParams, key: &str, default: Option<u64>) -> anyhow::Result<u64> {
    match params.get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("parameter '{key}' must be a non-negative integer")),
        None => default.with_context(|| format!("missing parameter '{key}'")),
    }
}

pub(crate) fn parse_i64(params: &TaskParams, key: &str, default: i64) -> anyhow::Result<i64> {
    match params.get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("parameter '{key}' must be an integer")),
        None => Ok(default),
    }
}

/// Register every built-in task with its pool sizing and timeout.
pub async fn register_builtins(manager: &Arc<JobManager>) {
    manager
        .register("isprime", task_fn(cpu::isprime), 4, 16, Duration::from_secs(30))
        .await;
    manager
        .register("factor", task_fn(cpu::factor), 4, 16, Duration::from_secs(30))
        .await;
    manager
        .register("fibonacci", task_fn(cpu::fibonacci), 2, 8, Duration::from_secs(10))
        .await;
    manager
        .register("random", task_fn(cpu::random), 2, 8, Duration::from_secs(10))
        .await;
    manager
        .register("wordcount", task_fn(io::wordcount), 2, 8, Duration::from_secs(60))
        .await;
    manager
        .register("grep", task_fn(io::grep), 2, 8, Duration::from_secs(60))
        .await;
    manager
        .register("hashfile", task_fn(io::hashfile), 2, 8, Duration::from_secs(60))
        .await;
    manager
        .register("compress", task_fn(io::compress), 2, 4, Duration::from_secs(120))
        .await;
    manager
        .register("sortfile", task_fn(io::sortfile), 2, 4, Duration::from_secs(120))
        .await;
    manager
        .register("sleep", task_fn(util::sleep), 4, 16, Duration::from_secs(300))
        .await;
    manager
        .register("simulate", task_fn(util::simulate), 4, 16, Duration::from_secs(300))
        .await;
}
