use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::JobqError;
use crate::jobs::{JobManager, JobPriority};
use crate::server::request::Request;
use crate::worker::PoolStats;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct SubmitBody {
    job_id: String,
    status: String,
}

#[derive(Serialize)]
struct CancelBody {
    id: String,
    status: String,
}

#[derive(Serialize)]
struct MetricsBody {
    workers: HashMap<String, PoolStats>,
    queues: HashMap<String, usize>,
    jobs: usize,
}

#[derive(Serialize)]
struct HelpBody {
    routes: Vec<&'static str>,
    tasks: Vec<String>,
}

/// Dispatch one parsed request to the manager and produce `(status code,
/// JSON body)`. This layer holds no state of its own; it only translates.
pub async fn handle(req: &Request, manager: &Arc<JobManager>) -> (u16, String) {
    if req.method != "GET" {
        return error_response(400, "method not supported, use GET");
    }

    match req.path.as_str() {
        "/jobs/submit" => {
            let Some(task) = req.param("task") else {
                return error_response(400, "missing parameter 'task'");
            };
            let priority = JobPriority::parse(req.param("priority").unwrap_or(""));
            match manager.submit(task, &req.query, priority).await {
                Ok((job_id, status)) => json_response(
                    200,
                    &SubmitBody {
                        job_id,
                        status: status.to_string(),
                    },
                ),
                Err(err) => manager_error_response(&err),
            }
        }

        "/jobs/status" | "/jobs/result" => {
            let Some(id) = req.param("id") else {
                return error_response(400, "missing parameter 'id'");
            };
            match manager.get_status(id).await {
                Ok(job) => match serde_json::to_string(&job) {
                    Ok(body) => (200, body),
                    Err(err) => error_response(500, &err.to_string()),
                },
                Err(err) => manager_error_response(&err),
            }
        }

        "/jobs/cancel" => {
            let Some(id) = req.param("id") else {
                return error_response(400, "missing parameter 'id'");
            };
            match manager.cancel(id).await {
                Ok(status) => json_response(
                    200,
                    &CancelBody {
                        id: id.to_string(),
                        status: status.to_string(),
                    },
                ),
                Err(err) => manager_error_response(&err),
            }
        }

        "/metrics" => {
            let body = MetricsBody {
                workers: manager.worker_stats().await,
                queues: manager.queue_sizes().await,
                jobs: manager.jobs_snapshot().await.len(),
            };
            json_response(200, &body)
        }

        "/help" => {
            let body = HelpBody {
                routes: vec![
                    "/jobs/submit?task=<name>&<params>",
                    "/jobs/status?id=<job_id>",
                    "/jobs/result?id=<job_id>",
                    "/jobs/cancel?id=<job_id>",
                    "/metrics",
                    "/help",
                ],
                tasks: manager.registered_tasks().await,
            };
            json_response(200, &body)
        }

        _ => error_response(404, "route not found"),
    }
}

/// Manager errors map to status codes here and nowhere else. Executor
/// failures and timeouts never reach this path: they live inside the job
/// record and the caller still gets a 200.
fn status_for(err: &JobqError) -> u16 {
    match err {
        JobqError::TaskNotFound(_) => 400,
        JobqError::Backpressure(_) => 503,
        JobqError::JobNotFound(_) => 404,
        JobqError::NotCancelable(_) => 409,
        _ => 500,
    }
}

fn manager_error_response(err: &JobqError) -> (u16, String) {
    error_response(status_for(err), &err.to_string())
}

fn error_response(code: u16, message: &str) -> (u16, String) {
    json_response(
        code,
        &ErrorBody {
            error: message.to_string(),
        },
    )
}

fn json_response<T: Serialize>(code: u16, body: &T) -> (u16, String) {
    match serde_json::to_string(body) {
        Ok(json) => (code, json),
        Err(err) => (
            500,
            format!(r#"{{"error": "failed to encode response: {err}"}}"#),
        ),
    }
}
