use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobqError {
    #[error("task not registered: {0}")]
    TaskNotFound(String),

    #[error("queue full for task '{0}': backpressure")]
    Backpressure(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job not cancelable: {0}")]
    NotCancelable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, JobqError>;
