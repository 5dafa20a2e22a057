//! Worker pools: fixed sets of executors draining one bounded queue per
//! registered task.

pub mod pool;

pub use pool::{PoolStats, WorkerPool};
