use std::path::PathBuf;
use std::time::Duration;

/// Construction-time knobs for the job manager.
///
/// `state_file` is the JSON snapshot the registry is rewritten to on every
/// mutation; `None` disables persistence. A zero `ttl` disables the cleanup
/// loop entirely.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub state_file: Option<PathBuf>,
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            ttl: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}
