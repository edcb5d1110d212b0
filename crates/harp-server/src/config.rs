//! Runtime configuration.

use crate::error::{Result, ServerError};
use crate::queue::DEFAULT_RETAINED_JOBS;
use std::path::PathBuf;

pub const ENV_SOCKET: &str = "HARP_SOCKET";
pub const ENV_OUTPUT_DIR: &str = "HARP_OUTPUT_DIR";
pub const ENV_WORKERS: &str = "HARP_WORKERS";
pub const ENV_QUEUE_CAPACITY: &str = "HARP_QUEUE_CAPACITY";
pub const ENV_RETAINED_JOBS: &str = "HARP_RETAINED_JOBS";

/// Endpoint server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Unix socket the host connects to
    pub socket_path: PathBuf,
    /// Where processed audio is written; `None` uses the process default
    pub output_dir: Option<PathBuf>,
    /// Worker threads running the process operation
    pub workers: usize,
    /// Maximum number of queued (not yet running) jobs
    pub queue_capacity: usize,
    /// Finished job records kept for status queries
    pub retained_jobs: usize,
    /// Largest accepted wire frame in bytes
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: std::env::temp_dir().join("harp-endpoint.sock"),
            output_dir: None,
            workers: 1,
            queue_capacity: 64,
            retained_jobs: DEFAULT_RETAINED_JOBS,
            max_frame_len: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `HARP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (keyed by the `ENV_*` names).
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(socket) = lookup(ENV_SOCKET) {
            self.socket_path = PathBuf::from(socket);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = parse_count(ENV_WORKERS, &workers)?;
        }
        if let Some(capacity) = lookup(ENV_QUEUE_CAPACITY) {
            self.queue_capacity = parse_count(ENV_QUEUE_CAPACITY, &capacity)?;
        }
        if let Some(retained) = lookup(ENV_RETAINED_JOBS) {
            self.retained_jobs = parse_count(ENV_RETAINED_JOBS, &retained)?;
        }
        Ok(self)
    }

    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn retained_jobs(mut self, count: usize) -> Self {
        self.retained_jobs = count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ServerError::Config("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ServerError::Config("queue capacity must be at least 1".into()));
        }
        if self.retained_jobs == 0 {
            return Err(ServerError::Config("retained jobs must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ServerError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}
