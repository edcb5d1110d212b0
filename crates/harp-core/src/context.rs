//! Job identity and cooperative cancellation.
//!
//! The hosting runtime owns the job queue. The core only sees the context it
//! is handed for each invocation: the job id and a cancellation token the
//! runtime may trip at any time.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating unique job IDs
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one invocation of the process operation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Creates a new process-unique job ID.
    pub fn new() -> Self {
        Self(JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Job({})", self.0)
    }
}

/// Lifecycle of a job as tracked by the hosting runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

impl JobState {
    /// No further transitions happen from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Succeeded | JobState::Failed
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Running => write!(f, "running"),
            JobState::Cancelled => write!(f, "cancelled"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Shared flag for cooperative cancellation.
///
/// Clones observe the same flag. Once cancelled, a token stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Execution context for one process invocation.
///
/// Cheap to clone (id + Arc). Cooperative processing functions receive it by
/// value and may poll [`JobContext::is_cancelled`] between work units.
#[derive(Clone, Debug)]
pub struct JobContext {
    job_id: JobId,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            cancel: CancellationToken::new(),
        }
    }

    /// Context for callers that run the process operation directly, outside
    /// any job queue.
    pub fn detached() -> Self {
        Self::new(JobId::new())
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
