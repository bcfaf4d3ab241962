//! Job Types

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Callback run on every firing of a job
pub type JobFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Opaque identifier handed out when a job is scheduled
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub(crate) fn new(seq: u64) -> Self {
        Self(seq.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Snapshot of a registered job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDetails {
    pub job_id: JobId,
    /// Next planned firing, `None` while the scheduler is stopped
    pub next_run: Option<DateTime<Utc>>,
    /// Most recent firing, `None` until the job has run once
    pub last_run: Option<DateTime<Utc>>,
}
