//! TTL Cleaner
//!
//! Scheduled job that periodically removes expired keys.

use std::sync::Arc;
use tracing::{debug, error, info};

use super::{CommandRepository, RepositoryError};
use crate::schedule::{JobFn, JobId, ScheduleError, Scheduler};

/// Active sweep over a repository
#[derive(Clone)]
pub struct TtlCleaner {
    repository: Arc<dyn CommandRepository>,
}

impl TtlCleaner {
    pub fn new(repository: Arc<dyn CommandRepository>) -> Self {
        Self { repository }
    }

    /// Run a single sweep, returning how many keys were removed
    pub fn run_once(&self) -> Result<u64, RepositoryError> {
        self.repository.cleanup()
    }

    /// Register the sweep with `scheduler` to run every `interval`
    pub fn schedule(self, scheduler: &dyn Scheduler, interval: &str) -> Result<JobId, ScheduleError> {
        let label = interval.to_string();
        let job: JobFn = Arc::new(move || {
            debug!(interval = %label, "Running TTL cleanup job");
            match self.run_once() {
                Ok(0) => {}
                Ok(deleted) => info!(deleted, "Cleaned up expired keys"),
                Err(e) => error!("TTL cleanup failed: {}", e),
            }
        });
        scheduler.schedule_interval_job(interval, job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::IntervalScheduler;
    use crate::storage::InMemoryRepository;
    use chrono::{Duration, Utc};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_run_once() {
        let repo = InMemoryRepository::new();
        repo.set("old", "1", Some(Utc::now() - Duration::seconds(1))).unwrap();
        repo.set("new", "2", None).unwrap();

        let cleaner = TtlCleaner::new(Arc::new(repo.clone()));
        assert_eq!(cleaner.run_once().unwrap(), 1);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        let scheduler = IntervalScheduler::new();
        let cleaner = TtlCleaner::new(Arc::new(InMemoryRepository::new()));

        let result = cleaner.schedule(&scheduler, "4");
        assert!(matches!(result, Err(ScheduleError::InvalidFormat(_))));
    }

    #[test]
    fn test_scheduled_sweep() {
        let repo = InMemoryRepository::new();
        let scheduler = IntervalScheduler::new();
        TtlCleaner::new(Arc::new(repo.clone()))
            .schedule(&scheduler, "1s")
            .unwrap();

        repo.set("gone", "v", Some(Utc::now() - Duration::seconds(1))).unwrap();
        repo.set("kept", "v", None).unwrap();

        scheduler.start().unwrap();
        let deadline = Instant::now() + std::time::Duration::from_secs(10);
        while repo.len() > 1 && Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(20));
        }
        scheduler.stop().unwrap();

        assert!(repo.get_expired_keys().unwrap().is_empty());
        assert_eq!(repo.get("kept").unwrap(), "v");
        assert_eq!(repo.len(), 1);
    }
}
