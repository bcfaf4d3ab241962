//! Interval Scheduler
//!
//! A single timer thread tracks the next firing of every job and hands each
//! due callback to a fresh worker thread, so slow jobs never delay the timer
//! and overlapping runs of the same job execute side by side.

use chrono::{DateTime, TimeDelta, Utc};
use crossbeam::channel::{self, select, Receiver, Sender};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::interval::parse_interval;
use super::job::{JobDetails, JobFn, JobId};
use super::ScheduleError;

/// Recurring job registry with a start/stop lifecycle
pub trait Scheduler: Send + Sync {
    /// Register `job` to run every `interval` (e.g. `"1h30m"`)
    fn schedule_interval_job(&self, interval: &str, job: JobFn) -> Result<JobId, ScheduleError>;

    /// Cancel a job; a firing already in progress runs to completion
    fn remove_job(&self, job_id: &JobId) -> Result<(), ScheduleError>;

    /// Start firing jobs; no-op when already running
    fn start(&self) -> Result<(), ScheduleError>;

    /// Stop firing jobs, keeping them registered; no-op when stopped
    fn stop(&self) -> Result<(), ScheduleError>;

    fn list_jobs(&self) -> Result<Vec<JobDetails>, ScheduleError>;
}

struct ScheduledJob {
    interval: TimeDelta,
    task: JobFn,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
}

/// Job table shared between callers and the timer thread
#[derive(Default)]
struct JobTable {
    jobs: Mutex<HashMap<JobId, ScheduledJob>>,
}

impl JobTable {
    fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.jobs.lock().values().filter_map(|job| job.next_run).min()
    }

    fn plan_all(&self, now: DateTime<Utc>) {
        for job in self.jobs.lock().values_mut() {
            job.next_run = now.checked_add_signed(job.interval);
        }
    }

    fn clear_plans(&self) {
        for job in self.jobs.lock().values_mut() {
            job.next_run = None;
        }
    }

    /// Mark due jobs as fired and return their callbacks
    fn take_due(&self, now: DateTime<Utc>) -> Vec<(JobId, JobFn)> {
        let mut jobs = self.jobs.lock();
        jobs.iter_mut()
            .filter(|(_, job)| job.next_run.is_some_and(|at| at <= now))
            .map(|(id, job)| {
                job.last_run = Some(now);
                job.next_run = now.checked_add_signed(job.interval);
                (id.clone(), job.task.clone())
            })
            .collect()
    }
}

enum Control {
    /// Job table changed, recompute the next wakeup
    Reschedule,
}

struct Runner {
    control: Sender<Control>,
    handle: JoinHandle<()>,
}

/// In-process [`Scheduler`] implementation
///
/// One instance is meant to be shared by everything that schedules work,
/// typically behind an `Arc` owned by the server.
pub struct IntervalScheduler {
    table: Arc<JobTable>,
    next_id: AtomicU64,
    runner: Mutex<Option<Runner>>,
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self {
            table: Arc::new(JobTable::default()),
            next_id: AtomicU64::new(1),
            runner: Mutex::new(None),
        }
    }

    /// Whether the timer thread is currently running
    pub fn is_running(&self) -> bool {
        self.runner.lock().is_some()
    }

    fn timer_loop(table: Arc<JobTable>, control: Receiver<Control>) {
        loop {
            let timer = match table.next_wakeup() {
                Some(at) => {
                    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    channel::after(wait)
                }
                None => channel::never(),
            };

            // A disconnected control channel means stop was requested
            let keep_running = select! {
                recv(control) -> msg => msg.is_ok(),
                recv(timer) -> _ => {
                    for (id, task) in table.take_due(Utc::now()) {
                        let spawned = thread::Builder::new()
                            .name(format!("job-{}", id))
                            .spawn(move || task());
                        if let Err(e) = spawned {
                            error!(job_id = %id, "Failed to spawn job thread: {}", e);
                        }
                    }
                    true
                }
            };

            if !keep_running {
                break;
            }
        }
    }
}

impl Scheduler for IntervalScheduler {
    fn schedule_interval_job(&self, interval: &str, job: JobFn) -> Result<JobId, ScheduleError> {
        let period = parse_interval(interval)?;
        let period = TimeDelta::from_std(period)
            .map_err(|e| ScheduleError::ScheduleFailed(format!("{}: {}", interval, e)))?;

        let now = Utc::now();
        if now.checked_add_signed(period).is_none() {
            return Err(ScheduleError::ScheduleFailed(format!(
                "interval {:?} is out of range",
                interval
            )));
        }

        let runner = self.runner.lock();
        let job_id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let scheduled = ScheduledJob {
            interval: period,
            task: job,
            next_run: runner.as_ref().and_then(|_| now.checked_add_signed(period)),
            last_run: None,
        };
        self.table.jobs.lock().insert(job_id.clone(), scheduled);

        if let Some(runner) = runner.as_ref() {
            let _ = runner.control.send(Control::Reschedule);
        }

        debug!(job_id = %job_id, interval = interval, "Job scheduled");
        Ok(job_id)
    }

    fn remove_job(&self, job_id: &JobId) -> Result<(), ScheduleError> {
        match self.table.jobs.lock().remove(job_id) {
            Some(_) => {
                debug!(job_id = %job_id, "Job removed");
                Ok(())
            }
            None => Err(ScheduleError::JobNotFound(job_id.clone())),
        }
    }

    fn start(&self) -> Result<(), ScheduleError> {
        let mut runner = self.runner.lock();
        if runner.is_some() {
            return Ok(());
        }

        self.table.plan_all(Utc::now());

        let (tx, rx) = channel::unbounded();
        let table = self.table.clone();
        let handle = thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || Self::timer_loop(table, rx))
            .map_err(|e| {
                self.table.clear_plans();
                ScheduleError::StartFailed(e)
            })?;

        *runner = Some(Runner {
            control: tx,
            handle,
        });
        debug!("Scheduler started");
        Ok(())
    }

    fn stop(&self) -> Result<(), ScheduleError> {
        let mut runner = self.runner.lock();
        let Some(Runner { control, handle }) = runner.take() else {
            return Ok(());
        };

        drop(control);
        if handle.join().is_err() {
            warn!("Scheduler thread panicked");
        }

        self.table.clear_plans();
        debug!("Scheduler stopped");
        Ok(())
    }

    fn list_jobs(&self) -> Result<Vec<JobDetails>, ScheduleError> {
        let jobs = self.table.jobs.lock();
        Ok(jobs
            .iter()
            .map(|(id, job)| JobDetails {
                job_id: id.clone(),
                next_run: job.next_run,
                last_run: job.last_run,
            })
            .collect())
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
