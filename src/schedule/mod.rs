//! Job Scheduling
//!
//! Named interval jobs driven by a background timer thread.

mod error;
mod interval;
mod job;
mod scheduler;

pub use error::ScheduleError;
pub use interval::{parse_interval, validate_interval};
pub use job::{JobDetails, JobFn, JobId};
pub use scheduler::{IntervalScheduler, Scheduler};
