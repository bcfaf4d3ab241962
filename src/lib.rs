//! Memorabilia - In-Memory Key-Value Store
//!
//! Typed values with optional per-key expiration, lazy expiry on read and
//! an interval-scheduled sweep that removes expired keys.

pub mod client;
pub mod metrics;
pub mod protocol;
pub mod schedule;
pub mod server;
pub mod storage;
pub mod types;

pub use client::{Client, ClientError};
pub use metrics::Metrics;
pub use protocol::{Command, ErrorCode, Frame, MemoCodec, Response};
pub use schedule::{IntervalScheduler, JobDetails, JobId, ScheduleError, Scheduler};
pub use server::{Config, Server, ServerError};
pub use storage::{CommandRepository, InMemoryRepository, RepositoryError, TtlCleaner};
pub use types::{detect_type, CastError, Value, ValueKind};
