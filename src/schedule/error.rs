//! Scheduler Errors

use thiserror::Error;

use super::job::JobId;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid interval {0:?}, must match (number)h(number)m(number)s pattern")]
    InvalidFormat(String),

    #[error("job id not found: {0}")]
    JobNotFound(JobId),

    #[error("failed to schedule job: {0}")]
    ScheduleFailed(String),

    #[error("failed to start scheduler: {0}")]
    StartFailed(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScheduleError::InvalidFormat("00h".to_string());
        assert!(err.to_string().contains("\"00h\""));

        let err = ScheduleError::JobNotFound(JobId::from("7"));
        assert_eq!(err.to_string(), "job id not found: 7");
    }
}
