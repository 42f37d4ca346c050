//! Error taxonomy for batch execution
//!
//! Two layers:
//!
//! - [`WorkError`] is a **per-item recoverable** failure. It never leaves the
//!   per-item boundary; the harness turns it into a [`WorkResult`] with a
//!   non-null error and the batch keeps going.
//! - [`BatchError`] is what the caller of a batch can actually see: invalid
//!   input, a crashed execution unit (missing results), or cancellation.
//!
//! [`WorkResult`]: crate::work::WorkResult

use std::time::Duration;
use thiserror::Error;

/// Failure of a single work item
#[derive(Debug, Error)]
pub enum WorkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP Error: {status}")]
    Http { status: u16 },

    #[error("Network Error: {0}")]
    Network(String),

    #[error("Timeout Error: exceeded {limit:?}")]
    Timeout { limit: Duration },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("work function panicked: {0}")]
    Panicked(String),

    #[error("Unexpected Error: {0}")]
    Other(String),
}

impl WorkError {
    /// HTTP status carried by the failure, if the remote answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WorkError::Http { status } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        WorkError::Panicked(message)
    }
}

impl From<reqwest::Error> for WorkError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts are mapped by the caller, which knows the configured limit
        if let Some(status) = err.status() {
            WorkError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() || err.is_body() {
            WorkError::Decode(err.to_string())
        } else {
            WorkError::Network(err.to_string())
        }
    }
}

/// Failure surfaced to the caller of a batch
#[derive(Debug, Error)]
pub enum BatchError {
    /// Configuration or source problem, reported before anything runs
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An execution unit died before yielding a result
    #[error("execution unit '{unit}' failed: {detail}")]
    WorkerCrashed { unit: String, detail: String },

    /// The log is shorter than the submitted batch
    #[error("batch incomplete: {recorded} of {expected} results recorded")]
    MissingResults { expected: usize, recorded: usize },

    /// The work function cannot be rebuilt on the far side of a process boundary
    #[error("work function '{function}' cannot be sent to worker processes")]
    NotTransferable { function: String },

    #[error("batch cancelled after {recorded} of {expected} results")]
    Cancelled { recorded: usize, expected: usize },
}

impl BatchError {
    pub(crate) fn crashed(unit: impl Into<String>, detail: impl ToString) -> Self {
        BatchError::WorkerCrashed {
            unit: unit.into(),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_keeps_status() {
        let err = WorkError::Http { status: 404 };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "HTTP Error: 404");
    }

    #[test]
    fn test_timeout_keeps_sub_second_limit() {
        let err = WorkError::Timeout {
            limit: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Timeout Error: exceeded 250ms");

        let err = WorkError::Timeout {
            limit: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "Timeout Error: exceeded 10s");
    }

    #[test]
    fn test_panic_payload_is_readable() {
        let err = WorkError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "work function panicked: boom");

        let err = WorkError::from_panic(Box::new(String::from("owned boom")));
        assert!(err.to_string().contains("owned boom"));
    }

    #[test]
    fn test_batch_error_messages() {
        let err = BatchError::MissingResults {
            expected: 3,
            recorded: 2,
        };
        assert_eq!(err.to_string(), "batch incomplete: 2 of 3 results recorded");
        assert!(
            BatchError::crashed("thread-pool", "join failed")
                .to_string()
                .contains("thread-pool")
        );
    }
}
