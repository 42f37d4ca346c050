use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::WorkError;

/// Marker appended to a preview that was cut short
pub const TRUNCATION_MARKER: &str = "...";

/// One unit of work: an identifier and its position in the submitted batch
///
/// The work function itself is shared by the whole batch and lives on the
/// dispatcher, not on each item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub index: usize,
    pub identifier: String,
}

impl WorkItem {
    pub fn new(index: usize, identifier: impl Into<String>) -> Self {
        Self {
            index,
            identifier: identifier.into(),
        }
    }

    /// Build an indexed batch from identifiers, preserving their order
    pub fn batch<I, S>(identifiers: I) -> Vec<WorkItem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        identifiers
            .into_iter()
            .enumerate()
            .map(|(index, id)| WorkItem::new(index, id))
            .collect()
    }
}

/// Which execution context produced a result
///
/// Diagnostic only. A result is owned by the aggregator regardless of who
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorTag {
    Cooperative { task: usize },
    Thread { worker: usize },
    Process { pid: u32, worker: usize },
}

impl ExecutorTag {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutorTag::Cooperative { .. } => "cooperative",
            ExecutorTag::Thread { .. } => "thread",
            ExecutorTag::Process { .. } => "process",
        }
    }
}

impl fmt::Display for ExecutorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorTag::Cooperative { task } => write!(f, "ASYNC-{task}"),
            ExecutorTag::Thread { worker } => write!(f, "THREAD-{worker}"),
            ExecutorTag::Process { pid, .. } => write!(f, "PID-{pid}"),
        }
    }
}

/// Outcome of one work item
///
/// Constructed once, when the item finishes, through [`WorkResult::success`]
/// or [`WorkResult::failure`]. A failed result always has an empty preview
/// and a zero size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkResult {
    pub identifier: String,
    pub payload_preview: String,
    pub size: u64,
    /// Seconds from admission to completion
    pub elapsed: f64,
    pub executor: ExecutorTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkResult {
    pub fn success(
        identifier: impl Into<String>,
        output: WorkOutput,
        elapsed: Duration,
        executor: ExecutorTag,
        truncate_length: usize,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            payload_preview: truncate_preview(&output.payload, truncate_length),
            size: output.size,
            elapsed: elapsed.as_secs_f64(),
            executor,
            status_code: output.status_code,
            error: None,
        }
    }

    pub fn failure(
        identifier: impl Into<String>,
        error: &WorkError,
        elapsed: Duration,
        executor: ExecutorTag,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            payload_preview: String::new(),
            size: 0,
            elapsed: elapsed.as_secs_f64(),
            executor,
            status_code: error.status_code(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// What a work function hands back on success
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkOutput {
    pub payload: String,
    pub size: u64,
    pub status_code: Option<u16>,
}

impl WorkOutput {
    pub fn new(payload: impl Into<String>, size: u64) -> Self {
        Self {
            payload: payload.into(),
            size,
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

/// Cut `payload` to `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was removed
pub fn truncate_preview(payload: &str, max_chars: usize) -> String {
    match payload.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => {
            let mut preview = String::with_capacity(byte_offset + TRUNCATION_MARKER.len());
            preview.push_str(&payload[..byte_offset]);
            preview.push_str(TRUNCATION_MARKER);
            preview
        }
        None => payload.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_at_boundary_is_untouched() {
        let payload = "a".repeat(1000);
        assert_eq!(truncate_preview(&payload, 1000), payload);
        assert_eq!(truncate_preview("", 1000), "");
    }

    #[test]
    fn test_preview_over_boundary_gets_marker() {
        let payload = "a".repeat(1001);
        let preview = truncate_preview(&payload, 1000);
        assert_eq!(preview.len(), 1003);
        assert!(preview.ends_with(TRUNCATION_MARKER));
        assert_eq!(&preview[..1000], &payload[..1000]);
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let payload = "é".repeat(5);
        assert_eq!(truncate_preview(&payload, 5), payload);
        assert_eq!(truncate_preview(&payload, 3), "ééé...");
    }

    #[test]
    fn test_failure_has_no_payload() {
        let err = WorkError::Http { status: 503 };
        let result = WorkResult::failure(
            "https://example.com",
            &err,
            Duration::from_millis(5),
            ExecutorTag::Thread { worker: 1 },
        );
        assert!(!result.is_success());
        assert_eq!(result.size, 0);
        assert!(result.payload_preview.is_empty());
        assert_eq!(result.status_code, Some(503));
        assert_eq!(result.error.as_deref(), Some("HTTP Error: 503"));
    }

    #[test]
    fn test_success_never_sets_error() {
        let result = WorkResult::success(
            "a.txt",
            WorkOutput::new("hello", 5),
            Duration::from_millis(1),
            ExecutorTag::Cooperative { task: 0 },
            1000,
        );
        assert!(result.is_success());
        assert_eq!(result.payload_preview, "hello");
        assert_eq!(result.size, 5);
    }

    #[test]
    fn test_batch_preserves_order() {
        let items = WorkItem::batch(["a", "b", "c"]);
        assert_eq!(items[2], WorkItem::new(2, "c"));
    }

    #[test]
    fn test_executor_tag_wire_shape() {
        let tag = ExecutorTag::Process { pid: 42, worker: 1 };
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#"{"kind":"process","pid":42,"worker":1}"#);
        assert_eq!(tag.to_string(), "PID-42");
    }
}
