use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::file::FileReader;
use super::item::WorkOutput;
use super::url::UrlFetcher;
use crate::error::WorkError;

/// The opaque operation run once per work item
///
/// Every strategy drives the same function; which entry point it uses
/// depends on the execution context:
///
/// - [`call`](WorkFunction::call) runs on the cooperative scheduler and must
///   only suspend at I/O boundaries.
/// - [`call_blocking`](WorkFunction::call_blocking) runs on a plain OS worker
///   thread, never inside the async runtime.
/// - [`wire_kind`](WorkFunction::wire_kind) names the function so a worker
///   process can rebuild it on its side of the process boundary.
#[async_trait]
pub trait WorkFunction: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn call(&self, identifier: &str) -> Result<WorkOutput, WorkError>;

    fn call_blocking(&self, identifier: &str, timeout: Duration) -> Result<WorkOutput, WorkError>;

    /// Expected payload size, used by size-based hybrid routing
    fn estimate_cost(&self, _identifier: &str) -> Option<u64> {
        None
    }

    fn wire_kind(&self) -> Option<WorkKind> {
        None
    }
}

/// Work functions that can be rebuilt by name inside a worker process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Read a local file
    ReadFile,
    /// HTTP GET a URL
    FetchUrl,
}

impl WorkKind {
    /// Construct the work function. `FetchUrl` must be built inside a tokio runtime.
    pub fn instantiate(self, timeout: Duration) -> anyhow::Result<Arc<dyn WorkFunction>> {
        Ok(match self {
            WorkKind::ReadFile => Arc::new(FileReader::new()),
            WorkKind::FetchUrl => Arc::new(UrlFetcher::new(timeout)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&WorkKind::ReadFile).unwrap(),
            "\"read_file\""
        );
        let kind: WorkKind = serde_json::from_str("\"fetch_url\"").unwrap();
        assert_eq!(kind, WorkKind::FetchUrl);
    }

    #[test]
    fn test_read_file_kind_round_trips_through_instantiate() {
        let function = WorkKind::ReadFile
            .instantiate(Duration::from_secs(10))
            .unwrap();
        assert_eq!(function.wire_kind(), Some(WorkKind::ReadFile));
    }
}
