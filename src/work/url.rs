use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::runtime::Handle;

use super::function::{WorkFunction, WorkKind};
use super::item::WorkOutput;
use crate::error::WorkError;

/// HTTP GET of a URL, body decoded as text
///
/// One async client serves both entry points. The blocking path drives that
/// client on the runtime handle captured at construction, so OS worker
/// threads share the connection pool with cooperative tasks.
#[derive(Debug, Clone)]
pub struct UrlFetcher {
    client: reqwest::Client,
    handle: Handle,
    timeout: Duration,
}

impl UrlFetcher {
    /// Must be called from inside a tokio runtime
    pub fn new(timeout: Duration) -> Result<Self> {
        let handle = Handle::try_current().context("UrlFetcher must be created inside a tokio runtime")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("batchio/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            handle,
            timeout,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> WorkError {
        if err.is_timeout() {
            WorkError::Timeout { limit: self.timeout }
        } else {
            WorkError::from(err)
        }
    }
}

#[async_trait]
impl WorkFunction for UrlFetcher {
    fn name(&self) -> &'static str {
        "fetch_url"
    }

    async fn call(&self, identifier: &str) -> Result<WorkOutput, WorkError> {
        let response = self
            .client
            .get(identifier)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        if status >= 400 {
            return Err(WorkError::Http { status });
        }

        let size = body.len() as u64;
        Ok(WorkOutput::new(body, size).with_status(status))
    }

    fn call_blocking(&self, identifier: &str, timeout: Duration) -> Result<WorkOutput, WorkError> {
        if Handle::try_current().is_ok() {
            return Err(WorkError::Other(
                "blocking fetch invoked from inside the async runtime".to_string(),
            ));
        }

        // The timer must be created inside the runtime, not on this thread
        self.handle
            .block_on(async { tokio::time::timeout(timeout, self.call(identifier)).await })
            .unwrap_or(Err(WorkError::Timeout { limit: timeout }))
    }

    fn wire_kind(&self) -> Option<WorkKind> {
        Some(WorkKind::FetchUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Port 1 is never listening on a test machine, so the connect fails fast
    const REFUSED: &str = "http://127.0.0.1:1/";

    #[test]
    fn test_requires_runtime() {
        assert!(UrlFetcher::new(Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let fetcher = UrlFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.call(REFUSED).await.unwrap_err();
        assert!(matches!(err, WorkError::Network(_)), "got {err:?}");
        assert!(err.to_string().starts_with("Network Error"));
    }

    #[tokio::test]
    async fn test_blocking_call_rejected_on_runtime_thread() {
        let fetcher = UrlFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher
            .call_blocking(REFUSED, Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, WorkError::Other(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_call_from_plain_thread() {
        let fetcher = UrlFetcher::new(Duration::from_secs(2)).unwrap();
        let result = std::thread::spawn(move || {
            fetcher.call_blocking(REFUSED, Duration::from_secs(2))
        })
        .join()
        .unwrap();
        assert!(matches!(result, Err(WorkError::Network(_))));
    }
}
