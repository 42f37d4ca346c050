//! Configuration management for batchio
//!
//! Typed settings live here; [`core`] layers them from the embedded defaults,
//! config files, `BATCHIO_*` environment variables and CLI flags.

pub mod core;
pub mod overrides;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BatchError;
use crate::parallel::{ItemSettings, PartitionKind, PartitionRule, PoolSettings, Strategy};

pub use overrides::ConfigOverrides;

/// Main configuration structure for batchio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BatchConfig {
    pub dispatch: DispatchConfig,
    pub hybrid: HybridConfig,
    pub item: ItemConfig,
    pub discovery: DiscoveryConfig,
    pub report: ReportConfig,
}

/// Strategy selection and pool sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub strategy: Strategy,
    /// Admission cap shared by every strategy
    pub max_concurrency: usize,
    /// Thread pool size
    pub worker_count: usize,
    /// Process pool size, 0 = available CPU parallelism
    pub process_count: usize,
}

/// Hybrid routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub partition: PartitionKind,
    /// Bytes; an estimated cost at or above this goes to the thread pool
    pub size_threshold: u64,
}

/// Per-item limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemConfig {
    pub truncate_length: usize,
    pub timeout_seconds: u64,
}

/// Directory enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub extensions: Vec<String>,
    pub follow_links: bool,
}

/// Human-facing report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// How many recent results to list
    pub recent: usize,
    /// Preview length in the recent listing
    pub preview_length: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Cooperative,
            max_concurrency: 50,
            worker_count: 8,
            process_count: 0,
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            partition: PartitionKind::Size,
            size_threshold: crate::parallel::hybrid::DEFAULT_SIZE_THRESHOLD,
        }
    }
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            truncate_length: 1000,
            timeout_seconds: 10,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: [".txt", ".py", ".js", ".html", ".css", ".json", ".md", ".csv"]
                .into_iter()
                .map(String::from)
                .collect(),
            follow_links: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recent: 10,
            preview_length: 200,
        }
    }
}

impl BatchConfig {
    /// Reject settings that would make a batch unable to make progress
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.dispatch.max_concurrency == 0 {
            return Err(BatchError::InvalidInput(
                "dispatch.max_concurrency must be at least 1".into(),
            ));
        }
        if self.dispatch.worker_count == 0 {
            return Err(BatchError::InvalidInput(
                "dispatch.worker_count must be at least 1".into(),
            ));
        }
        if self.item.timeout_seconds == 0 {
            return Err(BatchError::InvalidInput(
                "item.timeout_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn item_settings(&self) -> ItemSettings {
        ItemSettings {
            truncate_length: self.item.truncate_length,
            timeout: Duration::from_secs(self.item.timeout_seconds),
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            worker_count: self.dispatch.worker_count,
            process_count: self.dispatch.process_count,
            worker_program: None,
        }
    }

    pub fn partition_rule(&self) -> PartitionRule {
        PartitionRule::from_config(self.hybrid.partition, self.hybrid.size_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = BatchConfig::default();
        assert_eq!(config.dispatch.strategy, Strategy::Cooperative);
        assert_eq!(config.dispatch.max_concurrency, 50);
        assert_eq!(config.dispatch.worker_count, 8);
        assert_eq!(config.item_settings(), ItemSettings::default());
        assert_eq!(config.partition_rule(), PartitionRule::Size { threshold: 10_000 });
        assert_eq!(config.discovery.extensions.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_knobs_are_invalid() {
        let mut config = BatchConfig::default();
        config.dispatch.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(BatchError::InvalidInput(_))));

        let mut config = BatchConfig::default();
        config.dispatch.worker_count = 0;
        assert!(config.validate().unwrap_err().to_string().contains("worker_count"));

        let mut config = BatchConfig::default();
        config.item.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: BatchConfig = toml::from_str(
            r#"
            [hybrid]
            partition = "parity"
            "#,
        )
        .unwrap();
        assert_eq!(config.partition_rule(), PartitionRule::Parity);
        assert_eq!(config.dispatch, DispatchConfig::default());
    }
}
