use serde::Serialize;
use serde_json::Value;

use crate::parallel::{PartitionKind, Strategy};

/// CLI flags that sit on top of every other config layer
///
/// Mirrors the sections of [`BatchConfig`](super::BatchConfig); a `None`
/// means the flag was not given and the lower layers decide.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub dispatch: DispatchOverrides,
    pub hybrid: HybridOverrides,
    pub item: ItemOverrides,
    pub discovery: DiscoveryOverrides,
    pub report: ReportOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchOverrides {
    pub strategy: Option<Strategy>,
    pub max_concurrency: Option<usize>,
    pub worker_count: Option<usize>,
    pub process_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HybridOverrides {
    pub partition: Option<PartitionKind>,
    pub size_threshold: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemOverrides {
    pub truncate_length: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryOverrides {
    pub extensions: Vec<String>,
    pub follow_links: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportOverrides {
    pub recent: Option<usize>,
}

impl ConfigOverrides {
    /// Only the flags that were actually set, as a nested JSON object
    pub fn to_value(&self) -> Value {
        prune_unset(serde_json::to_value(self).unwrap_or(Value::Null))
    }
}

/// Drop nulls, empty arrays and objects that end up empty
pub fn prune_unset(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, prune_unset(value)))
                .filter(|(_, value)| !is_unset(value))
                .collect(),
        ),
        other => other,
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
