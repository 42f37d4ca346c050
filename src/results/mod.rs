//! Result log and batch summary

pub mod aggregator;
pub mod summary;

pub use aggregator::ResultAggregator;
pub use summary::{BatchSummary, ExecutorBreakdown, identifier_extension};
