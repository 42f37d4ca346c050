//! Execution strategies for a batch of work items
//!
//! Every strategy takes the same items and the same [`ExecutionContext`] and
//! must leave exactly one [`WorkResult`](crate::work::WorkResult) per item in
//! the aggregator. What differs is where items run and in which order their
//! results land.
//!
//! ```text
//! ┌────────────┐     ┌─────────────────────┐     ┌──────────────────────┐
//! │ Dispatcher │────▶│ Strategy::run       │────▶│ ResultAggregator     │
//! │            │     │                     │     │                      │
//! │ • items    │     │ • cooperative       │     │ • append-only log    │
//! │ • config   │     │ • threads           │     │ • summary / recent   │
//! │ • cancel   │     │ • hybrid            │     │                      │
//! │            │     │ • processes         │     │                      │
//! └────────────┘     └─────────────────────┘     └──────────────────────┘
//!                               │
//!                               ▼
//!                    AdmissionController (one cap for all of them)
//! ```
//!
//! # Strategies
//!
//! - **Cooperative**: one scheduling thread; units interleave only at I/O.
//! - **Threads**: a crossbeam worker pool with a producer and a collector.
//! - **Hybrid**: items are split by a [`PartitionRule`] and both halves run at
//!   once under the shared admission cap.
//! - **Processes**: `<exe> worker` children over JSON Lines; results are
//!   recorded in submission order.
//!
//! A failing item is a failed result, never a failed batch. A strategy
//! returns `Err` only when an execution unit dies or the batch is cancelled.

pub mod admission;
pub mod cooperative;
pub mod core;
pub mod harness;
pub mod hybrid;
pub mod process;
pub mod progress;
pub mod threaded;

#[cfg(test)]
pub(crate) mod testing;

pub use admission::{AdmissionController, AdmissionPermit};
pub use core::{ExecutionContext, PoolSettings, ResultOrdering, Strategy};
pub use harness::ItemSettings;
pub use hybrid::{PartitionKind, PartitionRule, Route, Split};
pub use process::{WORKER_SUBCOMMAND, serve_worker};
pub use progress::{BatchProgress, ProgressObserver};
