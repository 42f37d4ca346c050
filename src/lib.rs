//! # batchio - bounded-concurrency batch I/O
//!
//! Reads files or fetches URLs in bulk under one concurrency cap and
//! collects every per-item outcome, failures included, into a single
//! result log with aggregate statistics.
//!
//! ## Strategies
//!
//! - **cooperative**: async tasks on one scheduling thread
//! - **threads**: a fixed crossbeam worker pool
//! - **hybrid**: both of the above at once, split by size or index parity
//! - **processes**: `batchio worker` children over JSON Lines, results in
//!   submission order
//!
//! ## Quick Start
//!
//! ```bash
//! # Read every matching file under ./data with 8 threads
//! batchio run ./data --strategy threads --workers 8
//!
//! # Rank all strategies on the same URL list
//! batchio compare --list urls.txt
//! ```
//!
//! ## Library use
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batchio::{BatchConfig, Dispatcher, FileReader, Strategy, WorkSource};
//!
//! # async fn demo() -> batchio::Result<()> {
//! let config = BatchConfig::load()?;
//! let dispatcher = Dispatcher::new(config, Arc::new(FileReader::new()))?;
//! let source = WorkSource::directory("./data", &[".txt".to_string()], false);
//! let items = dispatcher.discover(&source)?;
//! let report = dispatcher.run_batch(items, Strategy::Hybrid).await?;
//! println!("{} ok, {} failed", report.summary.successful, report.summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod parallel;
pub mod results;
pub mod work;

pub use cli::{Cli, Output};
pub use config::BatchConfig;
pub use dispatcher::{BatchOutcome, BatchReport, Dispatcher, WorkSource};
pub use error::{BatchError, WorkError};
pub use parallel::{AdmissionController, Strategy};
pub use results::{BatchSummary, ResultAggregator};
pub use work::{FileReader, UrlFetcher, WorkFunction, WorkItem, WorkKind, WorkResult};

/// Result type alias for batchio application code
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
