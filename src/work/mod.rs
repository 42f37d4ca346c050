//! Work items, work results and the work functions that produce them
//!
//! The dispatcher never looks inside a work function. It only relies on the
//! contract in [`WorkFunction`]: an identifier goes in, a [`WorkOutput`] or a
//! [`WorkError`](crate::error::WorkError) comes out.

pub mod file;
pub mod function;
pub mod item;
pub mod url;
pub mod wire;

pub use file::FileReader;
pub use function::{WorkFunction, WorkKind};
pub use item::{ExecutorTag, TRUNCATION_MARKER, WorkItem, WorkOutput, WorkResult, truncate_preview};
pub use url::UrlFetcher;
