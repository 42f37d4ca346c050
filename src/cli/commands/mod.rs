use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::{BatchConfig, ConfigOverrides};
use crate::dispatcher::WorkSource;
use crate::parallel::{PartitionKind, Strategy};
use crate::work::WorkKind;

pub mod compare;
pub mod config;
pub mod run;
pub mod worker;

#[derive(Parser)]
#[command(
    name = "batchio",
    version = crate::VERSION,
    about = "Bounded-concurrency batch I/O over files and URLs",
    long_about = "batchio reads files or fetches URLs in bulk under a fixed concurrency cap, \
                  using cooperative tasks, a thread pool, both at once, or a process pool, \
                  and reports per-item results and aggregate statistics."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a batch with one strategy and print its summary
    Run(run::RunArgs),
    /// Run the same batch under several strategies and rank them
    Compare(compare::CompareArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Serve a process pool over stdin/stdout
    #[command(hide = true)]
    Worker,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        match self.command {
            Commands::Run(args) => run::execute(args, self.verbose, self.quiet, self.config.as_deref()).await,
            Commands::Compare(args) => {
                compare::execute(args, self.verbose, self.quiet, self.config.as_deref()).await
            }
            Commands::Config(args) => config::execute(args, self.config.as_deref()).await,
            Commands::Worker => worker::execute().await,
        }
    }
}

/// Logs always go to stderr; a worker's stdout carries frames only
fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("info,ignore=warn"),
        2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn,hyper=info,reqwest=info"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Output format for `run` and `compare`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Where the batch's items come from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Directory to walk recursively for files with an allowed extension
    #[arg(value_name = "DIR", conflicts_with_all = ["items", "list"])]
    pub directory: Option<PathBuf>,

    /// Explicit identifier (file path or URL); repeatable
    #[arg(short = 'i', long = "item", value_name = "ID")]
    pub items: Vec<String>,

    /// File with one identifier per line
    #[arg(long, value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Work function; inferred from the identifiers when omitted
    #[arg(long, value_enum)]
    pub kind: Option<WorkKind>,
}

impl SourceArgs {
    pub fn resolve(&self, config: &BatchConfig) -> Result<(WorkSource, WorkKind)> {
        if let Some(directory) = &self.directory {
            let source = WorkSource::directory(
                directory,
                &config.discovery.extensions,
                config.discovery.follow_links,
            );
            return Ok((source, self.kind.unwrap_or(WorkKind::ReadFile)));
        }

        let mut identifiers = self.items.clone();
        if let Some(list) = &self.list {
            identifiers.extend(read_identifier_list(list)?);
        }
        if identifiers.is_empty() && self.list.is_none() {
            anyhow::bail!("Nothing to process: give a directory, --item or --list");
        }

        let kind = self.kind.unwrap_or_else(|| infer_kind(&identifiers));
        Ok((WorkSource::Identifiers(identifiers), kind))
    }
}

fn read_identifier_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identifier list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// URLs only means fetch, anything else means read
fn infer_kind(identifiers: &[String]) -> WorkKind {
    let all_urls = !identifiers.is_empty()
        && identifiers
            .iter()
            .all(|id| id.starts_with("http://") || id.starts_with("https://"));
    if all_urls { WorkKind::FetchUrl } else { WorkKind::ReadFile }
}

/// Knobs shared by `run` and `compare`; unset flags leave config alone
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Maximum items executing at once
    #[arg(short = 'c', long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Thread pool size
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub worker_count: Option<usize>,

    /// Process pool size (0 = one per CPU)
    #[arg(long = "processes", value_name = "N")]
    pub process_count: Option<usize>,

    /// Hybrid partition rule
    #[arg(long, value_enum)]
    pub partition: Option<PartitionKind>,

    /// Hybrid size split in bytes
    #[arg(long, value_name = "BYTES")]
    pub size_threshold: Option<u64>,

    /// Per-item timeout
    #[arg(short = 't', long = "timeout", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Preview length before truncation
    #[arg(long = "truncate", value_name = "CHARS")]
    pub truncate_length: Option<usize>,

    /// Allowed extensions for directory walks (comma-separated or repeated)
    #[arg(short = 'e', long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Follow symbolic links while walking
    #[arg(long)]
    pub follow_links: bool,
}

impl TuningArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        overrides.dispatch.max_concurrency = self.max_concurrency;
        overrides.dispatch.worker_count = self.worker_count;
        overrides.dispatch.process_count = self.process_count;
        overrides.hybrid.partition = self.partition;
        overrides.hybrid.size_threshold = self.size_threshold;
        overrides.item.timeout_seconds = self.timeout_seconds;
        overrides.item.truncate_length = self.truncate_length;
        overrides.discovery.extensions = self.extensions.clone();
        overrides.discovery.follow_links = self.follow_links.then_some(true);
        overrides
    }
}

/// Config for a run: every layer plus the command's own flags
pub(crate) fn load_config(
    custom_config: Option<&Path>,
    tuning: &TuningArgs,
    strategy: Option<Strategy>,
    recent: Option<usize>,
) -> Result<BatchConfig> {
    let mut overrides = tuning.overrides();
    overrides.dispatch.strategy = strategy;
    overrides.report.recent = recent;
    BatchConfig::load_with(custom_config, &overrides)
}

/// Cancel the dispatcher's batches on Ctrl-C
pub(crate) fn cancel_on_interrupt(token: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling batch");
            token.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_kind_inference() {
        let urls = vec!["https://a.example".to_string(), "http://b.example/x".to_string()];
        assert_eq!(infer_kind(&urls), WorkKind::FetchUrl);

        let mixed = vec!["https://a.example".to_string(), "notes.txt".to_string()];
        assert_eq!(infer_kind(&mixed), WorkKind::ReadFile);
        assert_eq!(infer_kind(&[]), WorkKind::ReadFile);
    }

    #[test]
    fn test_list_file_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("ids.txt");
        std::fs::write(&list, "# urls\nhttps://a.example\n\n  https://b.example  \n").unwrap();

        let args = SourceArgs {
            list: Some(list),
            ..Default::default()
        };
        let (source, kind) = args.resolve(&BatchConfig::default()).unwrap();
        assert_eq!(kind, WorkKind::FetchUrl);
        assert_eq!(
            source,
            WorkSource::Identifiers(vec!["https://a.example".into(), "https://b.example".into()])
        );
    }

    #[test]
    fn test_empty_source_is_rejected() {
        assert!(SourceArgs::default().resolve(&BatchConfig::default()).is_err());
    }

    #[test]
    fn test_tuning_flags_become_overrides() {
        let tuning = TuningArgs {
            max_concurrency: Some(4),
            follow_links: true,
            ..Default::default()
        };
        let value = tuning.overrides().to_value();
        assert_eq!(value["dispatch"]["max_concurrency"], 4);
        assert_eq!(value["discovery"]["follow_links"], true);
        assert!(value.get("item").is_none());
    }
}
