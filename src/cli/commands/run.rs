use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::{ReportFormat, SourceArgs, TuningArgs, cancel_on_interrupt, load_config};
use crate::cli::Output;
use crate::dispatcher::{BatchOutcome, BatchReport, Dispatcher};
use crate::parallel::{BatchProgress, Strategy};
use crate::work::WorkResult;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Execution strategy (defaults to the configured one)
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// How many recent results to list
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a BatchReport>,
    recent: Vec<WorkResult>,
}

pub async fn execute(args: RunArgs, verbose: u8, quiet: bool, custom_config: Option<&Path>) -> Result<()> {
    let output = Output::new(verbose > 0, quiet);
    let config = load_config(custom_config, &args.tuning, args.strategy, args.recent)?;
    let (source, kind) = args.source.resolve(&config)?;
    let strategy = config.dispatch.strategy;

    if args.format == ReportFormat::Text {
        output.verbose(&format!(
            "Strategy {} with {:?}, max_concurrency {}",
            strategy, kind, config.dispatch.max_concurrency
        ));
    }

    let function = kind.instantiate(config.item_settings().timeout)?;
    let mut dispatcher = Dispatcher::new(config.clone(), function)?;

    let show_progress = !quiet && !args.no_progress && args.format == ReportFormat::Text;
    if show_progress {
        dispatcher = dispatcher.with_progress(Arc::new(BatchProgress::new(0)));
    }
    cancel_on_interrupt(dispatcher.cancellation_token());

    match dispatcher.run_source(&source, strategy).await? {
        BatchOutcome::Completed(report) => match args.format {
            ReportFormat::Text => {
                output.batch_report(&report, config.report.recent, config.report.preview_length);
                output.blank_line();
                if report.summary.failed == 0 {
                    output.success(&format!("Processed {} items", report.summary.total));
                } else {
                    output.warning(&format!(
                        "Processed {} items, {} failed",
                        report.summary.total, report.summary.failed
                    ));
                }
            }
            ReportFormat::Json => {
                let json = JsonReport {
                    status: "completed",
                    recent: report.recent(config.report.recent),
                    report: Some(&report),
                };
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        },
        BatchOutcome::NoWork => match args.format {
            ReportFormat::Text => output.warning("No work items found"),
            ReportFormat::Json => {
                let json = JsonReport {
                    status: "no_work",
                    report: None,
                    recent: Vec::new(),
                };
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        },
        BatchOutcome::InvalidInput(reason) => {
            anyhow::bail!("Invalid input: {reason}");
        }
    }

    Ok(())
}
