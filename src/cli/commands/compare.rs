use anyhow::Result;
use clap::Args;
use std::path::Path;

use super::{ReportFormat, SourceArgs, TuningArgs, cancel_on_interrupt, load_config};
use crate::cli::Output;
use crate::dispatcher::Dispatcher;
use crate::parallel::Strategy;

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Strategies to run, in order (comma-separated; default all)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub strategies: Vec<Strategy>,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

pub async fn execute(args: CompareArgs, verbose: u8, quiet: bool, custom_config: Option<&Path>) -> Result<()> {
    let output = Output::new(verbose > 0, quiet);
    let config = load_config(custom_config, &args.tuning, None, None)?;
    let (source, kind) = args.source.resolve(&config)?;

    let strategies = if args.strategies.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        args.strategies.clone()
    };

    let function = kind.instantiate(config.item_settings().timeout)?;
    let dispatcher = Dispatcher::new(config, function)?;
    cancel_on_interrupt(dispatcher.cancellation_token());

    let items = dispatcher.discover(&source)?;
    if items.is_empty() {
        match args.format {
            ReportFormat::Text => output.warning("No work items found"),
            ReportFormat::Json => println!("{}", serde_json::json!({ "status": "no_work" })),
        }
        return Ok(());
    }

    // JSON mode keeps stdout a single document
    if args.format == ReportFormat::Text {
        output.info(&format!(
            "Comparing {} strategies on {} items",
            strategies.len(),
            items.len()
        ));
    }
    let comparison = dispatcher.compare(&items, &strategies).await?;

    match args.format {
        ReportFormat::Text => output.comparison(&comparison),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
    }
    Ok(())
}
