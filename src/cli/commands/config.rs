use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use std::path::Path;

use crate::config::{BatchConfig, ConfigOverrides};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
    /// Get one configuration value by dotted path, e.g. dispatch.max_concurrency
    Get { key: String },
    /// Load and validate the merged configuration
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

pub async fn execute(args: ConfigArgs, custom_config: Option<&Path>) -> Result<()> {
    let overrides = ConfigOverrides::default();

    match args.command {
        ConfigCommand::Show { format } => {
            let config = BatchConfig::load_with(custom_config, &overrides)?;
            let rendered = match format {
                ConfigFormat::Toml => toml::to_string_pretty(&config)?,
                ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
            };
            println!("{rendered}");
        }
        ConfigCommand::Get { key } => {
            let value: serde_json::Value = BatchConfig::figment(custom_config, &overrides)?
                .extract_inner(&key)
                .map_err(|e| anyhow::anyhow!("Unknown configuration key '{key}': {e}"))?;
            match value {
                serde_json::Value::String(s) => println!("{s}"),
                other => println!("{}", serde_json::to_string_pretty(&other)?),
            }
        }
        ConfigCommand::Validate => {
            let config = BatchConfig::load_with(custom_config, &overrides)?;
            config.validate()?;
            println!("{} Configuration is valid", console::style("✔").green());
        }
    }
    Ok(())
}
