use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

use super::{BatchConfig, ConfigOverrides};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Repository-level config file stem, looked up in the working directory
const REPO_CONFIG_STEM: &str = "batchio";

impl BatchConfig {
    /// Defaults, user config, repo config and `BATCHIO_*` environment
    pub fn load() -> Result<Self> {
        Self::load_with(None, &ConfigOverrides::default())
    }

    /// Full layering; `custom_config` replaces the user and repo files
    pub fn load_with(custom_config: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let figment = Self::figment(custom_config, overrides)?;
        let config: BatchConfig = figment
            .extract()
            .context("Failed to parse batchio configuration")?;
        tracing::trace!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// The merged provider stack, exposed for `batchio config show`
    pub fn figment(custom_config: Option<&Path>, overrides: &ConfigOverrides) -> Result<Figment> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            if !custom_path.exists() {
                anyhow::bail!("Config file not found: {}", custom_path.display());
            }
            tracing::trace!("Using custom config {}", custom_path.display());
            figment = match custom_path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            let user = Self::user_config_dir();
            figment = figment
                .merge(Toml::file(user.join("config.toml")))
                .merge(Json::file(user.join("config.json")))
                .merge(Yaml::file(user.join("config.yaml")))
                .merge(Yaml::file(user.join("config.yml")))
                .merge(Toml::file(format!("{REPO_CONFIG_STEM}.toml")))
                .merge(Json::file(format!("{REPO_CONFIG_STEM}.json")))
                .merge(Yaml::file(format!("{REPO_CONFIG_STEM}.yaml")))
                .merge(Yaml::file(format!("{REPO_CONFIG_STEM}.yml")));
        }

        // Environment beats files, CLI flags beat everything
        figment = figment
            .merge(Env::prefixed("BATCHIO_").split("__"))
            .merge(Serialized::defaults(overrides.to_value()));

        Ok(figment)
    }

    fn user_config_dir() -> PathBuf {
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config").join("batchio"),
            Err(_) => PathBuf::from("~/.config/batchio"),
        }
    }
}
