//! Connection configuration for the CLI
//!
//! Settings are resolved from, highest priority first:
//! 1. Command-line flags and their `REFAUDIT_*` environment variables
//! 2. `~/.refaudit/config.toml`
//! 3. Built-in defaults

use crate::cli::error::HelpfulError;
use crate::cli::output::redact;
use refaudit_protocol::config::parse_host;
use refaudit_protocol::defaults::DEFAULT_ENVIRONMENT;
use refaudit_protocol::paths::{default_config_path, refaudit_home};
use refaudit_protocol::RepositorySettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection flags shared by every subcommand
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConnectionArgs {
    /// Space to audit
    #[arg(long, env = "REFAUDIT_SPACE_ID", global = true)]
    pub space_id: Option<String>,

    /// Space environment (default: master)
    #[arg(long, env = "REFAUDIT_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Delivery API access token
    #[arg(long, env = "REFAUDIT_DELIVERY_TOKEN", hide_env_values = true, global = true)]
    pub delivery_token: Option<String>,

    /// Management API token; when set, the schema is read from the Management API
    #[arg(long, env = "REFAUDIT_MANAGEMENT_TOKEN", hide_env_values = true, global = true)]
    pub management_token: Option<String>,

    /// Override the Delivery API host
    #[arg(long, global = true)]
    pub delivery_host: Option<String>,

    /// Override the Management API host
    #[arg(long, global = true)]
    pub management_host: Option<String>,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub space_id: Option<String>,
    pub environment: Option<String>,
    pub delivery_token: Option<String>,
    pub management_token: Option<String>,
    pub delivery_host: Option<String>,
    pub management_host: Option<String>,
    pub web_app_host: Option<String>,
    pub page_size: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Load the file at `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            )
        })
    }

    /// Apply flag and environment values on top of the file
    pub fn overlay(mut self, args: &ConnectionArgs) -> Self {
        fn pick(flag: &Option<String>, file: Option<String>) -> Option<String> {
            flag.clone()
                .filter(|value| !value.trim().is_empty())
                .or(file)
        }
        self.space_id = pick(&args.space_id, self.space_id);
        self.environment = pick(&args.environment, self.environment);
        self.delivery_token = pick(&args.delivery_token, self.delivery_token);
        self.management_token = pick(&args.management_token, self.management_token);
        self.delivery_host = pick(&args.delivery_host, self.delivery_host);
        self.management_host = pick(&args.management_host, self.management_host);
        self
    }

    /// Build settings. Only the space id is required here; callers that talk to
    /// the repository go through [`resolve_settings`].
    pub fn build_settings(&self) -> Result<RepositorySettings, HelpfulError> {
        let space_id = self
            .space_id
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| HelpfulError::missing_setting("space_id", "--space-id", "REFAUDIT_SPACE_ID"))?;

        let mut settings =
            RepositorySettings::new(space_id, self.delivery_token.clone().unwrap_or_default())
                .map_err(|e| HelpfulError::invalid_setting("default host", &e.to_string()))?;
        if let Some(environment) = &self.environment {
            settings.environment = environment.clone();
        }
        settings.management_token = self
            .management_token
            .clone()
            .filter(|token| !token.trim().is_empty());

        for (field, value, target) in [
            ("delivery_host", &self.delivery_host, &mut settings.delivery_host),
            ("management_host", &self.management_host, &mut settings.management_host),
            ("web_app_host", &self.web_app_host, &mut settings.web_app_host),
        ] {
            if let Some(value) = value {
                *target = parse_host(field, value)
                    .map_err(|e| HelpfulError::invalid_setting(field, &e.to_string()))?;
            }
        }

        if let Some(page_size) = self.page_size {
            settings.page_size = page_size;
        }
        if let Some(secs) = self.request_timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }

    /// The same values with tokens redacted, for display
    pub fn redacted(&self) -> Self {
        Self {
            delivery_token: self.delivery_token.as_deref().map(redact),
            management_token: self.management_token.as_deref().map(redact),
            ..self.clone()
        }
    }
}

/// Load the config file and apply the connection flags
pub fn load_merged(args: &ConnectionArgs) -> anyhow::Result<ConfigFile> {
    Ok(ConfigFile::load(&default_config_path())?.overlay(args))
}

/// Fully validated settings for commands that read from the repository
pub fn resolve_settings(
    args: &ConnectionArgs,
    page_size: Option<u64>,
) -> anyhow::Result<RepositorySettings> {
    let merged = load_merged(args)?;
    Ok(settings_for_repository(&merged, page_size)?)
}

fn settings_for_repository(
    merged: &ConfigFile,
    page_size: Option<u64>,
) -> Result<RepositorySettings, HelpfulError> {
    let mut settings = merged.build_settings()?;
    if settings.delivery_token.trim().is_empty() {
        return Err(HelpfulError::missing_setting(
            "delivery_token",
            "--delivery-token",
            "REFAUDIT_DELIVERY_TOKEN",
        ));
    }
    if let Some(page_size) = page_size {
        settings.page_size = page_size;
    }
    settings
        .validate()
        .map_err(|e| HelpfulError::invalid_setting("settings", &e.to_string()))?;
    Ok(settings)
}

/// Arguments for the config command
#[derive(Debug)]
pub struct ConfigArgs {
    pub json: bool,
}

/// Run the config command - shows the resolved configuration
pub fn run(args: ConfigArgs, connection: &ConnectionArgs) -> anyhow::Result<()> {
    let path = default_config_path();
    let merged = load_merged(connection)?;
    let shown = merged.redacted();
    let problem = settings_for_repository(&merged, None)
        .err()
        .map(|e| e.message);

    if args.json {
        let config = serde_json::json!({
            "home": refaudit_home().to_string_lossy(),
            "config_file": {
                "path": path.to_string_lossy(),
                "exists": path.exists(),
            },
            "settings": shown,
            "ready": problem.is_none(),
            "problem": problem,
        });
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let environment = shown
            .environment
            .clone()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        let unset = || "(not set)".to_string();

        println!("REFAUDIT CONFIGURATION");
        println!("======================");
        println!();
        println!("Home:        {}", refaudit_home().display());
        println!(
            "Config file: {} ({})",
            path.display(),
            if path.exists() { "exists" } else { "not found" }
        );
        println!();
        println!("Space:            {}", shown.space_id.clone().unwrap_or_else(unset));
        println!("Environment:      {}", environment);
        println!("Delivery token:   {}", shown.delivery_token.clone().unwrap_or_else(unset));
        println!("Management token: {}", shown.management_token.clone().unwrap_or_else(unset));
        if let Some(host) = &shown.delivery_host {
            println!("Delivery host:    {}", host);
        }
        if let Some(host) = &shown.management_host {
            println!("Management host:  {}", host);
        }
        if let Some(page_size) = shown.page_size {
            println!("Page size:        {}", page_size);
        }
        println!();
        match &problem {
            None => println!("Ready to scan."),
            Some(problem) => println!("Not ready: {}", problem),
        }
    }

    Ok(())
}
