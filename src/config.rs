use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WarehouseConfig {
    /// Project identifier; the warehouse file is attached under this catalog name.
    pub project_id: Option<String>,
    /// DuckDB file backing the project, or `:memory:`.
    pub path: String,
    pub pool_size: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "ollama", "remote", "gemini" or "none"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Warehouse project identifier
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// DuckDB file holding the project's datasets
    #[arg(long, value_name = "FILE", global = true)]
    pub warehouse: Option<String>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the JSON API (default)
    Serve,
    /// Answer a single question and print the response as JSON
    Ask {
        /// Dataset to query
        #[arg(short, long)]
        dataset: String,
        /// The question, in plain language
        question: String,
    },
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start with the built-in defaults
        let mut config_builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/nl-insight/config.toml",
            ];

            if let Some(location) = default_locations.iter().find(|l| Path::new(l).exists()) {
                config_builder =
                    config_builder.add_source(File::new(location, config::FileFormat::Toml));
            }
        }

        // NL_INSIGHT_WAREHOUSE__PROJECT_ID=... and friends
        config_builder = config_builder.add_source(
            Environment::with_prefix("NL_INSIGHT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Command line args win over everything else
        if let Some(project) = &args.project {
            config.warehouse.project_id = Some(project.clone());
        }
        if let Some(path) = &args.warehouse {
            config.warehouse.path = path.clone();
        }
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the settings every component needs before it can be constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id().is_none() {
            return Err(ConfigError::Invalid(
                "warehouse.project_id is not set (use --project or NL_INSIGHT_WAREHOUSE__PROJECT_ID)"
                    .to_string(),
            ));
        }
        if self.warehouse.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "warehouse.pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn project_id(&self) -> Option<&str> {
        self.warehouse
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            warehouse: WarehouseConfig {
                project_id: None,
                path: "warehouse.duckdb".to_string(),
                pool_size: 5,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig {
                backend: "ollama".to_string(),
                model: "sqlcoder".to_string(),
                api_key: None,
                api_url: None,
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        }
    }
}
