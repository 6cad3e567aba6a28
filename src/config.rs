//! Configuration for the message server and client.
//!
//! The server supports both command-line arguments and a TOML configuration
//! file; CLI arguments take precedence over config file values. The client is
//! configured from the command line only.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments for the message server
#[derive(Parser, Debug, Default)]
#[command(name = "message-server")]
#[command(version)]
#[command(about = "Serves messages by number over a fixed-frame TCP protocol", long_about = None)]
pub struct ServerArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:5000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Message source: first line is the count, then one message per line
    #[arg(short = 'm', long)]
    pub messages: Option<PathBuf>,

    /// Listen backlog passed to the kernel
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Seed for random message selection (each connection derives its own)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Command-line arguments for the message client
#[derive(Parser, Debug)]
#[command(name = "message-client")]
#[command(version)]
#[command(about = "Requests messages from a message server", long_about = None)]
pub struct ClientArgs {
    /// Server address
    #[arg(short, long, default_value = "localhost:5000")]
    pub server: String,

    /// Send a single request for this message number (0 for random) and exit
    #[arg(short, long, allow_negative_numbers = true)]
    pub index: Option<i32>,

    /// With --index, ask the server to close the connection after replying
    #[arg(long, requires = "index")]
    pub close: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
        }
    }
}

/// Message catalog configuration
#[derive(Debug, Deserialize)]
pub struct MessagesConfig {
    /// Path of the message source
    #[serde(default = "default_messages_path")]
    pub path: PathBuf,
    /// Fixed seed for random selection
    pub seed: Option<u64>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            path: default_messages_path(),
            seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_backlog() -> i32 {
    1024
}

fn default_messages_path() -> PathBuf {
    PathBuf::from("messages.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub messages_path: PathBuf,
    pub backlog: i32,
    pub seed: Option<u64>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(ServerArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(ServerArgs::parse())
    }

    /// Resolve already parsed arguments, reading the TOML file they name.
    pub fn from_args(cli: ServerArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents =
                std::fs::read_to_string(config_path).map_err(|source| ConfigError::FileRead {
                    path: config_path.clone(),
                    source,
                })?;
            toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            })?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: ServerArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            messages_path: cli.messages.unwrap_or(toml_config.messages.path),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            seed: cli.seed.or(toml_config.messages.seed),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
