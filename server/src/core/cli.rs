use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{ENV_API_KEY, ENV_CONFIG, ENV_DATABASE_URL, ENV_HOST, ENV_PORT};

#[derive(Parser)]
#[command(name = "querygate")]
#[command(version, about = "Query-string filtered REST API over SQLite tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// SQLite connection URL (e.g. sqlite://data.db)
    #[arg(long, global = true, env = ENV_DATABASE_URL)]
    pub database_url: Option<String>,

    /// API key required by protected actions
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Disable API key checks (for development)
    #[arg(long, global = true)]
    pub no_auth: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Print how a query string translates for a configured resource
    Translate {
        /// Resource name from the config file
        resource: String,
        /// Query string, with or without the leading '?'
        query: String,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub database_url: Option<String>,
    pub api_key: Option<String>,
    pub no_auth: bool,
}

fn split(cli: Cli) -> (CliConfig, Option<Commands>) {
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        database_url: cli.database_url,
        api_key: cli.api_key,
        no_auth: cli.no_auth,
    };
    (config, cli.command)
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    split(Cli::parse())
}
