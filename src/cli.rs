//! Command-line argument parsing for duck-console.

use clap::Parser;
use duck_console::config::Config;
use std::path::PathBuf;

/// A browser-based SQL console for a DuckDB database file.
#[derive(Parser, Debug)]
#[command(name = "duck-console")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// DuckDB database file to open (overrides DUCKDB_PATH)
    #[arg(value_name = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind the web server to
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind the web server to
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// LLM provider for natural-language queries (openai, mock)
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Open the database file for writing
    #[arg(long)]
    pub read_write: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides, the highest-precedence layer.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database.path = Some(database.clone());
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(llm) = &self.llm {
            config.llm.provider = llm.clone();
        }
        if self.read_write {
            config.database.read_only = false;
        }
    }
}
