//! CLI module for leadrouter
//!
//! # Commands
//!
//! - `serve` - Start the routing engine
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Write a starter config, then serve
//! leadrouter config init
//! leadrouter serve --bus-url http://bus.internal:4222
//!
//! # Generate shell completions
//! leadrouter completions bash > ~/.bash_completion.d/leadrouter
//! ```

pub mod completions;
pub mod config;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// leadrouter - lead routing and assignment engine
#[derive(Parser, Debug)]
#[command(
    name = "leadrouter",
    version,
    about = "Routes insurance leads to the best available agents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the routing engine
    Serve(ServeArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "leadrouter.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "LEADROUTER_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "LEADROUTER_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LEADROUTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override the bus gateway URL
    #[arg(long, env = "LEADROUTER_BUS_URL")]
    pub bus_url: Option<String>,

    /// Disable the stale-lead sweeper
    #[arg(long)]
    pub no_sweeper: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "leadrouter.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
