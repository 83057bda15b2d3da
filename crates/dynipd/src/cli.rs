//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dynip/config.yml";

/// Propagates a dynamic address to DNS records and files
#[derive(Parser, Debug)]
#[command(name = "dynipd", version)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "DYNIP_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Daemon commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the daemon until SIGTERM or SIGINT
    Run,
    /// Validate the configuration and print a summary
    Config,
}
