//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: poll until the exit tag is set (default)
//! - once: one read-compute-write cycle
//! - read: read and print the tags
//! - config: print the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tagloop::config::ConfigOverrides;
use tagloop::poller::OverlapPolicy;

/// tagloop - sums two IoT gateway tags and writes the result back
#[derive(Parser, Debug)]
#[command(name = "tagloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Gateway host
    #[arg(long, global = true, env = "TAGLOOP_HOST")]
    pub host: Option<String>,

    /// Gateway REST port
    #[arg(long, global = true, env = "TAGLOOP_PORT")]
    pub port: Option<u16>,

    /// Poll interval in milliseconds
    #[arg(short, long, global = true, env = "TAGLOOP_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Behaviour when a tick fires while a read is outstanding
    #[arg(long, global = true, value_enum)]
    pub overlap: Option<OverlapPolicy>,

    /// Stop after this many ticks
    #[arg(long, global = true)]
    pub max_ticks: Option<u64>,

    /// Gateway password (basic auth, used with gateway.username)
    #[arg(long, global = true, env = "TAGLOOP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Config values given on the command line or through the environment
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            interval_ms: self.interval_ms,
            overlap: self.overlap,
            max_ticks: self.max_ticks,
            password: self.password.clone(),
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll the gateway until the exit tag is set (default)
    Run,

    /// Run a single read-compute-write cycle
    Once,

    /// Read the tags and print them without writing
    Read,

    /// Print the effective configuration
    Config,
}
