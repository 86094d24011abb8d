//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cache::Timeout;
use crate::config::Environment;

/// Talk to a cache store cluster through the cache facade
#[derive(Parser, Debug)]
#[command(name = "cluster-cache")]
#[command(about = "Talk to a cache store cluster through the cache facade")]
#[command(long_about = "
cluster-cache runs single cache operations against the configured store
cluster. Servers, store name, key prefix and default timeout come from the
layered configuration (config/default.toml, config/{env}.toml,
config/local.toml, CLUSTER_CACHE_* variables).

EXAMPLES:
    # Validate configuration without contacting the store
    cluster-cache check

    # Store a value for 60 seconds
    cluster-cache set user:1 alice --timeout 60

    # Store only if absent
    cluster-cache add lock:job ok

    # Fetch one or several keys
    cluster-cache get user:1 --default nobody
    cluster-cache get-many user:1 user:2 user:3

    # Use another configuration file
    cluster-cache --config /etc/cluster-cache/prod.toml clear
")]
#[command(version = crate::build::CLAP_LONG_VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path, replacing layered loading
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override environment detection
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Key version shared by the key-addressed commands
#[derive(Args, Debug, Clone, Copy)]
pub struct VersionArg {
    /// Key version, defaults to the configured version
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub key_version: Option<i64>,
}

/// Expiry shared by the writing commands
#[derive(Args, Debug, Clone, Copy)]
pub struct TimeoutArg {
    /// Expiry in seconds, defaults to the configured timeout
    #[arg(short, long, value_name = "SECONDS", conflicts_with = "no_expiry")]
    pub timeout: Option<u64>,

    /// Keep the entry until deleted
    #[arg(long)]
    pub no_expiry: bool,
}

impl TimeoutArg {
    pub fn to_timeout(self) -> Timeout {
        match (self.timeout, self.no_expiry) {
            (_, true) => Timeout::Never,
            (Some(seconds), false) => Timeout::Seconds(seconds),
            (None, false) => Timeout::Default,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration and exit without connecting
    Check,

    /// Fetch a value
    Get {
        key: String,

        /// Printed when the key is absent
        #[arg(short, long)]
        default: Option<String>,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Fetch several values; absent keys are not printed
    GetMany {
        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Store a value unconditionally
    Set {
        key: String,
        value: String,

        #[command(flatten)]
        timeout: TimeoutArg,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Store a value only if the key is absent
    Add {
        key: String,
        value: String,

        #[command(flatten)]
        timeout: TimeoutArg,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Remove a key; succeeds when the key is absent
    Delete {
        key: String,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Remove every key of the configured store
    Clear,
}
