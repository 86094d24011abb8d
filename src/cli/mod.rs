//! Command-line interface
//!
//! - Argument parsing with clap
//! - Settings loading with CLI overrides
//! - Dispatch of one cache operation per invocation

pub mod executor;
pub mod parser;

pub use executor::{execute_command, run_operation};
pub use parser::{Cli, Commands};

use crate::config::{ConfigLoader, Settings};

/// Load settings honoring `--config`, `--env` and `--verbose`
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::from_file(path),
        None => ConfigLoader::new()?,
    };
    let loader = match cli.env {
        Some(env) => loader.with_environment(env),
        None => loader,
    };

    let mut settings = loader.load_unvalidated()?;
    if cli.verbose {
        settings.logger.level = "debug".to_string();
    }
    settings.validate()?;
    Ok(settings)
}
