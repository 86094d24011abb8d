//! Command executor for dispatching CLI commands

use std::io::Write;

use anyhow::Context;

use super::parser::Commands;
use crate::cache::CacheFacade;
use crate::config::Settings;

/// Execute a command against a facade built from the settings
///
/// `check` only builds the facade; every other command performs exactly one
/// facade operation and prints its result to `out`.
pub async fn execute_command<W: Write>(
    command: &Commands,
    settings: &Settings,
    out: &mut W,
) -> anyhow::Result<()> {
    let facade = settings
        .cache
        .build_facade()
        .context("Invalid cache configuration")?;

    if let Commands::Check = command {
        writeln!(
            out,
            "configuration ok: store '{}' on {} server(s), backend {:?}",
            facade.store_name(),
            facade.servers().len(),
            facade.params().backend
        )?;
        return Ok(());
    }

    run_operation(command, &facade, out).await
}

/// Run one cache operation and print its outcome
pub async fn run_operation<W: Write>(
    command: &Commands,
    facade: &CacheFacade,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Check => {}
        Commands::Get {
            key,
            default,
            version,
        } => match facade.get(key, version.key_version).await? {
            Some(value) => writeln!(out, "{}", String::from_utf8_lossy(&value))?,
            None => match default {
                Some(default) => writeln!(out, "{}", default)?,
                None => tracing::info!(key = %key, "Key not found"),
            },
        },
        Commands::GetMany { keys, version } => {
            let found = facade.get_many(keys.as_slice(), version.key_version).await?;
            for key in keys {
                if let Some(value) = found.get(key) {
                    writeln!(out, "{}\t{}", key, String::from_utf8_lossy(value))?;
                }
            }
        }
        Commands::Set {
            key,
            value,
            timeout,
            version,
        } => {
            facade
                .set(key, value.as_bytes(), timeout.to_timeout(), version.key_version)
                .await?;
            writeln!(out, "stored")?;
        }
        Commands::Add {
            key,
            value,
            timeout,
            version,
        } => {
            let stored = facade
                .add(key, value.as_bytes(), timeout.to_timeout(), version.key_version)
                .await?;
            writeln!(out, "{}", if stored { "stored" } else { "exists" })?;
        }
        Commands::Delete { key, version } => {
            facade.delete(key, version.key_version).await?;
            writeln!(out, "deleted")?;
        }
        Commands::Clear => {
            facade.clear().await?;
            writeln!(out, "cleared")?;
        }
    }

    Ok(())
}
