use clap::Parser;

use cluster_cache::cli::{Cli, execute_command, load_settings};
use cluster_cache::logger::init_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logger(&settings.logger)?;

    tracing::debug!(
        version = cluster_cache::pkg_version(),
        command = ?cli.command,
        "Starting cluster-cache"
    );

    let mut stdout = std::io::stdout().lock();
    execute_command(&cli.command, &settings, &mut stdout).await
}
