mod cli;

use anyhow::Result;
use clap::Parser;

use logtide_core::config::LogtideConfig;
use logtide_daemon::{logging, orchestrator};

use crate::cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = LogtideConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;

    // CLI overrides take precedence over file and environment.
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }

    if cli.validate {
        let checked = orchestrator::preflight(&config)?;
        println!(
            "configuration OK: {} log types, {} inputs, {} classification rules",
            checked.registry.len(),
            checked.pipeline.inputs.len(),
            checked.pipeline.classification.len()
        );
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "logtide-daemon starting"
    );

    let mut daemon = orchestrator::Orchestrator::build_from_config(config).await?;
    let stats = daemon.run().await?;

    if stats.sources_failed > 0 || stats.delivery_failures > 0 {
        tracing::warn!(
            sources_failed = stats.sources_failed,
            delivery_failures = stats.delivery_failures,
            "logtide-daemon finished with failures"
        );
    }

    tracing::info!("logtide-daemon shut down");
    Ok(())
}
