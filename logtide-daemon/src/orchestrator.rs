//! Daemon orchestration -- assembly, lifecycle management and shutdown.
//!
//! The [`Orchestrator`] is the central coordinator of `logtide-daemon`.
//! It validates configuration, builds the log type registry, exports the
//! schema catalog, wires the pipeline to its output directory and runs
//! until every input is drained or a shutdown signal arrives.
//!
//! # Startup
//!
//! 1. Validate `LogtideConfig` and derive `PipelineConfig`
//! 2. Build the registry (any invalid declaration aborts startup)
//! 3. Install the metrics recorder (if enabled)
//! 4. Write schema descriptions to `output.schema_dir`
//! 5. Build the pipeline with a `DirectorySink` on `output.dir`
//!
//! # Shutdown
//!
//! On SIGTERM/SIGINT the pipeline is cancelled; every worker seals and
//! delivers its open batches before the run loop returns.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::MissedTickBehavior;

use logtide_core::config::LogtideConfig;
use logtide_core::metrics as m;
use logtide_core::pipeline::Pipeline;
use logtide_log_pipeline::catalog;
use logtide_log_pipeline::classify::RuleClassifier;
use logtide_log_pipeline::logtypes;
use logtide_log_pipeline::{
    DirectorySink, LogPipeline, LogPipelineBuilder, LogTypeRegistry, PipelineConfig, PipelineStats,
};

use crate::health::DaemonHealth;
use crate::metrics_server;

/// Interval between health snapshots in the run loop.
const HEALTH_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration checked and resolved up to the point of building a pipeline.
pub struct Preflight {
    /// Built-in log types, shared with the pipeline.
    pub registry: Arc<LogTypeRegistry>,
    /// Pipeline settings derived from `[pipeline]`.
    pub pipeline: PipelineConfig,
}

/// Validate configuration and build everything that can fail before startup.
///
/// Used by both `--validate` and [`Orchestrator::build_from_config`], so a
/// configuration that passes here does not fail later for static reasons.
pub fn preflight(config: &LogtideConfig) -> Result<Preflight> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    let registry = logtypes::builtin_registry()
        .map_err(|e| anyhow::anyhow!("failed to build log type registry: {}", e))?;

    let pipeline = PipelineConfig::from_core(config)
        .map_err(|e| anyhow::anyhow!("invalid pipeline config: {}", e))?;
    pipeline
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid pipeline config: {}", e))?;

    RuleClassifier::from_config(&pipeline.classification, &registry)
        .map_err(|e| anyhow::anyhow!("invalid classification rules: {}", e))?;

    Ok(Preflight {
        registry: Arc::new(registry),
        pipeline,
    })
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogtideConfig,
    /// The normalization pipeline.
    pipeline: LogPipeline,
    /// Schema description files written at startup.
    catalog_files: Vec<PathBuf>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load `logtide.toml` (with environment overrides) and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogtideConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: LogtideConfig) -> Result<Self> {
        let Preflight { registry, pipeline } = preflight(&config)?;

        tracing::info!(
            log_types = registry.len(),
            names = ?registry.names(),
            "log type registry built"
        );

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics(registry.len());
        }

        let catalog_files = export_catalog(&config.output.schema_dir, &registry).await?;

        let sink = Arc::new(DirectorySink::new(&config.output.dir));
        let (pipeline, _) = LogPipelineBuilder::new()
            .config(pipeline)
            .registry(registry)
            .sink(sink)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log pipeline: {}", e))?;

        tracing::info!(output_dir = %config.output.dir, "orchestrator initialized");

        Ok(Self {
            config,
            pipeline,
            catalog_files,
            start_time: Instant::now(),
        })
    }

    /// Start the pipeline and run until SIGTERM/SIGINT or until every input is drained.
    pub async fn run(&mut self) -> Result<PipelineStats> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Start the pipeline and run until `shutdown` resolves or every input is drained.
    ///
    /// `shutdown` resolves to the name of the trigger, used for logging.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = Result<&'static str>>,
    {
        self.pipeline
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start log pipeline: {}", e))?;

        let mut health_tick = tokio::time::interval(HEALTH_INTERVAL);
        health_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!("entering main loop");
        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    let signal = signal?;
                    tracing::info!(signal, "shutdown signal received");
                    self.pipeline
                        .stop()
                        .await
                        .map_err(|e| anyhow::anyhow!("failed to stop log pipeline: {}", e))?;
                    break;
                }
                drained = self.pipeline.wait() => {
                    drained.map_err(|e| anyhow::anyhow!("log pipeline failed: {}", e))?;
                    tracing::info!("all inputs drained");
                    break;
                }
                _ = health_tick.tick() => {
                    self.health().await.log();
                }
            }
        }

        let stats = self.pipeline.stats().clone();
        log_summary(&stats, self.start_time.elapsed());
        Ok(stats)
    }

    /// Current health snapshot. Also refreshes the uptime gauge when metrics are enabled.
    pub async fn health(&self) -> DaemonHealth {
        let uptime_secs = self.start_time.elapsed().as_secs();
        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth::new(
            self.pipeline.health_check().await,
            uptime_secs,
            self.pipeline.active_streams(),
            self.pipeline.stats(),
        )
    }

    /// Schema description files written during startup.
    pub fn catalog_files(&self) -> &[PathBuf] {
        &self.catalog_files
    }

    pub fn config(&self) -> &LogtideConfig {
        &self.config
    }
}

/// Write one schema description per log type into `schema_dir`.
///
/// An empty `schema_dir` disables the export.
async fn export_catalog(schema_dir: &str, registry: &LogTypeRegistry) -> Result<Vec<PathBuf>> {
    if schema_dir.is_empty() {
        tracing::debug!("schema export disabled");
        return Ok(Vec::new());
    }

    let files = catalog::write_descriptions(Path::new(schema_dir), registry)
        .await
        .map_err(|e| anyhow::anyhow!("failed to export schema descriptions: {}", e))?;
    tracing::info!(dir = schema_dir, files = files.len(), "schema descriptions exported");
    Ok(files)
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl-C handler: {}", e))?;
    Ok("ctrl_c")
}

/// Record daemon-level metrics (build info, registered log types).
fn record_daemon_metrics(log_types: usize) {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_LOG_TYPES_REGISTERED).set(log_types as f64);
}

/// Log the final run summary: totals first, then one line per log type.
fn log_summary(stats: &PipelineStats, elapsed: Duration) {
    tracing::info!(
        elapsed_secs = elapsed.as_secs(),
        records_read = stats.records_read,
        events_emitted = stats.events_emitted,
        record_errors = stats.total_errors(),
        batches_delivered = stats.batches_delivered,
        delivery_failures = stats.delivery_failures,
        sources_completed = stats.sources_completed,
        sources_failed = stats.sources_failed,
        "run summary"
    );

    for (log_type, per_type) in &stats.per_log_type {
        let errors: u64 = per_type.errors.values().map(|tally| tally.count).sum();
        tracing::info!(
            log_type = %log_type,
            events = per_type.events,
            degraded_fields = per_type.degraded_fields,
            errors,
            "log type summary"
        );
    }

    let unclassified: u64 = stats.unclassified.values().map(|tally| tally.count).sum();
    if unclassified > 0 {
        tracing::warn!(records = unclassified, "records dropped without a log type");
    }
}
