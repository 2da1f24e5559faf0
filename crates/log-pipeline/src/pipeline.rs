//! 파이프라인 오케스트레이션 -- 입력 스트림마다 워커를 띄우고 생명주기를 관리합니다.
//!
//! [`LogPipeline`]은 core의 [`Pipeline`](logtide_core::pipeline::Pipeline) trait을 구현하여
//! `logtide-daemon`에서 시작/정지/상태 확인됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! inputs ─┬─ StreamWorker (LineSource) ─┐
//!         ├─ StreamWorker (LineSource) ─┼─> BatchSink
//!         └─ ...  (Semaphore: workers)  ┘
//! ```
//!
//! 레지스트리는 시작 전에 한 번 만들어져 `Arc`로 공유되며, 워커는 잠금 없이 읽기만 합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use logtide_core::error::{LogtideError, PipelineError};
use logtide_core::pipeline::{HealthStatus, Pipeline};

use crate::batch::Batch;
use crate::classify::{FixedClassifier, RuleClassifier, SourceClassifier};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::logtype::LogTypeRegistry;
use crate::logtypes;
use crate::sink::{BatchSink, ChannelSink};
use crate::source::LineSource;
use crate::stats::PipelineStats;
use crate::worker::StreamWorker;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 처리할 입력 스트림 하나
struct ResolvedInput {
    path: PathBuf,
    classifier: Arc<dyn SourceClassifier>,
}

/// 로그 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use logtide_log_pipeline::{LogPipelineBuilder, DirectorySink};
///
/// let (mut pipeline, _) = LogPipelineBuilder::new()
///     .config(config)
///     .sink(Arc::new(DirectorySink::new("/var/lib/logtide/events")))
///     .build()?;
///
/// pipeline.start().await?;
/// let stats = pipeline.wait().await?;
/// ```
pub struct LogPipeline {
    config: PipelineConfig,
    state: PipelineState,
    registry: Arc<LogTypeRegistry>,
    rules: Arc<RuleClassifier>,
    sink: Arc<dyn BatchSink>,
    cancel: CancellationToken,
    tasks: JoinSet<PipelineStats>,
    stats: PipelineStats,
}

impl LogPipeline {
    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    pub fn registry(&self) -> &Arc<LogTypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 끝난 워커까지 합친 통계
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// 아직 끝나지 않은 스트림 수
    pub fn active_streams(&self) -> usize {
        self.tasks.len()
    }

    /// 모든 입력이 끝날 때까지 기다린 뒤 합친 통계를 반환합니다.
    pub async fn wait(&mut self) -> Result<PipelineStats, LogPipelineError> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(stats) => self.stats.merge(stats),
                Err(e) => {
                    error!(error = %e, "stream worker task failed");
                    self.stats.sources_failed += 1;
                }
            }
        }
        if self.state == PipelineState::Running {
            self.state = PipelineState::Stopped;
            info!(
                records = self.stats.records_read,
                events = self.stats.events_emitted,
                errors = self.stats.total_errors(),
                batches = self.stats.batches_delivered,
                "log pipeline finished"
            );
        }
        Ok(self.stats.clone())
    }

    /// 설정된 입력을 스트림 목록으로 펼칩니다.
    ///
    /// 디렉토리는 바로 아래의 일반 파일을 이름 순으로 포함합니다.
    async fn resolve_inputs(&self) -> Result<Vec<ResolvedInput>, LogPipelineError> {
        let rules: Arc<dyn SourceClassifier> = self.rules.clone();
        let mut resolved = Vec::new();

        for (idx, input) in self.config.inputs.iter().enumerate() {
            let classifier = match &input.log_type {
                Some(name) => Arc::new(FixedClassifier::new(name.as_str(), &self.registry).map_err(
                    |e| LogPipelineError::Config {
                        field: format!("inputs[{idx}].log_type"),
                        reason: e.to_string(),
                    },
                )?) as Arc<dyn SourceClassifier>,
                None => Arc::clone(&rules),
            };

            let path = Path::new(&input.path);
            let metadata =
                tokio::fs::metadata(path)
                    .await
                    .map_err(|e| LogPipelineError::Config {
                        field: format!("inputs[{idx}].path"),
                        reason: format!("{}: {e}", input.path),
                    })?;

            if metadata.is_dir() {
                let mut files = Vec::new();
                let mut entries = tokio::fs::read_dir(path).await?;
                while let Some(entry) = entries.next_entry().await? {
                    if entry.file_type().await?.is_file() {
                        files.push(entry.path());
                    }
                }
                files.sort();
                if files.is_empty() {
                    warn!(path = %input.path, "input directory has no files");
                }
                resolved.extend(files.into_iter().map(|path| ResolvedInput {
                    path,
                    classifier: Arc::clone(&classifier),
                }));
            } else {
                resolved.push(ResolvedInput {
                    path: path.to_path_buf(),
                    classifier,
                });
            }
        }

        Ok(resolved)
    }

    fn spawn_workers(&mut self, inputs: Vec<ResolvedInput>) {
        let permits = Arc::new(Semaphore::new(self.config.workers));

        for input in inputs {
            let permits = Arc::clone(&permits);
            let cancel = self.cancel.clone();
            let registry = Arc::clone(&self.registry);
            let sink = Arc::clone(&self.sink);
            let config = self.config.clone();

            self.tasks.spawn(async move {
                let mut stats = PipelineStats::new(config.error_sample_limit);
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return stats,
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return stats,
                    },
                };

                match LineSource::open(&input.path, config.max_record_size).await {
                    Ok(source) => {
                        StreamWorker::new(registry, sink, &config, cancel)
                            .run(source, input.classifier)
                            .await
                    }
                    Err(e) => {
                        error!(path = %input.path.display(), error = %e, "failed to open input");
                        stats.sources_failed += 1;
                        stats
                    }
                }
            });
        }
    }
}

impl Pipeline for LogPipeline {
    async fn start(&mut self) -> Result<(), LogtideError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!("starting log pipeline");

        let inputs = self.resolve_inputs().await.map_err(LogtideError::from)?;
        info!(
            streams = inputs.len(),
            workers = self.config.workers,
            log_types = self.registry.len(),
            "inputs resolved"
        );

        self.cancel = CancellationToken::new();
        // 재시작하면 이번 실행의 통계만 집계
        self.stats = PipelineStats::new(self.config.error_sample_limit);
        self.spawn_workers(inputs);
        self.state = PipelineState::Running;
        info!("log pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogtideError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!(active = self.tasks.len(), "stopping log pipeline");
        self.cancel.cancel();
        self.wait().await.map_err(LogtideError::from)?;
        info!("log pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running if self.tasks.is_empty() => {
                HealthStatus::Degraded("no active streams".to_owned())
            }
            PipelineState::Running => HealthStatus::Healthy,
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 로그 파이프라인 빌더
pub struct LogPipelineBuilder {
    config: PipelineConfig,
    registry: Option<Arc<LogTypeRegistry>>,
    sink: Option<Arc<dyn BatchSink>>,
    batch_channel_capacity: usize,
}

impl LogPipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            registry: None,
            sink: None,
            batch_channel_capacity: 64,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 로그 타입 레지스트리를 지정합니다. 지정하지 않으면 내장 레지스트리를 만듭니다.
    pub fn registry(mut self, registry: Arc<LogTypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 배치 싱크를 지정합니다.
    pub fn sink(mut self, sink: Arc<dyn BatchSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 배치 채널 용량 (싱크를 지정하지 않은 경우)
    pub fn batch_channel_capacity(mut self, capacity: usize) -> Self {
        self.batch_channel_capacity = capacity;
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `LogPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<Batch>>`: 배치 수신 채널 (싱크를 지정한 경우 None)
    pub fn build(self) -> Result<(LogPipeline, Option<mpsc::Receiver<Batch>>), LogPipelineError> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(logtypes::builtin_registry()?),
        };
        let rules = RuleClassifier::from_config(&self.config.classification, &registry)?;

        let (sink, batch_rx) = match self.sink {
            Some(sink) => (sink, None),
            None => {
                let (sink, rx) = ChannelSink::channel(self.batch_channel_capacity.max(1));
                (Arc::new(sink) as Arc<dyn BatchSink>, Some(rx))
            }
        };

        let pipeline = LogPipeline {
            stats: PipelineStats::new(self.config.error_sample_limit),
            config: self.config,
            state: PipelineState::Initialized,
            registry,
            rules: Arc::new(rules),
            sink,
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        };

        Ok((pipeline, batch_rx))
    }
}

impl Default for LogPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfigBuilder;

    #[test]
    fn builder_creates_pipeline_with_channel() {
        let (pipeline, rx) = LogPipelineBuilder::new().build().unwrap();
        assert_eq!(pipeline.state_name(), "initialized");
        assert!(rx.is_some());
        assert_eq!(pipeline.registry().len(), 4);
    }

    #[test]
    fn builder_with_external_sink() {
        let (sink, _rx) = ChannelSink::channel(1);
        let (_pipeline, rx) = LogPipelineBuilder::new()
            .sink(Arc::new(sink))
            .build()
            .unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn builder_rejects_rule_for_unknown_log_type() {
        let config = PipelineConfigBuilder::new()
            .classify("prefix", "/logs/", "Nope.Missing")
            .build()
            .unwrap();
        assert!(LogPipelineBuilder::new().config(config).build().is_err());
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = PipelineConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(LogPipelineBuilder::new().config(config).build().is_err());
    }

    #[tokio::test]
    async fn lifecycle_state_checks() {
        let (mut pipeline, _rx) = LogPipelineBuilder::new().build().unwrap();
        assert!(pipeline.health_check().await.is_unhealthy());
        assert!(pipeline.stop().await.is_err());
    }

    #[tokio::test]
    async fn restart_counts_only_the_new_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dns.log");
        let line = crate::parser::test_util::zeek_dns(1_700_000_000.0, "C1").to_string();
        tokio::fs::write(&path, format!("{line}\n{line}\n")).await.unwrap();
        let config = PipelineConfigBuilder::new()
            .input(path.display().to_string(), Some("Zeek.DNS"))
            .build()
            .unwrap();
        let (mut pipeline, _rx) = LogPipelineBuilder::new().config(config).build().unwrap();

        pipeline.start().await.unwrap();
        let first = pipeline.wait().await.unwrap();
        assert_eq!(first.records_read, 2);
        assert_eq!(pipeline.state_name(), "stopped");

        pipeline.start().await.unwrap();
        let second = pipeline.wait().await.unwrap();
        assert_eq!(second.records_read, 2);
        assert_eq!(second.events_emitted, 2);
        assert_eq!(second.sources_completed, 1);
    }

    #[tokio::test]
    async fn start_fails_for_missing_input() {
        let config = PipelineConfigBuilder::new()
            .input("/nonexistent/logtide/input.log", Some("Zeek.DNS"))
            .build()
            .unwrap();
        let (mut pipeline, _rx) = LogPipelineBuilder::new().config(config).build().unwrap();
        assert!(pipeline.start().await.is_err());
        assert_eq!(pipeline.state_name(), "initialized");
    }

    #[tokio::test]
    async fn start_fails_for_unregistered_input_log_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.log");
        tokio::fs::write(&path, "{}\n").await.unwrap();
        let config = PipelineConfigBuilder::new()
            .input(path.display().to_string(), Some("Nope"))
            .build()
            .unwrap();
        let (mut pipeline, _rx) = LogPipelineBuilder::new().config(config).build().unwrap();
        assert!(pipeline.start().await.is_err());
    }

    #[tokio::test]
    async fn empty_pipeline_completes() {
        let (mut pipeline, _rx) = LogPipelineBuilder::new().build().unwrap();
        pipeline.start().await.unwrap();
        assert!(pipeline.start().await.is_err());
        let stats = pipeline.wait().await.unwrap();
        assert_eq!(stats.records_read, 0);
        assert_eq!(pipeline.state_name(), "stopped");
    }
}
