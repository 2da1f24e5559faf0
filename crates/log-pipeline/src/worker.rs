//! 스트림 워커 -- 소스 하나를 끝까지 처리합니다.
//!
//! ```text
//! RecordSource -> classify (스트림당 1회) -> Dispatcher -> Normalizer -> OutputBatcher -> BatchSink
//! ```
//!
//! 레코드 단위 에러(분류/파싱/검증)는 해당 레코드만 드롭하고 집계한 뒤 계속 진행합니다.
//! 취소는 레코드 사이에서만 관찰되며, 종료 시 열린 배치를 모두 봉인해 전달합니다.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use logtide_core::metrics as m;

use crate::batch::{Batch, OutputBatcher};
use crate::classify::{Dispatcher, SourceClassifier};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::logtype::LogTypeRegistry;
use crate::normalize::Normalizer;
use crate::record::RawRecord;
use crate::sink::BatchSink;
use crate::source::RecordSource;
use crate::stats::{ErrorSample, PipelineStats};

/// 스트림 하나를 소유하는 워커
///
/// 디스패처(파서 어댑터), 정규화기, 배처, 통계를 모두 자기 것으로 가지므로
/// 다른 워커와 공유하는 가변 상태가 없습니다.
pub struct StreamWorker {
    registry: Arc<LogTypeRegistry>,
    sink: Arc<dyn BatchSink>,
    dispatcher: Dispatcher,
    normalizer: Normalizer,
    batcher: OutputBatcher,
    stats: PipelineStats,
    flush_interval: Duration,
    cancel: CancellationToken,
}

impl StreamWorker {
    pub fn new(
        registry: Arc<LogTypeRegistry>,
        sink: Arc<dyn BatchSink>,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
            sink,
            normalizer: Normalizer::new(),
            batcher: OutputBatcher::new(
                config.partition,
                config.batch_max_events,
                config.batch_max_age(),
            ),
            stats: PipelineStats::new(config.error_sample_limit),
            flush_interval: config.flush_interval(),
            cancel,
        }
    }

    /// 소스가 끝나거나 취소될 때까지 처리하고 통계를 반환합니다.
    pub async fn run<S: RecordSource>(
        mut self,
        mut source: S,
        classifier: Arc<dyn SourceClassifier>,
    ) -> PipelineStats {
        let source_id = source.source_id().to_owned();
        let log_type = match classifier.classify(&source_id) {
            Ok(name) => Some(name.to_owned()),
            Err(e) => {
                warn!(source_id = %source_id, error = %e, "source could not be classified, records will be dropped");
                None
            }
        };
        info!(source_id = %source_id, log_type = log_type.as_deref().unwrap_or("-"), "stream started");
        gauge!(m::PIPELINE_WORKERS_ACTIVE).increment(1.0);

        let cancel = self.cancel.clone();
        let mut tick = tokio::time::interval(self.flush_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failed = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(source_id = %source_id, "stream cancelled");
                    break;
                }
                _ = tick.tick() => {
                    let expired = self.batcher.seal_expired(Instant::now());
                    self.deliver(expired).await;
                }
                next = source.next_record() => match next {
                    Ok(Some(raw)) => self.process(log_type.as_deref(), raw).await,
                    Ok(None) => break,
                    Err(e) if e.record_error_kind().is_some() => {
                        self.stats.records_read += 1;
                        counter!(m::PIPELINE_RECORDS_READ_TOTAL).increment(1);
                        let offset = error_offset(&e);
                        self.record_failure(log_type.as_deref(), &source_id, offset, &e);
                    }
                    Err(e) => {
                        error!(source_id = %source_id, error = %e, "stream read failed");
                        failed = true;
                        break;
                    }
                },
            }
        }

        let remaining = self.batcher.seal_all();
        self.deliver(remaining).await;

        if failed {
            self.stats.sources_failed += 1;
        } else {
            self.stats.sources_completed += 1;
        }
        gauge!(m::PIPELINE_WORKERS_ACTIVE).decrement(1.0);
        info!(
            source_id = %source_id,
            records = self.stats.records_read,
            events = self.stats.events_emitted,
            errors = self.stats.total_errors(),
            "stream finished"
        );
        self.stats
    }

    /// 원시 레코드 하나를 처리합니다.
    async fn process(&mut self, log_type: Option<&str>, raw: RawRecord) {
        self.stats.records_read += 1;
        counter!(m::PIPELINE_RECORDS_READ_TOTAL).increment(1);
        let started = std::time::Instant::now();

        let Some(name) = log_type else {
            let err = LogPipelineError::UnknownSource(raw.provenance.source_id.to_string());
            self.record_failure(None, &raw.provenance.source_id, raw.offset(), &err);
            return;
        };

        let registry = Arc::clone(&self.registry);
        let resolved = registry
            .lookup(name)
            .and_then(|lt| Ok((lt, self.dispatcher.dispatch(name, &raw)?)));
        let (descriptor, candidates) = match resolved {
            Ok(pair) => pair,
            Err(e) => {
                self.record_failure(Some(name), &raw.provenance.source_id, raw.offset(), &e);
                return;
            }
        };

        let mut sealed = Vec::new();
        for candidate in candidates {
            match self
                .normalizer
                .normalize(candidate, descriptor, &raw.provenance)
            {
                Ok(event) => {
                    let degraded = event.degraded_fields().len();
                    self.stats.record_event(name, degraded);
                    counter!(m::PIPELINE_EVENTS_EMITTED_TOTAL, m::LABEL_LOG_TYPE => name.to_owned())
                        .increment(1);
                    if degraded > 0 {
                        debug!(
                            source_id = %raw.provenance.source_id,
                            offset = raw.offset(),
                            fields = ?event.degraded_fields(),
                            "optional fields degraded to null"
                        );
                        counter!(m::PIPELINE_DEGRADED_FIELDS_TOTAL, m::LABEL_LOG_TYPE => name.to_owned())
                            .increment(degraded as u64);
                    }
                    if let Some(batch) = self.batcher.accept(event, Instant::now()) {
                        sealed.push(batch);
                    }
                }
                Err(e) => {
                    self.record_failure(Some(name), &raw.provenance.source_id, raw.offset(), &e);
                }
            }
        }
        histogram!(m::PIPELINE_PROCESSING_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        self.deliver(sealed).await;
    }

    /// 레코드 단위 실패를 집계합니다. 샘플 한도 안에서는 warn, 이후는 debug로 남깁니다.
    fn record_failure(
        &mut self,
        log_type: Option<&str>,
        source_id: &str,
        offset: u64,
        err: &LogPipelineError,
    ) {
        let Some(kind) = err.record_error_kind() else {
            error!(source_id, offset, error = %err, "unexpected error while processing record");
            return;
        };

        counter!(
            m::PIPELINE_RECORD_ERRORS_TOTAL,
            m::LABEL_ERROR_KIND => kind.as_str(),
            m::LABEL_LOG_TYPE => log_type.unwrap_or("-").to_owned()
        )
        .increment(1);

        let sampled = self.stats.record_error(
            log_type,
            kind,
            ErrorSample {
                source_id: source_id.to_owned(),
                offset,
                message: err.to_string(),
            },
        );
        if sampled {
            warn!(source_id, offset, kind = %kind, error = %err, "record dropped");
        } else {
            debug!(source_id, offset, kind = %kind, error = %err, "record dropped");
        }
    }

    /// 봉인된 배치를 싱크로 전달합니다. 실패는 집계만 하고 처리를 계속합니다.
    async fn deliver(&mut self, batches: Vec<Batch>) {
        for batch in batches {
            let events = batch.len();
            let key = batch.key().to_string();
            counter!(m::BATCH_SEALED_TOTAL, m::LABEL_LOG_TYPE => batch.key().log_type().to_owned())
                .increment(1);
            histogram!(m::BATCH_SIZE_EVENTS).record(events as f64);

            match self.sink.deliver(batch).await {
                Ok(()) => {
                    self.stats.batches_delivered += 1;
                    counter!(m::BATCH_DELIVERIES_TOTAL, m::LABEL_RESULT => "success").increment(1);
                    debug!(partition = %key, events, "batch delivered");
                }
                Err(e) => {
                    self.stats.delivery_failures += 1;
                    counter!(m::BATCH_DELIVERIES_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                    error!(sink = self.sink.name(), partition = %key, events, error = %e, "batch delivery failed");
                }
            }
        }
    }
}

fn error_offset(err: &LogPipelineError) -> u64 {
    match err {
        LogPipelineError::Parse { offset, .. } => *offset,
        _ => 0,
    }
}
