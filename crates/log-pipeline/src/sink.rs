//! 배치 싱크 -- 봉인된 배치의 전달 대상
//!
//! - [`DirectorySink`]: 파티션 경로 아래에 JSON lines 파일로 기록
//! - [`ChannelSink`]: `mpsc` 채널로 전달 (데몬 내부 연결, 테스트)

use std::path::{Path, PathBuf};

use logtide_core::pipeline::BoxFuture;
use tokio::sync::mpsc;
use tracing::debug;

use crate::batch::Batch;
use crate::error::LogPipelineError;

/// 봉인된 배치의 전달 대상
///
/// 여러 워커가 공유하므로 `Send + Sync`이어야 합니다.
pub trait BatchSink: Send + Sync {
    /// 싱크 이름 (로그/에러 보고용)
    fn name(&self) -> &str;

    /// 배치 하나를 전달합니다.
    fn deliver(&self, batch: Batch) -> BoxFuture<'_, Result<(), LogPipelineError>>;
}

/// 디렉토리 싱크
///
/// `<root>/<partition path>/<batch id>.json`에 기록합니다. 임시 파일에 쓴 뒤 이름을
/// 바꾸므로 읽는 쪽은 완성된 파일만 봅니다. 배치 식별자가 결정적이므로 같은 배치를
/// 다시 전달하면 같은 파일을 덮어씁니다.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 배치가 기록될 경로
    pub fn batch_path(&self, batch: &Batch) -> PathBuf {
        self.root
            .join(batch.key().path())
            .join(format!("{}.json", batch.id()))
    }

    async fn write(&self, batch: Batch) -> Result<(), LogPipelineError> {
        let path = self.batch_path(&batch);
        let sink_error = |reason: String| LogPipelineError::Sink {
            target: path.display().to_string(),
            reason,
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| sink_error(format!("create directory: {e}")))?;
        }

        let body = batch.to_json_lines()?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| sink_error(format!("write: {e}")))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| sink_error(format!("rename: {e}")))?;

        debug!(
            path = %path.display(),
            events = batch.len(),
            bytes = body.len(),
            "batch written"
        );
        Ok(())
    }
}

impl BatchSink for DirectorySink {
    fn name(&self) -> &str {
        "directory"
    }

    fn deliver(&self, batch: Batch) -> BoxFuture<'_, Result<(), LogPipelineError>> {
        Box::pin(self.write(batch))
    }
}

/// 채널 싱크
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Batch>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Batch>) -> Self {
        Self { tx }
    }

    /// 지정한 용량의 채널과 함께 싱크를 만듭니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Batch>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl BatchSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    fn deliver(&self, batch: Batch) -> BoxFuture<'_, Result<(), LogPipelineError>> {
        Box::pin(async move {
            self.tx
                .send(batch)
                .await
                .map_err(|_| LogPipelineError::Channel("batch receiver dropped".to_owned()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{OutputBatcher, PartitionGranularity};
    use crate::logtypes;
    use crate::normalize::Normalizer;
    use crate::parser::test_util::zeek_dns;
    use crate::record::{CandidateRecord, Provenance};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::time::Instant;

    fn sample_batch() -> Batch {
        let registry = logtypes::builtin_registry().unwrap();
        let log_type = registry.lookup("Zeek.DNS").unwrap();
        let mut batcher =
            OutputBatcher::new(PartitionGranularity::Hourly, 100, Duration::from_secs(60));
        for offset in 1..=3 {
            let event = Normalizer::new()
                .normalize(
                    CandidateRecord::new(0, zeek_dns(1_700_000_000.0, "C1")),
                    log_type,
                    &Provenance::new(
                        "dns.log",
                        offset,
                        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    ),
                )
                .unwrap();
            batcher.accept(event, Instant::now());
        }
        batcher.seal_all().remove(0)
    }

    #[tokio::test]
    async fn directory_sink_writes_partitioned_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let batch = sample_batch();
        let expected = sink.batch_path(&batch);
        assert!(
            expected
                .to_string_lossy()
                .contains("zeek_dns/year=2023/month=11/day=14/hour=22")
        );

        sink.deliver(batch).await.unwrap();

        let content = tokio::fs::read_to_string(&expected).await.unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(!expected.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn directory_sink_reports_unwritable_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        tokio::fs::write(&file, "x").await.unwrap();

        let sink = DirectorySink::new(&file);
        let err = sink.deliver(sample_batch()).await.unwrap_err();
        assert!(matches!(err, LogPipelineError::Sink { .. }));
    }

    #[tokio::test]
    async fn channel_sink_forwards_batches() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.deliver(sample_batch()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().len(), 3);

        drop(rx);
        let err = sink.deliver(sample_batch()).await.unwrap_err();
        assert!(matches!(err, LogPipelineError::Channel(_)));
    }
}
