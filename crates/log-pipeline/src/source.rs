//! 레코드 소스 -- 원시 레코드 스트림
//!
//! 소스 하나는 정확히 한 워커가 소유하며, 스트림 안의 순서가 그대로 처리 순서가 됩니다.
//! 오프셋은 1부터 시작하는 라인 번호입니다.

use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::error::LogPipelineError;
use crate::record::{Provenance, RawRecord};

/// 라인 소스 포맷 이름 (크기 초과 에러 보고용)
const LINE_FORMAT: &str = "line";

/// 원시 레코드 스트림
pub trait RecordSource: Send {
    /// 소스 식별자
    fn source_id(&self) -> &str;

    /// 다음 레코드를 읽습니다. 스트림 끝이면 `Ok(None)`.
    ///
    /// 레코드 단위 에러(`Parse`)를 반환한 뒤에도 계속 읽을 수 있습니다.
    /// 구현은 취소 안전(cancel safe)해야 합니다.
    fn next_record(
        &mut self,
    ) -> impl Future<Output = Result<Option<RawRecord>, LogPipelineError>> + Send;
}

/// 줄 단위 레코드 소스
///
/// - `\n`으로 분리하고 끝의 `\r`은 제거합니다.
/// - 빈 줄은 건너뛰지만 오프셋은 증가합니다.
/// - `max_record_size`를 넘는 줄은 해당 오프셋의 `Parse` 에러가 됩니다.
///
/// 읽던 줄은 `self`에 보관하므로 `next_record`가 중간에 취소되어도 데이터를 잃지 않습니다.
pub struct LineSource<R> {
    source_id: Arc<str>,
    reader: R,
    line: Vec<u8>,
    oversized: bool,
    line_no: u64,
    max_record_size: usize,
}

impl LineSource<BufReader<File>> {
    /// 파일을 열어 소스를 만듭니다. 소스 식별자는 파일 경로입니다.
    pub async fn open(path: &Path, max_record_size: usize) -> Result<Self, LogPipelineError> {
        let file = File::open(path).await?;
        Ok(Self::new(
            path.display().to_string(),
            BufReader::new(file),
            max_record_size,
        ))
    }
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(source_id: impl Into<Arc<str>>, reader: R, max_record_size: usize) -> Self {
        Self {
            source_id: source_id.into(),
            reader,
            line: Vec::new(),
            oversized: false,
            line_no: 0,
            max_record_size,
        }
    }

    /// 지금까지 읽은 줄 수
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    /// 다음 줄을 `self.line`에 채웁니다. 스트림 끝이고 남은 데이터가 없으면 `false`.
    async fn fill_line(&mut self) -> Result<bool, LogPipelineError> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(!self.line.is_empty() || self.oversized);
            }

            let (chunk_len, found) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos, true),
                None => (available.len(), false),
            };

            if self.line.len() + chunk_len > self.max_record_size {
                self.oversized = true;
            }
            if !self.oversized {
                self.line.extend_from_slice(&available[..chunk_len]);
            }

            let consumed = if found { chunk_len + 1 } else { chunk_len };
            self.reader.consume(consumed);
            if found {
                return Ok(true);
            }
        }
    }
}

impl<R> RecordSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn next_record(&mut self) -> Result<Option<RawRecord>, LogPipelineError> {
        loop {
            if !self.fill_line().await? {
                return Ok(None);
            }
            self.line_no += 1;
            let oversized = std::mem::take(&mut self.oversized);
            let mut line = std::mem::take(&mut self.line);

            if oversized {
                return Err(LogPipelineError::Parse {
                    format: LINE_FORMAT.to_owned(),
                    offset: self.line_no,
                    reason: format!("record exceeds {} bytes", self.max_record_size),
                });
            }

            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(RawRecord::new(
                line,
                Provenance::new(self.source_id.clone(), self.line_no, Utc::now()),
            )));
        }
    }
}

/// 메모리 내 레코드 소스
///
/// 테스트와 CLI의 일회성 처리에 사용합니다.
#[derive(Debug, Clone)]
pub struct MemorySource {
    source_id: Arc<str>,
    records: VecDeque<(u64, Bytes)>,
    ingested_at: Option<DateTime<Utc>>,
}

impl MemorySource {
    /// 줄 목록으로 소스를 만듭니다. 오프셋은 1부터 차례로 매깁니다.
    pub fn new<I, B>(source_id: impl Into<Arc<str>>, lines: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::with_offsets(
            source_id,
            lines.into_iter().enumerate().map(|(i, line)| (i as u64 + 1, line)),
        )
    }

    /// (오프셋, 데이터) 쌍으로 소스를 만듭니다.
    pub fn with_offsets<I, B>(source_id: impl Into<Arc<str>>, records: I) -> Self
    where
        I: IntoIterator<Item = (u64, B)>,
        B: Into<Bytes>,
    {
        Self {
            source_id: source_id.into(),
            records: records
                .into_iter()
                .map(|(offset, data)| (offset, data.into()))
                .collect(),
            ingested_at: None,
        }
    }

    /// 모든 레코드의 수집 시각을 고정합니다.
    pub fn with_ingest_time(mut self, ts: DateTime<Utc>) -> Self {
        self.ingested_at = Some(ts);
        self
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl RecordSource for MemorySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn next_record(&mut self) -> Result<Option<RawRecord>, LogPipelineError> {
        Ok(self.records.pop_front().map(|(offset, data)| {
            let ingested_at = self.ingested_at.unwrap_or_else(Utc::now);
            RawRecord::new(
                data,
                Provenance::new(self.source_id.clone(), offset, ingested_at),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn collect<S: RecordSource>(source: &mut S) -> Vec<Result<(u64, String), String>> {
        let mut out = Vec::new();
        loop {
            match source.next_record().await {
                Ok(Some(raw)) => out.push(Ok((
                    raw.offset(),
                    String::from_utf8_lossy(&raw.data).into_owned(),
                ))),
                Ok(None) => break,
                Err(e) => out.push(Err(e.to_string())),
            }
        }
        out
    }

    #[tokio::test]
    async fn splits_lines_and_tracks_offsets() {
        let data: &[u8] = b"first\r\n\nsecond\nthird";
        let mut source = LineSource::new("mem", data, 1024);
        let records = collect(&mut source).await;
        assert_eq!(
            records,
            vec![
                Ok((1, "first".to_owned())),
                Ok((3, "second".to_owned())),
                Ok((4, "third".to_owned())),
            ]
        );
        assert_eq!(source.lines_read(), 4);
    }

    #[tokio::test]
    async fn oversized_line_is_a_record_error() {
        let data: &[u8] = b"ok\nthis line is far too long\nok again\n";
        let mut source = LineSource::new("mem", data, 10);
        let records = collect(&mut source).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Ok((1, "ok".to_owned())));
        assert!(records[1].as_ref().unwrap_err().contains("exceeds 10 bytes"));
        assert_eq!(records[2], Ok((3, "ok again".to_owned())));
    }

    #[tokio::test]
    async fn small_reader_buffer_reassembles_lines() {
        let data: &[u8] = b"alpha beta gamma\ndelta\n";
        let reader = BufReader::with_capacity(4, data);
        let mut source = LineSource::new("mem", reader, 1024);
        let records = collect(&mut source).await;
        assert_eq!(records[0], Ok((1, "alpha beta gamma".to_owned())));
        assert_eq!(records[1], Ok((2, "delta".to_owned())));
    }

    #[tokio::test]
    async fn open_reads_file_with_path_as_source_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dns.log");
        tokio::fs::write(&path, "a\nb\n").await.unwrap();

        let mut source = LineSource::open(&path, 1024).await.unwrap();
        assert_eq!(source.source_id(), path.display().to_string());
        let raw = source.next_record().await.unwrap().unwrap();
        assert_eq!(&*raw.provenance.source_id, path.display().to_string());
    }

    #[tokio::test]
    async fn open_missing_file_is_io_error() {
        let result = LineSource::open(Path::new("/nonexistent/logtide/x.log"), 1024).await;
        assert!(matches!(result, Err(LogPipelineError::Io(_))));
    }

    #[tokio::test]
    async fn memory_source_uses_given_offsets() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut source =
            MemorySource::with_offsets("s3://b/k", [(10, "x"), (11, "y")]).with_ingest_time(ts);
        let first = source.next_record().await.unwrap().unwrap();
        assert_eq!(first.offset(), 10);
        assert_eq!(first.provenance.ingested_at, ts);
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.next_record().await.unwrap().unwrap().offset(), 11);
        assert!(source.next_record().await.unwrap().is_none());
    }
}
