//! 출력 배치 -- 파티션 키별로 이벤트를 모아 봉인된 배치로 내보냅니다.
//!
//! 배치는 다음 중 하나가 만족되면 봉인됩니다:
//! - 이벤트 수가 `max_events`에 도달
//! - 첫 이벤트 이후 `max_age`가 경과 ([`OutputBatcher::seal_expired`])
//! - 종료 시 [`OutputBatcher::seal_all`]
//!
//! 봉인된 배치는 배처에서 제거되므로 더 이상 이벤트를 받지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::LogPipelineError;
use crate::logtype::table_name;
use crate::normalize::NormalizedEvent;

/// 배치 식별자 UUIDv5 네임스페이스
const BATCH_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c6f_6774_6964_4500_8000_6261_7463_6800);

/// 파티션 시간 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PartitionGranularity {
    #[default]
    Hourly,
    Daily,
}

impl PartitionGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }

    /// 시각을 버킷 시작 시각으로 내림합니다.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let hour = match self {
            Self::Hourly => ts.hour(),
            Self::Daily => 0,
        };
        ts.date_naive()
            .and_hms_opt(hour, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(ts)
    }
}

impl fmt::Display for PartitionGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionGranularity {
    type Err = LogPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(LogPipelineError::Config {
                field: "partition".to_owned(),
                reason: format!("unknown granularity '{other}' (expected hourly or daily)"),
            }),
        }
    }
}

/// 출력 파티션 키 (로그 타입, 시간 버킷)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    log_type: String,
    bucket: DateTime<Utc>,
    granularity: PartitionGranularity,
}

impl PartitionKey {
    pub fn new(
        log_type: impl Into<String>,
        event_time: DateTime<Utc>,
        granularity: PartitionGranularity,
    ) -> Self {
        Self {
            log_type: log_type.into(),
            bucket: granularity.truncate(event_time),
            granularity,
        }
    }

    /// 이벤트의 파티션 키. 같은 이벤트는 항상 같은 키를 가집니다.
    pub fn for_event(event: &NormalizedEvent, granularity: PartitionGranularity) -> Self {
        Self::new(event.log_type(), event.event_time(), granularity)
    }

    pub fn log_type(&self) -> &str {
        &self.log_type
    }

    pub fn bucket(&self) -> DateTime<Utc> {
        self.bucket
    }

    pub fn granularity(&self) -> PartitionGranularity {
        self.granularity
    }

    /// `table/year=YYYY/month=MM/day=DD[/hour=HH]`
    pub fn path(&self) -> String {
        let b = &self.bucket;
        let mut path = format!(
            "{}/year={:04}/month={:02}/day={:02}",
            table_name(&self.log_type),
            b.year(),
            b.month(),
            b.day()
        );
        if self.granularity == PartitionGranularity::Hourly {
            path.push_str(&format!("/hour={:02}", b.hour()));
        }
        path
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// 봉인된 출력 배치
///
/// 생성 후 변경할 수 없으며, 모든 이벤트가 같은 파티션 키를 가집니다.
#[derive(Debug, Clone)]
pub struct Batch {
    id: Uuid,
    key: PartitionKey,
    events: Vec<NormalizedEvent>,
    sealed_at: DateTime<Utc>,
}

impl Batch {
    fn seal(key: PartitionKey, events: Vec<NormalizedEvent>) -> Self {
        let mut name = Vec::with_capacity(events.len() * 16);
        for event in &events {
            name.extend_from_slice(event.row_id().as_bytes());
        }
        Self {
            id: Uuid::new_v5(&BATCH_ID_NAMESPACE, &name),
            key,
            events,
            sealed_at: Utc::now(),
        }
    }

    /// 포함된 행 식별자에서 결정되는 배치 식별자
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    pub fn events(&self) -> &[NormalizedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn sealed_at(&self) -> DateTime<Utc> {
        self.sealed_at
    }

    pub fn into_events(self) -> Vec<NormalizedEvent> {
        self.events
    }

    /// 이벤트당 한 줄의 JSON 직렬화
    pub fn to_json_lines(&self) -> Result<Vec<u8>, LogPipelineError> {
        let mut out = Vec::with_capacity(self.events.len() * 256);
        for event in &self.events {
            serde_json::to_writer(&mut out, event)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

struct OpenBatch {
    events: Vec<NormalizedEvent>,
    opened_at: Instant,
}

/// 파티션 키별 이벤트 누적기
///
/// 워커 하나가 소유하며 동기화가 필요 없습니다.
pub struct OutputBatcher {
    granularity: PartitionGranularity,
    max_events: usize,
    max_age: Duration,
    open: HashMap<PartitionKey, OpenBatch>,
}

impl OutputBatcher {
    pub fn new(granularity: PartitionGranularity, max_events: usize, max_age: Duration) -> Self {
        Self {
            granularity,
            max_events: max_events.max(1),
            max_age,
            open: HashMap::new(),
        }
    }

    /// 이벤트를 받아들입니다. 크기 한도에 도달하면 봉인된 배치를 반환합니다.
    pub fn accept(&mut self, event: NormalizedEvent, now: Instant) -> Option<Batch> {
        let key = PartitionKey::for_event(&event, self.granularity);
        let open = self.open.entry(key.clone()).or_insert_with(|| OpenBatch {
            events: Vec::new(),
            opened_at: now,
        });
        open.events.push(event);

        if open.events.len() >= self.max_events {
            self.seal(&key)
        } else {
            None
        }
    }

    /// 해당 키의 배치를 봉인합니다.
    pub fn seal(&mut self, key: &PartitionKey) -> Option<Batch> {
        self.open
            .remove(key)
            .filter(|open| !open.events.is_empty())
            .map(|open| Batch::seal(key.clone(), open.events))
    }

    /// `max_age`를 넘긴 배치를 모두 봉인합니다. 결과는 키 순서로 정렬됩니다.
    pub fn seal_expired(&mut self, now: Instant) -> Vec<Batch> {
        let mut expired: Vec<PartitionKey> = self
            .open
            .iter()
            .filter(|(_, open)| now.saturating_duration_since(open.opened_at) >= self.max_age)
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();
        expired.iter().filter_map(|key| self.seal(key)).collect()
    }

    /// 열린 배치를 모두 봉인합니다. 결과는 키 순서로 정렬됩니다.
    pub fn seal_all(&mut self) -> Vec<Batch> {
        let mut batches: Vec<Batch> = self
            .open
            .drain()
            .filter(|(_, open)| !open.events.is_empty())
            .map(|(key, open)| Batch::seal(key, open.events))
            .collect();
        batches.sort_by(|a, b| a.key.cmp(&b.key));
        batches
    }

    /// 아직 봉인되지 않은 이벤트 수
    pub fn pending_events(&self) -> usize {
        self.open.values().map(|open| open.events.len()).sum()
    }

    pub fn open_batches(&self) -> usize {
        self.open.len()
    }

    pub fn granularity(&self) -> PartitionGranularity {
        self.granularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logtypes;
    use crate::normalize::Normalizer;
    use crate::parser::test_util::zeek_dns;
    use crate::record::{CandidateRecord, Provenance};
    use chrono::TimeZone;

    fn dns_event(offset: u64, ts: f64) -> NormalizedEvent {
        let registry = logtypes::builtin_registry().unwrap();
        Normalizer::new()
            .normalize(
                CandidateRecord::new(0, zeek_dns(ts, &format!("C{offset}"))),
                registry.lookup("Zeek.DNS").unwrap(),
                &Provenance::new(
                    "/var/log/zeek/dns.log",
                    offset,
                    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                ),
            )
            .unwrap()
    }

    #[test]
    fn granularity_truncates() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 12).unwrap();
        assert_eq!(
            PartitionGranularity::Hourly.truncate(ts),
            Utc.with_ymd_and_hms(2024, 3, 9, 17, 0, 0).unwrap()
        );
        assert_eq!(
            PartitionGranularity::Daily.truncate(ts),
            Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn granularity_from_str() {
        assert_eq!("daily".parse::<PartitionGranularity>().unwrap(), PartitionGranularity::Daily);
        assert!("weekly".parse::<PartitionGranularity>().is_err());
    }

    #[test]
    fn partition_path_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(
            PartitionKey::new("Zeek.DNS", ts, PartitionGranularity::Hourly).path(),
            "zeek_dns/year=2024/month=03/day=09/hour=07"
        );
        assert_eq!(
            PartitionKey::new("AWS.CloudTrail", ts, PartitionGranularity::Daily).path(),
            "aws_cloudtrail/year=2024/month=03/day=09"
        );
    }

    #[test]
    fn size_threshold_seals_batch() {
        let mut batcher =
            OutputBatcher::new(PartitionGranularity::Hourly, 2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(batcher.accept(dns_event(1, 1_700_000_000.0), now).is_none());
        let batch = batcher.accept(dns_event(2, 1_700_000_001.0), now).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batcher.pending_events(), 0);

        // 봉인 후 같은 키의 이벤트는 새 배치로 시작
        assert!(batcher.accept(dns_event(3, 1_700_000_002.0), now).is_none());
        assert_eq!(batcher.pending_events(), 1);
    }

    #[test]
    fn events_are_grouped_by_partition() {
        let mut batcher =
            OutputBatcher::new(PartitionGranularity::Hourly, 100, Duration::from_secs(60));
        let now = Instant::now();
        batcher.accept(dns_event(1, 1_700_000_000.0), now);
        batcher.accept(dns_event(2, 1_700_000_000.0 + 7200.0), now);
        batcher.accept(dns_event(3, 1_700_000_010.0), now);
        assert_eq!(batcher.open_batches(), 2);

        let batches = batcher.seal_all();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0].key() < batches[1].key());
        assert_eq!(batcher.pending_events(), 0);
    }

    #[test]
    fn age_threshold_seals_batch() {
        let mut batcher =
            OutputBatcher::new(PartitionGranularity::Hourly, 100, Duration::from_secs(60));
        let start = Instant::now();
        batcher.accept(dns_event(1, 1_700_000_000.0), start);

        assert!(batcher.seal_expired(start + Duration::from_secs(30)).is_empty());
        let sealed = batcher.seal_expired(start + Duration::from_secs(61));
        assert_eq!(sealed.len(), 1);
        assert_eq!(batcher.open_batches(), 0);
    }

    #[test]
    fn batch_id_depends_on_contents() {
        let seal = |offsets: &[u64]| {
            let mut batcher =
                OutputBatcher::new(PartitionGranularity::Daily, 100, Duration::from_secs(60));
            for &offset in offsets {
                batcher.accept(dns_event(offset, 1_700_000_000.0), Instant::now());
            }
            batcher.seal_all().remove(0)
        };
        assert_eq!(seal(&[1, 2]).id(), seal(&[1, 2]).id());
        assert_ne!(seal(&[1, 2]).id(), seal(&[1, 3]).id());
    }

    #[test]
    fn json_lines_has_one_line_per_event() {
        let mut batcher =
            OutputBatcher::new(PartitionGranularity::Hourly, 100, Duration::from_secs(60));
        batcher.accept(dns_event(1, 1_700_000_000.0), Instant::now());
        batcher.accept(dns_event(2, 1_700_000_001.0), Instant::now());
        let batch = batcher.seal_all().remove(0);
        let text = String::from_utf8(batch.to_json_lines().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["p_log_type"], "Zeek.DNS");
        assert_eq!(first["p_source_offset"], 1);
    }
}
